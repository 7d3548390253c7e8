//! XML entity escaping, grounded on the package layer's aho-corasick-based
//! escaper/unescaper pair (used there for writing `.rels`/part text; kept
//! here for diagnostics and for debug-mode canvas overlays that echo
//! attribute values back as text).

use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;

const ESCAPE_PATTERNS: &[&str] = &["&", "<", ">", "\"", "'"];
const ESCAPE_REPLACEMENTS: &[&str] = &["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"];

const UNESCAPE_PATTERNS: &[&str] = &["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"];
const UNESCAPE_REPLACEMENTS: &[&str] = &["&", "<", ">", "\"", "'"];

static ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::new(ESCAPE_PATTERNS).expect("escape automaton builds")
});

static UNESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(UNESCAPE_PATTERNS)
        .expect("unescape automaton builds")
});

/// Escape `&`, `<`, `>`, `"`, `'` for safe inclusion in XML text/attributes.
pub fn escape_xml(input: &str) -> String {
    ESCAPER.replace_all(input, ESCAPE_REPLACEMENTS)
}

/// Reverse of [`escape_xml`]. Longest-match first so `&amp;` wins over a
/// partial match against `&` alone.
pub fn unescape_xml(input: &str) -> String {
    UNESCAPER.replace_all(input, UNESCAPE_REPLACEMENTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_entities() {
        let raw = r#"Tom & Jerry's <tag> "quoted""#;
        let escaped = escape_xml(raw);
        assert_eq!(unescape_xml(&escaped), raw);
    }
}
