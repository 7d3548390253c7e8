//! Bullet formatter (C13).
//!
//! Parses a paragraph's bullet properties (`buNone`/`buChar`/`buAutoNum`/
//! `buBlip`) and formats auto-numbered sequences, tracking per-level
//! counters that reset whenever the paragraph stream returns to a
//! shallower level — the same "counters are a stack indexed by level"
//! behavior Office itself shows when a numbered list is interrupted by a
//! sub-list and resumes.

use crate::xml::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoNumScheme {
    ArabicPeriod,
    ArabicParenR,
    RomanUcPeriod,
    RomanLcPeriod,
    AlphaUcPeriod,
    AlphaLcPeriod,
    AlphaLcParenR,
}

impl AutoNumScheme {
    fn parse(val: &str) -> Self {
        match val {
            "arabicParenR" => AutoNumScheme::ArabicParenR,
            "romanUcPeriod" => AutoNumScheme::RomanUcPeriod,
            "romanLcPeriod" => AutoNumScheme::RomanLcPeriod,
            "alphaUcPeriod" => AutoNumScheme::AlphaUcPeriod,
            "alphaLcPeriod" => AutoNumScheme::AlphaLcPeriod,
            "alphaLcParenR" => AutoNumScheme::AlphaLcParenR,
            _ => AutoNumScheme::ArabicPeriod,
        }
    }

    fn format(&self, n: u32) -> String {
        match self {
            AutoNumScheme::ArabicPeriod => format!("{n}."),
            AutoNumScheme::ArabicParenR => format!("{n})"),
            AutoNumScheme::RomanUcPeriod => format!("{}.", to_roman(n).to_uppercase()),
            AutoNumScheme::RomanLcPeriod => format!("{}.", to_roman(n)),
            AutoNumScheme::AlphaUcPeriod => format!("{}.", to_alpha(n).to_uppercase()),
            AutoNumScheme::AlphaLcPeriod => format!("{}.", to_alpha(n)),
            AutoNumScheme::AlphaLcParenR => format!("{})", to_alpha(n)),
        }
    }
}

fn to_alpha(n: u32) -> String {
    let mut n = n;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push((b'a' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    out.iter().rev().collect()
}

fn to_roman(n: u32) -> String {
    const VALUES: &[(u32, &str)] = &[
        (1000, "m"), (900, "cm"), (500, "d"), (400, "cd"), (100, "c"), (90, "xc"),
        (50, "l"), (40, "xl"), (10, "x"), (9, "ix"), (5, "v"), (4, "iv"), (1, "i"),
    ];
    let mut n = n;
    let mut out = String::new();
    for (val, sym) in VALUES {
        while n >= *val {
            out.push_str(sym);
            n -= val;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub enum BulletStyle {
    /// No bullet glyph, and no `buPr` override to inherit further up.
    None,
    /// No `buPr` at all on this paragraph; the layout engine should use
    /// the list-style default for this level.
    Inherit,
    Char { glyph: String, size_pct: f64 },
    AutoNum { scheme: AutoNumScheme, size_pct: f64, start_at: u32 },
    /// Picture bullets render as the fallback glyph `"\u{2022}"` since the
    /// renderer doesn't resolve the referenced image for bullet glyphs.
    Picture { size_pct: f64 },
}

impl BulletStyle {
    /// Parse the bullet children of a `<a:pPr>` node.
    pub fn parse(ppr: &Node) -> Self {
        if ppr.child("buNone").is_some() {
            return BulletStyle::None;
        }
        let size_pct = ppr
            .child("buSzPct")
            .and_then(|n| n.attr_i64("val"))
            .map(|v| v as f64 / 100_000.0)
            .unwrap_or(1.0);

        if let Some(ch) = ppr.child("buChar") {
            let glyph = ch.attr_or("char", "\u{2022}").to_string();
            return BulletStyle::Char { glyph, size_pct };
        }
        if let Some(auto) = ppr.child("buAutoNum") {
            let scheme = AutoNumScheme::parse(auto.attr_or("type", "arabicPeriod"));
            let start_at = auto.attr_i64("startAt").unwrap_or(1).max(1) as u32;
            return BulletStyle::AutoNum { scheme, size_pct, start_at };
        }
        if ppr.child("buBlip").is_some() {
            return BulletStyle::Picture { size_pct };
        }
        BulletStyle::Inherit
    }
}

/// Tracks one running counter per list level, resetting deeper levels
/// whenever a shallower paragraph is seen (matches the outline behavior:
/// starting a new level-0 item resets any level-1+ counters beneath it).
#[derive(Debug, Default)]
pub struct BulletCounters {
    counts: Vec<u32>,
}

impl BulletCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance and return the next number for `level`, given the scheme's
    /// `start_at`. Must be called once per auto-numbered paragraph, in
    /// document order.
    pub fn next(&mut self, level: u32, start_at: u32) -> u32 {
        let level = level as usize;
        if self.counts.len() <= level {
            self.counts.resize(level + 1, 0);
        }
        self.counts.truncate(level + 1);
        if self.counts[level] == 0 {
            self.counts[level] = start_at;
        } else {
            self.counts[level] += 1;
        }
        self.counts[level]
    }
}

/// Render a bullet style to its displayed glyph/label, advancing `counters`
/// for auto-numbered styles. Returns `None` for `BulletStyle::None` and
/// `Inherit` (callers resolve `Inherit` against the list style before
/// reaching here).
pub fn render(style: &BulletStyle, level: u32, counters: &mut BulletCounters) -> Option<String> {
    match style {
        BulletStyle::None | BulletStyle::Inherit => None,
        BulletStyle::Char { glyph, .. } => Some(glyph.clone()),
        BulletStyle::Picture { .. } => Some("\u{2022}".to_string()),
        BulletStyle::AutoNum { scheme, start_at, .. } => {
            let n = counters.next(level, *start_at);
            Some(scheme.format(n))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn arabic_period_formats_sequential_numbers() {
        let mut counters = BulletCounters::new();
        let style = BulletStyle::AutoNum { scheme: AutoNumScheme::ArabicPeriod, size_pct: 1.0, start_at: 1 };
        assert_eq!(render(&style, 0, &mut counters), Some("1.".to_string()));
        assert_eq!(render(&style, 0, &mut counters), Some("2.".to_string()));
    }

    #[test]
    fn deeper_level_starting_resets_its_own_counter_on_revisit() {
        let mut counters = BulletCounters::new();
        let style = BulletStyle::AutoNum { scheme: AutoNumScheme::ArabicPeriod, size_pct: 1.0, start_at: 1 };
        assert_eq!(render(&style, 0, &mut counters), Some("1.".to_string()));
        assert_eq!(render(&style, 1, &mut counters), Some("1.".to_string()));
        // returning to level 0 truncates the level-1 counter
        assert_eq!(render(&style, 0, &mut counters), Some("2.".to_string()));
        assert_eq!(render(&style, 1, &mut counters), Some("1.".to_string()));
    }

    #[test]
    fn alpha_lc_paren_wraps_past_z() {
        assert_eq!(AutoNumScheme::AlphaLcParenR.format(1), "a)");
        assert_eq!(AutoNumScheme::AlphaLcParenR.format(27), "aa)");
    }

    #[test]
    fn parses_char_bullet_from_xml() {
        let node = xml::parse(r#"<a:pPr><a:buChar char="-"/></a:pPr>"#).unwrap();
        let style = BulletStyle::parse(&node);
        assert_eq!(style, BulletStyle::Char { glyph: "-".to_string(), size_pct: 1.0 });
    }
}
