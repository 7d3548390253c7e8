//! Word wrapper (C12).
//!
//! Breaks a run of text into lines that fit a target pixel width, in one
//! of three modes: word (break at spaces, falling back to a character
//! break when a single word overflows the line on its own), character
//! (break anywhere), or none (never wrap, matching `wrap="none"` body
//! properties). CJK text is measured and broken per code point rather than
//! per word, since it carries no inter-word spaces.

use crate::font_resolver::FontResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Word,
    Char,
    None,
}

/// True for code points in the common CJK unified ideograph, compatibility
/// ideograph, and fullwidth-form ranges, where word-boundary wrapping
/// doesn't apply.
pub fn is_cjk(c: char) -> bool {
    let cp = c as u32;
    (0x4E00..=0x9FFF).contains(&cp)
        || (0x3400..=0x4DBF).contains(&cp)
        || (0x3000..=0x30FF).contains(&cp)
        || (0xAC00..=0xD7AF).contains(&cp)
}

/// Wrap `text` to fit within `max_width_px`, measured with `font_string`
/// via `resolver`'s cache. Returns the broken lines in order; an empty
/// input produces a single empty line so callers always get at least one
/// line to lay out.
pub fn wrap_text(text: &str, font_string: &str, max_width_px: f64, mode: WrapMode, resolver: &FontResolver) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    if mode == WrapMode::None {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0;

    let space_width = resolver.measure_cached(font_string, " ").width;

    let units: Vec<&str> = split_into_units(text, mode);

    for unit in units {
        if unit == "\n" {
            lines.push(std::mem::take(&mut current));
            current_width = 0.0;
            continue;
        }
        let unit_width = resolver.measure_cached(font_string, unit).width;
        let needs_space = !current.is_empty() && mode == WrapMode::Word && !unit.chars().all(is_cjk);
        let extra = if needs_space { space_width } else { 0.0 };

        if !current.is_empty() && current_width + extra + unit_width > max_width_px {
            lines.push(std::mem::take(&mut current));
            current_width = 0.0;
        }

        if current.is_empty() && mode == WrapMode::Word && unit_width > max_width_px {
            let (mut broken, tail, tail_width) = break_word_by_char(unit, max_width_px, font_string, resolver);
            lines.append(&mut broken);
            current = tail;
            current_width = tail_width;
        } else {
            if needs_space {
                current.push(' ');
                current_width += space_width;
            }
            current.push_str(unit);
            current_width += unit_width;
        }
    }
    lines.push(current);
    lines
}

/// Break a single word wider than `max_width_px` into character-packed
/// lines, since the word-boundary pass alone would leave it overflowing.
/// Returns the complete lines produced, plus the trailing partial line
/// (and its measured width) so the caller can keep accumulating onto it.
fn break_word_by_char(word: &str, max_width_px: f64, font_string: &str, resolver: &FontResolver) -> (Vec<String>, String, f64) {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0;

    for c in word.chars() {
        let mut buf = [0u8; 4];
        let ch_str = c.encode_utf8(&mut buf);
        let ch_width = resolver.measure_cached(font_string, ch_str).width;
        if !current.is_empty() && current_width + ch_width > max_width_px {
            lines.push(std::mem::take(&mut current));
            current_width = 0.0;
        }
        current.push(c);
        current_width += ch_width;
    }
    (lines, current, current_width)
}

/// Split text into the atomic units the wrapper breaks between: words for
/// `Word` mode (CJK runs are split per character since they have no
/// spaces), single characters for `Char` mode.
pub(crate) fn split_into_units(text: &str, mode: WrapMode) -> Vec<&str> {
    if mode == WrapMode::Char {
        return text.split("").filter(|s| !s.is_empty()).collect();
    }
    let mut units = Vec::new();
    for line in text.split_inclusive('\n') {
        let (content, had_newline) = match line.strip_suffix('\n') {
            Some(rest) => (rest, true),
            None => (line, false),
        };
        let mut word_start = 0;
        let mut chars = content.char_indices().peekable();
        while let Some((idx, c)) = chars.next() {
            if c == ' ' {
                if idx > word_start {
                    units.push(&content[word_start..idx]);
                }
                word_start = idx + 1;
            } else if is_cjk(c) {
                if idx > word_start {
                    units.push(&content[word_start..idx]);
                }
                let next_idx = chars.peek().map(|(i, _)| *i).unwrap_or(content.len());
                units.push(&content[idx..next_idx]);
                word_start = next_idx;
            }
        }
        if word_start < content.len() {
            units.push(&content[word_start..]);
        }
        if had_newline {
            units.push("\n");
        }
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_cjk_classifies_han_and_hangul_but_not_latin() {
        assert!(is_cjk('漢'));
        assert!(is_cjk('한'));
        assert!(!is_cjk('A'));
    }

    #[test]
    fn wrap_none_mode_never_breaks() {
        let resolver = FontResolver::new();
        let lines = wrap_text("a very long single line of text", "normal normal 16px \"Arial\"", 10.0, WrapMode::None, &resolver);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn word_mode_breaks_at_spaces_when_width_exceeded() {
        let resolver = FontResolver::new();
        let lines = wrap_text("one two three four five", "normal normal 16px \"Arial\"", 40.0, WrapMode::Word, &resolver);
        assert!(lines.len() > 1);
        assert!(!lines.iter().any(|l| l.is_empty() && lines.len() > 1));
    }

    #[test]
    fn word_mode_falls_back_to_char_break_for_an_overflowing_word() {
        let resolver = FontResolver::new();
        let lines = wrap_text("supercalifragilisticexpialidocious", "normal normal 16px \"Arial\"", 30.0, WrapMode::Word, &resolver);
        assert!(lines.len() > 1, "an overflowing single word should still split: {lines:?}");
        assert_eq!(lines.concat(), "supercalifragilisticexpialidocious");
    }

    #[test]
    fn explicit_newline_forces_a_line_break() {
        let resolver = FontResolver::new();
        let lines = wrap_text("a\nb", "normal normal 16px \"Arial\"", 1000.0, WrapMode::Word, &resolver);
        assert_eq!(lines, vec!["a".to_string(), "b".to_string()]);
    }
}
