//! Theme resolver (C6).
//!
//! Locates and parses a presentation's theme: the 12-slot color scheme, the
//! major/minor font scheme (latin/ea/cs), and the background fill style
//! list. Grounded on the PresentationML parts module's `Theme`/`ThemeColor`/
//! `ThemeFont`, extended with ea/cs font variants, `bgFillStyleLst`, and the
//! documented Office-default fallback table (that module only captured the
//! 12 color slots and the latin typeface).

use crate::color::{self, ColorTransform, Rgba8};
use crate::xml::Node;
use std::collections::HashMap;

pub const SCHEME_COLOR_SLOTS: &[&str] = &[
    "dk1", "lt1", "dk2", "lt2", "accent1", "accent2", "accent3", "accent4", "accent5", "accent6",
    "hlink", "folHlink",
];

#[derive(Debug, Clone)]
pub struct ThemeFont {
    pub latin: String,
    pub ea: String,
    pub cs: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedTheme {
    pub name: String,
    pub colors: HashMap<String, Rgba8>,
    pub major_font: ThemeFont,
    pub minor_font: ThemeFont,
    /// Background fill style list, indexed as declared (solid fills taken
    /// literally; gradient fills reduced to their first stop's color).
    pub bg_fill_colors: Vec<Rgba8>,
}

impl ResolvedTheme {
    /// Office's documented default theme, used whenever a theme part is
    /// missing or a specific field within it is absent.
    pub fn office_default() -> Self {
        let mut colors = HashMap::new();
        let defaults: &[(&str, &str)] = &[
            ("dk1", "000000"),
            ("lt1", "FFFFFF"),
            ("dk2", "44546A"),
            ("lt2", "E7E6E6"),
            ("accent1", "4472C4"),
            ("accent2", "ED7D31"),
            ("accent3", "A5A5A5"),
            ("accent4", "FFC000"),
            ("accent5", "5B9BD5"),
            ("accent6", "70AD47"),
            ("hlink", "0563C1"),
            ("folHlink", "954F72"),
        ];
        for (name, hex) in defaults {
            colors.insert((*name).to_string(), Rgba8::from_hex(hex).unwrap());
        }
        Self {
            name: "Office".to_string(),
            colors,
            major_font: ThemeFont {
                latin: "Calibri Light".to_string(),
                ea: String::new(),
                cs: String::new(),
            },
            minor_font: ThemeFont {
                latin: "Calibri".to_string(),
                ea: String::new(),
                cs: String::new(),
            },
            bg_fill_colors: vec![Rgba8::WHITE],
        }
    }

    /// Resolve a scheme color name (`dk1`, `accent2`, `bg1`/`tx1`/`bg2`/
    /// `tx2` aliases, `phClr` excluded — callers substitute that) to its
    /// theme RGB, folding any transform children on the referencing node.
    pub fn resolve_scheme_color(&self, name: &str, transform: &ColorTransform) -> Option<Rgba8> {
        let canonical = match name {
            "bg1" => "lt1",
            "tx1" => "dk1",
            "bg2" => "lt2",
            "tx2" => "dk2",
            other => other,
        };
        let base = *self.colors.get(canonical)?;
        Some(color::apply_transforms(base, transform))
    }

    /// Parse a `<a:theme>` document into a `ResolvedTheme`, falling back to
    /// Office defaults field-by-field for anything absent.
    pub fn parse(theme_node: &Node) -> Self {
        let mut theme = Self::office_default();
        theme.name = theme_node.attr_or("name", &theme.name).to_string();

        if let Some(color_scheme) = theme_node.find_descendant("clrScheme") {
            for slot in SCHEME_COLOR_SLOTS {
                if let Some(slot_node) = color_scheme.child(slot) {
                    if let Some((rgb, transform)) =
                        color::resolve_color_node(slot_node, |_name| None)
                    {
                        theme.colors.insert((*slot).to_string(), color::apply_transforms(rgb, &transform));
                    }
                }
            }
        }

        if let Some(font_scheme) = theme_node.find_descendant("fontScheme") {
            if let Some(major) = font_scheme.child("majorFont") {
                theme.major_font = parse_font_collection(major, &theme.major_font);
            }
            if let Some(minor) = font_scheme.child("minorFont") {
                theme.minor_font = parse_font_collection(minor, &theme.minor_font);
            }
        }

        if let Some(bg_list) = theme_node.find_descendant("bgFillStyleLst") {
            let mut colors = Vec::new();
            for fill in &bg_list.children {
                if let Some(solid) = fill.child("solidFill") {
                    if let Some((rgb, transform)) = color::resolve_color_node(solid, |name| {
                        theme.colors.get(name).copied()
                    }) {
                        colors.push(color::apply_transforms(rgb, &transform));
                        continue;
                    }
                }
                if let Some(grad) = fill.child("gradFill") {
                    if let Some(gs_lst) = grad.child("gsLst") {
                        if let Some(first_stop) = gs_lst.children.first() {
                            if let Some((rgb, transform)) =
                                color::resolve_color_node(first_stop, |name| theme.colors.get(name).copied())
                            {
                                colors.push(color::apply_transforms(rgb, &transform));
                                continue;
                            }
                        }
                    }
                }
                colors.push(Rgba8::WHITE);
            }
            if !colors.is_empty() {
                theme.bg_fill_colors = colors;
            }
        }

        theme
    }
}

fn parse_font_collection(node: &Node, fallback: &ThemeFont) -> ThemeFont {
    let typeface_of = |tag: &str, fallback: &str| -> String {
        node.child(tag)
            .and_then(|n| n.attr("typeface"))
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback)
            .to_string()
    };
    ThemeFont {
        latin: typeface_of("latin", &fallback.latin),
        ea: typeface_of("ea", &fallback.ea),
        cs: typeface_of("cs", &fallback.cs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn parses_color_scheme_and_fonts() {
        let xml_text = r#"<a:theme name="Custom">
            <a:themeElements>
                <a:clrScheme name="Custom">
                    <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
                    <a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
                    <a:dk2><a:srgbClr val="44546A"/></a:dk2>
                    <a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>
                    <a:accent1><a:srgbClr val="112233"/></a:accent1>
                    <a:accent2><a:srgbClr val="ED7D31"/></a:accent2>
                    <a:accent3><a:srgbClr val="A5A5A5"/></a:accent3>
                    <a:accent4><a:srgbClr val="FFC000"/></a:accent4>
                    <a:accent5><a:srgbClr val="5B9BD5"/></a:accent5>
                    <a:accent6><a:srgbClr val="70AD47"/></a:accent6>
                    <a:hlink><a:srgbClr val="0563C1"/></a:hlink>
                    <a:folHlink><a:srgbClr val="954F72"/></a:folHlink>
                </a:clrScheme>
                <a:fontScheme name="Custom">
                    <a:majorFont><a:latin typeface="Georgia"/></a:majorFont>
                    <a:minorFont><a:latin typeface="Verdana"/></a:minorFont>
                </a:fontScheme>
            </a:themeElements>
        </a:theme>"#;
        let node = xml::parse(xml_text).unwrap();
        let theme = ResolvedTheme::parse(&node);
        assert_eq!(theme.colors["accent1"], Rgba8::from_hex("112233").unwrap());
        assert_eq!(theme.major_font.latin, "Georgia");
        assert_eq!(theme.minor_font.latin, "Verdana");
    }

    #[test]
    fn missing_theme_falls_back_to_office_defaults() {
        let theme = ResolvedTheme::office_default();
        assert_eq!(theme.colors["accent1"], Rgba8::from_hex("4472C4").unwrap());
    }
}
