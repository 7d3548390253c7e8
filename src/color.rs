//! Color resolver (C5).
//!
//! Parses OOXML color elements, resolves scheme references against a theme,
//! and folds the tint/shade/satMod/lumMod/lumOff/hueMod/hueOff/alpha
//! transform stack over an HSL intermediate. Grounded on the common style
//! module's `RGBColor` as the base 8-bit representation; the transform
//! algebra itself has no counterpart in the grounding library and is new,
//! written in its idiom (plain arithmetic, no external color-math crate).

use crate::units::percent_to_decimal;
use crate::xml::Node;
use serde::{Deserialize, Serialize};

/// 8-bit RGBA, the color resolver's only output representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const BLACK: Rgba8 = Rgba8::opaque(0, 0, 0);
    pub const WHITE: Rgba8 = Rgba8::opaque(255, 255, 255);

    /// Parse a 3/6/8-hex-digit color string, with or without a leading `#`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim_start_matches('#');
        match s.len() {
            3 => {
                let r = u8::from_str_radix(&s[0..1].repeat(2), 16).ok()?;
                let g = u8::from_str_radix(&s[1..2].repeat(2), 16).ok()?;
                let b = u8::from_str_radix(&s[2..3].repeat(2), 16).ok()?;
                Some(Self::opaque(r, g, b))
            }
            6 => {
                let r = u8::from_str_radix(&s[0..2], 16).ok()?;
                let g = u8::from_str_radix(&s[2..4], 16).ok()?;
                let b = u8::from_str_radix(&s[4..6], 16).ok()?;
                Some(Self::opaque(r, g, b))
            }
            8 => {
                let r = u8::from_str_radix(&s[0..2], 16).ok()?;
                let g = u8::from_str_radix(&s[2..4], 16).ok()?;
                let b = u8::from_str_radix(&s[4..6], 16).ok()?;
                let a = u8::from_str_radix(&s[6..8], 16).ok()?;
                Some(Self::new(r, g, b, a))
            }
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    fn to_hsla(self) -> Hsla {
        rgb_to_hsl(self.r, self.g, self.b, self.a)
    }
}

struct Hsla {
    h: f64, // degrees, [0, 360)
    s: f64, // [0, 1]
    l: f64, // [0, 1]
    a: f64, // [0, 1]
}

fn rgb_to_hsl(r: u8, g: u8, b: u8, a: u8) -> Hsla {
    let (r, g, b) = (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let delta = max - min;
    let s = if delta.abs() < 1e-12 {
        0.0
    } else {
        delta / (1.0 - (2.0 * l - 1.0).abs())
    };
    let h = if delta.abs() < 1e-12 {
        0.0
    } else if (max - r).abs() < 1e-12 {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if (max - g).abs() < 1e-12 {
        60.0 * (((b - r) / delta) + 2.0)
    } else {
        60.0 * (((r - g) / delta) + 4.0)
    };
    Hsla { h, s, l, a: a as f64 / 255.0 }
}

fn hsl_to_rgb(hsla: &Hsla) -> Rgba8 {
    let c = (1.0 - (2.0 * hsla.l - 1.0).abs()) * hsla.s;
    let h_prime = hsla.h.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (h_prime.rem_euclid(2.0) - 1.0).abs());
    let (r1, g1, b1) = if (0.0..1.0).contains(&h_prime) {
        (c, x, 0.0)
    } else if (1.0..2.0).contains(&h_prime) {
        (x, c, 0.0)
    } else if (2.0..3.0).contains(&h_prime) {
        (0.0, c, x)
    } else if (3.0..4.0).contains(&h_prime) {
        (0.0, x, c)
    } else if (4.0..5.0).contains(&h_prime) {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };
    let m = hsla.l - c / 2.0;
    let to_u8 = |v: f64| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba8::new(to_u8(r1), to_u8(g1), to_u8(b1), (hsla.a.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// The ordered sequence of optional percent/angle modifiers applied over
/// HSL. Every field is stored in its native OOXML unit (100000ths-of-a-
/// percent for tint/shade/satMod/lumMod/lumOff/alpha, 60000ths-of-a-degree
/// for hueOff; hueMod is also a 100000ths-of-a-percent multiplier).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorTransform {
    pub tint: Option<i64>,
    pub shade: Option<i64>,
    pub sat_mod: Option<i64>,
    pub lum_mod: Option<i64>,
    pub lum_off: Option<i64>,
    pub hue_mod: Option<i64>,
    pub hue_off: Option<i64>,
    pub alpha: Option<i64>,
}

impl ColorTransform {
    pub fn is_identity(&self) -> bool {
        *self == ColorTransform::default()
    }

    /// Parse the transform child elements of a color element
    /// (`<a:srgbClr val="..."><a:lumMod val="75000"/>...</a:srgbClr>`).
    pub fn parse(color_node: &Node) -> Self {
        let mut t = ColorTransform::default();
        for child in &color_node.children {
            let val = child.attr("val").and_then(|v| v.parse::<i64>().ok());
            match crate::xml::local_name(&child.tag) {
                "tint" => t.tint = val,
                "shade" => t.shade = val,
                "satMod" => t.sat_mod = val,
                "lumMod" => t.lum_mod = val,
                "lumOff" => t.lum_off = val,
                "hueMod" => t.hue_mod = val,
                "hueOff" => t.hue_off = val,
                "alpha" => t.alpha = val,
                _ => {}
            }
        }
        t
    }
}

/// Apply the transform stack, in the fixed order: tint → shade → satMod →
/// lumMod → lumOff → hueMod → hueOff → alpha. The empty transform is the
/// identity.
pub fn apply_transforms(base: Rgba8, transform: &ColorTransform) -> Rgba8 {
    if transform.is_identity() {
        return base;
    }
    let mut hsla = base.to_hsla();
    if let Some(tint) = transform.tint {
        let tint = percent_to_decimal(tint);
        hsla.l = hsla.l * tint + (1.0 - tint);
    }
    if let Some(shade) = transform.shade {
        hsla.l *= percent_to_decimal(shade);
    }
    if let Some(sat_mod) = transform.sat_mod {
        hsla.s = (hsla.s * percent_to_decimal(sat_mod)).clamp(0.0, 1.0);
    }
    if let Some(lum_mod) = transform.lum_mod {
        hsla.l = (hsla.l * percent_to_decimal(lum_mod)).clamp(0.0, 1.0);
    }
    if let Some(lum_off) = transform.lum_off {
        hsla.l = (hsla.l + percent_to_decimal(lum_off)).clamp(0.0, 1.0);
    }
    if let Some(hue_mod) = transform.hue_mod {
        hsla.h = (hsla.h * percent_to_decimal(hue_mod)).rem_euclid(360.0);
    }
    if let Some(hue_off) = transform.hue_off {
        hsla.h = (hsla.h + crate::units::angle_units_to_degrees(hue_off)).rem_euclid(360.0);
    }
    if let Some(alpha) = transform.alpha {
        hsla.a = percent_to_decimal(alpha).clamp(0.0, 1.0);
    }
    hsl_to_rgb(&hsla)
}

/// `luminance(c) < 0.5` using standard sRGB coefficients after
/// gamma-expansion with the 0.03928 threshold.
pub fn is_dark(c: Rgba8) -> bool {
    luminance(c) < 0.5
}

pub fn luminance(c: Rgba8) -> f64 {
    let expand = |channel: u8| -> f64 {
        let v = channel as f64 / 255.0;
        if v <= 0.03928 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * expand(c.r) + 0.7152 * expand(c.g) + 0.0722 * expand(c.b)
}

/// Preset color names (the CSS/VML-derived literal table OOXML's `prstClr`
/// and `sysClr` draw from). Not exhaustive — covers the names that appear
/// in real decks; unknown names fall back to black.
pub fn preset_color(name: &str) -> Rgba8 {
    match name {
        "black" => Rgba8::opaque(0, 0, 0),
        "white" => Rgba8::opaque(255, 255, 255),
        "red" => Rgba8::opaque(255, 0, 0),
        "green" => Rgba8::opaque(0, 128, 0),
        "blue" => Rgba8::opaque(0, 0, 255),
        "yellow" => Rgba8::opaque(255, 255, 0),
        "gray" | "grey" => Rgba8::opaque(128, 128, 128),
        "orange" => Rgba8::opaque(255, 165, 0),
        "silver" => Rgba8::opaque(192, 192, 192),
        "maroon" => Rgba8::opaque(128, 0, 0),
        "navy" => Rgba8::opaque(0, 0, 128),
        "purple" => Rgba8::opaque(128, 0, 128),
        "teal" => Rgba8::opaque(0, 128, 128),
        "lime" => Rgba8::opaque(0, 255, 0),
        "aqua" | "cyan" => Rgba8::opaque(0, 255, 255),
        "fuchsia" | "magenta" => Rgba8::opaque(255, 0, 255),
        "olive" => Rgba8::opaque(128, 128, 0),
        _ => Rgba8::BLACK,
    }
}

/// System colors used by `sysClr` when no explicit `lastClr` is given.
pub fn system_color(name: &str) -> Rgba8 {
    match name {
        "windowText" => Rgba8::BLACK,
        "window" => Rgba8::WHITE,
        "highlight" => Rgba8::opaque(0, 120, 215),
        "highlightText" => Rgba8::WHITE,
        "menuText" => Rgba8::BLACK,
        "btnFace" => Rgba8::opaque(240, 240, 240),
        _ => Rgba8::BLACK,
    }
}

/// Resolve the base color (before transforms) encoded by one of
/// `schemeClr, srgbClr, scrgbClr, hslClr, prstClr, sysClr`, given a
/// resolver for scheme-color names. Returns `None` if the node has no
/// recognized color child, or if `val`/`name` is missing (skip, don't
/// crash, per the documented boundary behavior).
pub fn resolve_color_node<F>(parent: &Node, mut resolve_scheme: F) -> Option<(Rgba8, ColorTransform)>
where
    F: FnMut(&str) -> Option<Rgba8>,
{
    for tag in ["schemeClr", "srgbClr", "scrgbClr", "hslClr", "prstClr", "sysClr"] {
        if let Some(node) = parent.child(tag) {
            let transform = ColorTransform::parse(node);
            let base = match tag {
                "schemeClr" => {
                    let name = node.attr("val")?;
                    resolve_scheme(name)?
                }
                "srgbClr" => Rgba8::from_hex(node.attr("val")?)?,
                "scrgbClr" => {
                    let pct = |name: &str| -> f64 {
                        node.attr(name)
                            .and_then(|v| v.trim_end_matches('%').parse::<f64>().ok())
                            .unwrap_or(0.0)
                            / 100_000.0
                    };
                    Rgba8::opaque(
                        (pct("r") * 255.0).round() as u8,
                        (pct("g") * 255.0).round() as u8,
                        (pct("b") * 255.0).round() as u8,
                    )
                }
                "hslClr" => {
                    let h = node
                        .attr("hue")
                        .and_then(|v| v.parse::<i64>().ok())
                        .map(crate::units::angle_units_to_degrees)
                        .unwrap_or(0.0);
                    let s = node
                        .attr("sat")
                        .and_then(|v| v.parse::<i64>().ok())
                        .map(percent_to_decimal)
                        .unwrap_or(0.0);
                    let l = node
                        .attr("lum")
                        .and_then(|v| v.parse::<i64>().ok())
                        .map(percent_to_decimal)
                        .unwrap_or(0.0);
                    hsl_to_rgb(&Hsla { h, s, l, a: 1.0 })
                }
                "prstClr" => preset_color(node.attr("val")?),
                "sysClr" => node
                    .attr("lastClr")
                    .and_then(Rgba8::from_hex)
                    .unwrap_or_else(|| system_color(node.attr("val").unwrap_or(""))),
                _ => unreachable!(),
            };
            return Some((base, transform));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_is_a_no_op() {
        let c = Rgba8::opaque(10, 20, 30);
        assert_eq!(apply_transforms(c, &ColorTransform::default()), c);
    }

    #[test]
    fn channel_outputs_stay_in_range_for_extreme_colors() {
        let transform = ColorTransform {
            lum_mod: Some(150_000),
            hue_off: Some(30 * 60_000),
            ..Default::default()
        };
        for c in [Rgba8::BLACK, Rgba8::WHITE] {
            let out = apply_transforms(c, &transform);
            // u8 fields are already bounded; this asserts the computation
            // didn't panic and alpha survived untouched.
            assert_eq!(out.a, c.a);
        }
    }

    #[test]
    fn hex_round_trip() {
        let c = Rgba8::opaque(0x44, 0x72, 0xC4);
        assert_eq!(Rgba8::from_hex(&c.to_hex()).unwrap(), c);
    }

    #[test]
    fn lum_mod_scenario_matches_documented_example() {
        // accent1 = 4472C4, lumMod=75000 lumOff=0 -> approx (51, 85, 147)
        let base = Rgba8::from_hex("4472C4").unwrap();
        let transform = ColorTransform {
            lum_mod: Some(75_000),
            lum_off: Some(0),
            ..Default::default()
        };
        let out = apply_transforms(base, &transform);
        assert!((out.r as i32 - 51).abs() <= 2);
        assert!((out.g as i32 - 85).abs() <= 2);
        assert!((out.b as i32 - 147).abs() <= 2);
    }

    #[test]
    fn is_dark_classifies_black_and_white() {
        assert!(is_dark(Rgba8::BLACK));
        assert!(!is_dark(Rgba8::WHITE));
    }
}

#[cfg(test)]
mod transform_properties {
    use super::*;
    use proptest::prelude::*;

    fn arb_color() -> impl Strategy<Value = Rgba8> {
        (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>())
            .prop_map(|(r, g, b, a)| Rgba8::new(r, g, b, a))
    }

    fn arb_transform() -> impl Strategy<Value = ColorTransform> {
        (
            proptest::option::of(-100_000i64..=200_000),
            proptest::option::of(-100_000i64..=200_000),
            proptest::option::of(0i64..=200_000),
            proptest::option::of(0i64..=200_000),
            proptest::option::of(-100_000i64..=100_000),
            proptest::option::of(0i64..=200_000),
            proptest::option::of(-21_600_000i64..=21_600_000),
            proptest::option::of(0i64..=100_000),
        )
            .prop_map(|(tint, shade, sat_mod, lum_mod, lum_off, hue_mod, hue_off, alpha)| {
                ColorTransform { tint, shade, sat_mod, lum_mod, lum_off, hue_mod, hue_off, alpha }
            })
    }

    proptest! {
        /// Property 3 (spec): applying the empty transform is always the identity.
        #[test]
        fn empty_transform_is_identity(c in arb_color()) {
            prop_assert_eq!(apply_transforms(c, &ColorTransform::default()), c);
        }

        /// Property 4 (spec): every channel of every transform's output is a
        /// valid 8-bit value — the type system guarantees this, so the
        /// property is really "never panics" over an arbitrary base color
        /// and an arbitrary, possibly out-of-typical-range, transform stack.
        #[test]
        fn transform_output_never_panics(c in arb_color(), t in arb_transform()) {
            let _ = apply_transforms(c, &t);
        }

        /// Hex formatting/parsing round-trips for every opaque 8-bit RGB
        /// value (`to_hex` emits 6 digits, dropping alpha by design).
        #[test]
        fn hex_round_trips(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            let c = Rgba8::opaque(r, g, b);
            prop_assert_eq!(Rgba8::from_hex(&c.to_hex()).unwrap(), c);
        }
    }
}
