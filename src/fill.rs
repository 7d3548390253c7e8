//! Fill and stroke engine (C9).
//!
//! Resolves `<a:solidFill>`/`<a:gradFill>`/`<a:pattFill>`/`<a:blipFill>`
//! (and their absence, `<a:noFill>`) into a `Fill` the shape orchestrator
//! hands to the canvas, plus `<a:ln>` into a `Stroke`. Grounded on the
//! slide-background module's `SlideBackground`/`PatternType`, generalized
//! from "background only" to any shape fill and extended with the linear/
//! radial gradient geometry and stroke cap/join/dash mapping that module
//! didn't need.

use crate::color::{self, Rgba8};
use crate::raster::{LineCap, LineJoin, Rect};
use crate::theme::ResolvedTheme;
use crate::xml::Node;
use bitflags::bitflags;

bitflags! {
    /// Which axes a tiled picture fill flips on alternating rows/columns.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TileFlip: u8 {
        const NONE = 0;
        const X = 0b01;
        const Y = 0b10;
    }
}

/// Percentage trim/expansion from each edge, in the `srcRect`/`fillRect`
/// thousandths-of-a-percent convention (negative values expand outward).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeInset {
    pub l: f64,
    pub t: f64,
    pub r: f64,
    pub b: f64,
}

impl EdgeInset {
    fn parse(node: &Node) -> Self {
        let pct = |attr: &str| node.attr_i64(attr).unwrap_or(0) as f64 / 100_000.0;
        Self { l: pct("l"), t: pct("t"), r: pct("r"), b: pct("b") }
    }
}

/// Which corner (or the center) of the destination rect a tiled fill
/// starts painting from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileAlignment {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl TileAlignment {
    fn parse(val: Option<&str>) -> Self {
        match val {
            Some("tr") => TileAlignment::TopRight,
            Some("bl") => TileAlignment::BottomLeft,
            Some("br") => TileAlignment::BottomRight,
            Some("ctr") | Some("t") | Some("b") | Some("l") | Some("r") => TileAlignment::Center,
            _ => TileAlignment::TopLeft,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileInfo {
    pub offset_x_emu: i64,
    pub offset_y_emu: i64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub flip: TileFlip,
    pub alignment: TileAlignment,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub pos: f64,
    pub color: Rgba8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientKind {
    Linear { angle_deg: f64 },
    /// `cx`/`cy` are the fractional (0..1) midpoint of the shape's bounding
    /// box the gradient radiates from, derived from `a:path@fillToRect`
    /// (defaulting to the box center, `(0.5, 0.5)`, when absent).
    Radial { cx: f64, cy: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub kind: GradientKind,
    pub stops: Vec<GradientStop>,
}

/// ~50-variant preset hatch patterns, grounded on the slide-background
/// module's exhaustive `PatternType`; rendering falls back to the solid
/// foreground color rather than drawing the hatch (a documented fidelity
/// gap, not a bug — see Fill::Pattern's render-time handling).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternPreset {
    Pct5, Pct10, Pct20, Pct25, Pct30, Pct40, Pct50, Pct60, Pct70, Pct75, Pct80, Pct90,
    Horizontal, Vertical, LightHorizontal, LightVertical, DarkHorizontal, DarkVertical,
    NarrowHorizontal, NarrowVertical, DashedHorizontal, DashedVertical,
    DownDiagonal, UpDiagonal, LightDownDiagonal, LightUpDiagonal,
    DarkDownDiagonal, DarkUpDiagonal, WideDownDiagonal, WideUpDiagonal,
    DashedDownDiagonal, DashedUpDiagonal, Cross, DiagonalCross,
    SmallCheck, LargeCheck, SmallGrid, LargeGrid, DottedGrid,
    SmallConfetti, LargeConfetti, HorizontalBrick, DiagonalBrick,
    SolidDiamond, OpenDiamond, DottedDiamond, Plaid, Sphere, Weave,
    Divot, Shingle, Wave, Trellis, ZigZag,
}

impl PatternPreset {
    pub fn parse(val: &str) -> Option<Self> {
        use PatternPreset::*;
        Some(match val {
            "pct5" => Pct5, "pct10" => Pct10, "pct20" => Pct20, "pct25" => Pct25,
            "pct30" => Pct30, "pct40" => Pct40, "pct50" => Pct50, "pct60" => Pct60,
            "pct70" => Pct70, "pct75" => Pct75, "pct80" => Pct80, "pct90" => Pct90,
            "horz" => Horizontal, "vert" => Vertical,
            "ltHorz" => LightHorizontal, "ltVert" => LightVertical,
            "dkHorz" => DarkHorizontal, "dkVert" => DarkVertical,
            "narHorz" => NarrowHorizontal, "narVert" => NarrowVertical,
            "dashHorz" => DashedHorizontal, "dashVert" => DashedVertical,
            "diagDnCross" => DiagonalCross, "diagCross" => DiagonalCross,
            "dnDiag" => DownDiagonal, "upDiag" => UpDiagonal,
            "ltDnDiag" => LightDownDiagonal, "ltUpDiag" => LightUpDiagonal,
            "dkDnDiag" => DarkDownDiagonal, "dkUpDiag" => DarkUpDiagonal,
            "wdDnDiag" => WideDownDiagonal, "wdUpDiag" => WideUpDiagonal,
            "dashDnDiag" => DashedDownDiagonal, "dashUpDiag" => DashedUpDiagonal,
            "cross" => Cross, "smCheck" => SmallCheck, "lgCheck" => LargeCheck,
            "smGrid" => SmallGrid, "lgGrid" => LargeGrid, "dotGrid" => DottedGrid,
            "smConfetti" => SmallConfetti, "lgConfetti" => LargeConfetti,
            "horzBrick" => HorizontalBrick, "diagBrick" => DiagonalBrick,
            "solidDmnd" => SolidDiamond, "openDmnd" => OpenDiamond, "dotDmnd" => DottedDiamond,
            "plaid" => Plaid, "sphere" => Sphere, "weave" => Weave, "divot" => Divot,
            "shingle" => Shingle, "wave" => Wave, "trellis" => Trellis, "zigZag" => ZigZag,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Rgba8),
    Gradient(Gradient),
    Pattern { preset: PatternPreset, fg: Rgba8, bg: Rgba8 },
    /// Picture fill; the relationship id is resolved and decoded by the
    /// image engine, this variant only carries the reference plus the
    /// crop/stretch/tile geometry the image engine needs to place it.
    Picture {
        rel_id: String,
        src_rect: Option<EdgeInset>,
        stretch: bool,
        fill_rect: Option<EdgeInset>,
        tile: Option<TileInfo>,
    },
}

/// Parse a fill from a shape-properties-level node (the direct parent that
/// would carry `noFill`/`solidFill`/`gradFill`/`pattFill`/`blipFill` as one
/// of its children). `None` means "no explicit fill here" (inherit or
/// `noFill`), distinguished by the `explicit_none` out-parameter.
pub fn parse_fill(parent: &Node, theme: &ResolvedTheme, ph_clr: Option<Rgba8>) -> Option<Fill> {
    if parent.child("noFill").is_some() {
        return None;
    }
    if let Some(solid) = parent.child("solidFill") {
        let resolve = |name: &str| -> Option<Rgba8> {
            if name == "phClr" {
                ph_clr
            } else {
                theme.colors.get(name).copied()
            }
        };
        let (base, transform) = color::resolve_color_node(solid, resolve)?;
        return Some(Fill::Solid(color::apply_transforms(base, &transform)));
    }
    if let Some(grad) = parent.child("gradFill") {
        return parse_gradient(grad, theme, ph_clr).map(Fill::Gradient);
    }
    if let Some(patt) = parent.child("pattFill") {
        let preset = patt.attr("prst").and_then(PatternPreset::parse)?;
        let resolve = |name: &str| -> Option<Rgba8> {
            if name == "phClr" { ph_clr } else { theme.colors.get(name).copied() }
        };
        let fg = patt
            .child("fgClr")
            .and_then(|n| color::resolve_color_node(n, resolve))
            .map(|(c, t)| color::apply_transforms(c, &t))
            .unwrap_or(Rgba8::BLACK);
        let bg = patt
            .child("bgClr")
            .and_then(|n| color::resolve_color_node(n, resolve))
            .map(|(c, t)| color::apply_transforms(c, &t))
            .unwrap_or(Rgba8::WHITE);
        return Some(Fill::Pattern { preset, fg, bg });
    }
    if let Some(blip) = parent.child("blipFill") {
        let rel_id = blip
            .find_descendant("blip")?
            .attr("embed")
            .or_else(|| blip.find_descendant("blip")?.attr("link"))?
            .to_string();
        let src_rect = blip.child("srcRect").map(EdgeInset::parse);
        let stretch_node = blip.child("stretch");
        let stretch = stretch_node.is_some();
        let fill_rect = stretch_node
            .and_then(|n| n.child("fillRect"))
            .map(EdgeInset::parse);
        let tile = blip.child("tile").map(|t| TileInfo {
            offset_x_emu: t.attr_i64("tx").unwrap_or(0),
            offset_y_emu: t.attr_i64("ty").unwrap_or(0),
            scale_x: t.attr_i64("sx").unwrap_or(100_000) as f64 / 100_000.0,
            scale_y: t.attr_i64("sy").unwrap_or(100_000) as f64 / 100_000.0,
            flip: match t.attr("flip") {
                Some("x") => TileFlip::X,
                Some("y") => TileFlip::Y,
                Some("xy") => TileFlip::X | TileFlip::Y,
                _ => TileFlip::NONE,
            },
            alignment: TileAlignment::parse(t.attr("algn")),
        });
        return Some(Fill::Picture { rel_id, src_rect, stretch, fill_rect, tile });
    }
    None
}

fn parse_gradient(grad: &Node, theme: &ResolvedTheme, ph_clr: Option<Rgba8>) -> Option<Gradient> {
    let gs_lst = grad.child("gsLst")?;
    let resolve = |name: &str| -> Option<Rgba8> {
        if name == "phClr" { ph_clr } else { theme.colors.get(name).copied() }
    };
    let mut stops: Vec<GradientStop> = gs_lst
        .children
        .iter()
        .filter_map(|gs| {
            let pos = gs.attr_i64("pos").unwrap_or(0) as f64 / 100_000.0;
            let (base, transform) = color::resolve_color_node(gs, resolve)?;
            Some(GradientStop { pos, color: color::apply_transforms(base, &transform) })
        })
        .collect();
    stops.sort_by(|a, b| a.pos.partial_cmp(&b.pos).unwrap());

    let kind = if let Some(lin) = grad.child("lin") {
        let angle_deg = lin
            .attr_i64("ang")
            .map(crate::units::angle_units_to_degrees)
            .unwrap_or(0.0);
        GradientKind::Linear { angle_deg }
    } else if let Some(path) = grad.child("path") {
        // radial/rectangular/shape path gradients are rendered as radial,
        // reversing stop order as the center-out convention requires.
        stops.reverse();
        for s in &mut stops {
            s.pos = 1.0 - s.pos;
        }
        let fill_to_rect = path.child("fillToRect").map(EdgeInset::parse);
        let (cx, cy) = fill_to_rect
            .map(|r| (r.l + (1.0 - r.l - r.r) / 2.0, r.t + (1.0 - r.t - r.b) / 2.0))
            .unwrap_or((0.5, 0.5));
        GradientKind::Radial { cx, cy }
    } else {
        GradientKind::Linear { angle_deg: 0.0 }
    };

    Some(Gradient { kind, stops })
}

/// Endpoints of a linear gradient's axis across a shape's bounding box.
/// `phi = 90deg - angle` so that `ang=0` runs bottom-to-top and `ang=90deg`
/// (5400000 sixtieths-of-a-degree) runs left-to-right, the convention
/// OOXML's `lin@ang` uses (the first stop sits at the returned start
/// point, the last at the returned end point).
pub fn linear_gradient_endpoints(rect: Rect, angle_deg: f64) -> (crate::raster::Point, crate::raster::Point) {
    use crate::raster::Point;
    let phi = (90.0 - angle_deg).to_radians();
    let (sin, cos) = phi.sin_cos();
    let half_w = rect.w / 2.0;
    let half_h = rect.h / 2.0;
    let diag = (half_w * half_w + half_h * half_h).sqrt();
    let center = rect.center();
    let dx = diag * cos;
    let dy = diag * sin;
    (Point::new(center.x - dx, center.y - dy), Point::new(center.x + dx, center.y + dy))
}

/// Parse `<a:ln>` into a stroke descriptor. Returns `None` for an explicit
/// `noFill` child or an absent node; widths below 0.5px are floored so
/// hairline borders stay visible at low render scales.
pub fn parse_stroke(
    ln: Option<&Node>,
    theme: &ResolvedTheme,
    ph_clr: Option<Rgba8>,
    scale_x: f64,
) -> Option<crate::raster::Stroke> {
    let ln = ln?;
    if ln.child("noFill").is_some() {
        return None;
    }
    let color = {
        let resolve = |name: &str| -> Option<Rgba8> {
            if name == "phClr" { ph_clr } else { theme.colors.get(name).copied() }
        };
        ln.child("solidFill")
            .and_then(|n| color::resolve_color_node(n, resolve))
            .map(|(c, t)| color::apply_transforms(c, &t))
            .unwrap_or(Rgba8::BLACK)
    };
    let width_px = ln
        .attr_i64("w")
        .map(|emu| crate::units::emu_to_px(emu, crate::units::DEFAULT_DPI) * scale_x)
        .unwrap_or(1.0)
        .max(0.5);
    let cap = match ln.attr("cap") {
        Some("rnd") => LineCap::Round,
        Some("sq") => LineCap::Square,
        _ => LineCap::Butt,
    };
    let join = if ln.child("round").is_some() {
        LineJoin::Round
    } else if ln.child("bevel").is_some() {
        LineJoin::Bevel
    } else {
        LineJoin::Miter
    };
    let dash = match ln.child("prstDash").and_then(|n| n.attr("val")) {
        Some("dash") => vec![width_px * 4.0, width_px * 2.0],
        Some("dashDot") => vec![width_px * 4.0, width_px * 2.0, width_px, width_px * 2.0],
        Some("dot") | Some("sysDot") => vec![width_px, width_px],
        Some("lgDash") => vec![width_px * 8.0, width_px * 2.0],
        _ => Vec::new(),
    };
    Some(crate::raster::Stroke { color, width_px, cap, join, dash })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn parses_solid_fill_with_theme_color() {
        let theme = ResolvedTheme::office_default();
        let node = xml::parse(r#"<a:spPr><a:solidFill><a:schemeClr val="accent1"/></a:solidFill></a:spPr>"#).unwrap();
        let fill = parse_fill(&node, &theme, None).unwrap();
        assert_eq!(fill, Fill::Solid(Rgba8::from_hex("4472C4").unwrap()));
    }

    #[test]
    fn no_fill_returns_none() {
        let theme = ResolvedTheme::office_default();
        let node = xml::parse(r#"<a:spPr><a:noFill/></a:spPr>"#).unwrap();
        assert!(parse_fill(&node, &theme, None).is_none());
    }

    #[test]
    fn gradient_stops_are_sorted_by_position() {
        let theme = ResolvedTheme::office_default();
        let node = xml::parse(
            r#"<a:spPr><a:gradFill><a:gsLst>
                <a:gs pos="100000"><a:srgbClr val="FFFFFF"/></a:gs>
                <a:gs pos="0"><a:srgbClr val="000000"/></a:gs>
            </a:gsLst><a:lin ang="5400000"/></a:gradFill></a:spPr>"#,
        )
        .unwrap();
        let fill = parse_fill(&node, &theme, None).unwrap();
        if let Fill::Gradient(g) = fill {
            assert_eq!(g.stops[0].pos, 0.0);
            assert_eq!(g.stops[1].pos, 1.0);
        } else {
            panic!("expected gradient");
        }
    }

    #[test]
    fn radial_gradient_reads_fill_to_rect_midpoint() {
        let theme = ResolvedTheme::office_default();
        let node = xml::parse(
            r#"<a:spPr><a:gradFill><a:gsLst>
                <a:gs pos="0"><a:srgbClr val="FFFFFF"/></a:gs>
                <a:gs pos="100000"><a:srgbClr val="000000"/></a:gs>
            </a:gsLst><a:path><a:fillToRect l="20000" t="0" r="60000" b="0"/></a:path></a:gradFill></a:spPr>"#,
        )
        .unwrap();
        let fill = parse_fill(&node, &theme, None).unwrap();
        match fill {
            Fill::Gradient(g) => match g.kind {
                GradientKind::Radial { cx, cy } => {
                    assert!((cx - 0.3).abs() < 1e-9);
                    assert_eq!(cy, 0.5);
                }
                GradientKind::Linear { .. } => panic!("expected radial"),
            },
            _ => panic!("expected gradient"),
        }
    }

    #[test]
    fn stroke_width_floors_at_half_pixel() {
        let theme = ResolvedTheme::office_default();
        let node = xml::parse(r#"<a:ln w="1"><a:solidFill><a:srgbClr val="000000"/></a:solidFill></a:ln>"#).unwrap();
        let stroke = parse_stroke(Some(&node), &theme, None, 1.0).unwrap();
        assert!(stroke.width_px >= 0.5);
    }

    #[test]
    fn picture_fill_parses_crop_and_tile() {
        let theme = ResolvedTheme::office_default();
        let node = xml::parse(
            r#"<a:spPr><a:blipFill>
                <a:blip r:embed="rId3"/>
                <a:srcRect l="10000" r="10000"/>
                <a:tile tx="0" ty="0" sx="50000" sy="50000" flip="x" algn="tl"/>
            </a:blipFill></a:spPr>"#,
        )
        .unwrap();
        let fill = parse_fill(&node, &theme, None).unwrap();
        match fill {
            Fill::Picture { rel_id, src_rect, tile, .. } => {
                assert_eq!(rel_id, "rId3");
                assert_eq!(src_rect.unwrap().l, 0.1);
                let tile = tile.unwrap();
                assert_eq!(tile.scale_x, 0.5);
                assert_eq!(tile.flip, TileFlip::X);
            }
            _ => panic!("expected picture fill"),
        }
    }

    #[test]
    fn ninety_degree_gradient_runs_left_to_right() {
        let rect = Rect { x: 0.0, y: 0.0, w: 200.0, h: 100.0 };
        let (start, end) = linear_gradient_endpoints(rect, 90.0);
        assert!(start.x < end.x, "start {start:?} should be left of end {end:?}");
        assert!((start.y - end.y).abs() < 1e-6, "axis should be horizontal: {start:?} -> {end:?}");
    }

    #[test]
    fn zero_degree_gradient_is_vertical() {
        let rect = Rect { x: 0.0, y: 0.0, w: 200.0, h: 100.0 };
        let (start, end) = linear_gradient_endpoints(rect, 0.0);
        assert!((start.x - end.x).abs() < 1e-6, "axis should be vertical: {start:?} -> {end:?}");
        assert!(start.y != end.y);
    }
}
