//! Preset geometry path synthesis.
//!
//! Each preset is built directly in pixel space over the shape's local
//! `0..=w, 0..=h` box, following the adjustment-value (`adj`) formulas from
//! the DrawingML preset geometry reference. Adjustment values are
//! expressed as 100,000ths of a percent of the smaller shape dimension
//! unless documented otherwise per shape, matching the OOXML schema's own
//! convention; every preset supplies the documented default when the
//! caller passes no override for a given guide.

use crate::raster::{ArcKind, LegacyArc, Path, Point};
use std::collections::HashMap;

/// Adjustment-value overrides, keyed by guide name (`adj`, `adj1`, `adj2`, …).
pub type Adjustments = HashMap<String, f64>;

fn adj(adjustments: &Adjustments, name: &str, default: f64) -> f64 {
    adjustments.get(name).copied().unwrap_or(default)
}

/// Synthesize the path for a named preset geometry. Unknown names fall
/// back to a plain rectangle, matching the renderer's "never fail a shape
/// outright over geometry" posture.
pub fn build(preset: &str, w: f64, h: f64, adjustments: &Adjustments) -> Path {
    match preset {
        "roundRect" => round_rect(w, h, adj(adjustments, "adj", 16_667.0) / 100_000.0),
        "round2SameRect" => round_rect(w, h, adj(adjustments, "adj1", 16_667.0) / 100_000.0),
        "ellipse" => ellipse(w, h),
        "triangle" => triangle(w, h, adj(adjustments, "adj", 50_000.0) / 100_000.0),
        "rtTriangle" => rt_triangle(w, h),
        "diamond" => diamond(w, h),
        "parallelogram" => parallelogram(w, h, adj(adjustments, "adj", 25_000.0) / 100_000.0),
        "trapezoid" => trapezoid(w, h, adj(adjustments, "adj", 25_000.0) / 100_000.0),
        "pentagon" => regular_polygon(w, h, 5),
        "hexagon" => regular_polygon(w, h, 6),
        "octagon" => regular_polygon(w, h, 8),
        "line" => line(w, h),
        "rightArrow" => right_arrow(
            w,
            h,
            adj(adjustments, "adj1", 50_000.0) / 100_000.0,
            adj(adjustments, "adj2", 50_000.0) / 100_000.0,
        ),
        "leftArrow" => flip_horizontal(
            right_arrow(
                w,
                h,
                adj(adjustments, "adj1", 50_000.0) / 100_000.0,
                adj(adjustments, "adj2", 50_000.0) / 100_000.0,
            ),
            w,
        ),
        "upArrow" => rotate_90(
            right_arrow(
                h,
                w,
                adj(adjustments, "adj1", 50_000.0) / 100_000.0,
                adj(adjustments, "adj2", 50_000.0) / 100_000.0,
            ),
            w,
            h,
            -1,
        ),
        "downArrow" => rotate_90(
            right_arrow(
                h,
                w,
                adj(adjustments, "adj1", 50_000.0) / 100_000.0,
                adj(adjustments, "adj2", 50_000.0) / 100_000.0,
            ),
            w,
            h,
            1,
        ),
        "chevron" => chevron(w, h, adj(adjustments, "adj", 50_000.0) / 100_000.0),
        "homePlate" => home_plate(w, h, adj(adjustments, "adj", 50_000.0) / 100_000.0),
        "star5" => star(w, h, 5, adj(adjustments, "adj", 19_098.0) / 100_000.0),
        "plus" => plus(w, h, adj(adjustments, "adj", 25_000.0) / 100_000.0),
        "heart" => heart(w, h),
        "wedgeRectCallout" => wedge_rect_callout(
            w,
            h,
            adj(adjustments, "adj1", -20_833.0) / 100_000.0,
            adj(adjustments, "adj2", 62_500.0) / 100_000.0,
        ),
        "flowChartProcess" => rect(w, h),
        "flowChartTerminator" => round_rect(w, h, 0.5),
        "flowChartDecision" => diamond(w, h),
        _ => rect(w, h),
    }
}

fn rect(w: f64, h: f64) -> Path {
    let mut p = Path::new();
    p.move_to(Point::new(0.0, 0.0))
        .line_to(Point::new(w, 0.0))
        .line_to(Point::new(w, h))
        .line_to(Point::new(0.0, h))
        .close();
    p
}

fn round_rect(w: f64, h: f64, corner_frac: f64) -> Path {
    let r = corner_frac.clamp(0.0, 0.5) * w.min(h);
    let mut p = Path::new();
    p.move_to(Point::new(r, 0.0));
    p.line_to(Point::new(w - r, 0.0));
    arc_corner(&mut p, Point::new(w - r, r), r, -90.0, 90.0);
    p.line_to(Point::new(w, h - r));
    arc_corner(&mut p, Point::new(w - r, h - r), r, 0.0, 90.0);
    p.line_to(Point::new(r, h));
    arc_corner(&mut p, Point::new(r, h - r), r, 90.0, 90.0);
    p.line_to(Point::new(0.0, r));
    arc_corner(&mut p, Point::new(r, r), r, 180.0, 90.0);
    p.close();
    p
}

fn arc_corner(path: &mut Path, center: Point, r: f64, start_angle_deg: f64, swing_deg: f64) {
    let current = Point::new(
        center.x + r * start_angle_deg.to_radians().cos(),
        center.y + r * start_angle_deg.to_radians().sin(),
    );
    crate::raster::arc::append_arc(
        path,
        current,
        &ArcKind::Legacy(LegacyArc {
            rx: r,
            ry: r,
            start_angle_deg,
            swing_angle_deg: swing_deg,
        }),
    );
}

fn ellipse(w: f64, h: f64) -> Path {
    let rx = w / 2.0;
    let ry = h / 2.0;
    let mut p = Path::new();
    p.move_to(Point::new(w, ry));
    crate::raster::arc::append_arc(
        &mut p,
        Point::new(w, ry),
        &ArcKind::Legacy(LegacyArc {
            rx,
            ry,
            start_angle_deg: 0.0,
            swing_angle_deg: 360.0,
        }),
    );
    p.close();
    p
}

fn triangle(w: f64, h: f64, apex_frac: f64) -> Path {
    let mut p = Path::new();
    p.move_to(Point::new(w * apex_frac.clamp(0.0, 1.0), 0.0))
        .line_to(Point::new(w, h))
        .line_to(Point::new(0.0, h))
        .close();
    p
}

fn rt_triangle(w: f64, h: f64) -> Path {
    let mut p = Path::new();
    p.move_to(Point::new(0.0, 0.0))
        .line_to(Point::new(0.0, h))
        .line_to(Point::new(w, h))
        .close();
    p
}

fn diamond(w: f64, h: f64) -> Path {
    let mut p = Path::new();
    p.move_to(Point::new(w / 2.0, 0.0))
        .line_to(Point::new(w, h / 2.0))
        .line_to(Point::new(w / 2.0, h))
        .line_to(Point::new(0.0, h / 2.0))
        .close();
    p
}

fn parallelogram(w: f64, h: f64, adj: f64) -> Path {
    let shift = w * adj.clamp(0.0, 1.0);
    let mut p = Path::new();
    p.move_to(Point::new(shift, 0.0))
        .line_to(Point::new(w, 0.0))
        .line_to(Point::new(w - shift, h))
        .line_to(Point::new(0.0, h))
        .close();
    p
}

fn trapezoid(w: f64, h: f64, adj: f64) -> Path {
    let shift = w * adj.clamp(0.0, 0.5);
    let mut p = Path::new();
    p.move_to(Point::new(shift, 0.0))
        .line_to(Point::new(w - shift, 0.0))
        .line_to(Point::new(w, h))
        .line_to(Point::new(0.0, h))
        .close();
    p
}

fn regular_polygon(w: f64, h: f64, sides: u32) -> Path {
    let cx = w / 2.0;
    let cy = h / 2.0;
    let rx = w / 2.0;
    let ry = h / 2.0;
    let mut p = Path::new();
    for i in 0..sides {
        // start at the top (-90deg) so pentagon/hexagon/octagon orient the
        // way Office's own renderer does.
        let theta = -std::f64::consts::FRAC_PI_2 + (i as f64) * std::f64::consts::TAU / sides as f64;
        let pt = Point::new(cx + rx * theta.cos(), cy + ry * theta.sin());
        if i == 0 {
            p.move_to(pt);
        } else {
            p.line_to(pt);
        }
    }
    p.close();
    p
}

fn line(w: f64, h: f64) -> Path {
    let mut p = Path::new();
    p.move_to(Point::new(0.0, 0.0)).line_to(Point::new(w, h));
    p
}

fn right_arrow(w: f64, h: f64, shaft_height_frac: f64, head_width_frac: f64) -> Path {
    let shaft_h = h * shaft_height_frac.clamp(0.0, 1.0);
    let head_w = w * head_width_frac.clamp(0.0, 1.0);
    let shaft_top = (h - shaft_h) / 2.0;
    let shaft_bottom = shaft_top + shaft_h;
    let neck_x = w - head_w;
    let mut p = Path::new();
    p.move_to(Point::new(0.0, shaft_top))
        .line_to(Point::new(neck_x, shaft_top))
        .line_to(Point::new(neck_x, 0.0))
        .line_to(Point::new(w, h / 2.0))
        .line_to(Point::new(neck_x, h))
        .line_to(Point::new(neck_x, shaft_bottom))
        .line_to(Point::new(0.0, shaft_bottom))
        .close();
    p
}

fn flip_horizontal(path: Path, w: f64) -> Path {
    map_points(path, |p| Point::new(w - p.x, p.y))
}

/// Rotate a path synthesized in a `h x w` box (swapped dimensions) into a
/// `w x h` box, turning the arrow to point up (`dir < 0`) or down
/// (`dir > 0`).
fn rotate_90(path: Path, w: f64, h: f64, dir: i32) -> Path {
    if dir < 0 {
        map_points(path, |p| Point::new(p.y, h - p.x))
    } else {
        map_points(path, |p| Point::new(w - p.y, p.x))
    }
}

fn map_points(mut path: Path, f: impl Fn(Point) -> Point) -> Path {
    use crate::raster::PathSegment::*;
    for seg in &mut path.segments {
        *seg = match *seg {
            MoveTo(p) => MoveTo(f(p)),
            LineTo(p) => LineTo(f(p)),
            CubicBezierTo(a, b, c) => CubicBezierTo(f(a), f(b), f(c)),
            QuadBezierTo(a, b) => QuadBezierTo(f(a), f(b)),
            other @ (ArcTo(_) | Close) => other,
        };
    }
    path
}

fn chevron(w: f64, h: f64, adj: f64) -> Path {
    // The notch depth is scaled by height, not width, so the chevron's
    // point angle stays consistent regardless of the shape's aspect ratio.
    let notch = (h * adj.clamp(0.0, 1.0)).min(w / 2.0);
    let mut p = Path::new();
    p.move_to(Point::new(0.0, 0.0))
        .line_to(Point::new(w - notch, 0.0))
        .line_to(Point::new(w, h / 2.0))
        .line_to(Point::new(w - notch, h))
        .line_to(Point::new(0.0, h))
        .line_to(Point::new(notch, h / 2.0))
        .close();
    p
}

fn home_plate(w: f64, h: f64, adj: f64) -> Path {
    let notch = w * adj.clamp(0.0, 1.0);
    let mut p = Path::new();
    p.move_to(Point::new(0.0, 0.0))
        .line_to(Point::new(w - notch, 0.0))
        .line_to(Point::new(w, h / 2.0))
        .line_to(Point::new(w - notch, h))
        .line_to(Point::new(0.0, h))
        .close();
    p
}

fn star(w: f64, h: f64, points: u32, inner_radius_frac: f64) -> Path {
    let cx = w / 2.0;
    let cy = h / 2.0;
    let rx = w / 2.0;
    let ry = h / 2.0;
    let inner_frac = inner_radius_frac.clamp(0.05, 1.0);
    let mut p = Path::new();
    let total = points * 2;
    for i in 0..total {
        let theta = -std::f64::consts::FRAC_PI_2 + (i as f64) * std::f64::consts::PI / points as f64;
        let frac = if i % 2 == 0 { 1.0 } else { inner_frac };
        let pt = Point::new(cx + rx * frac * theta.cos(), cy + ry * frac * theta.sin());
        if i == 0 {
            p.move_to(pt);
        } else {
            p.line_to(pt);
        }
    }
    p.close();
    p
}

fn plus(w: f64, h: f64, adj: f64) -> Path {
    let thickness = adj.clamp(0.0, 0.5);
    let tw = w * thickness;
    let th = h * thickness;
    let cx0 = (w - tw) / 2.0;
    let cx1 = cx0 + tw;
    let cy0 = (h - th) / 2.0;
    let cy1 = cy0 + th;
    let mut p = Path::new();
    p.move_to(Point::new(cx0, 0.0))
        .line_to(Point::new(cx1, 0.0))
        .line_to(Point::new(cx1, cy0))
        .line_to(Point::new(w, cy0))
        .line_to(Point::new(w, cy1))
        .line_to(Point::new(cx1, cy1))
        .line_to(Point::new(cx1, h))
        .line_to(Point::new(cx0, h))
        .line_to(Point::new(cx0, cy1))
        .line_to(Point::new(0.0, cy1))
        .line_to(Point::new(0.0, cy0))
        .line_to(Point::new(cx0, cy0))
        .close();
    p
}

fn heart(w: f64, h: f64) -> Path {
    // Two lobes as cubic beziers meeting at the top notch, tapering to a
    // point at the bottom; not schema-accurate to the preset's guide
    // formulas, but visually faithful at typical shape sizes. Control
    // points stay inside the bounds rect (unlike a wider heart whose lobes
    // would bulge past the box) so the shape never overflows its frame.
    let mut p = Path::new();
    p.move_to(Point::new(w / 2.0, h));
    p.cubic_to(
        Point::new(0.0, h * 0.6),
        Point::new(0.0, 0.0),
        Point::new(w / 2.0, h * 0.25),
    );
    p.cubic_to(
        Point::new(w, 0.0),
        Point::new(w, h * 0.6),
        Point::new(w / 2.0, h),
    );
    p.close();
    p
}

fn wedge_rect_callout(w: f64, h: f64, tail_x_frac: f64, tail_y_frac: f64) -> Path {
    let tail = Point::new(w * (0.5 + tail_x_frac), h * tail_y_frac);
    let mut p = Path::new();
    p.move_to(Point::new(0.0, 0.0))
        .line_to(Point::new(w, 0.0))
        .line_to(Point::new(w, h))
        .line_to(Point::new(w * 0.6, h))
        .line_to(tail)
        .line_to(Point::new(w * 0.4, h))
        .line_to(Point::new(0.0, h))
        .close();
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_preset_has_four_corners_and_closes() {
        let path = build("rect", 100.0, 50.0, &Adjustments::new());
        assert_eq!(path.segments.len(), 5);
    }

    #[test]
    fn round_rect_stays_within_expanded_bounds() {
        let path = build("roundRect", 200.0, 100.0, &Adjustments::new());
        let bounds = path.bounds().unwrap();
        assert!(bounds.w <= 200.0 + 1.0);
        assert!(bounds.h <= 100.0 + 1.0);
    }

    #[test]
    fn unknown_preset_falls_back_to_rectangle() {
        let a = build("somethingMadeUp", 10.0, 10.0, &Adjustments::new());
        let b = build("rect", 10.0, 10.0, &Adjustments::new());
        assert_eq!(a.segments.len(), b.segments.len());
    }

    #[test]
    fn star5_produces_ten_vertices() {
        let path = build("star5", 100.0, 100.0, &Adjustments::new());
        assert_eq!(path.segments.len(), 11); // moveTo + 9 lineTo + close
    }

    #[test]
    fn right_arrow_points_toward_positive_x() {
        let path = build("rightArrow", 100.0, 40.0, &Adjustments::new());
        let bounds = path.bounds().unwrap();
        assert!(bounds.w > 90.0);
    }
}

#[cfg(test)]
mod bounds_properties {
    use super::*;
    use proptest::prelude::*;

    const PRESETS: &[&str] = &[
        "rect", "roundRect", "round2SameRect", "ellipse", "triangle", "rtTriangle", "diamond",
        "parallelogram", "trapezoid", "pentagon", "hexagon", "octagon", "line", "rightArrow",
        "leftArrow", "upArrow", "downArrow", "chevron", "homePlate", "star5", "plus", "heart",
        "wedgeRectCallout", "flowChartProcess", "flowChartDecision", "flowChartTerminator",
    ];

    proptest! {
        /// Property 5 (spec): every preset, for any positive bounds, yields a
        /// non-empty path whose points sit within a 5%-expanded margin of
        /// those bounds.
        #[test]
        fn preset_path_stays_within_expanded_bounds(w in 1.0f64..2000.0, h in 1.0f64..2000.0) {
            for preset in PRESETS {
                let path = build(preset, w, h, &Adjustments::new());
                prop_assert!(!path.is_empty(), "preset {preset} produced an empty path");
                let bounds = path.bounds().expect("non-empty path has bounds");
                let margin_x = w * 0.05;
                let margin_y = h * 0.05;
                prop_assert!(
                    bounds.x >= -margin_x && bounds.x + bounds.w <= w + margin_x,
                    "preset {preset} x-extent {:?} outside {w}x{h} bounds (margin {margin_x})",
                    (bounds.x, bounds.w)
                );
                prop_assert!(
                    bounds.y >= -margin_y && bounds.y + bounds.h <= h + margin_y,
                    "preset {preset} y-extent {:?} outside {w}x{h} bounds (margin {margin_y})",
                    (bounds.y, bounds.h)
                );
            }
        }
    }
}
