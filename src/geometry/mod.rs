//! Geometry engine (C7): shape transforms, group coordinate mapping, and
//! preset/custom geometry path synthesis.
//!
//! Grounded on the DrawingML transform handling found throughout the
//! presentation shape readers (`off`/`ext`/`rot`/`flipH`/`flipV` parsing)
//! and extended here into the single pixel-space transform the rasterizer
//! needs, plus the group child-coordinate remapping formula that the
//! source only ever applied ad hoc per call site.

pub mod presets;

use crate::raster::{ArcKind, LegacyArc, Path, PathSegment, Point, SvgArc};
use crate::units;
use crate::xml::Node;

/// A shape's `<a:xfrm>` in its native EMU space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeTransform {
    pub off_x: i64,
    pub off_y: i64,
    pub ext_cx: i64,
    pub ext_cy: i64,
    pub rot_deg: f64,
    pub flip_h: bool,
    pub flip_v: bool,
    /// Child coordinate space for group shapes (`chOff`/`chExt`); `None` for
    /// non-group shapes.
    pub child_off: Option<(i64, i64)>,
    pub child_ext: Option<(i64, i64)>,
}

impl ShapeTransform {
    pub fn identity() -> Self {
        Self {
            off_x: 0,
            off_y: 0,
            ext_cx: 0,
            ext_cy: 0,
            rot_deg: 0.0,
            flip_h: false,
            flip_v: false,
            child_off: None,
            child_ext: None,
        }
    }

    /// Parse an `<a:xfrm>` node. Returns `None` if the node itself is
    /// absent (callers fall back to placeholder inheritance in that case).
    pub fn parse(xfrm: Option<&Node>) -> Option<Self> {
        let xfrm = xfrm?;
        let (off_x, off_y) = xfrm
            .child("off")
            .map(|n| (n.attr_i64("x").unwrap_or(0), n.attr_i64("y").unwrap_or(0)))
            .unwrap_or((0, 0));
        let (ext_cx, ext_cy) = xfrm
            .child("ext")
            .map(|n| (n.attr_i64("cx").unwrap_or(0), n.attr_i64("cy").unwrap_or(0)))
            .unwrap_or((0, 0));
        let rot_deg = xfrm
            .attr_i64("rot")
            .map(units::angle_units_to_degrees)
            .unwrap_or(0.0);
        let flip_h = xfrm.attr("flipH") == Some("1");
        let flip_v = xfrm.attr("flipV") == Some("1");
        let child_off = xfrm
            .child("chOff")
            .map(|n| (n.attr_i64("x").unwrap_or(0), n.attr_i64("y").unwrap_or(0)));
        let child_ext = xfrm
            .child("chExt")
            .map(|n| (n.attr_i64("cx").unwrap_or(0), n.attr_i64("cy").unwrap_or(0)));

        Some(Self {
            off_x,
            off_y,
            ext_cx,
            ext_cy,
            rot_deg,
            flip_h,
            flip_v,
            child_off,
            child_ext,
        })
    }

    /// Remap a child shape's transform into a group's coordinate space per
    /// the DrawingML group-transform formula:
    /// `t' = (t.off - chOff) * gExt / chExt + gOff` component-wise, with
    /// the child's extents scaled by the same per-axis factor.
    pub fn map_into_group(&self, group: &ShapeTransform) -> ShapeTransform {
        let (ch_off_x, ch_off_y) = group.child_off.unwrap_or((group.off_x, group.off_y));
        let (ch_ext_cx, ch_ext_cy) = group.child_ext.unwrap_or((group.ext_cx, group.ext_cy));

        let scale_x = if ch_ext_cx != 0 {
            group.ext_cx as f64 / ch_ext_cx as f64
        } else {
            1.0
        };
        let scale_y = if ch_ext_cy != 0 {
            group.ext_cy as f64 / ch_ext_cy as f64
        } else {
            1.0
        };

        let off_x = ((self.off_x - ch_off_x) as f64 * scale_x) as i64 + group.off_x;
        let off_y = ((self.off_y - ch_off_y) as f64 * scale_y) as i64 + group.off_y;

        Self {
            off_x,
            off_y,
            ext_cx: (self.ext_cx as f64 * scale_x) as i64,
            ext_cy: (self.ext_cy as f64 * scale_y) as i64,
            rot_deg: self.rot_deg + group.rot_deg,
            flip_h: self.flip_h ^ group.flip_h,
            flip_v: self.flip_v ^ group.flip_v,
            child_off: self.child_off,
            child_ext: self.child_ext,
        }
    }
}

/// The pixel-space transform applied to the canvas before a shape's path
/// is drawn: translate to the shape's center, rotate, flip, translate back
/// to the origin corner. Canvas callers apply these in the listed order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelTransform {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub rotation_rad: f64,
    pub flip_h: bool,
    pub flip_v: bool,
}

impl PixelTransform {
    pub fn from_shape(shape: &ShapeTransform, scale_x: f64, scale_y: f64) -> Self {
        Self {
            x: units::emu_to_px(shape.off_x, units::DEFAULT_DPI) * scale_x,
            y: units::emu_to_px(shape.off_y, units::DEFAULT_DPI) * scale_y,
            w: units::emu_to_px(shape.ext_cx, units::DEFAULT_DPI) * scale_x,
            h: units::emu_to_px(shape.ext_cy, units::DEFAULT_DPI) * scale_y,
            rotation_rad: shape.rot_deg.to_radians(),
            flip_h: shape.flip_h,
            flip_v: shape.flip_v,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// Map a shape's full pixel bounds to the usable text box for `preset`,
/// given its adjustment values. Most presets just get their full bounds;
/// a few non-rectangular shapes need an inset so text doesn't overrun the
/// shape's visible outline.
pub fn text_bounds(preset: &str, bounds: crate::raster::Rect, adjustments: &presets::Adjustments) -> crate::raster::Rect {
    let adj = |name: &str, default: f64| -> f64 {
        adjustments.get(name).copied().unwrap_or(default) / 100_000.0
    };
    match preset {
        "chevron" => {
            let notch = bounds.h * adj("adj", 50_000.0).clamp(0.0, 1.0);
            crate::raster::Rect::new(bounds.x + notch, bounds.y, (bounds.w - 2.0 * notch).max(0.0), bounds.h)
        }
        "homePlate" => {
            let notch = bounds.w * adj("adj", 50_000.0).clamp(0.0, 1.0);
            crate::raster::Rect::new(bounds.x, bounds.y, (bounds.w - notch).max(0.0), bounds.h)
        }
        "rightArrow" | "leftArrow" => {
            let shaft_h = bounds.h * adj("adj1", 50_000.0).clamp(0.0, 1.0);
            crate::raster::Rect::new(bounds.x, bounds.y + (bounds.h - shaft_h) / 2.0, bounds.w, shaft_h)
        }
        "upArrow" | "downArrow" => {
            let shaft_w = bounds.w * adj("adj1", 50_000.0).clamp(0.0, 1.0);
            crate::raster::Rect::new(bounds.x + (bounds.w - shaft_w) / 2.0, bounds.y, shaft_w, bounds.h)
        }
        _ => bounds,
    }
}

/// Parse `<a:custGeom>` into a `Path` in the shape's local 0..=w,0..=h
/// outline coordinate space, using the ordered XML view so that path
/// commands stay in their document sequence.
pub fn parse_custom_geometry(cust_geom: &Node, w: f64, h: f64) -> Path {
    let (scale_x, scale_y) = path_scale(cust_geom, w, h);
    let mut path = Path::new();
    let mut current = Point::new(0.0, 0.0);

    if let Some(path_node) = cust_geom.find_descendant("path") {
        for cmd in &path_node.children {
            match crate::xml::local_name(&cmd.tag) {
                "moveTo" => {
                    if let Some(pt) = point_from_pt_node(cmd, scale_x, scale_y) {
                        current = pt;
                        path.move_to(pt);
                    }
                }
                "lnTo" => {
                    if let Some(pt) = point_from_pt_node(cmd, scale_x, scale_y) {
                        current = pt;
                        path.line_to(pt);
                    }
                }
                "cubicBezTo" => {
                    let pts: Vec<Point> = cmd
                        .children
                        .iter()
                        .filter_map(|pt_node| point_from_pt(pt_node, scale_x, scale_y))
                        .collect();
                    if pts.len() == 3 {
                        path.cubic_to(pts[0], pts[1], pts[2]);
                        current = pts[2];
                    }
                }
                "quadBezTo" => {
                    let pts: Vec<Point> = cmd
                        .children
                        .iter()
                        .filter_map(|pt_node| point_from_pt(pt_node, scale_x, scale_y))
                        .collect();
                    if pts.len() == 2 {
                        path.segments.push(PathSegment::QuadBezierTo(pts[0], pts[1]));
                        current = pts[1];
                    }
                }
                "arcTo" => {
                    let rx = cmd.attr_i64("wR").unwrap_or(0) as f64 * scale_x;
                    let ry = cmd.attr_i64("hR").unwrap_or(0) as f64 * scale_y;
                    let start_angle_deg = cmd
                        .attr_i64("stAng")
                        .map(units::angle_units_to_degrees)
                        .unwrap_or(0.0);
                    let swing_angle_deg = cmd
                        .attr_i64("swAng")
                        .map(units::angle_units_to_degrees)
                        .unwrap_or(0.0);
                    crate::raster::arc::append_arc(
                        &mut path,
                        current,
                        &ArcKind::Legacy(LegacyArc {
                            rx,
                            ry,
                            start_angle_deg,
                            swing_angle_deg,
                        }),
                    );
                    if let Some(last) = path.bounds() {
                        current = Point::new(last.x + last.w, last.y + last.h);
                    }
                }
                "close" => {
                    path.close();
                }
                _ => {}
            }
        }
    }
    path
}

fn path_scale(cust_geom: &Node, w: f64, h: f64) -> (f64, f64) {
    let path_node = cust_geom.find_descendant("path");
    let path_w = path_node.and_then(|n| n.attr_i64("w")).unwrap_or(0).max(1) as f64;
    let path_h = path_node.and_then(|n| n.attr_i64("h")).unwrap_or(0).max(1) as f64;
    (w / path_w, h / path_h)
}

fn point_from_pt_node(cmd: &Node, scale_x: f64, scale_y: f64) -> Option<Point> {
    cmd.children.first().and_then(|pt| point_from_pt(pt, scale_x, scale_y))
}

fn point_from_pt(pt: &Node, scale_x: f64, scale_y: f64) -> Option<Point> {
    if crate::xml::local_name(&pt.tag) != "pt" {
        return None;
    }
    let x = pt.attr_i64("x")? as f64 * scale_x;
    let y = pt.attr_i64("y")? as f64 * scale_y;
    Some(Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn parses_offset_extent_and_rotation() {
        let node = xml::parse(
            r#"<a:xfrm rot="2700000" flipH="1"><a:off x="100" y="200"/><a:ext cx="300" cy="400"/></a:xfrm>"#,
        )
        .unwrap();
        let t = ShapeTransform::parse(Some(&node)).unwrap();
        assert_eq!(t.off_x, 100);
        assert_eq!(t.ext_cy, 400);
        assert_eq!(t.rot_deg, 45.0);
        assert!(t.flip_h);
    }

    #[test]
    fn group_mapping_scales_and_offsets_child() {
        let group = ShapeTransform {
            off_x: 1000,
            off_y: 1000,
            ext_cx: 2000,
            ext_cy: 2000,
            rot_deg: 0.0,
            flip_h: false,
            flip_v: false,
            child_off: Some((0, 0)),
            child_ext: Some((1000, 1000)),
        };
        let child = ShapeTransform {
            off_x: 500,
            off_y: 500,
            ext_cx: 100,
            ext_cy: 100,
            ..ShapeTransform::identity()
        };
        let mapped = child.map_into_group(&group);
        assert_eq!(mapped.off_x, 2000);
        assert_eq!(mapped.off_y, 2000);
        assert_eq!(mapped.ext_cx, 200);
    }

    #[test]
    fn chevron_text_bounds_insets_both_sides_by_height_scaled_notch() {
        let bounds = crate::raster::Rect::new(0.0, 0.0, 100.0, 40.0);
        let adjustments = presets::Adjustments::new();
        let tb = text_bounds("chevron", bounds, &adjustments);
        assert_eq!(tb.x, 20.0);
        assert_eq!(tb.w, 60.0);
    }

    #[test]
    fn unknown_preset_text_bounds_is_full_bounds() {
        let bounds = crate::raster::Rect::new(0.0, 0.0, 100.0, 40.0);
        let adjustments = presets::Adjustments::new();
        let tb = text_bounds("rect", bounds, &adjustments);
        assert_eq!(tb, bounds);
    }

    #[test]
    fn custom_geometry_round_trips_a_simple_triangle() {
        let node = xml::parse(
            r#"<a:custGeom><a:pathLst><a:path w="100" h="100">
                <a:moveTo><a:pt x="0" y="100"/></a:moveTo>
                <a:lnTo><a:pt x="50" y="0"/></a:lnTo>
                <a:lnTo><a:pt x="100" y="100"/></a:lnTo>
                <a:close/>
            </a:path></a:pathLst></a:custGeom>"#,
        )
        .unwrap();
        let path = parse_custom_geometry(&node, 200.0, 200.0);
        assert_eq!(path.segments.len(), 4);
        assert!(matches!(path.segments[0], PathSegment::MoveTo(_)));
        assert!(matches!(path.segments.last(), Some(PathSegment::Close)));
    }
}
