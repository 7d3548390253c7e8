//! SVG and legacy OOXML arc-to-center conversion, and arc flattening into
//! cubic Bezier segments for canvases that only draw lines and curves.
//!
//! The SVG conversion follows the W3C implementation note's endpoint-to-
//! center parameterization algorithm, including the radius correction
//! (`sqrt(lambda)` scaling) required when the requested radii are too small
//! to span the two endpoints.

use super::{ArcKind, LegacyArc, Path, PathSegment, Point, SvgArc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterArc {
    pub cx: f64,
    pub cy: f64,
    pub rx: f64,
    pub ry: f64,
    pub x_rotation_rad: f64,
    pub start_angle_rad: f64,
    pub sweep_angle_rad: f64,
}

/// Convert an SVG endpoint-form arc to center-parameterized form.
///
/// Degenerate cases: `start == end` is treated by the caller as a no-op
/// (nothing to draw); a zero radius collapses to a straight line, also
/// handled by the caller before reaching here.
pub fn svg_arc_to_center(start: Point, arc: &SvgArc) -> CenterArc {
    let phi = arc.x_rotation_deg.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();

    let dx2 = (start.x - arc.end.x) / 2.0;
    let dy2 = (start.y - arc.end.y) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    let mut rx = arc.rx.abs();
    let mut ry = arc.ry.abs();

    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let scale = lambda.sqrt();
        rx *= scale;
        ry *= scale;
    }

    let sign = if arc.large_arc == arc.sweep { -1.0 } else { 1.0 };
    let num = (rx * rx * ry * ry) - (rx * rx * y1p * y1p) - (ry * ry * x1p * x1p);
    let den = (rx * rx * y1p * y1p) + (ry * ry * x1p * x1p);
    let co = sign * (num.max(0.0) / den).sqrt();

    let cxp = co * (rx * y1p) / ry;
    let cyp = co * -(ry * x1p) / rx;

    let cx = cos_phi * cxp - sin_phi * cyp + (start.x + arc.end.x) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (start.y + arc.end.y) / 2.0;

    let angle = |ux: f64, uy: f64, vx: f64, vy: f64| -> f64 {
        let dot = ux * vx + uy * vy;
        let len = ((ux * ux + uy * uy) * (vx * vx + vy * vy)).sqrt();
        let mut ang = (dot / len).clamp(-1.0, 1.0).acos();
        if ux * vy - uy * vx < 0.0 {
            ang = -ang;
        }
        ang
    };

    let start_angle = angle(1.0, 0.0, (x1p - cxp) / rx, (y1p - cyp) / ry);
    let mut delta = angle(
        (x1p - cxp) / rx,
        (y1p - cyp) / ry,
        (-x1p - cxp) / rx,
        (-y1p - cyp) / ry,
    );
    if !arc.sweep && delta > 0.0 {
        delta -= std::f64::consts::TAU;
    } else if arc.sweep && delta < 0.0 {
        delta += std::f64::consts::TAU;
    }

    CenterArc {
        cx,
        cy,
        rx,
        ry,
        x_rotation_rad: phi,
        start_angle_rad: start_angle,
        sweep_angle_rad: delta,
    }
}

/// Legacy `<a:arcTo>` is already center-implied by the path's current
/// position (taken as the arc's start point on the ellipse) and an
/// explicit start/swing angle pair, so no endpoint solve is needed.
pub fn legacy_arc_to_center(current: Point, arc: &LegacyArc) -> CenterArc {
    let start_angle = arc.start_angle_deg.to_radians();
    let cx = current.x - arc.rx * start_angle.cos();
    let cy = current.y - arc.ry * start_angle.sin();
    CenterArc {
        cx,
        cy,
        rx: arc.rx,
        ry: arc.ry,
        x_rotation_rad: 0.0,
        start_angle_rad: start_angle,
        sweep_angle_rad: arc.swing_angle_deg.to_radians(),
    }
}

/// Flatten a `CenterArc` into cubic Bezier segments, splitting at 90°
/// boundaries so each cubic stays within the standard circular-arc
/// approximation error bound.
pub fn flatten_to_cubics(center: CenterArc, out: &mut Path) {
    const MAX_SEGMENT_RAD: f64 = std::f64::consts::FRAC_PI_2;
    let segments = (center.sweep_angle_rad.abs() / MAX_SEGMENT_RAD).ceil().max(1.0) as u32;
    let step = center.sweep_angle_rad / segments as f64;

    let (rot_sin, rot_cos) = center.x_rotation_rad.sin_cos();
    let point_at = |theta: f64| -> Point {
        let ex = center.rx * theta.cos();
        let ey = center.ry * theta.sin();
        Point::new(
            center.cx + ex * rot_cos - ey * rot_sin,
            center.cy + ex * rot_sin + ey * rot_cos,
        )
    };

    let mut theta = center.start_angle_rad;
    for _ in 0..segments {
        let theta_end = theta + step;
        let alpha = (step / 4.0).tan() * 4.0 / 3.0;

        let p0 = point_at(theta);
        let p3 = point_at(theta_end);

        let tangent = |theta: f64, sign: f64| -> Point {
            Point::new(
                -center.rx * theta.sin() * rot_cos - center.ry * theta.cos() * rot_sin,
                -center.rx * theta.sin() * rot_sin + center.ry * theta.cos() * rot_cos,
            ) * sign
        };
        // Local helper closures can't return `Point` scaled by `*`; expand
        // inline instead since `Point` has no `Mul` impl.
        let tan_start = tangent(theta, alpha);
        let tan_end = tangent(theta_end, alpha);

        let c1 = Point::new(p0.x + tan_start.x, p0.y + tan_start.y);
        let c2 = Point::new(p3.x - tan_end.x, p3.y - tan_end.y);

        out.segments.push(PathSegment::CubicBezierTo(c1, c2, p3));
        theta = theta_end;
    }
}

impl std::ops::Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Append an arc segment (either convention) to `path` as flattened cubics,
/// given the path's current point. No-ops on the degenerate "arc ends where
/// it starts" case; collapses to a straight line when both radii are zero.
pub fn append_arc(path: &mut Path, current: Point, kind: &ArcKind) {
    match kind {
        ArcKind::Svg(arc) => {
            if (current.x - arc.end.x).abs() < f64::EPSILON && (current.y - arc.end.y).abs() < f64::EPSILON {
                return;
            }
            if arc.rx.abs() < f64::EPSILON || arc.ry.abs() < f64::EPSILON {
                path.line_to(arc.end);
                return;
            }
            let center = svg_arc_to_center(current, arc);
            flatten_to_cubics(center, path);
        }
        ArcKind::Legacy(arc) => {
            if arc.rx.abs() < f64::EPSILON || arc.ry.abs() < f64::EPSILON {
                return;
            }
            let center = legacy_arc_to_center(current, arc);
            flatten_to_cubics(center, path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svg_arc_semicircle_produces_opposite_endpoint() {
        let start = Point::new(0.0, 0.0);
        let arc = SvgArc {
            rx: 50.0,
            ry: 50.0,
            x_rotation_deg: 0.0,
            large_arc: false,
            sweep: true,
            end: Point::new(100.0, 0.0),
        };
        let center = svg_arc_to_center(start, &arc);
        assert!((center.cx - 50.0).abs() < 1e-6);
        assert!(center.cy.abs() < 1e-6);
    }

    #[test]
    fn undersized_radius_is_scaled_up_to_span_endpoints() {
        let start = Point::new(0.0, 0.0);
        let arc = SvgArc {
            rx: 1.0,
            ry: 1.0,
            x_rotation_deg: 0.0,
            large_arc: false,
            sweep: true,
            end: Point::new(100.0, 0.0),
        };
        let center = svg_arc_to_center(start, &arc);
        assert!(center.rx >= 50.0);
    }

    #[test]
    fn legacy_arc_center_is_offset_from_current_point_by_radius() {
        let current = Point::new(10.0, 0.0);
        let arc = LegacyArc {
            rx: 10.0,
            ry: 10.0,
            start_angle_deg: 0.0,
            swing_angle_deg: 90.0,
        };
        let center = legacy_arc_to_center(current, &arc);
        assert!(center.cx.abs() < 1e-9);
        assert!(center.cy.abs() < 1e-9);
    }

    #[test]
    fn degenerate_zero_radius_becomes_a_line() {
        let mut path = Path::new();
        path.move_to(Point::new(0.0, 0.0));
        append_arc(
            &mut path,
            Point::new(0.0, 0.0),
            &ArcKind::Svg(SvgArc {
                rx: 0.0,
                ry: 0.0,
                x_rotation_deg: 0.0,
                large_arc: false,
                sweep: false,
                end: Point::new(5.0, 5.0),
            }),
        );
        assert!(matches!(path.segments.last(), Some(PathSegment::LineTo(_))));
    }
}
