//! Path IR and the canvas abstraction the rest of the pipeline draws
//! through (C8). The source couples directly to one 2-D canvas library;
//! here that coupling is replaced with a trait so any backend implementing
//! these primitives can consume the renderer's output.

pub mod arc;

use crate::color::Rgba8;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// An SVG-style elliptical arc, endpoint-parameterized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvgArc {
    pub rx: f64,
    pub ry: f64,
    pub x_rotation_deg: f64,
    pub large_arc: bool,
    pub sweep: bool,
    pub end: Point,
}

/// A legacy OOXML arc: center-implied by the current point and a start
/// angle, sweeping by `swing_angle_deg`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegacyArc {
    pub rx: f64,
    pub ry: f64,
    pub start_angle_deg: f64,
    pub swing_angle_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcKind {
    Svg(SvgArc),
    Legacy(LegacyArc),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    CubicBezierTo(Point, Point, Point),
    QuadBezierTo(Point, Point),
    ArcTo(ArcKind),
    Close,
}

/// Most preset shapes synthesize well under 16 segments; the inline
/// capacity avoids a heap allocation per shape for the common case.
#[derive(Debug, Clone, Default)]
pub struct Path {
    pub segments: SmallVec<[PathSegment; 16]>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, p: Point) -> &mut Self {
        self.segments.push(PathSegment::MoveTo(p));
        self
    }

    pub fn line_to(&mut self, p: Point) -> &mut Self {
        self.segments.push(PathSegment::LineTo(p));
        self
    }

    pub fn cubic_to(&mut self, c1: Point, c2: Point, end: Point) -> &mut Self {
        self.segments.push(PathSegment::CubicBezierTo(c1, c2, end));
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.segments.push(PathSegment::Close);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Bounding box over every anchor point in the path (control points of
    /// curves included, which over-estimates slightly but never
    /// under-estimates — sufficient for the invariant that synthesized
    /// presets stay within an expanded margin of their declared bounds).
    pub fn bounds(&self) -> Option<Rect> {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let mut visit = |p: Point| {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        };
        for seg in &self.segments {
            match *seg {
                PathSegment::MoveTo(p) | PathSegment::LineTo(p) => visit(p),
                PathSegment::CubicBezierTo(a, b, c) => {
                    visit(a);
                    visit(b);
                    visit(c);
                }
                PathSegment::QuadBezierTo(a, b) => {
                    visit(a);
                    visit(b);
                }
                PathSegment::ArcTo(ArcKind::Svg(a)) => visit(a.end),
                PathSegment::ArcTo(ArcKind::Legacy(_)) => {}
                PathSegment::Close => {}
            }
        }
        if min_x.is_finite() {
            Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

#[derive(Debug, Clone)]
pub struct Stroke {
    pub color: Rgba8,
    pub width_px: f64,
    pub cap: LineCap,
    pub join: LineJoin,
    pub dash: Vec<f64>,
}

/// The abstract drawing surface the rasterizer adapter streams path
/// segments and fill/stroke operations to.
pub trait Canvas {
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, dx: f64, dy: f64);
    fn rotate(&mut self, radians: f64);
    fn scale(&mut self, sx: f64, sy: f64);

    fn fill_path(&mut self, path: &Path, color: Rgba8);
    /// Fill with a linear/radial gradient spanning `bounds`; backends that
    /// can't rasterize a real gradient may approximate with the average of
    /// the stops, but must still fill the path.
    fn fill_path_gradient(&mut self, path: &Path, gradient: &crate::fill::Gradient, bounds: Rect);
    fn stroke_path(&mut self, path: &Path, stroke: &Stroke);
    fn fill_rect(&mut self, rect: Rect, color: Rgba8);

    fn draw_image(&mut self, rgba: &[u8], src_w: u32, src_h: u32, dest: Rect);

    fn measure_text(&mut self, font: &str, text: &str) -> TextMetrics;
    /// Paint `text` with its baseline origin at `(x, y)`, the canvas
    /// convention `measure_text`'s ascent/descent are relative to.
    fn fill_text(&mut self, text: &str, x: f64, y: f64, font: &str, color: Rgba8);

    /// Restrict subsequent drawing to `rect` until the matching `restore`.
    fn clip_rect(&mut self, rect: Rect);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextMetrics {
    pub width: f64,
    pub ascent: f64,
    pub descent: f64,
}
