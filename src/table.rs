//! Table renderer (C17).
//!
//! Parses `a:tbl/a:tblGrid` + row/cell geometry, honors merged cells, and
//! paints background/borders/margins before delegating cell text to the
//! text layout engine. Grounded on the shape orchestrator's fill/stroke
//! handling (C9) and the text layout engine (C14); the grid-scan pixel
//! positioning is new, following the same "cumulative EMU scan scaled to
//! the frame's pixel width" approach the geometry engine uses for shape
//! transforms.

use crate::color::Rgba8;
use crate::fill::{self, Fill};
use crate::font_resolver::FontResolver;
use crate::raster::{Canvas, Rect};
use crate::text::{layout, TextBody, VerticalAnchor};
use crate::theme::{ResolvedTheme, ThemeFont};
use crate::units;
use crate::xml::Node;

const DEFAULT_MARGIN_EMU: i64 = 91_440;

struct Grid {
    col_widths_emu: Vec<i64>,
    row_heights_emu: Vec<i64>,
}

impl Grid {
    fn parse(tbl: &Node) -> Self {
        let col_widths_emu = tbl
            .child("tblGrid")
            .map(|g| g.children("gridCol").map(|c| c.attr_i64("w").unwrap_or(0)).collect())
            .unwrap_or_default();
        let row_heights_emu = tbl.children("tr").map(|r| r.attr_i64("h").unwrap_or(0)).collect();
        Self { col_widths_emu, row_heights_emu }
    }

    fn col_offsets_px(&self, scale_x: f64) -> Vec<f64> {
        cumulative_px(&self.col_widths_emu, scale_x)
    }

    fn row_offsets_px(&self, scale_y: f64) -> Vec<f64> {
        cumulative_px(&self.row_heights_emu, scale_y)
    }
}

fn cumulative_px(sizes_emu: &[i64], scale: f64) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(sizes_emu.len() + 1);
    let mut acc = 0.0;
    offsets.push(0.0);
    for &size in sizes_emu {
        acc += units::emu_to_px(size, units::DEFAULT_DPI) * scale;
        offsets.push(acc);
    }
    offsets
}

struct BorderSide {
    width_px: f64,
    color: Rgba8,
}

fn parse_border(tc_pr: &Node, tag: &str, theme: &ResolvedTheme, scale_x: f64) -> Option<BorderSide> {
    let ln = tc_pr.child(tag)?;
    if ln.child("noFill").is_some() {
        return None;
    }
    let width_px = ln
        .attr_i64("w")
        .map(|emu| units::emu_to_px(emu, units::DEFAULT_DPI) * scale_x)
        .unwrap_or(1.0)
        .max(0.5);
    let color = ln
        .child("solidFill")
        .and_then(|n| crate::color::resolve_color_node(n, |name| theme.colors.get(name).copied()))
        .map(|(c, t)| crate::color::apply_transforms(c, &t))
        .unwrap_or(Rgba8::opaque(0x40, 0x40, 0x40));
    Some(BorderSide { width_px, color })
}

/// Render an `<a:tbl>` into `bounds` (pixel space, already positioned and
/// scaled the way the orchestrator places any other graphic frame).
pub fn render(
    canvas: &mut dyn Canvas,
    tbl: &Node,
    bounds: Rect,
    theme: &ResolvedTheme,
    theme_font: &ThemeFont,
    resolver: &FontResolver,
) {
    let grid = Grid::parse(tbl);
    if grid.col_widths_emu.is_empty() || grid.row_heights_emu.is_empty() {
        return;
    }

    let total_w_emu: i64 = grid.col_widths_emu.iter().sum::<i64>().max(1);
    let scale_x = bounds.w / units::emu_to_px(total_w_emu, units::DEFAULT_DPI);
    let total_h_emu: i64 = grid.row_heights_emu.iter().sum::<i64>().max(1);
    let scale_y = bounds.h / units::emu_to_px(total_h_emu, units::DEFAULT_DPI);

    let col_offsets = grid.col_offsets_px(scale_x);
    let row_offsets = grid.row_offsets_px(scale_y);

    let rows: Vec<&Node> = tbl.children("tr").collect();
    for (row_idx, row) in rows.iter().enumerate() {
        let cells: Vec<&Node> = row.children("tc").collect();
        let mut col_cursor = 0usize;
        for tc in cells {
            let grid_span = tc.attr_i64("gridSpan").unwrap_or(1).max(1) as usize;
            let row_span = tc.attr_i64("rowSpan").unwrap_or(1).max(1) as usize;
            let h_merge = tc.attr("hMerge") == Some("1");
            let v_merge = tc.attr("vMerge") == Some("1");

            if h_merge || v_merge {
                col_cursor += grid_span;
                continue;
            }
            if col_cursor >= col_offsets.len().saturating_sub(1) {
                break;
            }

            let col_end = (col_cursor + grid_span).min(col_offsets.len() - 1);
            let row_end = (row_idx + row_span).min(row_offsets.len() - 1);

            let cell_rect = Rect::new(
                bounds.x + col_offsets[col_cursor],
                bounds.y + row_offsets[row_idx],
                col_offsets[col_end] - col_offsets[col_cursor],
                row_offsets[row_end] - row_offsets[row_idx],
            );

            render_cell(canvas, tc, cell_rect, theme, theme_font, resolver, scale_x);
            col_cursor += grid_span;
        }
    }
}

fn render_cell(
    canvas: &mut dyn Canvas,
    tc: &Node,
    rect: Rect,
    theme: &ResolvedTheme,
    theme_font: &ThemeFont,
    resolver: &FontResolver,
    scale_x: f64,
) {
    let tc_pr = tc.child("tcPr");

    if let Some(pr) = tc_pr {
        if let Some(fill) = fill::parse_fill(pr, theme, None) {
            match fill {
                Fill::Solid(color) => canvas.fill_rect(rect, color),
                Fill::Gradient(ref g) => canvas.fill_path_gradient(&rect_path(rect), g, rect),
                _ => {}
            }
        }
    }

    if let Some(pr) = tc_pr {
        for (tag, edge) in [("lnT", Edge::Top), ("lnB", Edge::Bottom), ("lnL", Edge::Left), ("lnR", Edge::Right)] {
            if let Some(border) = parse_border(pr, tag, theme, scale_x) {
                draw_border(canvas, rect, edge, &border);
            }
        }
    }

    let margin_l = units::emu_to_px(tc_pr.and_then(|p| p.attr_i64("marL")).unwrap_or(DEFAULT_MARGIN_EMU), units::DEFAULT_DPI) * scale_x;
    let margin_r = units::emu_to_px(tc_pr.and_then(|p| p.attr_i64("marR")).unwrap_or(DEFAULT_MARGIN_EMU), units::DEFAULT_DPI) * scale_x;
    let margin_t = units::emu_to_px(tc_pr.and_then(|p| p.attr_i64("marT")).unwrap_or(DEFAULT_MARGIN_EMU), units::DEFAULT_DPI) * scale_x;
    let margin_b = units::emu_to_px(tc_pr.and_then(|p| p.attr_i64("marB")).unwrap_or(DEFAULT_MARGIN_EMU), units::DEFAULT_DPI) * scale_x;

    let inner = Rect::new(
        rect.x + margin_l,
        rect.y + margin_t,
        (rect.w - margin_l - margin_r).max(0.0),
        (rect.h - margin_t - margin_b).max(0.0),
    );

    let Some(tx_body_node) = tc.child("txBody") else { return };
    let mut body = TextBody::parse(tx_body_node, tx_body_node.child("bodyPr"), theme, None);
    if let Some(anchor) = tc_pr.and_then(|p| p.attr("anchor")) {
        body.anchor = match anchor {
            "ctr" => VerticalAnchor::Middle,
            "b" => VerticalAnchor::Bottom,
            _ => VerticalAnchor::Top,
        };
    }

    let result = layout::layout_text(&body, inner, scale_x, resolver, theme_font);
    for run in &result.runs {
        canvas.fill_text(&run.text, run.x, run.y, &run.font, run.color);
    }
    for bullet in &result.bullets {
        canvas.fill_text(&bullet.text, bullet.x, bullet.y, &bullet.font, bullet.color);
    }
}

enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

fn draw_border(canvas: &mut dyn Canvas, rect: Rect, edge: Edge, border: &BorderSide) {
    let mut path = crate::raster::Path::new();
    let (start, end) = match edge {
        Edge::Top => (crate::raster::Point::new(rect.x, rect.y), crate::raster::Point::new(rect.x + rect.w, rect.y)),
        Edge::Bottom => (
            crate::raster::Point::new(rect.x, rect.y + rect.h),
            crate::raster::Point::new(rect.x + rect.w, rect.y + rect.h),
        ),
        Edge::Left => (crate::raster::Point::new(rect.x, rect.y), crate::raster::Point::new(rect.x, rect.y + rect.h)),
        Edge::Right => (
            crate::raster::Point::new(rect.x + rect.w, rect.y),
            crate::raster::Point::new(rect.x + rect.w, rect.y + rect.h),
        ),
    };
    path.move_to(start);
    path.line_to(end);
    canvas.stroke_path(
        &path,
        &crate::raster::Stroke {
            color: border.color,
            width_px: border.width_px,
            cap: crate::raster::LineCap::Butt,
            join: crate::raster::LineJoin::Miter,
            dash: Vec::new(),
        },
    );
}

fn rect_path(rect: Rect) -> crate::raster::Path {
    let mut path = crate::raster::Path::new();
    path.move_to(crate::raster::Point::new(rect.x, rect.y))
        .line_to(crate::raster::Point::new(rect.x + rect.w, rect.y))
        .line_to(crate::raster::Point::new(rect.x + rect.w, rect.y + rect.h))
        .line_to(crate::raster::Point::new(rect.x, rect.y + rect.h))
        .close();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn grid_parses_column_widths_and_row_heights() {
        let node = xml::parse(
            r#"<a:tbl>
                <a:tblGrid><a:gridCol w="100"/><a:gridCol w="200"/></a:tblGrid>
                <a:tr h="50"><a:tc/><a:tc/></a:tr>
                <a:tr h="60"><a:tc/><a:tc/></a:tr>
            </a:tbl>"#,
        )
        .unwrap();
        let grid = Grid::parse(&node);
        assert_eq!(grid.col_widths_emu, vec![100, 200]);
        assert_eq!(grid.row_heights_emu, vec![50, 60]);
    }

    #[test]
    fn cumulative_offsets_scale_by_factor() {
        let offsets = cumulative_px(&[914_400, 914_400], 1.0);
        assert_eq!(offsets.len(), 3);
        assert_eq!(offsets[0], 0.0);
        assert!((offsets[1] - 96.0).abs() < 1e-6);
        assert!((offsets[2] - 192.0).abs() < 1e-6);
    }
}
