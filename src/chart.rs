//! Chart renderer (C16).
//!
//! Parses `c:chartSpace/c:chart/c:plotArea` and paints bar/column/line/pie/
//! area charts. Grounded on the shape orchestrator's graphic-frame dispatch
//! (a `GraphicFrame` whose `graphicData@uri` ends in `/chart` hands its
//! payload here) and on the fill engine for series coloring; the chart
//! XML schema itself has no counterpart anywhere in the corpus, so the
//! plotting geometry (bar layout, pie slice angles, axis ticks) is new,
//! written the way the fill/geometry engines lay out their own primitives.

use crate::color::Rgba8;
use crate::font_resolver::FontResolver;
use crate::raster::{ArcKind, Canvas, LegacyArc, Path, Point, Rect};
use crate::theme::ResolvedTheme;
use crate::xml::{local_name, Node};
use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Column,
    StackedBar,
    StackedColumn,
    Line,
    Pie,
    Area,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPos {
    Top,
    Bottom,
    Left,
    Right,
    TopRight,
}

impl LegendPos {
    fn parse(val: Option<&str>) -> Self {
        match val {
            Some("t") => LegendPos::Top,
            Some("l") => LegendPos::Left,
            Some("r") => LegendPos::Right,
            Some("tr") => LegendPos::TopRight,
            _ => LegendPos::Bottom,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub name: String,
    pub color: Option<Rgba8>,
    pub categories: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct ChartModel {
    pub kind: ChartKind,
    pub title: Option<String>,
    pub legend: Option<LegendPos>,
    pub series: Vec<ChartSeries>,
}

/// Parse a `<c:chartSpace>` document. `None` if no recognized chart-type
/// element is present under `plotArea` (the graphic frame is then skipped,
/// per the documented "unsupported graphicData uri" handling).
pub fn parse(chart_space: &Node) -> Option<ChartModel> {
    let chart = chart_space.child("chart")?;
    let plot_area = chart.find_descendant("plotArea")?;

    let (kind_tag, kind) = plot_area
        .children
        .iter()
        .find_map(|c| chart_kind_for_tag(local_name(&c.tag)).map(|k| (c, k)))?;

    let auto_title_deleted = chart
        .child("autoTitleDeleted")
        .and_then(|n| n.attr("val"))
        .map(|v| v == "1")
        .unwrap_or(false);
    let title = chart
        .child("title")
        .filter(|_| !auto_title_deleted)
        .and_then(extract_title_text);

    let legend = chart
        .child("legend")
        .map(|l| LegendPos::parse(l.child("legendPos").and_then(|n| n.attr("val"))));

    let kind = resolve_grouping(kind_tag, kind);
    let series = kind_tag
        .children("ser")
        .map(parse_series)
        .collect::<Vec<_>>();

    Some(ChartModel { kind, title, legend, series })
}

fn chart_kind_for_tag(tag: &str) -> Option<ChartKind> {
    match tag {
        "barChart" => Some(ChartKind::Column),
        "lineChart" => Some(ChartKind::Line),
        "pieChart" => Some(ChartKind::Pie),
        "areaChart" => Some(ChartKind::Area),
        _ => None,
    }
}

fn resolve_grouping(chart_node: &Node, default_kind: ChartKind) -> ChartKind {
    if default_kind != ChartKind::Column {
        return default_kind;
    }
    let is_bar = chart_node.child("barDir").and_then(|n| n.attr("val")) == Some("bar");
    let stacked = matches!(
        chart_node.child("grouping").and_then(|n| n.attr("val")),
        Some("stacked") | Some("percentStacked")
    );
    match (is_bar, stacked) {
        (true, true) => ChartKind::StackedBar,
        (true, false) => ChartKind::Bar,
        (false, true) => ChartKind::StackedColumn,
        (false, false) => ChartKind::Column,
    }
}

fn extract_title_text(title: &Node) -> Option<String> {
    let text = title.find_descendant("rich")?.all_text();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_series(ser: &Node) -> ChartSeries {
    let name = ser
        .child("tx")
        .and_then(|n| n.find_descendant("v"))
        .map(|v| v.all_text())
        .unwrap_or_default();

    let color = ser
        .child("spPr")
        .and_then(|sppr| sppr.child("solidFill"))
        .and_then(|solid| solid.find_descendant("srgbClr").or_else(|| solid.find_descendant("schemeClr")))
        .and_then(|c| c.attr("val"))
        .and_then(Rgba8::from_hex);

    let categories = ser
        .child("cat")
        .and_then(|c| c.find_descendant("strCache"))
        .map(sorted_string_points)
        .unwrap_or_default();

    let values = ser
        .child("val")
        .and_then(|v| v.find_descendant("numCache"))
        .map(sorted_numeric_points)
        .unwrap_or_default();

    ChartSeries { name, color, categories, values }
}

fn sorted_numeric_points(cache: &Node) -> Vec<f64> {
    let mut points: Vec<(i64, f64)> = cache
        .children("pt")
        .filter_map(|pt| {
            let idx = pt.attr_i64("idx")?;
            let v = pt.child("v")?.all_text().trim().parse::<f64>().ok()?;
            Some((idx, v))
        })
        .collect();
    points.sort_by_key(|(idx, _)| *idx);
    points.into_iter().map(|(_, v)| v).collect()
}

fn sorted_string_points(cache: &Node) -> Vec<String> {
    let mut points: Vec<(i64, String)> = cache
        .children("pt")
        .filter_map(|pt| {
            let idx = pt.attr_i64("idx")?;
            let v = pt.child("v").map(|v| v.all_text())?;
            Some((idx, v))
        })
        .collect();
    points.sort_by_key(|(idx, _)| *idx);
    points.into_iter().map(|(_, v)| v).collect()
}

/// Format an axis value with K/M suffixes, matching the 5-tick axis the
/// layout reserves room for.
fn format_axis_value(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.1}K", v / 1_000.0)
    } else if v.fract().abs() < 1e-9 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

/// Series color, falling back to the theme's accent1..accent6 slots cycled
/// by index rather than the fixed Office RGB octet the source used — an
/// explicit alignment with deck theming for higher fidelity (see the
/// recorded decision for this component).
fn series_color(series: &ChartSeries, index: usize, theme: &ResolvedTheme) -> Rgba8 {
    if let Some(c) = series.color {
        return c;
    }
    let accents = ["accent1", "accent2", "accent3", "accent4", "accent5", "accent6"];
    let name = accents[index % accents.len()];
    theme.colors.get(name).copied().unwrap_or(Rgba8::opaque(0x44, 0x72, 0xC4))
}

const TITLE_HEIGHT: f64 = 28.0;
const LEGEND_BAND: f64 = 24.0;
const AXIS_BAND_BOTTOM: f64 = 24.0;
const AXIS_BAND_LEFT: f64 = 48.0;
const AXIS_TICKS: usize = 5;

/// Render a parsed chart model into `bounds` (already in canvas pixel
/// space). Unrecognized/empty series are simply not drawn; a chart with no
/// series at all just paints its title/legend chrome.
pub fn render(
    canvas: &mut dyn Canvas,
    model: &ChartModel,
    bounds: Rect,
    theme: &ResolvedTheme,
    resolver: &FontResolver,
) {
    let mut area = bounds;
    let axis_font = resolver.canvas_font_string("sans-serif", 11.0, false, false);

    if let Some(title) = &model.title {
        let title_font = resolver.canvas_font_string("sans-serif", 14.0, true, false);
        let metrics = canvas.measure_text(&title_font, title);
        canvas.fill_text(title, area.x + (area.w - metrics.width) / 2.0, area.y + TITLE_HEIGHT * 0.7, &title_font, Rgba8::BLACK);
        area = Rect::new(area.x, area.y + TITLE_HEIGHT, area.w, area.h - TITLE_HEIGHT);
    }

    let legend_h = if model.legend.is_some() && !model.series.is_empty() { LEGEND_BAND } else { 0.0 };
    let legend_rect = match model.legend {
        Some(LegendPos::Top) => {
            let r = Rect::new(area.x, area.y, area.w, legend_h);
            area = Rect::new(area.x, area.y + legend_h, area.w, area.h - legend_h);
            Some(r)
        }
        Some(_) => {
            let r = Rect::new(area.x, area.y + area.h - legend_h, area.w, legend_h);
            area = Rect::new(area.x, area.y, area.w, area.h - legend_h);
            Some(r)
        }
        None => None,
    };
    if let Some(r) = legend_rect {
        draw_legend(canvas, model, r, theme, &axis_font);
    }

    if model.series.is_empty() {
        return;
    }

    match model.kind {
        ChartKind::Pie => draw_pie(canvas, model, area, theme),
        _ => {
            let plot = Rect::new(
                area.x + AXIS_BAND_LEFT,
                area.y,
                (area.w - AXIS_BAND_LEFT).max(0.0),
                (area.h - AXIS_BAND_BOTTOM).max(0.0),
            );
            let max_value = model
                .series
                .iter()
                .flat_map(|s| s.values.iter().copied())
                .fold(0.0_f64, f64::max)
                .max(1.0);
            draw_axes(canvas, plot, max_value, &axis_font);
            match model.kind {
                ChartKind::Bar | ChartKind::StackedBar => draw_bar(canvas, model, plot, max_value, theme, true, model.kind == ChartKind::StackedBar),
                ChartKind::Column | ChartKind::StackedColumn => draw_bar(canvas, model, plot, max_value, theme, false, model.kind == ChartKind::StackedColumn),
                ChartKind::Line => draw_line(canvas, model, plot, max_value, theme, false),
                ChartKind::Area => draw_line(canvas, model, plot, max_value, theme, true),
                ChartKind::Pie => unreachable!(),
            }
        }
    }
}

fn draw_legend(canvas: &mut dyn Canvas, model: &ChartModel, rect: Rect, theme: &ResolvedTheme, font: &str) {
    let mut x = rect.x;
    let swatch = 10.0;
    for (i, series) in model.series.iter().enumerate() {
        let color = series_color(series, i, theme);
        canvas.fill_rect(Rect::new(x, rect.y + (rect.h - swatch) / 2.0, swatch, swatch), color);
        let label = if series.name.is_empty() { format!("Series {}", i + 1) } else { series.name.clone() };
        let metrics = canvas.measure_text(font, &label);
        canvas.fill_text(&label, x + swatch + 4.0, rect.y + rect.h / 2.0 + metrics.ascent / 2.0, font, Rgba8::BLACK);
        x += swatch + 4.0 + metrics.width + 16.0;
        if x > rect.x + rect.w {
            break;
        }
    }
}

fn draw_axes(canvas: &mut dyn Canvas, plot: Rect, max_value: f64, font: &str) {
    let axis_stroke = crate::raster::Stroke {
        color: Rgba8::opaque(0x80, 0x80, 0x80),
        width_px: 1.0,
        cap: crate::raster::LineCap::Butt,
        join: crate::raster::LineJoin::Miter,
        dash: Vec::new(),
    };
    let mut axes = Path::new();
    axes.move_to(Point::new(plot.x, plot.y));
    axes.line_to(Point::new(plot.x, plot.y + plot.h));
    axes.line_to(Point::new(plot.x + plot.w, plot.y + plot.h));
    canvas.stroke_path(&axes, &axis_stroke);

    for tick in 0..AXIS_TICKS {
        let frac = tick as f64 / (AXIS_TICKS - 1) as f64;
        let value = max_value * (1.0 - frac);
        let y = plot.y + plot.h * frac;
        let label = format_axis_value(value);
        let metrics = canvas.measure_text(font, &label);
        canvas.fill_text(&label, plot.x - metrics.width - 6.0, y + metrics.ascent / 2.0, font, Rgba8::opaque(0x40, 0x40, 0x40));
    }
}

fn draw_bar(canvas: &mut dyn Canvas, model: &ChartModel, plot: Rect, max_value: f64, theme: &ResolvedTheme, horizontal: bool, stacked: bool) {
    let category_count = model.series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    if category_count == 0 {
        return;
    }
    let series_count = model.series.len().max(1);
    let primary = if horizontal { plot.h } else { plot.w };
    let slot = primary / category_count as f64;
    let group_gap = slot * 0.2;
    let bar_w = if stacked {
        slot - group_gap
    } else {
        (slot - group_gap) / series_count as f64
    };

    for cat_idx in 0..category_count {
        let mut stack_offset = 0.0;
        for (s_idx, series) in model.series.iter().enumerate() {
            let Some(&value) = series.values.get(cat_idx) else { continue };
            let color = series_color(series, s_idx, theme);
            let extent = if horizontal { plot.w } else { plot.h } * (value / max_value).max(0.0);

            let rect = if horizontal {
                let y = plot.y + cat_idx as f64 * slot + group_gap / 2.0 + if stacked { 0.0 } else { s_idx as f64 * bar_w };
                let x = plot.x + stack_offset;
                Rect::new(x, y, extent, bar_w)
            } else {
                let x = plot.x + cat_idx as f64 * slot + group_gap / 2.0 + if stacked { 0.0 } else { s_idx as f64 * bar_w };
                let y = plot.y + plot.h - extent - stack_offset;
                Rect::new(x, y, bar_w, extent)
            };
            canvas.fill_rect(rect, color);
            if stacked {
                stack_offset += extent;
            }
        }
    }
}

fn draw_line(canvas: &mut dyn Canvas, model: &ChartModel, plot: Rect, max_value: f64, theme: &ResolvedTheme, filled: bool) {
    let category_count = model.series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    if category_count < 2 {
        return;
    }
    let step = plot.w / (category_count - 1) as f64;

    for (s_idx, series) in model.series.iter().enumerate() {
        if series.values.is_empty() {
            continue;
        }
        let color = series_color(series, s_idx, theme);
        let points: Vec<Point> = series
            .values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let x = plot.x + i as f64 * step;
                let y = plot.y + plot.h * (1.0 - (v / max_value).clamp(0.0, 1.0));
                Point::new(x, y)
            })
            .collect();

        let mut path = Path::new();
        path.move_to(points[0]);
        for p in &points[1..] {
            path.line_to(*p);
        }

        if filled {
            let mut fill_path = path.clone();
            fill_path.line_to(Point::new(points.last().unwrap().x, plot.y + plot.h));
            fill_path.line_to(Point::new(points[0].x, plot.y + plot.h));
            fill_path.close();
            canvas.fill_path(&fill_path, Rgba8::new(color.r, color.g, color.b, 120));
        }
        canvas.stroke_path(
            &path,
            &crate::raster::Stroke {
                color,
                width_px: 2.0,
                cap: crate::raster::LineCap::Round,
                join: crate::raster::LineJoin::Round,
                dash: Vec::new(),
            },
        );
    }
}

fn draw_pie(canvas: &mut dyn Canvas, model: &ChartModel, area: Rect, theme: &ResolvedTheme) {
    let Some(series) = model.series.first() else { return };
    let total: f64 = series.values.iter().sum();
    if total <= 0.0 {
        warn!("pie chart has non-positive total value; nothing to draw");
        return;
    }

    let radius = (area.w.min(area.h) / 2.0 - 8.0).max(1.0);
    let center = area.center();
    let mut start_angle_deg = -90.0;

    for (i, &value) in series.values.iter().enumerate() {
        let sweep_deg = 360.0 * value / total;
        if sweep_deg <= 0.0 {
            continue;
        }
        let color = series_color(series, i, theme);
        let start_point = Point::new(
            center.x + radius * start_angle_deg.to_radians().cos(),
            center.y + radius * start_angle_deg.to_radians().sin(),
        );

        let mut path = Path::new();
        path.move_to(center);
        path.line_to(start_point);
        crate::raster::arc::append_arc(
            &mut path,
            start_point,
            &ArcKind::Legacy(LegacyArc {
                rx: radius,
                ry: radius,
                start_angle_deg,
                swing_angle_deg: sweep_deg,
            }),
        );
        path.close();
        canvas.fill_path(&path, color);

        start_angle_deg += sweep_deg;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    fn sample_chart(xml_tag: &str, dir: &str) -> Node {
        xml::parse(&format!(
            r#"<c:chartSpace>
                <c:chart>
                    <c:title><c:tx><c:rich><a:p><a:r><a:t>Revenue</a:t></a:r></a:p></c:rich></c:tx></c:title>
                    <c:plotArea>
                        <c:{xml_tag}>
                            {dir}
                            <c:ser>
                                <c:idx val="0"/>
                                <c:tx><c:v>Q1</c:v></c:tx>
                                <c:cat><c:strCache><c:pt idx="1"><c:v>B</c:v></c:pt><c:pt idx="0"><c:v>A</c:v></c:pt></c:strCache></c:cat>
                                <c:val><c:numCache><c:pt idx="1"><c:v>20</c:v></c:pt><c:pt idx="0"><c:v>10</c:v></c:pt></c:numCache></c:val>
                            </c:ser>
                        </c:{xml_tag}>
                    </c:plotArea>
                    <c:legend><c:legendPos val="b"/></c:legend>
                </c:chart>
            </c:chartSpace>"#
        ))
        .unwrap()
    }

    #[test]
    fn parses_title_categories_sorted_by_idx() {
        let node = sample_chart("barChart", r#"<c:barDir val="col"/><c:grouping val="clustered"/>"#);
        let model = parse(&node).unwrap();
        assert_eq!(model.title.as_deref(), Some("Revenue"));
        assert_eq!(model.series[0].categories, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(model.series[0].values, vec![10.0, 20.0]);
    }

    #[test]
    fn bar_direction_and_grouping_select_column_kind() {
        let node = sample_chart("barChart", r#"<c:barDir val="col"/><c:grouping val="stacked"/>"#);
        let model = parse(&node).unwrap();
        assert_eq!(model.kind, ChartKind::StackedColumn);
    }

    #[test]
    fn pie_chart_is_recognized_without_grouping() {
        let node = sample_chart("pieChart", "");
        let model = parse(&node).unwrap();
        assert_eq!(model.kind, ChartKind::Pie);
    }

    #[test]
    fn axis_value_formatting_uses_k_and_m_suffixes() {
        assert_eq!(format_axis_value(1_500_000.0), "1.5M");
        assert_eq!(format_axis_value(2_500.0), "2.5K");
        assert_eq!(format_axis_value(42.0), "42");
    }

    #[test]
    fn unrecognized_chart_type_returns_none() {
        let node = xml::parse(
            r#"<c:chartSpace><c:chart><c:plotArea><c:bubbleChart/></c:plotArea></c:chart></c:chartSpace>"#,
        )
        .unwrap();
        assert!(parse(&node).is_none());
    }
}
