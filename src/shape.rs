//! Shape orchestrator (C18).
//!
//! Classifies each shape-tree element, resolves placeholder geometry from
//! the layout/master chain, and dispatches to the fill/stroke engine (C9),
//! the geometry engine (C7), the text layout engine (C14), the image
//! engine (C15), and the table/chart renderers (C16/C17). This is the
//! single place that understands the shape-tree's tagged-variant shape
//! (`p:sp | p:cxnSp | p:pic | p:grpSp | p:graphicFrame | mc:AlternateContent`)
//! and walks it in document order, the z-order invariant §3 requires.

use crate::color::Rgba8;
use crate::fill::{self, Fill};
use crate::font_resolver::FontResolver;
use crate::geometry::{self, presets, PixelTransform, ShapeTransform};
use crate::opc::Package;
use crate::picture::ImageEngine;
use crate::raster::{Canvas, Rect};
use crate::table;
use crate::text::{layout, TextBody};
use crate::theme::ResolvedTheme;
use crate::xml::{local_name, Node};
use log::{debug, warn};
use std::io::{Read, Seek};

/// Namespace prefixes this renderer treats as always-supported when
/// evaluating `mc:AlternateContent/mc:Choice@Requires`: core DrawingML and
/// PresentationML. Anything else (e.g. `a14`, vendor extensions) falls
/// through to `mc:Fallback`, matching the documented "known OOXML
/// namespaces" allowlist rather than resolving real namespace URIs (the
/// parser does not track `xmlns` bindings per element).
const SUPPORTED_ALTERNATE_CONTENT_PREFIXES: &[&str] = &["a", "p", "dgm", "pic"];

/// Everything the orchestrator needs that stays constant across one
/// slide's shape tree: the resolved theme, font plumbing, the per-slide
/// image cache, the render scale, and the layout/master trees a
/// placeholder's geometry may fall back to.
pub struct RenderContext<'a, R: Read + Seek> {
    pub package: &'a Package<R>,
    pub part_path: &'a str,
    pub theme: &'a ResolvedTheme,
    pub font_resolver: &'a FontResolver,
    pub images: &'a ImageEngine,
    pub scale_x: f64,
    pub scale_y: f64,
    pub layout_tree: Option<&'a Node>,
    pub master_tree: Option<&'a Node>,
    pub debug_mode: bool,
}

/// Render every child of a shape-tree container (`p:spTree` or `p:grpSp`)
/// in document order. `group` is the already-resolved (slide-EMU-space)
/// transform of the enclosing group, if any; `None` at the tree root.
pub fn render_shape_tree<R: Read + Seek>(
    canvas: &mut dyn Canvas,
    ctx: &RenderContext<R>,
    tree: &Node,
    group: Option<&ShapeTransform>,
) {
    for child in &tree.children {
        match local_name(&child.tag) {
            "sp" => render_shape(canvas, ctx, child, group),
            "cxnSp" => render_connection_shape(canvas, ctx, child, group),
            "pic" => render_picture(canvas, ctx, child, group),
            "grpSp" => render_group(canvas, ctx, child, group),
            "graphicFrame" => render_graphic_frame(canvas, ctx, child, group),
            "AlternateContent" => render_alternate_content(canvas, ctx, child, group),
            _ => {}
        }
    }
}

fn is_hidden(nv_pr: Option<&Node>) -> bool {
    nv_pr
        .and_then(|n| n.find_descendant("cNvPr"))
        .and_then(|n| n.attr("hidden"))
        == Some("1")
}

fn placeholder_ref(sp: &Node) -> Option<(Option<String>, Option<String>)> {
    let ph = sp.find_descendant("nvSpPr")?.find_descendant("ph")?;
    Some((ph.attr("type").map(str::to_string), ph.attr("idx").map(str::to_string)))
}

/// Find the placeholder shape in a layout/master's shape tree matching by
/// `type` or `idx`, either accepted (§4.18).
fn find_placeholder<'a>(tree: &'a Node, ph_type: Option<&str>, ph_idx: Option<&str>) -> Option<&'a Node> {
    tree.children.iter().find(|sp| {
        if local_name(&sp.tag) != "sp" {
            return false;
        }
        let Some(ph) = sp.find_descendant("nvSpPr").and_then(|n| n.find_descendant("ph")) else {
            return false;
        };
        let type_match = ph_type.is_some() && ph.attr("type") == ph_type;
        let idx_match = ph_idx.is_some() && ph.attr("idx") == ph_idx;
        type_match || idx_match
    })
}

/// Resolve the `spPr` a placeholder shape should inherit geometry/fill
/// from when it carries none of its own: layout first, then master.
fn resolve_placeholder_sp_pr<'a, R: Read + Seek>(
    ctx: &RenderContext<'a, R>,
    sp: &Node,
) -> Option<&'a Node> {
    let (ph_type, ph_idx) = placeholder_ref(sp)?;
    if let Some(layout) = ctx.layout_tree {
        if let Some(found) = find_placeholder(layout, ph_type.as_deref(), ph_idx.as_deref()) {
            if let Some(sppr) = found.child("spPr") {
                return Some(sppr);
            }
        }
    }
    if let Some(master) = ctx.master_tree {
        if let Some(found) = find_placeholder(master, ph_type.as_deref(), ph_idx.as_deref()) {
            if let Some(sppr) = found.child("spPr") {
                return Some(sppr);
            }
        }
    }
    None
}

/// Parse `<a:avLst>/<a:gd fmla="val N"/>` adjustment guides (§4.2's
/// `val N`-only formula support; anything else is simply not an
/// adjustment this renderer understands and is skipped).
fn parse_adjustments(prst_geom: &Node) -> presets::Adjustments {
    let mut out = presets::Adjustments::new();
    if let Some(av_lst) = prst_geom.child("avLst") {
        for gd in av_lst.children("gd") {
            let (Some(name), Some(fmla)) = (gd.attr("name"), gd.attr("fmla")) else {
                continue;
            };
            if let Some(rest) = fmla.strip_prefix("val ") {
                if let Ok(val) = rest.trim().parse::<f64>() {
                    out.insert(name.to_string(), val);
                }
            }
        }
    }
    out
}

struct Geometry {
    preset: String,
    adjustments: presets::Adjustments,
    custom: Option<Node>,
}

fn parse_geometry(sp_pr: &Node) -> Geometry {
    if let Some(prst) = sp_pr.child("prstGeom") {
        return Geometry {
            preset: prst.attr_or("prst", "rect").to_string(),
            adjustments: parse_adjustments(prst),
            custom: None,
        };
    }
    if let Some(cust) = sp_pr.child("custGeom") {
        return Geometry { preset: "rect".to_string(), adjustments: presets::Adjustments::new(), custom: Some(cust.clone()) };
    }
    debug!("unsupported or missing geometry; substituting rect");
    Geometry { preset: "rect".to_string(), adjustments: presets::Adjustments::new(), custom: None }
}

/// Apply the canvas transform order §4.7 documents: translate by pixel
/// offset, translate to center, rotate, flip (negative scale), translate
/// back to the origin corner. Subsequent path coordinates are in the local
/// `0..=w, 0..=h` box.
fn apply_canvas_transform(canvas: &mut dyn Canvas, t: &PixelTransform) {
    canvas.translate(t.x, t.y);
    canvas.translate(t.w / 2.0, t.h / 2.0);
    if t.rotation_rad != 0.0 {
        canvas.rotate(t.rotation_rad);
    }
    canvas.scale(if t.flip_h { -1.0 } else { 1.0 }, if t.flip_v { -1.0 } else { 1.0 });
    canvas.translate(-t.w / 2.0, -t.h / 2.0);
}

fn resolved_transform<R: Read + Seek>(
    ctx: &RenderContext<R>,
    sp: &Node,
    sp_pr: Option<&Node>,
    group: Option<&ShapeTransform>,
) -> Option<ShapeTransform> {
    let own = sp_pr.and_then(|p| ShapeTransform::parse(p.child("xfrm")));
    let base = own.or_else(|| {
        let inherited = resolve_placeholder_sp_pr(ctx, sp)?;
        ShapeTransform::parse(inherited.child("xfrm"))
    })?;
    Some(match group {
        Some(g) => base.map_into_group(g),
        None => base,
    })
}

fn render_shape<R: Read + Seek>(canvas: &mut dyn Canvas, ctx: &RenderContext<R>, sp: &Node, group: Option<&ShapeTransform>) {
    if is_hidden(sp.child("nvSpPr")) {
        return;
    }
    let sp_pr = sp.child("spPr");
    let Some(transform) = resolved_transform(ctx, sp, sp_pr, group) else {
        return;
    };
    let geom_source = sp_pr
        .filter(|p| p.child("prstGeom").is_some() || p.child("custGeom").is_some())
        .or_else(|| resolve_placeholder_sp_pr(ctx, sp));
    let geometry = geom_source.map(parse_geometry).unwrap_or_else(|| Geometry {
        preset: "rect".to_string(),
        adjustments: presets::Adjustments::new(),
        custom: None,
    });

    let pixel = PixelTransform::from_shape(&transform, ctx.scale_x, ctx.scale_y);
    let local_bounds = Rect::new(0.0, 0.0, pixel.w, pixel.h);

    let fill = sp_pr.and_then(|p| fill::parse_fill(p, ctx.theme, None));
    let stroke = sp_pr.and_then(|p| fill::parse_stroke(p.child("ln"), ctx.theme, None, ctx.scale_x));

    canvas.save();
    apply_canvas_transform(canvas, &pixel);

    let path = match &geometry.custom {
        Some(cust) => geometry::parse_custom_geometry(cust, pixel.w, pixel.h),
        None => presets::build(&geometry.preset, pixel.w, pixel.h, &geometry.adjustments),
    };

    if !path.is_empty() {
        match &fill {
            Some(Fill::Solid(c)) => {
                canvas.fill_path(&path, *c);
            }
            Some(Fill::Gradient(g)) => {
                canvas.fill_path_gradient(&path, g, local_bounds);
            }
            Some(Fill::Pattern { fg, .. }) => {
                // Pattern fills fall back to their foreground solid color
                // (a deliberate fidelity gap, not a bug to preserve bit-exactly).
                canvas.fill_path(&path, *fg);
            }
            Some(Fill::Picture { rel_id, src_rect, stretch, fill_rect, tile }) => {
                let picture_fill = Fill::Picture {
                    rel_id: rel_id.clone(),
                    src_rect: src_rect.clone(),
                    stretch: *stretch,
                    fill_rect: fill_rect.clone(),
                    tile: tile.clone(),
                };
                if let Err(e) = ctx.images.render(canvas, ctx.package, ctx.part_path, &picture_fill, local_bounds) {
                    warn!("picture fill failed for {rel_id}: {e}");
                }
            }
            None => {}
        }
        if !path.is_empty() {
            if let Some(stroke) = &stroke {
                canvas.stroke_path(&path, stroke);
            }
        }
    }

    if let Some(tx_body) = sp.child("txBody") {
        let body_pr = tx_body.child("bodyPr");
        let theme_font = &ctx.theme.minor_font;
        // §4.18 step 6: default text color contrasts with the shape's own
        // fill (black/white chosen by `is_dark`), falling back to black
        // when the shape has no fill at all.
        let default_color = match &fill {
            Some(Fill::Solid(c)) if crate::color::is_dark(*c) => Rgba8::WHITE,
            _ => Rgba8::BLACK,
        };
        let body = TextBody::parse_with_default_color(tx_body, body_pr, ctx.theme, None, default_color);
        let text_rect = geometry::text_bounds(&geometry.preset, local_bounds, &geometry.adjustments);
        let laid_out = layout::layout_text(&body, text_rect, (ctx.scale_x + ctx.scale_y) / 2.0, ctx.font_resolver, theme_font);
        draw_layout(canvas, &laid_out);
    }

    if ctx.debug_mode {
        canvas.stroke_path(
            &{
                let mut p = crate::raster::Path::new();
                p.move_to(crate::raster::Point::new(0.0, 0.0));
                p.line_to(crate::raster::Point::new(pixel.w, 0.0));
                p.line_to(crate::raster::Point::new(pixel.w, pixel.h));
                p.line_to(crate::raster::Point::new(0.0, pixel.h));
                p.close();
                p
            },
            &crate::raster::Stroke {
                color: Rgba8::opaque(255, 0, 255),
                width_px: 1.0,
                cap: crate::raster::LineCap::Butt,
                join: crate::raster::LineJoin::Miter,
                dash: Vec::new(),
            },
        );
    }

    canvas.restore();
}

/// Connection shapes are restricted to `line` geometry and never filled
/// (§4.18).
fn render_connection_shape<R: Read + Seek>(canvas: &mut dyn Canvas, ctx: &RenderContext<R>, cxn: &Node, group: Option<&ShapeTransform>) {
    if is_hidden(cxn.child("nvCxnSpPr")) {
        return;
    }
    let sp_pr = cxn.child("spPr");
    let Some(own) = sp_pr.and_then(|p| ShapeTransform::parse(p.child("xfrm"))) else {
        return;
    };
    let transform = match group {
        Some(g) => own.map_into_group(g),
        None => own,
    };
    let pixel = PixelTransform::from_shape(&transform, ctx.scale_x, ctx.scale_y);
    let stroke = sp_pr.and_then(|p| fill::parse_stroke(p.child("ln"), ctx.theme, None, ctx.scale_x));

    canvas.save();
    apply_canvas_transform(canvas, &pixel);
    let path = presets::build("line", pixel.w, pixel.h, &presets::Adjustments::new());
    if let Some(stroke) = stroke {
        canvas.stroke_path(&path, &stroke);
    }
    canvas.restore();
}

fn render_picture<R: Read + Seek>(canvas: &mut dyn Canvas, ctx: &RenderContext<R>, pic: &Node, group: Option<&ShapeTransform>) {
    if is_hidden(pic.child("nvPicPr")) {
        return;
    }
    let sp_pr = pic.child("spPr");
    let Some(own) = sp_pr.and_then(|p| ShapeTransform::parse(p.child("xfrm"))) else {
        return;
    };
    let transform = match group {
        Some(g) => own.map_into_group(g),
        None => own,
    };
    let pixel = PixelTransform::from_shape(&transform, ctx.scale_x, ctx.scale_y);
    let dest = Rect::new(pixel.x, pixel.y, pixel.w, pixel.h);

    let Some(fill) = fill::parse_fill(pic, ctx.theme, None) else {
        return;
    };
    canvas.save();
    if pixel.rotation_rad != 0.0 || pixel.flip_h || pixel.flip_v {
        apply_canvas_transform(canvas, &pixel);
        if let Err(e) = ctx.images.render(canvas, ctx.package, ctx.part_path, &fill, Rect::new(0.0, 0.0, pixel.w, pixel.h)) {
            warn!("picture render failed: {e}");
        }
    } else if let Err(e) = ctx.images.render(canvas, ctx.package, ctx.part_path, &fill, dest) {
        warn!("picture render failed: {e}");
    }
    canvas.restore();
}

fn render_group<R: Read + Seek>(canvas: &mut dyn Canvas, ctx: &RenderContext<R>, grp: &Node, group: Option<&ShapeTransform>) {
    if is_hidden(grp.child("nvGrpSpPr")) {
        return;
    }
    let Some(grp_pr) = grp.child("grpSpPr") else { return };
    let Some(own) = ShapeTransform::parse(grp_pr.child("xfrm")) else { return };
    let resolved = match group {
        Some(g) => own.map_into_group(g),
        None => own,
    };
    render_shape_tree(canvas, ctx, grp, Some(&resolved));
}

fn frame_pixel_rect<R: Read + Seek>(ctx: &RenderContext<R>, frame: &Node, group: Option<&ShapeTransform>) -> Option<Rect> {
    let own = ShapeTransform::parse(frame.child("xfrm"))?;
    let resolved = match group {
        Some(g) => own.map_into_group(g),
        None => own,
    };
    let pixel = PixelTransform::from_shape(&resolved, ctx.scale_x, ctx.scale_y);
    Some(Rect::new(pixel.x, pixel.y, pixel.w, pixel.h))
}

fn render_graphic_frame<R: Read + Seek>(canvas: &mut dyn Canvas, ctx: &RenderContext<R>, frame: &Node, group: Option<&ShapeTransform>) {
    let Some(bounds) = frame_pixel_rect(ctx, frame, group) else { return };
    let Some(graphic) = frame.child("graphic") else { return };
    let Some(graphic_data) = graphic.child("graphicData") else { return };
    let uri = graphic_data.attr_or("uri", "");

    if uri.ends_with("/chart") {
        let Some(chart_ref) = graphic_data.find_descendant("chart") else { return };
        let Some(rel_id) = chart_ref.attr("id") else { return };
        let chart_part = match ctx.package.resolve_rel(ctx.part_path, rel_id) {
            Ok(p) => p,
            Err(e) => {
                warn!("chart relationship missing: {e}");
                return;
            }
        };
        let chart_xml = match ctx.package.read_xml(&chart_part) {
            Ok(n) => n,
            Err(e) => {
                warn!("chart xml parse failed for {chart_part}: {e}");
                return;
            }
        };
        let Some(chart_space) = (if local_name(&chart_xml.tag) == "chartSpace" { Some(&*chart_xml) } else { chart_xml.find_descendant("chartSpace") }) else {
            return;
        };
        if let Some(model) = crate::chart::parse(chart_space) {
            crate::chart::render(canvas, &model, bounds, ctx.theme, ctx.font_resolver);
        } else {
            warn!("no recognized chart-type element in {chart_part}");
        }
        return;
    }

    if uri.ends_with("/table") {
        let Some(tbl) = graphic_data.child("tbl") else { return };
        table::render(canvas, tbl, bounds, ctx.theme, &ctx.theme.minor_font, ctx.font_resolver);
        return;
    }

    debug!("unsupported graphicData uri, skipping: {uri}");
}

fn render_alternate_content<R: Read + Seek>(canvas: &mut dyn Canvas, ctx: &RenderContext<R>, node: &Node, group: Option<&ShapeTransform>) {
    if let Some(choice) = node.child("Choice") {
        let requires = choice.attr("Requires").unwrap_or("");
        if requires.is_empty() || SUPPORTED_ALTERNATE_CONTENT_PREFIXES.contains(&requires) {
            render_shape_tree(canvas, ctx, choice, group);
            return;
        }
    }
    if let Some(fallback) = node.child("Fallback") {
        render_shape_tree(canvas, ctx, fallback, group);
    }
}

/// Rough strike-through height above the baseline; text runs don't carry
/// their own ascent, so this is a fixed offset rather than a font-relative
/// one.
const STRIKE_RISE_PX: f64 = 6.0;

fn draw_decoration_line(canvas: &mut dyn Canvas, run: &layout::PositionedRun, y: f64) {
    let mut p = crate::raster::Path::new();
    p.move_to(crate::raster::Point::new(run.x, y));
    p.line_to(crate::raster::Point::new(run.x + run.width, y));
    canvas.stroke_path(
        &p,
        &crate::raster::Stroke {
            color: run.color,
            width_px: 1.0,
            cap: crate::raster::LineCap::Butt,
            join: crate::raster::LineJoin::Miter,
            dash: Vec::new(),
        },
    );
}

fn draw_layout(canvas: &mut dyn Canvas, result: &layout::LayoutResult) {
    for run in &result.runs {
        canvas.fill_text(&run.text, run.x, run.y, &run.font, run.color);
        if run.underline {
            draw_decoration_line(canvas, run, run.y + 2.0);
        }
        if run.strike {
            draw_decoration_line(canvas, run, run.y - STRIKE_RISE_PX);
        }
    }
    for bullet in &result.bullets {
        canvas.fill_text(&bullet.text, bullet.x, bullet.y, &bullet.font, bullet.color);
    }
}
