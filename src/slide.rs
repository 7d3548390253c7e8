//! Slide pipeline (C19).
//!
//! Computes a slide's target pixel size, resolves its background against
//! the slide→layout→master chain, instantiates the per-slide image/font
//! plumbing (C15/C11), and walks `p:cSld/p:spTree` through the shape
//! orchestrator (C18). The concrete canvas a caller paints onto, and the
//! PNG/JPEG encoding of the result, sit outside this crate's core per §1 —
//! this module only ever talks to the abstract `Canvas` sink (C8) and hands
//! back the pixel dimensions it computed.

use crate::error::Result;
use crate::fill::Fill;
use crate::font_resolver::FontResolver;
use crate::opc::Package;
use crate::picture::ImageEngine;
use crate::presentation::RenderOptions;
use crate::raster::{Canvas, Path, Point, Rect};
use crate::shape::{self, RenderContext};
use crate::theme::ResolvedTheme;
use crate::units;
use crate::xml::Node;
use log::warn;
use std::io::{Read, Seek};

/// The resolved slide→layout→master ancestry a single slide renders
/// against. Layout and master are both optional: a slide may have no
/// layout relationship, and (rarely, but the renderer must not choke on it)
/// a layout may have no master.
pub struct SlideChain<'a> {
    pub slide: &'a Node,
    pub slide_path: &'a str,
    pub layout: Option<&'a Node>,
    pub layout_path: Option<&'a str>,
    pub master: Option<&'a Node>,
    pub master_path: Option<&'a str>,
    pub theme: &'a ResolvedTheme,
}

/// What the pipeline actually produced, once painted onto the caller's
/// canvas.
#[derive(Debug, Clone, Copy)]
pub struct SlideOutcome {
    pub width_px: u32,
    pub height_px: u32,
}

enum BackgroundFill {
    NoFill,
    Fill(Fill),
}

struct ResolvedBackground {
    fill: BackgroundFill,
    /// The part the background's relationship ids (picture fills) resolve
    /// against — whichever of slide/layout/master actually carried the
    /// `p:bg` element, per §4.19's "track which source level contributed"
    /// rule.
    source_part: String,
}

/// Render one slide into `canvas`. `slide_w_emu`/`slide_h_emu` come from the
/// presentation's `p:sldSz` (shared by every slide in the deck).
pub fn render<R: Read + Seek>(
    canvas: &mut dyn Canvas,
    package: &Package<R>,
    chain: &SlideChain,
    slide_w_emu: i64,
    slide_h_emu: i64,
    options: &RenderOptions,
) -> Result<SlideOutcome> {
    let (scale_x, scale_y, width_px, height_px) =
        units::calc_scale(slide_w_emu, slide_h_emu, options.width, options.height);

    let images = ImageEngine::new();
    let background = resolve_background(chain);
    paint_background(canvas, package, &images, background.as_ref(), width_px, height_px, options);

    let font_resolver = FontResolver::new();
    let ctx = RenderContext {
        package,
        part_path: chain.slide_path,
        theme: chain.theme,
        font_resolver: &font_resolver,
        images: &images,
        scale_x,
        scale_y,
        layout_tree: chain.layout,
        master_tree: chain.master,
        debug_mode: options.debug_mode,
    };

    let sp_tree = chain
        .slide
        .find_descendant("cSld")
        .and_then(|c_sld| c_sld.child("spTree"));
    if let Some(sp_tree) = sp_tree {
        shape::render_shape_tree(canvas, &ctx, sp_tree, None);
    } else {
        warn!("slide {} has no p:cSld/p:spTree; rendering background only", chain.slide_path);
    }

    Ok(SlideOutcome { width_px, height_px })
}

/// Find `p:cSld/p:bg`, if present, on a single ancestor part.
fn find_bg(node: &Node) -> Option<&Node> {
    node.find_descendant("cSld")?.child("bg")
}

/// Resolve the background per §4.19: slide first, then layout, then
/// master; the first ancestor actually carrying a `p:bg` element wins,
/// whether its fill resolves to paint or to an explicit `noFill`.
fn resolve_background(chain: &SlideChain) -> Option<ResolvedBackground> {
    let candidates: [(Option<&Node>, Option<&str>); 3] = [
        (Some(chain.slide), Some(chain.slide_path)),
        (chain.layout, chain.layout_path),
        (chain.master, chain.master_path),
    ];

    for (node, part_path) in candidates {
        let Some(node) = node else { continue };
        let Some(bg) = find_bg(node) else { continue };
        let source_part = part_path.unwrap_or(chain.slide_path).to_string();

        if let Some(bg_pr) = bg.child("bgPr") {
            if bg_pr.child("noFill").is_some() {
                return Some(ResolvedBackground { fill: BackgroundFill::NoFill, source_part });
            }
            if let Some(fill) = crate::fill::parse_fill(bg_pr, chain.theme, None) {
                return Some(ResolvedBackground { fill: BackgroundFill::Fill(fill), source_part });
            }
        }

        if let Some(bg_ref) = bg.child("bgRef") {
            if let Some(color) = resolve_bg_ref(bg_ref, chain.theme) {
                return Some(ResolvedBackground { fill: BackgroundFill::Fill(Fill::Solid(color)), source_part });
            }
        }
    }
    None
}

/// `p:bgRef@idx` selects a background fill style from the theme's
/// `bgFillStyleLst` (1-based); an explicit color child overrides the
/// style's placeholder color, the same `phClr`-substitution convention
/// every other style-reference element in OOXML uses.
fn resolve_bg_ref(bg_ref: &Node, theme: &ResolvedTheme) -> Option<crate::color::Rgba8> {
    let resolve = |name: &str| theme.colors.get(name).copied();
    if let Some((base, transform)) = crate::color::resolve_color_node(bg_ref, resolve) {
        return Some(crate::color::apply_transforms(base, &transform));
    }
    let idx = bg_ref.attr_i64("idx")? as usize;
    idx.checked_sub(1).and_then(|i| theme.bg_fill_colors.get(i)).copied()
}

fn rect_path(rect: Rect) -> Path {
    let mut path = Path::new();
    path.move_to(Point::new(rect.x, rect.y))
        .line_to(Point::new(rect.x + rect.w, rect.y))
        .line_to(Point::new(rect.x + rect.w, rect.y + rect.h))
        .line_to(Point::new(rect.x, rect.y + rect.h))
        .close();
    path
}

fn paint_background<R: Read + Seek>(
    canvas: &mut dyn Canvas,
    package: &Package<R>,
    images: &ImageEngine,
    background: Option<&ResolvedBackground>,
    width_px: u32,
    height_px: u32,
    options: &RenderOptions,
) {
    let full = Rect::new(0.0, 0.0, width_px as f64, height_px as f64);

    // An explicit override always wins, regardless of what the deck itself
    // declares (§6's `backgroundColor` render option).
    if let Some(color) = options.background_color {
        canvas.fill_rect(full, color);
        return;
    }

    let Some(bg) = background else {
        // No `p:bg` anywhere in the chain: white, per §8's documented
        // boundary behavior.
        canvas.fill_rect(full, crate::color::Rgba8::WHITE);
        return;
    };

    match &bg.fill {
        BackgroundFill::NoFill => {}
        BackgroundFill::Fill(Fill::Solid(c)) => canvas.fill_rect(full, *c),
        BackgroundFill::Fill(Fill::Gradient(g)) => canvas.fill_path_gradient(&rect_path(full), g, full),
        BackgroundFill::Fill(Fill::Pattern { fg, .. }) => canvas.fill_rect(full, *fg),
        BackgroundFill::Fill(fill @ Fill::Picture { rel_id, .. }) => {
            if let Err(e) = images.render(canvas, package, &bg.source_part, fill, full) {
                warn!("background picture failed for {rel_id} against {}: {e}; using white", bg.source_part);
                canvas.fill_rect(full, crate::color::Rgba8::WHITE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::ResolvedTheme;
    use crate::xml;

    #[test]
    fn missing_bg_anywhere_in_chain_resolves_to_none() {
        let slide = xml::parse(r#"<p:sld><p:cSld><p:spTree/></p:cSld></p:sld>"#).unwrap();
        let theme = ResolvedTheme::office_default();
        let chain = SlideChain {
            slide: &slide,
            slide_path: "/ppt/slides/slide1.xml",
            layout: None,
            layout_path: None,
            master: None,
            master_path: None,
            theme: &theme,
        };
        assert!(resolve_background(&chain).is_none());
    }

    #[test]
    fn slide_level_bg_wins_over_layout() {
        let slide = xml::parse(
            r#"<p:sld><p:cSld><p:bg><p:bgPr><a:solidFill><a:srgbClr val="FF0000"/></a:solidFill></p:bgPr></p:bg><p:spTree/></p:cSld></p:sld>"#,
        )
        .unwrap();
        let layout = xml::parse(
            r#"<p:sldLayout><p:cSld><p:bg><p:bgPr><a:solidFill><a:srgbClr val="00FF00"/></a:solidFill></p:bgPr></p:bg></p:cSld></p:sldLayout>"#,
        )
        .unwrap();
        let theme = ResolvedTheme::office_default();
        let chain = SlideChain {
            slide: &slide,
            slide_path: "/ppt/slides/slide1.xml",
            layout: Some(&layout),
            layout_path: Some("/ppt/slideLayouts/slideLayout1.xml"),
            master: None,
            master_path: None,
            theme: &theme,
        };
        let bg = resolve_background(&chain).unwrap();
        assert_eq!(bg.source_part, "/ppt/slides/slide1.xml");
        match bg.fill {
            BackgroundFill::Fill(Fill::Solid(c)) => assert_eq!(c, crate::color::Rgba8::from_hex("FF0000").unwrap()),
            _ => panic!("expected solid red"),
        }
    }

    #[test]
    fn falls_through_to_layout_when_slide_has_no_bg() {
        let slide = xml::parse(r#"<p:sld><p:cSld><p:spTree/></p:cSld></p:sld>"#).unwrap();
        let layout = xml::parse(
            r#"<p:sldLayout><p:cSld><p:bg><p:bgPr><a:noFill/></p:bgPr></p:bg></p:cSld></p:sldLayout>"#,
        )
        .unwrap();
        let theme = ResolvedTheme::office_default();
        let chain = SlideChain {
            slide: &slide,
            slide_path: "/ppt/slides/slide1.xml",
            layout: Some(&layout),
            layout_path: Some("/ppt/slideLayouts/slideLayout1.xml"),
            master: None,
            master_path: None,
            theme: &theme,
        };
        let bg = resolve_background(&chain).unwrap();
        assert_eq!(bg.source_part, "/ppt/slideLayouts/slideLayout1.xml");
        assert!(matches!(bg.fill, BackgroundFill::NoFill));
    }

    #[test]
    fn bg_ref_resolves_against_theme_fill_list() {
        let slide = xml::parse(r#"<p:sld><p:cSld><p:bg><p:bgRef idx="1"/></p:bg><p:spTree/></p:cSld></p:sld>"#).unwrap();
        let mut theme = ResolvedTheme::office_default();
        theme.bg_fill_colors = vec![crate::color::Rgba8::from_hex("123456").unwrap()];
        let chain = SlideChain {
            slide: &slide,
            slide_path: "/ppt/slides/slide1.xml",
            layout: None,
            layout_path: None,
            master: None,
            master_path: None,
            theme: &theme,
        };
        let bg = resolve_background(&chain).unwrap();
        match bg.fill {
            BackgroundFill::Fill(Fill::Solid(c)) => assert_eq!(c, crate::color::Rgba8::from_hex("123456").unwrap()),
            _ => panic!("expected solid fill from bg_fill_colors"),
        }
    }
}
