//! Presentation entry point.
//!
//! The thin orchestration layer §1 calls out as outside the core five
//! subsystems: open the package, resolve the slide list and each slide's
//! layout→master→theme ancestry via the relationship graph (C3), and drive
//! the slide pipeline (C19) for one or every slide. `RenderOptions` is the
//! crate's only configuration surface, a plain `serde`-(de)serializable
//! struct matching the grounding library's own metadata records.

use crate::color::Rgba8;
use crate::error::{RenderError, Result};
use crate::opc::Package;
use crate::raster::Canvas;
use crate::slide::{self, SlideChain};
use crate::theme::ResolvedTheme;
use crate::units;
use crate::xml::{local_name, Node};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::rc::Rc;

/// Standard 4:3 slide size, the documented default when `p:sldSz` is
/// absent.
pub const DEFAULT_SLIDE_WIDTH_EMU: i64 = 9_144_000;
pub const DEFAULT_SLIDE_HEIGHT_EMU: i64 = 6_858_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Silent,
}

/// PNG post-optimization is an external collaborator (§1's Non-goals); this
/// enum exists only so `RenderOptions` round-trips a caller's saved config
/// faithfully, exactly as `log_level` does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngOptimization {
    None,
    Fast,
    Balanced,
    Maximum,
    Web,
    Custom {
        compression_level: Option<u8>,
        adaptive_filtering: Option<bool>,
        palette: Option<bool>,
        colors: Option<u16>,
        quality: Option<u8>,
        dither: Option<bool>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOptions {
    pub width: u32,
    pub height: Option<u32>,
    pub format: ImageFormat,
    pub jpeg_quality: u8,
    pub background_color: Option<Rgba8>,
    pub log_level: LogLevel,
    pub debug_mode: bool,
    pub png_optimization: PngOptimization,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1920,
            height: None,
            format: ImageFormat::Png,
            jpeg_quality: 90,
            background_color: None,
            log_level: LogLevel::Warn,
            debug_mode: false,
            png_optimization: PngOptimization::None,
        }
    }
}

/// One slide's outcome, always produced — a failed slide downgrades to
/// `success=false` rather than aborting the deck (§7).
#[derive(Debug, Clone)]
pub struct SlideResult {
    pub index: usize,
    pub width_px: u32,
    pub height_px: u32,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PresentationResult {
    pub slides: Vec<SlideResult>,
    pub total: usize,
    pub successful: usize,
    pub all_successful: bool,
}

/// Best-effort document properties from `docProps/core.xml`/`app.xml`.
/// Never consulted by the rendering pipeline itself; absence of either part
/// is not an error.
#[derive(Debug, Clone, Default)]
pub struct PresentationMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub slide_count_hint: Option<usize>,
}

struct SlideEntry {
    rel_id: String,
}

pub struct Presentation<R: Read + Seek> {
    package: Package<R>,
    presentation_path: String,
    slide_entries: Vec<SlideEntry>,
    pub width_emu: i64,
    pub height_emu: i64,
}

impl Presentation<BufReader<File>> {
    /// Open a PPTX from a filesystem path. Archive-open and presentation-
    /// structure failures are fatal, per §7's propagation policy.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::from_package(Package::open(path)?)
    }
}

impl Presentation<Cursor<Vec<u8>>> {
    /// Open a PPTX already held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_package(Package::from_bytes(bytes)?)
    }
}

impl<R: Read + Seek> Presentation<R> {
    fn from_package(package: Package<R>) -> Result<Self> {
        let presentation_path = package.find_presentation()?;
        let root = package.read_xml(&presentation_path)?;
        let presentation_node = if local_name(&root.tag) == "presentation" {
            &*root
        } else {
            root.find_descendant("presentation")
                .ok_or_else(|| RenderError::InvalidPresentation("no p:presentation element".to_string()))?
        };

        let (width_emu, height_emu) = presentation_node
            .child("sldSz")
            .map(|n| {
                (
                    n.attr_i64("cx").unwrap_or(DEFAULT_SLIDE_WIDTH_EMU),
                    n.attr_i64("cy").unwrap_or(DEFAULT_SLIDE_HEIGHT_EMU),
                )
            })
            .unwrap_or((DEFAULT_SLIDE_WIDTH_EMU, DEFAULT_SLIDE_HEIGHT_EMU));

        let slide_entries = presentation_node
            .child("sldIdLst")
            .map(|lst| {
                lst.children("sldId")
                    .filter_map(|sld_id| exact_attr(sld_id, "r:id"))
                    .map(|rid| SlideEntry { rel_id: rid.to_string() })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { package, presentation_path, slide_entries, width_emu, height_emu })
    }

    pub fn slide_count(&self) -> usize {
        self.slide_entries.len()
    }

    /// The pixel size a canvas for this deck's slides should be allocated
    /// at, for a given set of render options. Every slide in a deck shares
    /// one `p:sldSz`, so this is constant across the whole presentation.
    pub fn target_dimensions(&self, options: &RenderOptions) -> (u32, u32) {
        let (_, _, w, h) = units::calc_scale(self.width_emu, self.height_emu, options.width, options.height);
        (w, h)
    }

    fn slide_path(&self, index: usize) -> Result<String> {
        let entry = self
            .slide_entries
            .get(index)
            .ok_or(RenderError::InvalidSlideIndex { index, count: self.slide_entries.len() })?;
        self.package.resolve_rel(&self.presentation_path, &entry.rel_id)
    }

    /// Find the first relationship of `part_path` whose type suffix-matches
    /// `type_suffix` and return its parsed XML plus member path. Missing
    /// `.rels`, a missing relationship of that type, or an unreadable
    /// target are all logged and treated as "not found" rather than
    /// propagated, per §7's "MemberNotFound during layout/master/theme
    /// resolution → warn, substitute defaults" rule.
    fn find_related_part(&self, part_path: &str, type_suffix: &str) -> Option<(Rc<Node>, String)> {
        let rels = match self.package.rels_for(part_path) {
            Ok(r) => r,
            Err(e) => {
                warn!("failed to read relationships for {part_path}: {e}");
                return None;
            }
        };
        let rel = rels.find_by_type_suffix(type_suffix).next()?;
        let target_path = match self.package.resolve_rel(part_path, &rel.id) {
            Ok(p) => p,
            Err(e) => {
                warn!("relationship {type_suffix} from {part_path} unresolvable: {e}");
                return None;
            }
        };
        match self.package.read_xml(&target_path) {
            Ok(node) => Some((node, target_path)),
            Err(e) => {
                warn!("failed to read {target_path}: {e}");
                None
            }
        }
    }

    /// Layout → master → theme ancestry for one slide. Never errors: any
    /// missing link in the chain substitutes `None`/the Office default
    /// theme and is logged, matching the "substitute defaults, keep
    /// rendering" boundary behavior.
    fn resolve_chain(&self, slide_path: &str) -> (Option<Rc<Node>>, Option<String>, Option<Rc<Node>>, Option<String>, ResolvedTheme) {
        let layout = self.find_related_part(slide_path, "/slideLayout");
        let (layout_node, layout_path) = match layout {
            Some((node, path)) => (Some(node), Some(path)),
            None => (None, None),
        };

        let master = layout_path.as_deref().and_then(|lp| self.find_related_part(lp, "/slideMaster"));
        let (master_node, master_path) = match master {
            Some((node, path)) => (Some(node), Some(path)),
            None => (None, None),
        };

        let theme = master_path.as_deref().and_then(|mp| self.find_related_part(mp, "/theme"));
        let resolved_theme = match theme {
            Some((node, _)) => ResolvedTheme::parse(&node),
            None => {
                warn!("no theme resolved for slide {slide_path}; using Office defaults");
                ResolvedTheme::office_default()
            }
        };

        (layout_node, layout_path, master_node, master_path, resolved_theme)
    }

    fn render_slide_inner(&self, index: usize, canvas: &mut dyn Canvas, options: &RenderOptions) -> Result<slide::SlideOutcome> {
        let slide_path = self.slide_path(index)?;
        let slide_node = self.package.read_xml(&slide_path)?;
        let (layout_node, layout_path, master_node, master_path, theme) = self.resolve_chain(&slide_path);

        let chain = SlideChain {
            slide: &slide_node,
            slide_path: &slide_path,
            layout: layout_node.as_deref(),
            layout_path: layout_path.as_deref(),
            master: master_node.as_deref(),
            master_path: master_path.as_deref(),
            theme: &theme,
        };

        slide::render(canvas, &self.package, &chain, self.width_emu, self.height_emu, options)
    }

    /// Render slide `index` into `canvas`. Always returns a `SlideResult` —
    /// per §7, a per-slide failure (including an out-of-range index) never
    /// aborts the caller's loop over the rest of the deck.
    pub fn render_slide(&self, index: usize, canvas: &mut dyn Canvas, options: &RenderOptions) -> SlideResult {
        match self.render_slide_inner(index, canvas, options) {
            Ok(outcome) => SlideResult {
                index,
                width_px: outcome.width_px,
                height_px: outcome.height_px,
                success: true,
                error: None,
            },
            Err(e) => {
                let (width_px, height_px) = self.target_dimensions(options);
                SlideResult { index, width_px, height_px, success: false, error: Some(e.to_string()) }
            }
        }
    }

    /// Render every slide, one canvas per slide (already allocated by the
    /// caller at `target_dimensions(options)`, since canvas construction is
    /// the concrete-backend's job, not this crate's — see module docs).
    /// Extra canvases beyond `slide_count()` are ignored; fewer than
    /// `slide_count()` renders only as many slides as canvases provided.
    pub fn render_all(&self, canvases: &mut [Box<dyn Canvas>], options: &RenderOptions) -> PresentationResult {
        let slides: Vec<SlideResult> = canvases
            .iter_mut()
            .enumerate()
            .take(self.slide_count())
            .map(|(index, canvas)| self.render_slide(index, canvas.as_mut(), options))
            .collect();

        let total = slides.len();
        let successful = slides.iter().filter(|s| s.success).count();
        PresentationResult { slides, total, successful, all_successful: successful == total }
    }

    /// Best-effort document properties; absence of `docProps/*` is not an
    /// error, matching §6's "no persisted state beyond what the caller
    /// writes" boundary — this crate only ever reads what's already there.
    pub fn metadata(&self) -> PresentationMetadata {
        let mut meta = PresentationMetadata::default();

        if let Ok(core) = self.package.read_xml("/docProps/core.xml") {
            meta.title = text_of(&core, "title");
            meta.author = text_of(&core, "creator");
            meta.created = text_of(&core, "created").and_then(|s| parse_w3cdtf(&s));
            meta.modified = text_of(&core, "modified").and_then(|s| parse_w3cdtf(&s));
        }
        if let Ok(app) = self.package.read_xml("/docProps/app.xml") {
            meta.slide_count_hint = app.child("Slides").map(|n| n.all_text()).and_then(|s| s.parse().ok());
        }

        meta
    }
}

fn exact_attr<'a>(node: &'a Node, key: &str) -> Option<&'a str> {
    node.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

fn text_of(node: &Node, tag: &str) -> Option<String> {
    node.child(tag).map(|n| n.all_text()).filter(|s| !s.is_empty())
}

fn parse_w3cdtf(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn minimal_deck() -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut w = zip::ZipWriter::new(Cursor::new(&mut buf));
            let opts = SimpleFileOptions::default();

            w.start_file("_rels/.rels", opts).unwrap();
            w.write_all(br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#).unwrap();

            w.start_file("ppt/presentation.xml", opts).unwrap();
            w.write_all(br#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldSz cx="9144000" cy="6858000"/><p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst></p:presentation>"#).unwrap();

            w.start_file("ppt/_rels/presentation.xml.rels", opts).unwrap();
            w.write_all(br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/></Relationships>"#).unwrap();

            w.start_file("ppt/slides/slide1.xml", opts).unwrap();
            w.write_all(br#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree><p:sp><p:spPr><a:xfrm><a:off x="914400" y="914400"/><a:ext cx="3000000" cy="1000000"/></a:xfrm><a:prstGeom prst="rect"/><a:solidFill><a:srgbClr val="FF0000"/></a:solidFill></p:spPr></p:sp></p:spTree></p:cSld></p:sld>"#).unwrap();

            w.finish().unwrap();
        }
        buf
    }

    #[test]
    fn opens_and_reads_slide_size_and_count() {
        let pres = Presentation::from_bytes(minimal_deck()).unwrap();
        assert_eq!(pres.slide_count(), 1);
        assert_eq!(pres.width_emu, 9_144_000);
        assert_eq!(pres.height_emu, 6_858_000);
    }

    #[test]
    fn invalid_slide_index_is_a_slide_result_not_a_panic() {
        let pres = Presentation::from_bytes(minimal_deck()).unwrap();
        struct NullCanvas;
        impl Canvas for NullCanvas {
            fn save(&mut self) {}
            fn restore(&mut self) {}
            fn translate(&mut self, _dx: f64, _dy: f64) {}
            fn rotate(&mut self, _r: f64) {}
            fn scale(&mut self, _sx: f64, _sy: f64) {}
            fn fill_path(&mut self, _p: &crate::raster::Path, _c: Rgba8) {}
            fn fill_path_gradient(&mut self, _p: &crate::raster::Path, _g: &crate::fill::Gradient, _b: crate::raster::Rect) {}
            fn stroke_path(&mut self, _p: &crate::raster::Path, _s: &crate::raster::Stroke) {}
            fn fill_rect(&mut self, _r: crate::raster::Rect, _c: Rgba8) {}
            fn draw_image(&mut self, _rgba: &[u8], _w: u32, _h: u32, _dest: crate::raster::Rect) {}
            fn measure_text(&mut self, _font: &str, _text: &str) -> crate::raster::TextMetrics {
                crate::raster::TextMetrics::default()
            }
            fn fill_text(&mut self, _text: &str, _x: f64, _y: f64, _font: &str, _color: Rgba8) {}
            fn clip_rect(&mut self, _r: crate::raster::Rect) {}
        }
        let mut canvas = NullCanvas;
        let result = pres.render_slide(5, &mut canvas, &RenderOptions::default());
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn metadata_is_absent_without_error_when_docprops_missing() {
        let pres = Presentation::from_bytes(minimal_deck()).unwrap();
        let meta = pres.metadata();
        assert!(meta.title.is_none());
        assert!(meta.slide_count_hint.is_none());
    }
}
