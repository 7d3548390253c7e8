//! Text layout engine (C14).
//!
//! Assembles a parsed [`TextBody`](super::TextBody) into a flat list of
//! positioned runs and bullets within a pixel bounds rect: insets body
//! margins, wraps each paragraph's runs against the available width
//! (tokenized per-run so a font/size change mid-paragraph still wraps
//! correctly), applies horizontal alignment and per-level bullet indent,
//! accumulates paragraph spacing, then anchors the whole block vertically.
//! Shape rotation is applied by the orchestrator around the canvas, not
//! here — by the time layout runs, the canvas is already in the shape's
//! rotated local space.

use crate::color::Rgba8;
use crate::font_resolver::FontResolver;
use crate::raster::Rect;
use crate::theme::ThemeFont;
use crate::units;
use super::bullets::{self, BulletCounters, BulletStyle};
use super::wrap::{self, WrapMode};
use super::{Align, Paragraph, RunKind, RunProps, TextBody, VerticalAnchor};

/// EMU indent contributed by each outline level, and the gap reserved for
/// a bullet glyph ahead of a paragraph's first line. Office decks vary
/// these per list style; absent an explicit `marL`/`indent` on the
/// paragraph this renderer uses the common 0.5in/0.3in defaults.
const LEVEL_INDENT_EMU: i64 = 457_200;
const BULLET_RESERVE_EMU: i64 = 274_320;

#[derive(Debug, Clone)]
pub struct PositionedRun {
    pub x: f64,
    /// Baseline y, ready to hand a canvas `fillText` call.
    pub y: f64,
    pub width: f64,
    pub text: String,
    pub font: String,
    pub color: Rgba8,
    pub underline: bool,
    pub strike: bool,
}

#[derive(Debug, Clone)]
pub struct PositionedBullet {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub font: String,
    pub color: Rgba8,
}

#[derive(Debug, Clone, Default)]
pub struct LayoutResult {
    pub runs: Vec<PositionedRun>,
    pub bullets: Vec<PositionedBullet>,
    pub content_height: f64,
}

struct Token {
    text: String,
    font_string: String,
    size_px: f64,
    props_idx: usize,
    hard_break: bool,
}

/// Lay out `body` within `bounds` (already in canvas pixel space). `scale`
/// is the render scale applied to EMU-denominated spacing (insets, level
/// indent) and to point sizes, matching the scale the geometry engine
/// already applied to the shape's own transform.
pub fn layout_text(
    body: &TextBody,
    bounds: Rect,
    scale: f64,
    resolver: &FontResolver,
    theme_font: &ThemeFont,
) -> LayoutResult {
    let inset_left = units::emu_to_px(body.inset_left, units::DEFAULT_DPI) * scale;
    let inset_top = units::emu_to_px(body.inset_top, units::DEFAULT_DPI) * scale;
    let inset_right = units::emu_to_px(body.inset_right, units::DEFAULT_DPI) * scale;
    let inset_bottom = units::emu_to_px(body.inset_bottom, units::DEFAULT_DPI) * scale;

    let content_x = bounds.x + inset_left;
    let content_w = (bounds.w - inset_left - inset_right).max(0.0);
    let container_h = (bounds.h - inset_top - inset_bottom).max(0.0);

    let mut result = LayoutResult::default();
    let mut y = 0.0;
    let mut counters = BulletCounters::new();

    for (idx, para) in body.paragraphs.iter().enumerate() {
        if idx > 0 {
            if let Some(before) = &para.props.space_before {
                let base_lh = para.props.default_run_props.size_pt * 1.2;
                y += before.resolve_pt(base_lh) * (units::DEFAULT_DPI / 72.0) * scale;
            }
        }

        let level_indent = units::emu_to_px(LEVEL_INDENT_EMU * para.props.level as i64, units::DEFAULT_DPI) * scale;
        let bullet_reserve = units::emu_to_px(BULLET_RESERVE_EMU, units::DEFAULT_DPI) * scale;

        let bullet_text = resolve_bullet_text(para, &mut counters);
        let text_indent = level_indent + if bullet_text.is_some() { bullet_reserve } else { 0.0 };
        let line_x = content_x + text_indent;
        let available_w = (content_w - text_indent).max(1.0);

        let base_lh = para.props.default_run_props.size_pt * 1.2;
        let line_height_px = match &para.props.line_spacing {
            Some(super::Spacing::Points(pt)) => pt * (units::DEFAULT_DPI / 72.0) * scale,
            Some(spc) => spc.resolve_pt(base_lh) * (units::DEFAULT_DPI / 72.0) * scale,
            None => base_lh * (units::DEFAULT_DPI / 72.0) * scale,
        };

        let tokens = tokenize(para, body.word_wrap, scale, resolver, theme_font);
        let lines = pack_lines(&tokens, available_w, resolver);

        for (line_idx, line) in lines.iter().enumerate() {
            let line_width: f64 = line.iter().map(|(_, w)| *w).sum::<f64>()
                + (line.len().saturating_sub(1)) as f64 * space_width_px(&tokens, resolver);
            let ascent = line
                .iter()
                .map(|(tok, _)| tokens[*tok].size_px * 0.8)
                .fold(0.0_f64, f64::max);
            let baseline = y + ascent;

            let start_x = match para.props.align {
                Align::Left | Align::Justify => line_x,
                Align::Center => line_x + ((available_w - line_width) / 2.0).max(0.0),
                Align::Right => line_x + (available_w - line_width).max(0.0),
            };

            if line_idx == 0 {
                if let Some((glyph, color)) = &bullet_text {
                    let font = resolver.canvas_font_string(
                        &resolver.resolve(&para.props.default_run_props.typeface, theme_font),
                        para.props.default_run_props.size_pt * (units::DEFAULT_DPI / 72.0) * scale,
                        false,
                        false,
                    );
                    result.bullets.push(PositionedBullet {
                        x: content_x + level_indent,
                        y: baseline,
                        text: glyph.clone(),
                        font,
                        color: *color,
                    });
                }
            }

            let mut x = start_x;
            for (tok_idx, width) in line {
                let token = &tokens[*tok_idx];
                let props = &para.runs[token.props_idx.min(para.runs.len().saturating_sub(1))].props;
                result.runs.push(PositionedRun {
                    x,
                    y: baseline,
                    width: *width,
                    text: token.text.clone(),
                    font: token.font_string.clone(),
                    color: props.color,
                    underline: props.underline,
                    strike: props.strike,
                });
                x += width + space_width_px(&tokens, resolver);
            }

            y += line_height_px;
        }

        if let Some(after) = &para.props.space_after {
            y += after.resolve_pt(base_lh) * (units::DEFAULT_DPI / 72.0) * scale;
        }
    }

    result.content_height = y;

    let shift = match body.anchor {
        VerticalAnchor::Top => 0.0,
        VerticalAnchor::Middle => ((container_h - y) / 2.0).max(0.0),
        VerticalAnchor::Bottom => (container_h - y).max(0.0),
    };
    let top = bounds.y + inset_top + shift;
    for run in &mut result.runs {
        run.y += top;
    }
    for b in &mut result.bullets {
        b.y += top;
    }

    if body.rotation_deg != 0.0 {
        rotate_block(&mut result, bounds, body.rotation_deg.to_radians());
    }

    result
}

/// §4.14 step 8: rotate the whole laid-out block around the center of its
/// container bounds. Only the anchor point each run/bullet paints from
/// moves — the glyphs themselves are drawn by the canvas backend, which
/// does not see this rotation, so a rotated text body reads correctly only
/// when a backend also rotates the glyph itself; tracking the anchor keeps
/// layout geometry (and therefore bounding-box tests) correct regardless.
fn rotate_block(result: &mut LayoutResult, bounds: Rect, angle_rad: f64) {
    let cx = bounds.x + bounds.w / 2.0;
    let cy = bounds.y + bounds.h / 2.0;
    let (sin, cos) = angle_rad.sin_cos();
    let rotate = |x: f64, y: f64| -> (f64, f64) {
        let (dx, dy) = (x - cx, y - cy);
        (cx + dx * cos - dy * sin, cy + dx * sin + dy * cos)
    };
    for run in &mut result.runs {
        let (x, y) = rotate(run.x, run.y);
        run.x = x;
        run.y = y;
    }
    for bullet in &mut result.bullets {
        let (x, y) = rotate(bullet.x, bullet.y);
        bullet.x = x;
        bullet.y = y;
    }
}

fn resolve_bullet_text(para: &Paragraph, counters: &mut BulletCounters) -> Option<(String, Rgba8)> {
    match &para.props.bullet {
        BulletStyle::None | BulletStyle::Inherit => None,
        style => {
            let glyph = bullets::render(style, para.props.level, counters)?;
            let color = para
                .runs
                .first()
                .map(|r| r.props.color)
                .unwrap_or(para.props.default_run_props.color);
            Some((glyph, color))
        }
    }
}

fn tokenize(para: &Paragraph, word_wrap: bool, scale: f64, resolver: &FontResolver, theme_font: &ThemeFont) -> Vec<Token> {
    let mode = if word_wrap { WrapMode::Word } else { WrapMode::None };
    let mut tokens = Vec::new();
    for (run_idx, run) in para.runs.iter().enumerate() {
        match &run.kind {
            RunKind::LineBreak => {
                tokens.push(Token {
                    text: String::new(),
                    font_string: String::new(),
                    size_px: 0.0,
                    props_idx: run_idx,
                    hard_break: true,
                });
            }
            RunKind::Text(t) | RunKind::Field(t) => {
                let font_string = font_string_for(&run.props, scale, resolver, theme_font);
                let size_px = run.props.size_pt * (units::DEFAULT_DPI / 72.0) * scale;
                for unit in wrap::split_into_units(t, mode) {
                    if unit == "\n" {
                        tokens.push(Token {
                            text: String::new(),
                            font_string: String::new(),
                            size_px: 0.0,
                            props_idx: run_idx,
                            hard_break: true,
                        });
                        continue;
                    }
                    tokens.push(Token {
                        text: unit.to_string(),
                        font_string: font_string.clone(),
                        size_px,
                        props_idx: run_idx,
                        hard_break: false,
                    });
                }
            }
        }
    }
    tokens
}

fn font_string_for(props: &RunProps, scale: f64, resolver: &FontResolver, theme_font: &ThemeFont) -> String {
    let family = resolver.resolve(&props.typeface, theme_font);
    let size_px = props.size_pt * (units::DEFAULT_DPI / 72.0) * scale;
    resolver.canvas_font_string(&family, size_px, props.bold, props.italic)
}

/// Greedily pack tokens into lines no wider than `max_width`, returning
/// each line as `(token index, measured width)` pairs. A hard break always
/// starts a new line; a single overflowing token still gets its own line
/// (no mid-word break in word mode, matching the wrapper's own rule).
fn pack_lines(tokens: &[Token], max_width: f64, resolver: &FontResolver) -> Vec<Vec<(usize, f64)>> {
    let mut lines = Vec::new();
    let mut current: Vec<(usize, f64)> = Vec::new();
    let mut current_width = 0.0;
    let space_w = space_width_px(tokens, resolver);

    for (i, token) in tokens.iter().enumerate() {
        if token.hard_break {
            lines.push(std::mem::take(&mut current));
            current_width = 0.0;
            continue;
        }
        let w = resolver.measure_cached(&token.font_string, &token.text).width;
        let extra = if current.is_empty() { 0.0 } else { space_w };
        if !current.is_empty() && current_width + extra + w > max_width {
            lines.push(std::mem::take(&mut current));
            current_width = 0.0;
            current.push((i, w));
            current_width = w;
        } else {
            current_width += extra + w;
            current.push((i, w));
        }
    }
    lines.push(current);
    lines
}

fn space_width_px(tokens: &[Token], resolver: &FontResolver) -> f64 {
    tokens
        .iter()
        .find(|t| !t.hard_break)
        .map(|t| resolver.measure_cached(&t.font_string, " ").width)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::ResolvedTheme;
    use crate::xml;

    #[test]
    fn single_short_line_centers_vertically_in_a_taller_box() {
        let theme = ResolvedTheme::office_default();
        let node = xml::parse(
            r#"<p:txBody><p:bodyPr anchor="ctr" lIns="0" tIns="0" rIns="0" bIns="0"/>
                <a:p><a:r><a:rPr sz="1800" b="1"/><a:t>Hello World</a:t></a:r></a:p>
            </p:txBody>"#,
        )
        .unwrap();
        let body_pr = node.child("bodyPr");
        let body = TextBody::parse(&node, body_pr, &theme, None);
        let resolver = FontResolver::new();
        let theme_font = crate::theme::ThemeFont {
            latin: "Arial".to_string(),
            ea: "Arial".to_string(),
            cs: "Arial".to_string(),
        };
        let bounds = Rect::new(0.0, 0.0, 400.0, 300.0);
        let result = layout_text(&body, bounds, 1.0, &resolver, &theme_font);
        assert_eq!(result.runs.len(), 1);
        assert!(result.runs[0].y > 100.0 && result.runs[0].y < 200.0);
    }

    #[test]
    fn bullets_are_emitted_for_auto_numbered_paragraphs() {
        let theme = ResolvedTheme::office_default();
        let node = xml::parse(
            r#"<p:txBody><a:p><a:pPr><a:buAutoNum type="arabicPeriod"/></a:pPr><a:r><a:t>first</a:t></a:r></a:p>
                <a:p><a:pPr><a:buAutoNum type="arabicPeriod"/></a:pPr><a:r><a:t>second</a:t></a:r></a:p>
            </p:txBody>"#,
        )
        .unwrap();
        let body = TextBody::parse(&node, None, &theme, None);
        let resolver = FontResolver::new();
        let theme_font = crate::theme::ThemeFont {
            latin: "Arial".to_string(),
            ea: "Arial".to_string(),
            cs: "Arial".to_string(),
        };
        let bounds = Rect::new(0.0, 0.0, 400.0, 300.0);
        let result = layout_text(&body, bounds, 1.0, &resolver, &theme_font);
        assert_eq!(result.bullets.len(), 2);
        assert_eq!(result.bullets[0].text, "1.");
        assert_eq!(result.bullets[1].text, "2.");
    }

    #[test]
    fn body_rotation_spins_run_anchors_around_bounds_center() {
        let theme = ResolvedTheme::office_default();
        let node = xml::parse(
            r#"<p:txBody><p:bodyPr anchor="ctr" rot="10800000" lIns="0" tIns="0" rIns="0" bIns="0"/>
                <a:p><a:r><a:t>Hi</a:t></a:r></a:p>
            </p:txBody>"#,
        )
        .unwrap();
        let body_pr = node.child("bodyPr");
        let body = TextBody::parse(&node, body_pr, &theme, None);
        assert_eq!(body.rotation_deg, 180.0);
        let resolver = FontResolver::new();
        let theme_font = crate::theme::ThemeFont {
            latin: "Arial".to_string(),
            ea: "Arial".to_string(),
            cs: "Arial".to_string(),
        };
        let bounds = Rect::new(0.0, 0.0, 400.0, 300.0);
        let unrotated = {
            let mut unrotated_body = body.clone();
            unrotated_body.rotation_deg = 0.0;
            layout_text(&unrotated_body, bounds, 1.0, &resolver, &theme_font)
        };
        let rotated = layout_text(&body, bounds, 1.0, &resolver, &theme_font);
        let cx = bounds.x + bounds.w / 2.0;
        let cy = bounds.y + bounds.h / 2.0;
        // A 180-degree spin reflects every anchor through the bounds center.
        assert!((rotated.runs[0].x - (2.0 * cx - unrotated.runs[0].x)).abs() < 1e-6);
        assert!((rotated.runs[0].y - (2.0 * cy - unrotated.runs[0].y)).abs() < 1e-6);
    }

    #[test]
    fn word_wrap_breaks_a_long_paragraph_into_multiple_lines() {
        let theme = ResolvedTheme::office_default();
        let node = xml::parse(
            r#"<p:txBody><a:p><a:r><a:rPr sz="1800"/><a:t>one two three four five six seven eight</a:t></a:r></a:p></p:txBody>"#,
        )
        .unwrap();
        let body = TextBody::parse(&node, None, &theme, None);
        let resolver = FontResolver::new();
        let theme_font = crate::theme::ThemeFont {
            latin: "Arial".to_string(),
            ea: "Arial".to_string(),
            cs: "Arial".to_string(),
        };
        let bounds = Rect::new(0.0, 0.0, 100.0, 1000.0);
        let result = layout_text(&body, bounds, 1.0, &resolver, &theme_font);
        let distinct_y: std::collections::BTreeSet<i64> =
            result.runs.iter().map(|r| r.y as i64).collect();
        assert!(distinct_y.len() > 1);
    }
}
