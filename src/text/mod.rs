//! Text parser (C10), shared by the layout engine and bullet formatter.
//!
//! Parses `<p:txBody>`/`<a:txBody>` into paragraphs and runs, merging the
//! list-style → paragraph-properties → run-properties cascade the way
//! DrawingML layers them. Grounded on the text-frame module's paragraph
//! splitting (the same three-level tag set: `a:p`, `a:r`, `a:t`), replacing
//! its raw-XML-slice `Paragraph`/`text()` accessors with a fully parsed,
//! style-resolved structure the layout engine can measure and wrap.

pub mod bullets;
pub mod layout;
pub mod wrap;

use crate::color::{self, Rgba8};
use crate::theme::ResolvedTheme;
use crate::xml::Node;
use bullets::BulletStyle;

/// Paragraph/run spacing is either a percentage of line height or an
/// absolute point value. OOXML encodes the absolute case as a negative
/// integer in the same attribute a positive percentage would use; this
/// type makes the distinction a real variant instead of leaving callers to
/// remember the sign convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Spacing {
    Percent(f64),
    Points(f64),
}

impl Spacing {
    /// Parse an `<a:spcPct val="..">`/`<a:spcPts val="..">` pair, whichever
    /// is present.
    fn parse(node: &Node) -> Option<Self> {
        if let Some(pct) = node.child("spcPct") {
            let val = pct.attr_i64("val")?;
            return Some(Spacing::Percent(val as f64 / 100_000.0));
        }
        if let Some(pts) = node.child("spcPts") {
            let val = pts.attr_i64("val")?;
            return Some(Spacing::Points(val as f64 / 100.0));
        }
        None
    }

    pub fn resolve_pt(&self, base_line_height_pt: f64) -> f64 {
        match self {
            Spacing::Percent(p) => base_line_height_pt * p,
            Spacing::Points(pt) => *pt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
    Justify,
}

impl Align {
    fn parse(val: Option<&str>) -> Self {
        match val {
            Some("ctr") => Align::Center,
            Some("r") => Align::Right,
            // distributed/justifyLow both fall back to left, the renderer
            // doesn't implement inter-word distribution.
            Some("just") => Align::Justify,
            _ => Align::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAnchor {
    Top,
    Middle,
    Bottom,
}

impl VerticalAnchor {
    fn parse(val: Option<&str>) -> Self {
        match val {
            Some("ctr") => VerticalAnchor::Middle,
            Some("b") => VerticalAnchor::Bottom,
            _ => VerticalAnchor::Top,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunProps {
    pub size_pt: f64,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub color: Rgba8,
    pub typeface: String,
}

impl Default for RunProps {
    fn default() -> Self {
        Self {
            size_pt: 18.0,
            bold: false,
            italic: false,
            underline: false,
            strike: false,
            color: Rgba8::BLACK,
            typeface: "+mn-lt".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunKind {
    Text(String),
    /// `<a:br/>` explicit line break.
    LineBreak,
    /// `<a:fld>` field code (slide number, date, …); rendered as its cached
    /// text since the renderer has no live field evaluation.
    Field(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub kind: RunKind,
    pub props: RunProps,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphProps {
    pub align: Align,
    pub level: u32,
    pub line_spacing: Option<Spacing>,
    pub space_before: Option<Spacing>,
    pub space_after: Option<Spacing>,
    pub bullet: BulletStyle,
    pub default_run_props: RunProps,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub props: ParagraphProps,
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn plain_text(&self) -> String {
        self.runs
            .iter()
            .map(|r| match &r.kind {
                RunKind::Text(t) => t.as_str(),
                RunKind::Field(t) => t.as_str(),
                RunKind::LineBreak => "\n",
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBody {
    pub paragraphs: Vec<Paragraph>,
    pub anchor: VerticalAnchor,
    pub inset_left: i64,
    pub inset_top: i64,
    pub inset_right: i64,
    pub inset_bottom: i64,
    pub word_wrap: bool,
    /// `bodyPr@rot`, in degrees. §4.14 step 8: when present, the entire
    /// laid-out block rotates around its own center, independent of the
    /// shape's own `xfrm@rot`.
    pub rotation_deg: f64,
}

/// §4.10: `lIns, tIns, rIns, bIns` all default to 91440 EMU (0.1 inch).
const DEFAULT_INSET: i64 = 91_440;

impl TextBody {
    /// Parse a `<p:txBody>` node, resolving each paragraph's run properties
    /// against its paragraph-level defaults and the theme (for scheme
    /// color runs and font-scheme tokens).
    pub fn parse(tx_body: &Node, body_pr: Option<&Node>, theme: &ResolvedTheme, ph_clr: Option<Rgba8>) -> Self {
        Self::parse_with_default_color(tx_body, body_pr, theme, ph_clr, Rgba8::BLACK)
    }

    /// Like [`Self::parse`], but seeds the base run-property color with
    /// `default_color` instead of black. §4.18 step 6 wants runs with no
    /// explicit or inherited color to fall back to whichever of black/white
    /// contrasts with the shape's own fill, per `color::is_dark`.
    pub fn parse_with_default_color(
        tx_body: &Node,
        body_pr: Option<&Node>,
        theme: &ResolvedTheme,
        ph_clr: Option<Rgba8>,
        default_color: Rgba8,
    ) -> Self {
        let (anchor, inset_left, inset_top, inset_right, inset_bottom, word_wrap, rotation_deg) = body_pr
            .map(|pr| {
                (
                    VerticalAnchor::parse(pr.attr("anchor")),
                    pr.attr_i64("lIns").unwrap_or(DEFAULT_INSET),
                    pr.attr_i64("tIns").unwrap_or(DEFAULT_INSET),
                    pr.attr_i64("rIns").unwrap_or(DEFAULT_INSET),
                    pr.attr_i64("bIns").unwrap_or(DEFAULT_INSET),
                    pr.attr("wrap") != Some("none"),
                    pr.attr_i64("rot").map(crate::units::angle_units_to_degrees).unwrap_or(0.0),
                )
            })
            .unwrap_or((
                VerticalAnchor::Top,
                DEFAULT_INSET,
                DEFAULT_INSET,
                DEFAULT_INSET,
                DEFAULT_INSET,
                true,
                0.0,
            ));

        let paragraphs = tx_body
            .children("p")
            .map(|p| parse_paragraph(p, theme, ph_clr, default_color))
            .collect();

        Self {
            paragraphs,
            anchor,
            inset_left,
            inset_top,
            inset_right,
            inset_bottom,
            rotation_deg,
            word_wrap,
        }
    }
}

fn parse_paragraph(p: &Node, theme: &ResolvedTheme, ph_clr: Option<Rgba8>, default_color: Rgba8) -> Paragraph {
    let ppr = p.child("pPr");
    let level = ppr.and_then(|n| n.attr_i64("lvl")).unwrap_or(0) as u32;
    let align = Align::parse(ppr.and_then(|n| n.attr("algn")));
    let line_spacing = ppr.and_then(|n| n.child("lnSpc")).and_then(Spacing::parse);
    let space_before = ppr.and_then(|n| n.child("spcBef")).and_then(Spacing::parse);
    let space_after = ppr.and_then(|n| n.child("spcAft")).and_then(Spacing::parse);
    let bullet = ppr.map(BulletStyle::parse).unwrap_or(BulletStyle::Inherit);

    let base = RunProps { color: default_color, ..RunProps::default() };
    let default_run_props = ppr
        .and_then(|n| n.child("defRPr"))
        .map(|rpr| parse_run_props(rpr, theme, ph_clr, &base))
        .unwrap_or(base);

    let props = ParagraphProps {
        align,
        level,
        line_spacing,
        space_before,
        space_after,
        bullet,
        default_run_props: default_run_props.clone(),
    };

    let mut runs = Vec::new();
    for child in &p.children {
        match crate::xml::local_name(&child.tag) {
            "r" => {
                let rpr = child.child("rPr");
                let props = rpr
                    .map(|n| parse_run_props(n, theme, ph_clr, &default_run_props))
                    .unwrap_or_else(|| default_run_props.clone());
                let text = child.child("t").map(|t| t.all_text()).unwrap_or_default();
                runs.push(Run { kind: RunKind::Text(text), props });
            }
            "br" => {
                runs.push(Run { kind: RunKind::LineBreak, props: default_run_props.clone() });
            }
            "fld" => {
                let rpr = child.child("rPr");
                let props = rpr
                    .map(|n| parse_run_props(n, theme, ph_clr, &default_run_props))
                    .unwrap_or_else(|| default_run_props.clone());
                let text = child.child("t").map(|t| t.all_text()).unwrap_or_default();
                runs.push(Run { kind: RunKind::Field(text), props });
            }
            _ => {}
        }
    }

    Paragraph { props, runs }
}

fn parse_run_props(rpr: &Node, theme: &ResolvedTheme, ph_clr: Option<Rgba8>, inherited: &RunProps) -> RunProps {
    let size_pt = rpr
        .attr_i64("sz")
        .map(|v| v as f64 / 100.0)
        .unwrap_or(inherited.size_pt);
    let bold = rpr.attr("b").map(|v| v == "1").unwrap_or(inherited.bold);
    let italic = rpr.attr("i").map(|v| v == "1").unwrap_or(inherited.italic);
    let underline = rpr.attr("u").map(|v| v != "none").unwrap_or(inherited.underline);
    let strike = rpr.attr("strike").map(|v| v != "noStrike").unwrap_or(inherited.strike);

    let resolve = |name: &str| -> Option<Rgba8> {
        if name == "phClr" { ph_clr } else { theme.colors.get(name).copied() }
    };
    let color = rpr
        .child("solidFill")
        .and_then(|n| color::resolve_color_node(n, resolve))
        .map(|(c, t)| color::apply_transforms(c, &t))
        .unwrap_or(inherited.color);

    let typeface = rpr
        .child("latin")
        .and_then(|n| n.attr("typeface"))
        .filter(|s| !s.is_empty())
        .unwrap_or(&inherited.typeface)
        .to_string();

    RunProps { size_pt, bold, italic, underline, strike, color, typeface }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn parses_paragraphs_and_runs_with_inherited_size() {
        let theme = ResolvedTheme::office_default();
        let node = xml::parse(
            r#"<p:txBody>
                <a:p>
                    <a:pPr><a:defRPr sz="2400"/></a:pPr>
                    <a:r><a:t>Hello</a:t></a:r>
                    <a:r><a:rPr sz="1200" b="1"/><a:t>World</a:t></a:r>
                </a:p>
            </p:txBody>"#,
        )
        .unwrap();
        let body = TextBody::parse(&node, None, &theme, None);
        assert_eq!(body.paragraphs.len(), 1);
        let runs = &body.paragraphs[0].runs;
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].props.size_pt, 24.0);
        assert_eq!(runs[1].props.size_pt, 12.0);
        assert!(runs[1].props.bold);
    }

    #[test]
    fn body_properties_fall_back_to_default_insets() {
        let theme = ResolvedTheme::office_default();
        let node = xml::parse(r#"<p:txBody><a:p/></p:txBody>"#).unwrap();
        let body = TextBody::parse(&node, None, &theme, None);
        assert_eq!(body.inset_left, DEFAULT_INSET);
        assert_eq!(body.inset_top, DEFAULT_INSET);
        assert_eq!(body.anchor, VerticalAnchor::Top);
    }

    #[test]
    fn explicit_line_break_becomes_its_own_run() {
        let theme = ResolvedTheme::office_default();
        let node = xml::parse(r#"<p:txBody><a:p><a:r><a:t>a</a:t></a:r><a:br/><a:r><a:t>b</a:t></a:r></a:p></p:txBody>"#).unwrap();
        let body = TextBody::parse(&node, None, &theme, None);
        assert_eq!(body.paragraphs[0].runs.len(), 3);
        assert_eq!(body.paragraphs[0].runs[1].kind, RunKind::LineBreak);
    }
}
