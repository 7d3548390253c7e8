//! XML parser (C2).
//!
//! Parses XML text into a single ordered tree (`Node`); a map view — by-tag
//! children lookup and an attribute map — is derived from it on demand,
//! matching the "expose one ordered representation, derive the map view"
//! design noted for this subsystem. Because children are always stored as
//! `Vec<Node>`, singleton-vs-sequence collapsing (the failure mode the
//! always-array tag whitelist guards against upstream) cannot happen here
//! by construction; the whitelist is kept only as a documented set of tags
//! where callers must expect more than one child and iterate accordingly.

pub mod escape;

use crate::error::XmlError;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;

/// Tags that the spec calls out as needing sequence treatment even for a
/// single occurrence: shape-tree primitives, paragraph/run elements,
/// gradient stops, slide ids, relationships, and custom-geometry path
/// segments. Kept for documentation and for the property test asserting the
/// map view never silently drops a sibling.
pub const ALWAYS_ARRAY_TAGS: &[&str] = &[
    "p:sp", "p:pic", "p:grpSp", "p:cxnSp", "p:graphicFrame", "a:p", "a:r", "a:gs", "p:sldId",
    "Relationship", "a:path", "a:moveTo", "a:lnTo", "a:cubicBezTo", "a:arcTo", "a:close",
];

/// One node in the document-ordered XML tree.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
    /// Concatenated direct text content (e.g. the contents of `<a:t>`).
    pub text: String,
}

impl Node {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name || local_name(k) == local_name(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn attr_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.attr(name).unwrap_or(default)
    }

    /// Parse an attribute as a signed integer (EMU offsets/extents, angle
    /// units, and adjustment-value guides are all plain decimal integers in
    /// OOXML, never exponential notation). Falls back to the standard parser
    /// for values `atoi_simd` rejects (leading `+`, embedded whitespace).
    pub fn attr_i64(&self, name: &str) -> Option<i64> {
        let raw = self.attr(name)?;
        atoi_simd::parse::<i64>(raw.as_bytes()).ok().or_else(|| raw.parse().ok())
    }

    pub fn attr_f64(&self, name: &str) -> Option<f64> {
        let raw = self.attr(name)?;
        fast_float2::parse(raw).ok().or_else(|| raw.parse().ok())
    }

    /// First direct child with the given tag (by local name, namespace
    /// prefix-insensitive, since producers vary in which prefixes they
    /// declare).
    pub fn child(&self, tag: &str) -> Option<&Node> {
        let want = local_name(tag);
        self.children.iter().find(|c| local_name(&c.tag) == want)
    }

    /// All direct children with the given tag, in document order.
    pub fn children(&self, tag: &str) -> impl Iterator<Item = &Node> {
        let want = local_name(tag).to_string();
        self.children
            .iter()
            .filter(move |c| local_name(&c.tag) == want)
    }

    /// Find the first descendant (depth-first, document order) with the
    /// given tag, not crossing into a nested node of the same tag's
    /// immediate siblings — used sparingly, for presence checks like "does
    /// this shape contain an `a:tbl` anywhere".
    pub fn find_descendant(&self, tag: &str) -> Option<&Node> {
        let want = local_name(tag);
        if local_name(&self.tag) == want {
            return Some(self);
        }
        for child in &self.children {
            if let Some(found) = child.find_descendant(tag) {
                return Some(found);
            }
        }
        None
    }

    /// Derived map view: children grouped by local tag name, in document
    /// order within each group.
    pub fn children_map(&self) -> HashMap<&str, Vec<&Node>> {
        let mut map: HashMap<&str, Vec<&Node>> = HashMap::new();
        for child in &self.children {
            map.entry(local_name(&child.tag)).or_default().push(child);
        }
        map
    }

    /// All text in this subtree, depth-first, space-joined between `a:t`
    /// runs the way the grounding library's `extract_text` helpers do.
    pub fn all_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if !self.text.is_empty() {
            out.push_str(&self.text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

/// Strip an XML namespace prefix (`a:`, `p:`, `r:`, …) for comparison.
pub fn local_name(tag: &str) -> &str {
    match tag.rfind(':') {
        Some(idx) => &tag[idx + 1..],
        None => tag,
    }
}

/// Parse XML text into the ordered tree rooted at the document element.
pub fn parse(text: &str) -> Result<Node, XmlError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let node = start_node(&e)?;
                stack.push(node);
            }
            Event::Empty(e) => {
                let node = start_node(&e)?;
                push_child(&mut stack, &mut root, node);
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| {
                    XmlError::UnexpectedStructure("unbalanced closing tag".into())
                })?;
                push_child(&mut stack, &mut root, node);
            }
            Event::Text(t) | Event::CData(t) => {
                let text = t
                    .decode()
                    .map_err(|e| XmlError::Parse(e.to_string()))?
                    .into_owned();
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| XmlError::UnexpectedStructure("empty document".into()))
}

fn start_node(e: &quick_xml::events::BytesStart) -> Result<Node, XmlError> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| XmlError::Parse(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .decode_and_unescape_value(quick_xml::encoding::Decoder::utf8())
            .map_err(|e| XmlError::Parse(e.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Node {
        tag,
        attrs,
        children: Vec::new(),
        text: String::new(),
    })
}

fn push_child(stack: &mut Vec<Node>, root: &mut Option<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => *root = Some(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_tree_preserving_order() {
        let doc = parse(r#"<p:spTree><p:sp id="1"/><p:sp id="2"/><p:pic id="3"/></p:spTree>"#)
            .unwrap();
        let tags: Vec<&str> = doc.children.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(tags, vec!["p:sp", "p:sp", "p:pic"]);
    }

    #[test]
    fn map_view_is_stable_permutation_of_ordered_children() {
        let doc = parse(r#"<a:gsLst><a:gs pos="0"/><a:gs pos="50000"/><a:gs pos="100000"/></a:gsLst>"#)
            .unwrap();
        let map = doc.children_map();
        let ordered: Vec<&str> = doc.children.iter().map(|n| n.attr("pos").unwrap()).collect();
        let mapped: Vec<&str> = map["gs"].iter().map(|n| n.attr("pos").unwrap()).collect();
        assert_eq!(ordered, mapped);
    }

    #[test]
    fn reads_attributes_and_text() {
        let doc = parse(r#"<a:t>hello</a:t>"#).unwrap();
        assert_eq!(doc.all_text(), "hello");
        let doc = parse(r#"<a:off x="100" y="200"/>"#).unwrap();
        assert_eq!(doc.attr("x"), Some("100"));
        assert_eq!(doc.attr("y"), Some("200"));
    }
}
