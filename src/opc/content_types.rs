//! `[Content_Types].xml` lookup, grounded on the package layer's
//! `is_xml_content_type`/content-type constant table, trimmed to the
//! PresentationML content types this renderer actually branches on.

use crate::xml::Node;
use std::collections::HashMap;

pub mod content_type {
    pub const PML_PRESENTATION_MAIN: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
    pub const PML_SLIDE: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
    pub const PML_SLIDE_LAYOUT: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
    pub const PML_SLIDE_MASTER: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
    pub const DML_CHART: &str =
        "application/vnd.openxmlformats-officedocument.drawingml.chart+xml";
    pub const THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
}

pub mod relationship_type {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const SLIDE_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
    pub const SLIDE_LAYOUT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
    pub const SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    pub const THEME: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
    pub const IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    pub const CHART: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart";
}

#[derive(Debug, Default)]
pub struct ContentTypes {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    pub fn from_node(node: &Node) -> Self {
        let mut defaults = HashMap::new();
        let mut overrides = HashMap::new();
        for default in node.children("Default") {
            defaults.insert(
                default.attr_or("Extension", "").to_ascii_lowercase(),
                default.attr_or("ContentType", "").to_string(),
            );
        }
        for over in node.children("Override") {
            overrides.insert(
                over.attr_or("PartName", "").to_string(),
                over.attr_or("ContentType", "").to_string(),
            );
        }
        Self { defaults, overrides }
    }

    /// Content type for a part path, honoring an `Override` before falling
    /// back to the `Default` for its file extension.
    pub fn content_type_for(&self, part_path: &str) -> Option<&str> {
        if let Some(ct) = self.overrides.get(part_path) {
            return Some(ct.as_str());
        }
        let ext = part_path.rsplit('.').next()?.to_ascii_lowercase();
        self.defaults.get(&ext).map(|s| s.as_str())
    }

    /// The single part explicitly `Override`n to `content_type`, if any.
    /// Content types this renderer cares about (presentation main, theme,
    /// slide/layout/master) are always declared via `Override`, never
    /// `Default`, since they share the `.xml` extension with every other
    /// part in the package.
    pub fn part_with_content_type(&self, content_type: &str) -> Option<&str> {
        self.overrides
            .iter()
            .find(|(_, ct)| ct.as_str() == content_type)
            .map(|(part, _)| part.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn finds_the_part_overridden_to_a_content_type() {
        let node = xml::parse(
            r#"<Types>
                <Default Extension="xml" ContentType="application/xml"/>
                <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
            </Types>"#,
        )
        .unwrap();
        let ct = ContentTypes::from_node(&node);
        assert_eq!(
            ct.part_with_content_type(content_type::PML_PRESENTATION_MAIN),
            Some("/ppt/presentation.xml")
        );
        assert_eq!(ct.content_type_for("/ppt/presentation.xml"), Some(content_type::PML_PRESENTATION_MAIN));
    }
}
