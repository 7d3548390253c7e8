//! Relationship resolver (C3).
//!
//! Parses `.rels` files and exposes lookups used to walk
//! root→presentation→slide→layout→master→theme. Grounded on the package
//! layer's `Relationship`/`Relationships`, trimmed to the read-only subset
//! (no `add`/`next_r_id` writer machinery).

use crate::error::XmlError;
use crate::xml;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub is_external: bool,
}

/// A parsed `.rels` file: `{id, type, target}` triples keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    by_id: HashMap<String, Relationship>,
}

impl Relationships {
    /// Parse a `.rels` document. A missing file is represented upstream as
    /// `Relationships::default()` (empty set), not an error — see
    /// [`Relationships::empty`].
    pub fn parse(xml_text: &str) -> Result<Self, XmlError> {
        let root = xml::parse(xml_text)?;
        let mut by_id = HashMap::new();
        for rel in root.children("Relationship") {
            let id = rel.attr_or("Id", "").to_string();
            let rel_type = rel.attr_or("Type", "").to_string();
            let target = rel.attr_or("Target", "").to_string();
            let is_external = rel.attr("TargetMode") == Some("External");
            by_id.insert(
                id.clone(),
                Relationship {
                    id,
                    rel_type,
                    target,
                    is_external,
                },
            );
        }
        Ok(Self { by_id })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.by_id.get(id)
    }

    /// All relationships whose type suffix-matches `suffix` (e.g.
    /// `/officeDocument`), not substring-matches — `extended-properties`
    /// must not match `/officeDocument`.
    pub fn find_by_type_suffix(&self, suffix: &str) -> impl Iterator<Item = &Relationship> {
        self.by_id.values().filter(move |r| r.rel_type.ends_with(suffix))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELS_XML: &str = r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

    #[test]
    fn suffix_match_is_not_substring_match() {
        let rels = Relationships::parse(RELS_XML).unwrap();
        let found: Vec<_> = rels.find_by_type_suffix("/officeDocument").collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].target, "ppt/presentation.xml");
    }

    #[test]
    fn lookup_by_id() {
        let rels = Relationships::parse(RELS_XML).unwrap();
        assert_eq!(rels.get("rId2").unwrap().target, "docProps/app.xml");
        assert!(rels.get("rId99").is_none());
    }
}
