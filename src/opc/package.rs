//! OPC package: archive + relationship graph + parsed-XML cache, combined.
//!
//! Grounded on the package layer's `OpcPackage`/`unmarshal`, trimmed to the
//! read-only subset a renderer needs: no part registry of boxed trait
//! objects, just three caches (parsed XML by member path, parsed rels by
//! `.rels` path, and the content-types lookup) sitting over the archive
//! reader, matching the "three caches, per-presentation, unbounded within
//! an open archive" caching strategy this pipeline documents for itself.

use crate::archive::Archive;
use crate::error::{ArchiveError, RenderError, XmlError};
use crate::opc::content_types::{self, ContentTypes};
use crate::opc::packuri::PackUri;
use crate::opc::rel::Relationships;
use crate::xml::{self, Node};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::rc::Rc;

pub struct Package<R: Read + Seek> {
    archive: RefCell<Archive<R>>,
    xml_cache: RefCell<HashMap<String, Rc<Node>>>,
    rels_cache: RefCell<HashMap<String, Rc<Relationships>>>,
    content_types: RefCell<Option<Rc<ContentTypes>>>,
}

impl Package<std::io::BufReader<std::fs::File>> {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, RenderError> {
        let archive = Archive::open(path)?;
        Ok(Self::new(archive))
    }
}

impl Package<Cursor<Vec<u8>>> {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, RenderError> {
        let archive = Archive::from_bytes(bytes)?;
        Ok(Self::new(archive))
    }
}

impl<R: Read + Seek> Package<R> {
    pub fn new(archive: Archive<R>) -> Self {
        Self {
            archive: RefCell::new(archive),
            xml_cache: RefCell::new(HashMap::new()),
            rels_cache: RefCell::new(HashMap::new()),
            content_types: RefCell::new(None),
        }
    }

    /// Read and parse a member as XML, caching by member path within this
    /// open archive.
    pub fn read_xml(&self, member_path: &str) -> Result<Rc<Node>, RenderError> {
        if let Some(cached) = self.xml_cache.borrow().get(member_path) {
            return Ok(Rc::clone(cached));
        }
        let text = self
            .archive
            .borrow_mut()
            .read_text(member_path.trim_start_matches('/'))?;
        let node = xml::parse(&text).map_err(RenderError::Xml)?;
        let rc = Rc::new(node);
        self.xml_cache
            .borrow_mut()
            .insert(member_path.to_string(), Rc::clone(&rc));
        Ok(rc)
    }

    pub fn read_bytes(&self, member_path: &str) -> Result<Vec<u8>, ArchiveError> {
        self.archive
            .borrow_mut()
            .read_bytes(member_path.trim_start_matches('/'))
    }

    pub fn exists(&self, member_path: &str) -> bool {
        self.archive
            .borrow_mut()
            .exists(member_path.trim_start_matches('/'))
    }

    /// Parsed `.rels` for the part at `part_path`. Missing `.rels` file is
    /// an empty relationship set, not an error.
    pub fn rels_for(&self, part_path: &str) -> Result<Rc<Relationships>, RenderError> {
        let rels_path = PackUri::new(normalize_root(part_path)).rels_uri();
        let key = rels_path.as_str().to_string();
        if let Some(cached) = self.rels_cache.borrow().get(&key) {
            return Ok(Rc::clone(cached));
        }
        let rels = if self.exists(&key) {
            let text = self
                .archive
                .borrow_mut()
                .read_text(rels_path.membername())?;
            Relationships::parse(&text).map_err(RenderError::Xml)?
        } else {
            Relationships::empty()
        };
        let rc = Rc::new(rels);
        self.rels_cache.borrow_mut().insert(key, Rc::clone(&rc));
        Ok(rc)
    }

    /// Resolve a relationship id recorded against `part_path` to the
    /// absolute member path of its target.
    pub fn resolve_rel(&self, part_path: &str, rel_id: &str) -> Result<String, RenderError> {
        let rels = self.rels_for(part_path)?;
        let rel = rels.get(rel_id).ok_or_else(|| RenderError::RelationshipMissing {
            from: part_path.to_string(),
            rel_type: rel_id.to_string(),
        })?;
        let base_dir = PackUri::new(normalize_root(part_path)).base_uri();
        Ok(PackUri::from_rel_ref(&base_dir, &rel.target).as_str().to_string())
    }

    /// Find the presentation part per the root relationship graph: the
    /// relationship in `_rels/.rels` whose type suffix-matches
    /// `/officeDocument`. If that relationship is missing, fall back to
    /// `[Content_Types].xml`, looking for the one part declared with the
    /// presentation main content type (matching the package layer's
    /// content-type-driven part classification). If neither source
    /// resolves it, default to `ppt/presentation.xml` with no error
    /// (documented boundary behavior).
    pub fn find_presentation(&self) -> Result<String, RenderError> {
        let rels = self.rels_for("/")?;
        if let Some(rel) = rels.find_by_type_suffix("/officeDocument").next() {
            return Ok(PackUri::from_rel_ref("/", &rel.target).as_str().to_string());
        }
        if let Ok(ct) = self.content_types() {
            if let Some(part) = ct.part_with_content_type(content_types::content_type::PML_PRESENTATION_MAIN) {
                return Ok(part.to_string());
            }
        }
        Ok("/ppt/presentation.xml".to_string())
    }

    pub fn content_types(&self) -> Result<Rc<ContentTypes>, RenderError> {
        if let Some(ct) = self.content_types.borrow().as_ref() {
            return Ok(Rc::clone(ct));
        }
        let node = self.read_xml("/[Content_Types].xml")?;
        let ct = Rc::new(ContentTypes::from_node(&node));
        *self.content_types.borrow_mut() = Some(Rc::clone(&ct));
        Ok(ct)
    }
}

fn normalize_root(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

impl From<XmlError> for RenderError {
    fn from(e: XmlError) -> Self {
        RenderError::Xml(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn fixture() -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut w = zip::ZipWriter::new(Cursor::new(&mut buf));
            let opts = SimpleFileOptions::default();
            w.start_file("_rels/.rels", opts).unwrap();
            w.write_all(
                br#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
</Relationships>"#,
            )
            .unwrap();
            w.start_file("ppt/presentation.xml", opts).unwrap();
            w.write_all(br#"<p:presentation xmlns:p="x"/>"#).unwrap();
            w.finish().unwrap();
        }
        buf
    }

    #[test]
    fn finds_presentation_via_root_rels() {
        let pkg = Package::from_bytes(fixture()).unwrap();
        assert_eq!(pkg.find_presentation().unwrap(), "/ppt/presentation.xml");
    }

    #[test]
    fn missing_root_rels_falls_back_to_default_path() {
        let mut buf = Vec::new();
        {
            let mut w = zip::ZipWriter::new(Cursor::new(&mut buf));
            w.start_file("ppt/presentation.xml", SimpleFileOptions::default())
                .unwrap();
            w.write_all(b"<p:presentation/>").unwrap();
            w.finish().unwrap();
        }
        let pkg = Package::from_bytes(buf).unwrap();
        assert_eq!(pkg.find_presentation().unwrap(), "/ppt/presentation.xml");
    }

    #[test]
    fn falls_back_to_content_types_when_root_rels_lacks_officedocument() {
        let mut buf = Vec::new();
        {
            let mut w = zip::ZipWriter::new(Cursor::new(&mut buf));
            let opts = SimpleFileOptions::default();
            w.start_file("_rels/.rels", opts).unwrap();
            w.write_all(br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#).unwrap();
            w.start_file("[Content_Types].xml", opts).unwrap();
            w.write_all(br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
                <Override PartName="/ppt/deck.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
            </Types>"#).unwrap();
            w.start_file("ppt/deck.xml", opts).unwrap();
            w.write_all(b"<p:presentation/>").unwrap();
            w.finish().unwrap();
        }
        let pkg = Package::from_bytes(buf).unwrap();
        assert_eq!(pkg.find_presentation().unwrap(), "/ppt/deck.xml");
    }

    #[test]
    fn xml_cache_returns_same_parse_on_repeat_reads() {
        let pkg = Package::from_bytes(fixture()).unwrap();
        let a = pkg.read_xml("/ppt/presentation.xml").unwrap();
        let b = pkg.read_xml("/ppt/presentation.xml").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }
}
