//! Pack URIs — absolute, `/`-rooted member paths within an OPC package, and
//! the relative-reference resolution rules used to turn a relationship's
//! `Target` into one. Grounded on the package layer's `PackURI`.

pub const PACKAGE_URI: &str = "/";
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackUri(String);

impl PackUri {
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        debug_assert!(uri.starts_with('/'), "pack URI must start with '/': {uri}");
        Self(uri)
    }

    /// Resolve a relationship's `Target` (which may be absolute or relative)
    /// against the directory containing the source part.
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Self {
        if relative_ref.starts_with('/') {
            return Self::new(normalize(relative_ref));
        }
        let joined = format!("{}/{}", base_uri.trim_end_matches('/'), relative_ref);
        Self::new(normalize(&joined))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The directory containing this part, e.g. `/ppt/slides` for
    /// `/ppt/slides/slide1.xml`.
    pub fn base_uri(&self) -> String {
        match self.0.rfind('/') {
            Some(0) => "/".to_string(),
            Some(idx) => self.0[..idx].to_string(),
            None => "/".to_string(),
        }
    }

    pub fn filename(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// The member path of this part's `.rels` file:
    /// `<dir>/_rels/<file>.rels`.
    pub fn rels_uri(&self) -> PackUri {
        let dir = self.base_uri();
        let file = self.filename();
        let path = if dir == "/" {
            format!("/_rels/{file}.rels")
        } else {
            format!("{dir}/_rels/{file}.rels")
        };
        PackUri::new(path)
    }

    /// The zip member name (no leading `/`).
    pub fn membername(&self) -> &str {
        self.0.trim_start_matches('/')
    }
}

fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    format!("/{}", out.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_targets() {
        let base = PackUri::new("/ppt/slides/slide1.xml").base_uri();
        assert_eq!(base, "/ppt/slides");
        let resolved = PackUri::from_rel_ref(&base, "../slideLayouts/slideLayout1.xml");
        assert_eq!(resolved.as_str(), "/ppt/slideLayouts/slideLayout1.xml");
    }

    #[test]
    fn resolves_absolute_targets() {
        let resolved = PackUri::from_rel_ref("/ppt/slides", "/ppt/media/image1.png");
        assert_eq!(resolved.as_str(), "/ppt/media/image1.png");
    }

    #[test]
    fn computes_rels_uri() {
        let part = PackUri::new("/ppt/presentation.xml");
        assert_eq!(part.rels_uri().as_str(), "/ppt/_rels/presentation.xml.rels");
        let root = PackUri::new("/");
        // membername of root is empty; rels file at the package root is `_rels/.rels`.
        assert_eq!(root.membername(), "");
    }
}
