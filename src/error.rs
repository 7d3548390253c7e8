//! Crate-wide error types.
//!
//! Mirrors the error-kind list of the render pipeline: archive and XML
//! failures are their own small enums, converted into [`RenderError`] at the
//! subsystem boundary that first observes them, the same split the
//! package/part layer below uses for `OpcError` vs. the crate-wide error.

use thiserror::Error;

/// Errors raised while opening or reading members of a PPTX (ZIP) archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to open archive: {0}")]
    OpenFailed(String),
    #[error("member not found: {0}")]
    MemberNotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Errors raised while parsing XML text into either DOM view.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("xml parse error: {0}")]
    Parse(String),
    #[error("unexpected structure: {0}")]
    UnexpectedStructure(String),
}

impl From<quick_xml::Error> for XmlError {
    fn from(e: quick_xml::Error) -> Self {
        XmlError::Parse(e.to_string())
    }
}

/// Crate-wide error type, one variant per documented error kind.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("xml error: {0}")]
    Xml(#[from] XmlError),
    #[error("invalid presentation: {0}")]
    InvalidPresentation(String),
    #[error("invalid slide index {index} (deck has {count} slides)")]
    InvalidSlideIndex { index: usize, count: usize },
    #[error("relationship missing from {from}: type {rel_type}")]
    RelationshipMissing { from: String, rel_type: String },
    #[error("image decode failed: {0}")]
    ImageDecodeFailed(String),
    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),
    #[error("layout failure: {0}")]
    LayoutFailure(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;
