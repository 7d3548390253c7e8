//! Open Packaging Conventions plumbing (C3): pack URIs, relationship
//! resolution, and the package-level caches built on top of the archive
//! reader (C1).

pub mod content_types;
pub mod package;
pub mod packuri;
pub mod rel;

pub use package::Package;
pub use packuri::PackUri;
pub use rel::Relationships;
