//! Archive reader (C1).
//!
//! Opens a PPTX (a ZIP/OPC package) from a path or an in-memory buffer and
//! gives random-access, buffered reads of its member files. Grounded on the
//! package layer's `PhysPkgReader`, trimmed to the read-only subset this
//! renderer needs (no writer side).

use crate::error::ArchiveError;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use zip::ZipArchive;

/// A membership mapping from internal `/`-separated path to its bytes,
/// backed by a ZIP archive. No directory semantics: paths are literal.
pub struct Archive<R: Read + Seek> {
    zip: ZipArchive<R>,
}

impl Archive<BufReader<File>> {
    /// Open a PPTX from a filesystem path.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| ArchiveError::OpenFailed(format!("{}: {e}", path.display())))?;
        Self::new(BufReader::with_capacity(64 * 1024, file))
    }
}

impl Archive<Cursor<Vec<u8>>> {
    /// Open a PPTX from an in-memory buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ArchiveError> {
        Self::new(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> Archive<R> {
    pub fn new(reader: R) -> Result<Self, ArchiveError> {
        let zip = ZipArchive::new(reader)?;
        Ok(Self { zip })
    }

    /// Whether a member exists by exact (case-sensitive) path.
    pub fn exists(&mut self, member: &str) -> bool {
        self.zip.by_name(member).is_ok()
    }

    /// List all member paths, in archive order.
    pub fn list(&self) -> Vec<String> {
        self.zip.file_names().map(|s| s.to_string()).collect()
    }

    /// Read a member's raw bytes.
    pub fn read_bytes(&mut self, member: &str) -> Result<Vec<u8>, ArchiveError> {
        let mut entry = self
            .zip
            .by_name(member)
            .map_err(|_| ArchiveError::MemberNotFound(member.to_string()))?;
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Read a member and decode it as UTF-8 text.
    pub fn read_text(&mut self, member: &str) -> Result<String, ArchiveError> {
        let bytes = self.read_bytes(member)?;
        String::from_utf8(bytes)
            .map_err(|e| ArchiveError::OpenFailed(format!("{member}: invalid utf-8: {e}")))
    }

    pub fn len(&self) -> usize {
        self.zip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zip.is_empty()
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
            w.start_file("hello.txt", opts).unwrap();
            w.write_all(b"hello world").unwrap();
            w.finish().unwrap();
        }
        buf
    }

    #[test]
    fn reads_member_bytes_and_text() {
        let mut archive = Archive::from_bytes(fixture()).unwrap();
        assert!(archive.exists("hello.txt"));
        assert!(!archive.exists("missing.txt"));
        assert_eq!(archive.read_text("hello.txt").unwrap(), "hello world");
        assert_eq!(archive.list(), vec!["hello.txt".to_string()]);
    }

    #[test]
    fn missing_member_is_an_error_not_a_panic() {
        let mut archive = Archive::from_bytes(fixture()).unwrap();
        assert!(archive.read_bytes("nope.xml").is_err());
    }

    #[test]
    fn opens_from_a_real_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        std::fs::write(&path, fixture()).unwrap();

        let mut archive = Archive::open(&path).unwrap();
        assert_eq!(archive.read_text("hello.txt").unwrap(), "hello world");
    }

    #[test]
    fn open_failure_names_the_path_not_just_the_zip_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pptx");
        let err = Archive::open(&path).unwrap_err();
        assert!(matches!(err, ArchiveError::OpenFailed(_)));
        assert!(err.to_string().contains("missing.pptx"));
    }
}
