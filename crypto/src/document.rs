//! A selected document together with its fingerprint.

use docchain_types::FileHash;
use std::io;
use std::path::Path;

use crate::hash::fingerprint;

/// File contents plus the fingerprint computed when they were loaded.
///
/// The fingerprint is computed once per selection; replacing the contents
/// means building a new `DocumentFile`.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentFile {
    file_name: String,
    bytes: Vec<u8>,
    fingerprint: FileHash,
}

impl DocumentFile {
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let fingerprint = fingerprint(&bytes);
        Self {
            file_name: file_name.into(),
            bytes,
            fingerprint,
        }
    }

    /// Read and fingerprint a file. The name is the path's final component.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
            })?;
        Ok(Self::from_bytes(file_name, bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn fingerprint(&self) -> FileHash {
        self.fingerprint
    }
}

impl std::fmt::Debug for DocumentFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentFile")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn from_bytes_fingerprints_contents() {
        let doc = DocumentFile::from_bytes("a.txt", b"abc".to_vec());
        assert_eq!(doc.fingerprint(), fingerprint(b"abc"));
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.file_name(), "a.txt");
    }

    #[test]
    fn load_uses_final_path_component() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deed.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"deed")
            .unwrap();
        let doc = DocumentFile::load(&path).unwrap();
        assert_eq!(doc.file_name(), "deed.pdf");
        assert_eq!(doc.fingerprint(), fingerprint(b"deed"));
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(DocumentFile::load("/nonexistent/deed.pdf").is_err());
    }
}
