//! SHA-256 hashing of documents.

use docchain_types::FileHash;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read size used when streaming a file through the hasher.
pub const CHUNK_SIZE: usize = 8192;

/// Compute a 256-bit SHA-256 digest of arbitrary data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    digest_bytes(hasher)
}

fn digest_bytes(hasher: Sha256) -> [u8; 32] {
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Fingerprint an in-memory document.
pub fn fingerprint(data: &[u8]) -> FileHash {
    FileHash::new(sha256(data))
}

/// Fingerprint a stream in [`CHUNK_SIZE`] reads.
///
/// Produces the same digest as [`fingerprint`] over the concatenated bytes.
/// Interrupted reads are retried; any other I/O error is returned as is.
pub fn fingerprint_reader<R: Read>(mut reader: R) -> io::Result<FileHash> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(FileHash::new(digest_bytes(hasher)))
}

/// Fingerprint a file on disk.
pub fn fingerprint_file(path: impl AsRef<Path>) -> io::Result<FileHash> {
    let file = File::open(path)?;
    fingerprint_reader(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_input_matches_known_digest() {
        assert_eq!(fingerprint(b"").to_hex(), FileHash::EMPTY_SHA256);
    }

    #[test]
    fn known_vector_abc() {
        assert_eq!(
            fingerprint(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn deterministic() {
        assert_eq!(fingerprint(b"hello docchain"), fingerprint(b"hello docchain"));
    }

    #[test]
    fn different_inputs() {
        assert_ne!(fingerprint(b"hello"), fingerprint(b"hellp"));
    }

    #[test]
    fn reader_spanning_chunks_matches_one_shot() {
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let streamed = fingerprint_reader(&data[..]).unwrap();
        assert_eq!(streamed, fingerprint(&data));
    }

    #[test]
    fn file_matches_one_shot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"signed contract v1").unwrap();
        file.flush().unwrap();
        assert_eq!(
            fingerprint_file(file.path()).unwrap(),
            fingerprint(b"signed contract v1")
        );
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let err = fingerprint_file("/nonexistent/docchain/file.pdf").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
