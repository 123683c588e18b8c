//! Content fingerprinting for DocChain.
//!
//! A document's identity is the SHA-256 digest of its bytes, rendered as
//! 64 lowercase hex characters.

pub mod document;
pub mod hash;

pub use document::DocumentFile;
pub use hash::{fingerprint, fingerprint_file, fingerprint_reader, sha256, CHUNK_SIZE};
