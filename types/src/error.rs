//! Parse and validation errors for the shared types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("invalid file hash: {0}")]
    InvalidHash(String),

    #[error("invalid document ID format: {0}")]
    InvalidDocumentId(String),

    #[error(
        "invalid owner name: use only letters, numbers, spaces, hyphens, and underscores \
         (max {max} chars)"
    )]
    InvalidOwner { max: usize },

    #[error("file type not allowed: {0}")]
    DisallowedExtension(String),

    #[error("empty filename")]
    EmptyFileName,

    #[error("file too large: {size} bytes (max {max})")]
    FileTooLarge { size: u64, max: u64 },
}
