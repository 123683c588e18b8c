//! Server-assigned document identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TypesError;

/// Identifier the registry assigns to a document at upload time.
///
/// The reference registry hands out lowercase UUIDv4 strings, but other
/// backends are free to use any opaque string, so construction via
/// [`DocumentId::new`] does not validate. [`DocumentId::parse`] applies
/// the UUID shape check used for user-supplied hints.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Length of a hyphenated UUID.
    pub const UUID_LEN: usize = 36;

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Parse a user-supplied id, requiring 36 chars of `[a-f0-9-]`.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let s = raw.trim();
        let well_formed = s.len() == Self::UUID_LEN
            && s
                .bytes()
                .all(|b| matches!(b, b'a'..=b'f' | b'0'..=b'9' | b'-'));
        if !well_formed {
            return Err(TypesError::InvalidDocumentId(raw.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_uuid() {
        let id = DocumentId::parse("3f2b8c1e-9a4d-4e6f-8b7a-0c1d2e3f4a5b").unwrap();
        assert_eq!(id.as_str(), "3f2b8c1e-9a4d-4e6f-8b7a-0c1d2e3f4a5b");
    }

    #[test]
    fn parse_rejects_short_and_upper_case() {
        assert!(DocumentId::parse("d1").is_err());
        assert!(DocumentId::parse("3F2B8C1E-9A4D-4E6F-8B7A-0C1D2E3F4A5B").is_err());
    }

    #[test]
    fn new_does_not_validate() {
        assert_eq!(DocumentId::new("d1").to_string(), "d1");
    }
}
