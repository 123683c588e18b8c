//! Content hashes and ledger transaction identifiers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Strip an optional `0x`/`0X` prefix and lower-case the rest.
///
/// This is the comparison form used for every hash in the system. It does
/// not check length or alphabet; use [`FileHash::parse`] for that.
pub fn normalize_hex(s: &str) -> String {
    let trimmed = s.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    body.to_ascii_lowercase()
}

/// A 32-byte SHA-256 content fingerprint.
///
/// Always rendered as 64 lowercase hex characters with no prefix. Parsing
/// accepts a `0x` prefix and upper-case digits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileHash([u8; 32]);

impl FileHash {
    /// Digest of the empty byte string.
    pub const EMPTY_SHA256: &'static str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a hex digest, tolerating a `0x` prefix and any letter case.
    pub fn parse(s: &str) -> Result<Self, TypesError> {
        let norm = normalize_hex(s);
        if norm.len() != 64 {
            return Err(TypesError::InvalidHash(format!(
                "expected 64 hex characters, got {}",
                norm.len()
            )));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&norm, &mut bytes)
            .map_err(|e| TypesError::InvalidHash(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Lowercase hex rendering without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Case- and prefix-insensitive comparison against a raw hex string.
    ///
    /// Malformed input never matches.
    pub fn matches_hex(&self, other: &str) -> bool {
        normalize_hex(other) == self.to_hex()
    }
}

impl fmt::Debug for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileHash({}\u{2026})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for FileHash {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FileHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FileHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A ledger transaction identifier as reported by the wallet provider.
///
/// Kept verbatim; providers disagree on prefix and case, and the registry
/// stores whatever the provider returned.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxHash {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
