use docchain_types::{DocumentId, FileHash, TxHash};

/// Result of one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The file is byte-identical to a registered document.
    Verified {
        fingerprint: FileHash,
        document_id: Option<DocumentId>,
        tx_hash: Option<TxHash>,
    },
    /// The file differs from what was registered.
    ///
    /// `stored_hash` is the registry's hash as it reported it, or `None`
    /// when the registry declared a mismatch without disclosing it.
    Tampered {
        computed_hash: FileHash,
        stored_hash: Option<String>,
        document_id: Option<DocumentId>,
        tx_hash: Option<TxHash>,
    },
    /// No registered document has this content.
    NotRegistered { computed_hash: FileHash },
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    /// The fingerprint of the presented file.
    pub fn computed_hash(&self) -> FileHash {
        match self {
            Self::Verified { fingerprint, .. } => *fingerprint,
            Self::Tampered { computed_hash, .. } | Self::NotRegistered { computed_hash } => {
                *computed_hash
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Verified { .. } => "verified",
            Self::Tampered { .. } => "tampered",
            Self::NotRegistered { .. } => "not registered",
        }
    }
}

impl std::fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified {
                fingerprint,
                document_id,
                tx_hash,
            } => {
                write!(f, "verified {fingerprint}")?;
                if let Some(id) = document_id {
                    write!(f, " document={id}")?;
                }
                if let Some(tx) = tx_hash {
                    write!(f, " tx={tx}")?;
                }
                Ok(())
            }
            Self::Tampered {
                computed_hash,
                stored_hash,
                document_id,
                ..
            } => {
                write!(f, "tampered {computed_hash}")?;
                if let Some(stored) = stored_hash {
                    write!(f, " stored={stored}")?;
                }
                if let Some(id) = document_id {
                    write!(f, " document={id}")?;
                }
                Ok(())
            }
            Self::NotRegistered { computed_hash } => write!(f, "not registered {computed_hash}"),
        }
    }
}
