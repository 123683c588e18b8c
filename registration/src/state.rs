//! Registration states and results.

use docchain_backend::StagedDocument;
use docchain_ledger::Receipt;
use docchain_types::{DocumentId, FileHash, TxHash};

/// Everything needed to (re)drive the confirm step.
///
/// Produced as soon as a receipt is observed. Holding one means the ledger
/// transaction already succeeded, whatever happens to the confirm call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedCheckpoint {
    pub document_id: DocumentId,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Where a registration attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegistrationState {
    #[default]
    Idle,
    Staged {
        document_id: DocumentId,
        file_hash: FileHash,
    },
    /// A transaction hash is known; the receipt is not.
    Submitted {
        document_id: DocumentId,
        tx_hash: TxHash,
    },
    Mined(MinedCheckpoint),
    Confirmed(ConfirmedRegistration),
    /// The attempt ended before a receipt was observed.
    Failed { message: String },
}

impl RegistrationState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Staged { .. } => "staged",
            Self::Submitted { .. } => "submitted",
            Self::Mined(_) => "mined",
            Self::Confirmed(_) => "confirmed",
            Self::Failed { .. } => "failed",
        }
    }

    /// The pending transaction hash, from `Submitted` onwards.
    pub fn tx_hash(&self) -> Option<&TxHash> {
        match self {
            Self::Submitted { tx_hash, .. } => Some(tx_hash),
            Self::Mined(c) => Some(&c.tx_hash),
            Self::Confirmed(c) => Some(&c.tx_hash),
            _ => None,
        }
    }
}

/// The registry's acknowledgement of a mined registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedRegistration {
    pub document_id: DocumentId,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Successful end of [`crate::Coordinator::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// No ledger adapter is configured; the record stays staged.
    Staged(StagedDocument),
    /// Anchored on the ledger and acknowledged by the registry.
    Confirmed {
        staged: StagedDocument,
        confirmation: ConfirmedRegistration,
    },
}

impl RegistrationOutcome {
    pub fn document_id(&self) -> &DocumentId {
        match self {
            Self::Staged(s) => &s.document_id,
            Self::Confirmed { staged, .. } => &staged.document_id,
        }
    }

    pub fn tx_hash(&self) -> Option<&TxHash> {
        match self {
            Self::Staged(_) => None,
            Self::Confirmed { confirmation, .. } => Some(&confirmation.tx_hash),
        }
    }
}

/// Working state of one registration attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionAttempt {
    pub document_id: DocumentId,
    pub fingerprint: FileHash,
    pub tx_hash: Option<TxHash>,
    pub receipt: Option<Receipt>,
}

impl TransactionAttempt {
    pub fn new(document_id: DocumentId, fingerprint: FileHash) -> Self {
        Self {
            document_id,
            fingerprint,
            tx_hash: None,
            receipt: None,
        }
    }

    /// Checkpoint from the observed receipt, if any.
    pub fn checkpoint(&self) -> Option<MinedCheckpoint> {
        self.receipt.as_ref().map(|r| MinedCheckpoint {
            document_id: self.document_id.clone(),
            tx_hash: r.tx_hash.clone(),
            block_number: r.block_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_requires_receipt() {
        let mut attempt = TransactionAttempt::new(DocumentId::new("d1"), FileHash::new([1; 32]));
        assert!(attempt.checkpoint().is_none());

        attempt.tx_hash = Some(TxHash::new("0xpending"));
        attempt.receipt = Some(Receipt {
            tx_hash: TxHash::new("0xT1"),
            block_number: Some(5),
        });
        let cp = attempt.checkpoint().unwrap();
        assert_eq!(cp.tx_hash, TxHash::new("0xT1"));
        assert_eq!(cp.block_number, Some(5));
    }

    #[test]
    fn tx_hash_visible_from_submitted() {
        let s = RegistrationState::Submitted {
            document_id: DocumentId::new("d1"),
            tx_hash: TxHash::new("0xT1"),
        };
        assert_eq!(s.tx_hash(), Some(&TxHash::new("0xT1")));
        assert_eq!(s.label(), "submitted");
        assert!(RegistrationState::Idle.tx_hash().is_none());
    }
}
