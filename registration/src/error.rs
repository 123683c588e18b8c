use docchain_ledger::LedgerError;
use docchain_types::{DocumentId, FileHash, TxHash};
use thiserror::Error;

use crate::state::MinedCheckpoint;

/// Why a registration attempt stopped.
///
/// Every variant is terminal for the attempt. None of them roll back the
/// staged record; only [`RegistrationError::ConfirmFailed`] is retried
/// from where it stopped (via [`crate::Coordinator::confirm`]), the others
/// need a fresh attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("a registration for {0} is already in progress")]
    AlreadyInFlight(FileHash),

    #[error("registry did not stage the document: {0}")]
    StageFailed(String),

    #[error("ledger configuration unavailable: {0}")]
    LedgerConfigUnavailable(String),

    #[error("wallet unavailable: {0}")]
    WalletUnavailable(String),

    #[error("transaction for {document_id} was rejected in the wallet")]
    UserRejected { document_id: DocumentId },

    #[error("insufficient funds to register {document_id}")]
    InsufficientFunds { document_id: DocumentId },

    #[error("transaction for {document_id} failed: {reason}")]
    TransactionFailed {
        document_id: DocumentId,
        tx_hash: Option<TxHash>,
        reason: String,
    },

    #[error(
        "transaction {} for {} was mined but the registry did not confirm it: {reason}",
        .checkpoint.tx_hash,
        .checkpoint.document_id
    )]
    ConfirmFailed {
        checkpoint: MinedCheckpoint,
        reason: String,
    },
}

impl RegistrationError {
    /// Map an adapter error raised while submitting for `document_id`.
    pub fn from_ledger(
        document_id: &DocumentId,
        tx_hash: Option<TxHash>,
        error: LedgerError,
    ) -> Self {
        match error {
            LedgerError::Unavailable(msg) => Self::WalletUnavailable(msg),
            LedgerError::Rejected => Self::UserRejected {
                document_id: document_id.clone(),
            },
            LedgerError::InsufficientFunds => Self::InsufficientFunds {
                document_id: document_id.clone(),
            },
            other => Self::TransactionFailed {
                document_id: document_id.clone(),
                tx_hash,
                reason: other.to_string(),
            },
        }
    }

    /// The checkpoint to re-drive confirmation from, if the ledger step
    /// already succeeded.
    pub fn checkpoint(&self) -> Option<&MinedCheckpoint> {
        match self {
            Self::ConfirmFailed { checkpoint, .. } => Some(checkpoint),
            _ => None,
        }
    }
}
