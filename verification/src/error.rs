use docchain_types::FileHash;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Neither the registry's verdict nor the listing fallback produced an
    /// answer. Never reported as NotRegistered.
    #[error("could not verify {computed_hash}: {reason}")]
    ReconciliationFailed {
        computed_hash: FileHash,
        reason: String,
    },
}
