//! The verification precedence rules.

use std::sync::Arc;

use docchain_backend::{BackendVerdict, RegistryBackend, VerifyRequest};
use docchain_crypto::DocumentFile;
use docchain_types::{DocumentId, FileHash};

use crate::error::VerificationError;
use crate::outcome::VerificationOutcome;

/// Classifies presented files against a registry.
pub struct Reconciler {
    backend: Arc<dyn RegistryBackend>,
}

impl Reconciler {
    pub fn new(backend: Arc<dyn RegistryBackend>) -> Self {
        Self { backend }
    }

    /// Verify `file`, optionally against the document it claims to be.
    ///
    /// The first rule that applies decides:
    /// 1. the registry says verified
    /// 2. the registry says the document is not registered
    /// 3. the registry says the content was tampered with
    /// 4. the registry disclosed its stored hash, compared locally
    /// 5. a scan of the document listing for the fingerprint
    ///
    /// A failed verify call skips straight to the scan. A failed scan is
    /// [`VerificationError::ReconciliationFailed`].
    pub async fn verify(
        &self,
        file: &DocumentFile,
        claimed: Option<&DocumentId>,
    ) -> Result<VerificationOutcome, VerificationError> {
        let computed_hash = file.fingerprint();
        let request = VerifyRequest {
            file_name: file.file_name().to_string(),
            bytes: file.bytes().to_vec(),
            document_id: claimed.cloned(),
        };

        let verdict = match self.backend.verify(&request).await {
            Ok(reply) => reply.verdict(),
            Err(e) => {
                tracing::warn!(hash = %computed_hash, "verify call failed: {e}");
                return self.scan(computed_hash).await;
            }
        };

        match verdict {
            BackendVerdict::Verified {
                document_id,
                tx_hash,
            } => {
                tracing::debug!(hash = %computed_hash, "registry reported verified");
                Ok(VerificationOutcome::Verified {
                    fingerprint: computed_hash,
                    document_id,
                    tx_hash,
                })
            }
            BackendVerdict::NotRegistered => {
                tracing::debug!(hash = %computed_hash, "registry reported not registered");
                Ok(VerificationOutcome::NotRegistered { computed_hash })
            }
            BackendVerdict::Tampered {
                stored_hash,
                document_id,
                tx_hash,
            } => {
                tracing::debug!(hash = %computed_hash, "registry reported tampered");
                Ok(VerificationOutcome::Tampered {
                    computed_hash,
                    stored_hash,
                    document_id,
                    tx_hash,
                })
            }
            BackendVerdict::StoredHash {
                stored_hash,
                document_id,
                tx_hash,
            } => {
                let equal = computed_hash.matches_hex(&stored_hash);
                tracing::debug!(
                    hash = %computed_hash,
                    stored = %stored_hash,
                    equal,
                    "compared stored hash"
                );
                if equal {
                    Ok(VerificationOutcome::Verified {
                        fingerprint: computed_hash,
                        document_id,
                        tx_hash,
                    })
                } else {
                    Ok(VerificationOutcome::Tampered {
                        computed_hash,
                        stored_hash: Some(stored_hash),
                        document_id,
                        tx_hash,
                    })
                }
            }
            BackendVerdict::Unclassified(reason) => {
                tracing::debug!(
                    hash = %computed_hash,
                    reason = ?reason,
                    "no verdict, scanning listing"
                );
                self.scan(computed_hash).await
            }
        }
    }

    /// Fallback: look for the fingerprint in the full document listing.
    ///
    /// Rows without a usable hash are passed over rather than failing the
    /// scan.
    async fn scan(
        &self,
        computed_hash: FileHash,
    ) -> Result<VerificationOutcome, VerificationError> {
        let listing = self.backend.listing().await.map_err(|e| {
            VerificationError::ReconciliationFailed {
                computed_hash,
                reason: format!("document listing unavailable: {e}"),
            }
        })?;

        match listing.into_iter().find(|row| row.matches(&computed_hash)) {
            Some(row) => {
                tracing::debug!(
                    hash = %computed_hash,
                    document_id = ?row.document_id,
                    "found in listing"
                );
                Ok(VerificationOutcome::Verified {
                    fingerprint: computed_hash,
                    document_id: row.document_id,
                    tx_hash: row.blockchain_tx.filter(|tx| !tx.is_empty()),
                })
            }
            None => {
                tracing::debug!(hash = %computed_hash, "absent from listing");
                Ok(VerificationOutcome::NotRegistered { computed_hash })
            }
        }
    }
}
