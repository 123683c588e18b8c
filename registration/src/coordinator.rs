//! The stage → anchor → confirm driver.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use docchain_backend::{ConfirmRequest, RegistryBackend, StagedDocument, UploadRequest};
use docchain_crypto::DocumentFile;
use docchain_ledger::{
    abi::DEFAULT_METHOD, gas_limit_for, FunctionSpec, LedgerAdapter, LedgerCall, LedgerError,
    LedgerTarget, TxEvent,
};
use docchain_types::{DocumentId, FileHash};
use tokio::sync::{mpsc, watch};

use crate::error::RegistrationError;
use crate::state::{
    ConfirmedRegistration, MinedCheckpoint, RegistrationOutcome, RegistrationState,
    TransactionAttempt,
};

/// Ledger call settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// Contract function invoked to anchor a document.
    pub method: String,
    /// Sending account. When unset the first account the wallet exposes
    /// is used.
    pub from: Option<String>,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            method: DEFAULT_METHOD.to_string(),
            from: None,
        }
    }
}

/// Drives registrations against a registry and, optionally, a ledger.
pub struct Coordinator {
    backend: Arc<dyn RegistryBackend>,
    ledger: Option<Arc<dyn LedgerAdapter>>,
    options: CoordinatorOptions,
    in_flight: Mutex<HashSet<FileHash>>,
}

/// Removes a fingerprint from the in-flight set when the attempt ends,
/// however it ends.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<FileHash>>,
    hash: FileHash,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.set).remove(&self.hash);
    }
}

fn lock(set: &Mutex<HashSet<FileHash>>) -> MutexGuard<'_, HashSet<FileHash>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Coordinator {
    pub fn new(
        backend: Arc<dyn RegistryBackend>,
        ledger: Option<Arc<dyn LedgerAdapter>>,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            backend,
            ledger,
            options,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Whether registrations are anchored on a ledger.
    pub fn has_ledger(&self) -> bool {
        self.ledger.is_some()
    }

    /// Whether a registration for `hash` is currently running.
    pub fn is_in_flight(&self, hash: &FileHash) -> bool {
        lock(&self.in_flight).contains(hash)
    }

    fn claim(&self, hash: FileHash) -> Result<InFlight<'_>, RegistrationError> {
        if !lock(&self.in_flight).insert(hash) {
            return Err(RegistrationError::AlreadyInFlight(hash));
        }
        Ok(InFlight {
            set: &self.in_flight,
            hash,
        })
    }

    /// Register `file` on behalf of `owner`.
    ///
    /// Every state reached is published on `progress`. At most one ledger
    /// transaction is submitted and nothing is retried automatically. On
    /// [`RegistrationError::ConfirmFailed`] the published state stays
    /// [`RegistrationState::Mined`].
    pub async fn register(
        &self,
        file: &DocumentFile,
        owner: &str,
        progress: &watch::Sender<RegistrationState>,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let _guard = self.claim(file.fingerprint())?;

        let result = self.run(file, owner, progress).await;
        if let Err(e) = &result {
            match e {
                RegistrationError::ConfirmFailed { checkpoint, reason } => {
                    tracing::error!(
                        document_id = %checkpoint.document_id,
                        tx_hash = %checkpoint.tx_hash,
                        "confirm failed after the transaction was mined: {reason}"
                    );
                }
                other => {
                    tracing::warn!("registration failed: {other}");
                    publish(
                        progress,
                        RegistrationState::Failed {
                            message: other.to_string(),
                        },
                    );
                }
            }
        }
        result
    }

    async fn run(
        &self,
        file: &DocumentFile,
        owner: &str,
        progress: &watch::Sender<RegistrationState>,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let staged = self.stage(file, owner).await?;
        publish(
            progress,
            RegistrationState::Staged {
                document_id: staged.document_id.clone(),
                file_hash: staged.file_hash,
            },
        );

        let Some(ledger) = self.ledger.as_deref() else {
            tracing::info!(
                document_id = %staged.document_id,
                "no ledger configured, document left staged"
            );
            return Ok(RegistrationOutcome::Staged(staged));
        };

        let call = self.prepare_call(ledger, &staged).await?;
        let checkpoint = self.submit(ledger, &call, file.fingerprint(), progress).await?;

        let confirmation = self.confirm_inner(&checkpoint).await?;
        publish(progress, RegistrationState::Confirmed(confirmation.clone()));
        Ok(RegistrationOutcome::Confirmed {
            staged,
            confirmation,
        })
    }

    async fn stage(
        &self,
        file: &DocumentFile,
        owner: &str,
    ) -> Result<StagedDocument, RegistrationError> {
        let request = UploadRequest {
            file_name: file.file_name().to_string(),
            bytes: file.bytes().to_vec(),
            owner: owner.to_string(),
        };
        let staged = self
            .backend
            .upload(&request)
            .await
            .and_then(|reply| reply.into_staged())
            .map_err(|e| RegistrationError::StageFailed(e.to_string()))?;

        if staged.file_hash != file.fingerprint() {
            return Err(RegistrationError::StageFailed(format!(
                "registry hashed the file as {}, expected {}",
                staged.file_hash,
                file.fingerprint()
            )));
        }
        Ok(staged)
    }

    /// Resolve the contract, pick the sending account and build the call.
    async fn prepare_call(
        &self,
        ledger: &dyn LedgerAdapter,
        staged: &StagedDocument,
    ) -> Result<LedgerCall, RegistrationError> {
        let info = self
            .backend
            .contract()
            .await
            .map_err(|e| RegistrationError::LedgerConfigUnavailable(e.to_string()))?;
        let (address, abi) = info
            .require()
            .map_err(|e| RegistrationError::LedgerConfigUnavailable(e.to_string()))?;
        let function = FunctionSpec::from_abi(abi, &self.options.method)
            .map_err(|e| RegistrationError::LedgerConfigUnavailable(e.to_string()))?;

        let accounts = ledger
            .request_accounts()
            .await
            .map_err(|e| RegistrationError::from_ledger(&staged.document_id, None, e))?;
        let from = match &self.options.from {
            Some(from) => from.clone(),
            None => accounts.into_iter().next().ok_or_else(|| {
                RegistrationError::WalletUnavailable("wallet exposed no accounts".into())
            })?,
        };

        let call = LedgerCall {
            target: LedgerTarget {
                contract_address: address.to_string(),
                function,
            },
            from: Some(from),
            document_id: staged.document_id.clone(),
            file_name: staged.file_name.clone(),
            file_hash: staged.file_hash,
        };
        // Arity or argument problems surface here rather than in the wallet.
        call.calldata()
            .map_err(|e| RegistrationError::LedgerConfigUnavailable(e.to_string()))?;
        Ok(call)
    }

    /// Submit the call and wait, without a timeout, for its receipt.
    async fn submit(
        &self,
        ledger: &dyn LedgerAdapter,
        call: &LedgerCall,
        fingerprint: FileHash,
        progress: &watch::Sender<RegistrationState>,
    ) -> Result<MinedCheckpoint, RegistrationError> {
        let document_id = &call.document_id;
        let mut attempt = TransactionAttempt::new(document_id.clone(), fingerprint);

        let gas_limit = gas_limit_for(ledger, call).await;
        tracing::info!(
            adapter = ledger.name(),
            document_id = %document_id,
            gas_limit,
            "submitting registration transaction"
        );
        let mut events = ledger
            .send(call, gas_limit)
            .await
            .map_err(|e| RegistrationError::from_ledger(document_id, None, e))?;

        while attempt.receipt.is_none() {
            match next_event(&mut events, document_id, &attempt).await? {
                TxEvent::Hash(tx_hash) => {
                    if attempt.tx_hash.is_some() {
                        continue;
                    }
                    tracing::info!(
                        document_id = %document_id,
                        tx_hash = %tx_hash,
                        "transaction submitted"
                    );
                    publish(
                        progress,
                        RegistrationState::Submitted {
                            document_id: document_id.clone(),
                            tx_hash: tx_hash.clone(),
                        },
                    );
                    attempt.tx_hash = Some(tx_hash);
                }
                TxEvent::Receipt(receipt) => {
                    attempt.receipt = Some(receipt);
                }
                TxEvent::Error(e) => {
                    return Err(RegistrationError::from_ledger(
                        document_id,
                        attempt.tx_hash.clone(),
                        e,
                    ));
                }
            }
        }

        let checkpoint = attempt.checkpoint().ok_or_else(|| RegistrationError::TransactionFailed {
            document_id: document_id.clone(),
            tx_hash: attempt.tx_hash.clone(),
            reason: "no receipt".into(),
        })?;
        tracing::info!(
            document_id = %checkpoint.document_id,
            tx_hash = %checkpoint.tx_hash,
            block_number = ?checkpoint.block_number,
            "transaction mined"
        );
        publish(progress, RegistrationState::Mined(checkpoint.clone()));
        Ok(checkpoint)
    }

    /// Re-drive the confirm step from a mined checkpoint.
    ///
    /// Safe to repeat: the registry treats confirming an already confirmed
    /// document as a no-op.
    pub async fn confirm(
        &self,
        checkpoint: &MinedCheckpoint,
    ) -> Result<ConfirmedRegistration, RegistrationError> {
        let result = self.confirm_inner(checkpoint).await;
        if let Err(e) = &result {
            tracing::error!("{e}");
        }
        result
    }

    async fn confirm_inner(
        &self,
        checkpoint: &MinedCheckpoint,
    ) -> Result<ConfirmedRegistration, RegistrationError> {
        let failed = |reason: String| RegistrationError::ConfirmFailed {
            checkpoint: checkpoint.clone(),
            reason,
        };

        let request = ConfirmRequest {
            document_id: checkpoint.document_id.clone(),
            blockchain_tx: checkpoint.tx_hash.clone(),
            block_number: checkpoint.block_number,
        };
        let reply = self
            .backend
            .confirm(&request)
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !reply.success {
            return Err(failed(
                reply
                    .error
                    .or(reply.message)
                    .unwrap_or_else(|| "registry refused the confirmation".into()),
            ));
        }

        let tx_hash = match reply.blockchain_tx.filter(|tx| !tx.is_empty()) {
            Some(stored) if stored != checkpoint.tx_hash => {
                tracing::warn!(
                    document_id = %checkpoint.document_id,
                    stored = %stored,
                    submitted = %checkpoint.tx_hash,
                    "document was already confirmed with another transaction"
                );
                stored
            }
            _ => checkpoint.tx_hash.clone(),
        };

        tracing::info!(
            document_id = %checkpoint.document_id,
            tx_hash = %tx_hash,
            "registration confirmed"
        );
        Ok(ConfirmedRegistration {
            document_id: checkpoint.document_id.clone(),
            tx_hash,
            block_number: reply.block_number.or(checkpoint.block_number),
        })
    }
}

async fn next_event(
    events: &mut mpsc::Receiver<TxEvent>,
    document_id: &DocumentId,
    attempt: &TransactionAttempt,
) -> Result<TxEvent, RegistrationError> {
    events.recv().await.ok_or_else(|| {
        RegistrationError::from_ledger(
            document_id,
            attempt.tx_hash.clone(),
            LedgerError::Transport("adapter closed the event stream".into()),
        )
    })
}

fn publish(progress: &watch::Sender<RegistrationState>, state: RegistrationState) {
    tracing::debug!(state = state.label(), "registration state");
    progress.send_replace(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchain_ledger::Receipt;
    use docchain_nullables::{NullBackend, NullLedger};
    use docchain_types::TxHash;

    fn file() -> DocumentFile {
        DocumentFile::from_bytes("contract.pdf", b"signed contract".to_vec())
    }

    fn receipt(tx: &str, block: u64) -> Receipt {
        Receipt {
            tx_hash: TxHash::new(tx),
            block_number: Some(block),
        }
    }

    fn coordinator(backend: &Arc<NullBackend>, ledger: Option<&Arc<NullLedger>>) -> Coordinator {
        Coordinator::new(
            backend.clone(),
            ledger.map(|l| l.clone() as Arc<dyn LedgerAdapter>),
            CoordinatorOptions::default(),
        )
    }

    #[tokio::test]
    async fn happy_path_confirms_and_records_tx() {
        let backend = Arc::new(NullBackend::with_contract());
        let ledger = Arc::new(NullLedger::new());
        ledger.script(vec![
            TxEvent::Hash(TxHash::new("0xT1")),
            TxEvent::Receipt(receipt("0xT1", 5)),
        ]);
        let coord = coordinator(&backend, Some(&ledger));
        let (tx, rx) = watch::channel(RegistrationState::Idle);

        let outcome = coord.register(&file(), "alice", &tx).await.unwrap();
        assert_eq!(outcome.tx_hash(), Some(&TxHash::new("0xT1")));
        assert!(matches!(*rx.borrow(), RegistrationState::Confirmed(_)));

        let record = backend.record(outcome.document_id()).unwrap();
        assert!(record.registered);
        assert_eq!(record.blockchain_tx, Some(TxHash::new("0xT1")));
        assert_eq!(record.block_number, Some(5));

        let sent = ledger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].call.document_id, *outcome.document_id());
        assert_eq!(sent[0].call.file_hash, file().fingerprint());
    }

    #[tokio::test]
    async fn without_ledger_stops_after_staging() {
        let backend = Arc::new(NullBackend::new());
        let coord = coordinator(&backend, None);
        let (tx, rx) = watch::channel(RegistrationState::Idle);

        let outcome = coord.register(&file(), "alice", &tx).await.unwrap();
        assert!(matches!(outcome, RegistrationOutcome::Staged(_)));
        assert!(matches!(*rx.borrow(), RegistrationState::Staged { .. }));
        assert!(!backend.record(outcome.document_id()).unwrap().registered);
    }

    #[tokio::test]
    async fn user_rejection_leaves_record_staged() {
        let backend = Arc::new(NullBackend::with_contract());
        let ledger = Arc::new(NullLedger::new());
        ledger.script(vec![TxEvent::Error(LedgerError::Rejected)]);
        let coord = coordinator(&backend, Some(&ledger));
        let (tx, rx) = watch::channel(RegistrationState::Idle);

        let err = coord.register(&file(), "alice", &tx).await.unwrap_err();
        let RegistrationError::UserRejected { document_id } = err.clone() else {
            panic!("expected UserRejected, got {err:?}");
        };
        let record = backend.record(&document_id).unwrap();
        assert!(!record.registered);
        assert!(record.blockchain_tx.is_none());
        assert!(matches!(*rx.borrow(), RegistrationState::Failed { .. }));
        assert_eq!(ledger.sent().len(), 1);
    }

    #[tokio::test]
    async fn confirm_failure_keeps_checkpoint_and_can_be_redriven() {
        let backend = Arc::new(NullBackend::with_contract());
        backend.fail_confirm(true);
        let ledger = Arc::new(NullLedger::new());
        ledger.script(vec![
            TxEvent::Hash(TxHash::new("0xT1")),
            TxEvent::Receipt(receipt("0xT1", 5)),
        ]);
        let coord = coordinator(&backend, Some(&ledger));
        let (tx, rx) = watch::channel(RegistrationState::Idle);

        let err = coord.register(&file(), "alice", &tx).await.unwrap_err();
        let checkpoint = err.checkpoint().cloned().unwrap();
        assert_eq!(checkpoint.tx_hash, TxHash::new("0xT1"));
        assert!(matches!(*rx.borrow(), RegistrationState::Mined(_)));
        assert!(!backend.record(&checkpoint.document_id).unwrap().registered);

        backend.fail_confirm(false);
        let confirmed = coord.confirm(&checkpoint).await.unwrap();
        assert_eq!(confirmed.tx_hash, TxHash::new("0xT1"));
        // Repeating is harmless.
        coord.confirm(&checkpoint).await.unwrap();
        assert!(backend.record(&checkpoint.document_id).unwrap().registered);
        assert_eq!(ledger.sent().len(), 1);
    }

    #[tokio::test]
    async fn gas_estimation_failure_uses_fallback() {
        let backend = Arc::new(NullBackend::with_contract());
        let ledger = Arc::new(NullLedger::new());
        ledger.fail_estimate(true);
        ledger.script(vec![
            TxEvent::Hash(TxHash::new("0xT1")),
            TxEvent::Receipt(receipt("0xT1", 5)),
        ]);
        let coord = coordinator(&backend, Some(&ledger));
        let (tx, _rx) = watch::channel(RegistrationState::Idle);

        coord.register(&file(), "alice", &tx).await.unwrap();
        assert_eq!(
            ledger.sent()[0].gas_limit,
            docchain_ledger::FALLBACK_GAS_LIMIT
        );
    }

    #[tokio::test]
    async fn missing_contract_is_config_unavailable() {
        let backend = Arc::new(NullBackend::new());
        let ledger = Arc::new(NullLedger::new());
        let coord = coordinator(&backend, Some(&ledger));
        let (tx, _rx) = watch::channel(RegistrationState::Idle);

        let err = coord.register(&file(), "alice", &tx).await.unwrap_err();
        assert!(matches!(err, RegistrationError::LedgerConfigUnavailable(_)));
        assert!(ledger.sent().is_empty());
    }

    #[tokio::test]
    async fn rejected_upload_is_stage_failed() {
        let backend = Arc::new(NullBackend::with_contract());
        let ledger = Arc::new(NullLedger::new());
        let coord = coordinator(&backend, Some(&ledger));
        let (tx, _rx) = watch::channel(RegistrationState::Idle);

        let exe = DocumentFile::from_bytes("tool.exe", b"MZ".to_vec());
        let err = coord.register(&exe, "alice", &tx).await.unwrap_err();
        assert!(matches!(err, RegistrationError::StageFailed(_)));
        assert!(ledger.sent().is_empty());
    }

    #[tokio::test]
    async fn closed_stream_after_hash_keeps_tx_hash() {
        let backend = Arc::new(NullBackend::with_contract());
        let ledger = Arc::new(NullLedger::new());
        ledger.script(vec![TxEvent::Hash(TxHash::new("0xT1"))]);
        let coord = coordinator(&backend, Some(&ledger));
        let (tx, _rx) = watch::channel(RegistrationState::Idle);

        let err = coord.register(&file(), "alice", &tx).await.unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::TransactionFailed { tx_hash: Some(ref h), .. }
                if h.as_str() == "0xT1"
        ));
    }

    #[tokio::test]
    async fn concurrent_attempt_for_same_file_is_refused() {
        let backend = Arc::new(NullBackend::with_contract());
        let ledger = Arc::new(NullLedger::new());
        let gate = ledger.hold();
        ledger.script(vec![
            TxEvent::Hash(TxHash::new("0xT1")),
            TxEvent::Receipt(receipt("0xT1", 5)),
        ]);
        let coord = Arc::new(coordinator(&backend, Some(&ledger)));

        let first = {
            let coord = coord.clone();
            tokio::spawn(async move {
                let (tx, _rx) = watch::channel(RegistrationState::Idle);
                coord.register(&file(), "alice", &tx).await
            })
        };
        while !coord.is_in_flight(&file().fingerprint()) {
            tokio::task::yield_now().await;
        }

        let (tx, _rx) = watch::channel(RegistrationState::Idle);
        let err = coord.register(&file(), "alice", &tx).await.unwrap_err();
        assert!(matches!(err, RegistrationError::AlreadyInFlight(_)));

        gate.release();
        first.await.unwrap().unwrap();
        assert!(!coord.is_in_flight(&file().fingerprint()));
    }
}
