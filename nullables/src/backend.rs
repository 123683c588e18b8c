//! Nullable registry backend: the reference registry, in process.

use async_trait::async_trait;
use docchain_backend::{
    BackendError, ConfirmReply, ConfirmRequest, ContractInfo, HealthReply, ListedDocument,
    RegistryBackend, UploadReply, UploadRequest, VerifyReply, VerifyRequest,
};
use docchain_crypto::DocumentFile;
use docchain_server::registry::{rejected_verify, upload_reply};
use docchain_server::{Registry, RegistryError};
use docchain_types::{DocumentId, DocumentRecord, HistoryEntry, RegistryStats};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::clock::NullClock;

/// Contract address reported by [`NullBackend::with_contract`].
pub const NULL_CONTRACT: &str = "0x00000000000000000000000000000000000000aa";

/// ABI declaring `registerDocument(string,string,string)`.
pub fn registry_abi() -> Value {
    json!([{
        "type": "function",
        "name": "registerDocument",
        "stateMutability": "nonpayable",
        "inputs": [
            {"name": "documentID", "type": "string"},
            {"name": "fileName", "type": "string"},
            {"name": "fileHash", "type": "string"}
        ],
        "outputs": []
    }])
}

/// A [`RegistryBackend`] backed by an in-memory [`Registry`].
///
/// Individual endpoints can be made to fail, and verify replies can be
/// scripted to imitate registries that answer differently from the
/// reference one.
pub struct NullBackend {
    registry: Mutex<Registry>,
    contract: Mutex<ContractInfo>,
    clock: NullClock,
    scripted_verify: Mutex<VecDeque<VerifyReply>>,
    extra_rows: Mutex<Vec<ListedDocument>>,
    fail_confirm: AtomicBool,
    fail_documents: AtomicBool,
    fail_verify: AtomicBool,
    confirm_calls: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn status(error: RegistryError) -> BackendError {
    BackendError::Status {
        status: error.status(),
        message: error.to_string(),
    }
}

impl NullBackend {
    /// A registry with no contract configured.
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
            contract: Mutex::new(ContractInfo::default()),
            clock: NullClock::default(),
            scripted_verify: Mutex::new(VecDeque::new()),
            extra_rows: Mutex::new(Vec::new()),
            fail_confirm: AtomicBool::new(false),
            fail_documents: AtomicBool::new(false),
            fail_verify: AtomicBool::new(false),
            confirm_calls: AtomicUsize::new(0),
        }
    }

    /// A registry advertising [`NULL_CONTRACT`] with [`registry_abi`].
    pub fn with_contract() -> Self {
        let backend = Self::new();
        backend.set_contract(ContractInfo {
            contract_address: Some(NULL_CONTRACT.to_string()),
            contract_abi: Some(registry_abi()),
            network: Some("Null Network".into()),
            explorer: None,
        });
        backend
    }

    pub fn set_contract(&self, contract: ContractInfo) {
        *lock(&self.contract) = contract;
    }

    pub fn clock(&self) -> &NullClock {
        &self.clock
    }

    /// Stage a document directly, bypassing the trait.
    pub fn stage(&self, file: &DocumentFile, owner: &str) -> Result<DocumentId, RegistryError> {
        lock(&self.registry)
            .upload(file.file_name(), file.bytes(), Some(owner), self.clock.now())
            .map(|record| record.document_id)
    }

    /// Current state of one record.
    pub fn record(&self, id: &DocumentId) -> Option<DocumentRecord> {
        lock(&self.registry).get(id).cloned()
    }

    /// Queue a reply for the next `verify` call, in place of the registry's.
    pub fn script_verify(&self, reply: VerifyReply) {
        lock(&self.scripted_verify).push_back(reply);
    }

    /// Put a raw row at the head of the listing, ahead of the registry's
    /// own documents. Used to imitate rows left behind by older registries.
    pub fn list_row(&self, row: ListedDocument) {
        lock(&self.extra_rows).push(row);
    }

    fn check_documents(&self) -> Result<(), BackendError> {
        if self.fail_documents.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                status: 500,
                message: "Failed to retrieve documents".into(),
            });
        }
        Ok(())
    }

    pub fn fail_confirm(&self, fail: bool) {
        self.fail_confirm.store(fail, Ordering::SeqCst);
    }

    pub fn fail_documents(&self, fail: bool) {
        self.fail_documents.store(fail, Ordering::SeqCst);
    }

    pub fn fail_verify(&self, fail: bool) {
        self.fail_verify.store(fail, Ordering::SeqCst);
    }

    /// Number of confirm requests received, failed ones included.
    pub fn confirm_calls(&self) -> usize {
        self.confirm_calls.load(Ordering::SeqCst)
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryBackend for NullBackend {
    async fn upload(&self, request: &UploadRequest) -> Result<UploadReply, BackendError> {
        let owner = Some(request.owner.as_str());
        lock(&self.registry)
            .upload(&request.file_name, &request.bytes, owner, self.clock.now())
            .map(|record| upload_reply(&record))
            .map_err(status)
    }

    async fn contract(&self) -> Result<ContractInfo, BackendError> {
        Ok(lock(&self.contract).clone())
    }

    async fn confirm(&self, request: &ConfirmRequest) -> Result<ConfirmReply, BackendError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_confirm.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("confirm endpoint unreachable".into()));
        }
        let (record, _) = lock(&self.registry)
            .confirm(
                request.document_id.as_str(),
                request.blockchain_tx.as_str(),
                request.block_number,
                self.clock.now(),
            )
            .map_err(status)?;
        Ok(ConfirmReply {
            success: true,
            document_id: Some(record.document_id),
            blockchain_tx: record.blockchain_tx,
            block_number: record.block_number,
            message: None,
            error: None,
        })
    }

    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyReply, BackendError> {
        if self.fail_verify.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("verify endpoint unreachable".into()));
        }
        if let Some(reply) = lock(&self.scripted_verify).pop_front() {
            return Ok(reply);
        }
        let hint = request.document_id.as_ref().map(DocumentId::as_str);
        let result = lock(&self.registry).verify(
            &request.file_name,
            &request.bytes,
            hint,
            self.clock.now(),
        );
        Ok(result.unwrap_or_else(|e| rejected_verify(&e)))
    }

    async fn documents(&self) -> Result<Vec<DocumentRecord>, BackendError> {
        self.check_documents()?;
        Ok(lock(&self.registry).documents())
    }

    async fn listing(&self) -> Result<Vec<ListedDocument>, BackendError> {
        self.check_documents()?;
        let mut rows = lock(&self.extra_rows).clone();
        rows.extend(
            lock(&self.registry)
                .documents()
                .into_iter()
                .map(ListedDocument::from),
        );
        Ok(rows)
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, BackendError> {
        Ok(lock(&self.registry).history())
    }

    async fn stats(&self) -> Result<RegistryStats, BackendError> {
        Ok(lock(&self.registry).stats())
    }

    async fn health(&self) -> Result<HealthReply, BackendError> {
        Ok(HealthReply {
            status: "healthy".into(),
            timestamp: self.clock.now(),
            version: None,
        })
    }
}
