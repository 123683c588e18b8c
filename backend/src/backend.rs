//! The registry capability the registration and verification flows use.

use async_trait::async_trait;
use docchain_types::{DocumentId, DocumentRecord, HistoryEntry, RegistryStats};

use crate::error::BackendError;
use crate::wire::{
    ConfirmReply, ConfirmRequest, ContractInfo, HealthReply, ListedDocument, UploadReply,
    UploadRequest, VerifyReply, VerifyRequest,
};

/// A document registry reachable by request/response round trips.
///
/// Every method is independent; none holds state between calls.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Stage a document. The registry hashes it and assigns an id.
    async fn upload(&self, request: &UploadRequest) -> Result<UploadReply, BackendError>;

    /// Contract address and ABI used to anchor registrations.
    async fn contract(&self) -> Result<ContractInfo, BackendError>;

    /// Record the mined transaction for a staged document.
    ///
    /// Repeating the call for an already confirmed document is a no-op.
    async fn confirm(&self, request: &ConfirmRequest) -> Result<ConfirmReply, BackendError>;

    /// Ask the registry whether a file matches what it holds.
    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyReply, BackendError>;

    /// Every document, newest first.
    async fn documents(&self) -> Result<Vec<DocumentRecord>, BackendError>;

    /// The document listing as the listing scan reads it.
    ///
    /// Unlike [`RegistryBackend::documents`], rows missing a hash or
    /// timestamp are kept.
    async fn listing(&self) -> Result<Vec<ListedDocument>, BackendError> {
        Ok(self
            .documents()
            .await?
            .into_iter()
            .map(ListedDocument::from)
            .collect())
    }

    /// Audit history, newest first.
    async fn history(&self) -> Result<Vec<HistoryEntry>, BackendError>;

    /// Aggregate counts.
    async fn stats(&self) -> Result<RegistryStats, BackendError>;

    /// Liveness check.
    async fn health(&self) -> Result<HealthReply, BackendError>;

    /// Look up one document by id from the listing.
    async fn document(&self, id: &DocumentId) -> Result<Option<DocumentRecord>, BackendError> {
        Ok(self
            .documents()
            .await?
            .into_iter()
            .find(|d| &d.document_id == id))
    }
}
