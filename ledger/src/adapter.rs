//! The wallet/provider capability the registration flow depends on.

use async_trait::async_trait;
use docchain_types::{DocumentId, FileHash, TxHash};
use tokio::sync::mpsc;

use crate::abi::FunctionSpec;
use crate::error::LedgerError;

/// Where registrations are anchored: a contract address plus the resolved
/// registration function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTarget {
    pub contract_address: String,
    pub function: FunctionSpec,
}

/// A registration call ready to be signed and submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCall {
    pub target: LedgerTarget,
    /// Sending account. Chosen from `request_accounts` when not configured.
    pub from: Option<String>,
    pub document_id: DocumentId,
    pub file_name: String,
    pub file_hash: FileHash,
}

impl LedgerCall {
    /// ABI-encoded call data carrying `(documentID, fileName, fileHash)`.
    pub fn calldata(&self) -> Result<Vec<u8>, LedgerError> {
        let hash = self.file_hash.to_hex();
        self.target.function.encode(&[
            self.document_id.as_str(),
            self.file_name.as_str(),
            hash.as_str(),
        ])
    }
}

/// A mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Progress of one submitted transaction.
///
/// On the success path an adapter emits exactly one [`TxEvent::Hash`]
/// followed by exactly one [`TxEvent::Receipt`]. An [`TxEvent::Error`] may
/// arrive in place of either and ends the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxEvent {
    Hash(TxHash),
    Receipt(Receipt),
    Error(LedgerError),
}

/// Signs and submits ledger transactions on the user's behalf.
///
/// `send` may take arbitrarily long to produce its first event while the
/// user decides in their wallet; callers must not impose a timeout.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Human-readable adapter name (for logs).
    fn name(&self) -> &str;

    /// Accounts the user has exposed to this application.
    async fn request_accounts(&self) -> Result<Vec<String>, LedgerError>;

    /// Gas estimate for `call`. May fail; see [`crate::gas_limit_for`].
    async fn estimate_gas(&self, call: &LedgerCall) -> Result<u64, LedgerError>;

    /// Submit `call` with the given gas limit.
    ///
    /// Errors returned directly mean nothing was submitted. Once the
    /// receiver is handed back, every later outcome arrives as a [`TxEvent`].
    async fn send(
        &self,
        call: &LedgerCall,
        gas_limit: u64,
    ) -> Result<mpsc::Receiver<TxEvent>, LedgerError>;
}
