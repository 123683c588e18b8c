//! Registry records: documents, audit history, and aggregate stats.

use serde::{Deserialize, Serialize};

use crate::hash::{FileHash, TxHash};
use crate::id::DocumentId;
use crate::time::Timestamp;

fn default_owner() -> String {
    crate::validate::DEFAULT_OWNER.to_string()
}

/// A document as held by the registry.
///
/// Created staged (`registered == false`) on upload and moved to confirmed
/// exactly once by [`DocumentRecord::confirm`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(rename = "documentID")]
    pub document_id: DocumentId,
    #[serde(rename = "fileName", default)]
    pub file_name: String,
    #[serde(rename = "fileHash")]
    pub file_hash: FileHash,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(rename = "blockchainTx", default)]
    pub blockchain_tx: Option<TxHash>,
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub registered: bool,
    #[serde(rename = "registeredAt", default)]
    pub registered_at: Option<Timestamp>,
}

/// Result of applying a ledger confirmation to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The record moved from staged to confirmed.
    Applied,
    /// The record was already confirmed; nothing changed.
    AlreadyConfirmed,
}

impl DocumentRecord {
    /// A freshly uploaded, not yet anchored record.
    pub fn staged(
        document_id: DocumentId,
        file_name: impl Into<String>,
        file_hash: FileHash,
        owner: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            document_id,
            file_name: file_name.into(),
            file_hash,
            owner: owner.into(),
            timestamp,
            blockchain_tx: None,
            block_number: None,
            registered: false,
            registered_at: None,
        }
    }

    /// Record the ledger transaction that anchors this document.
    ///
    /// `blockchain_tx` only ever goes from `None` to `Some`; a second call
    /// is a no-op regardless of the transaction it carries.
    pub fn confirm(
        &mut self,
        tx: TxHash,
        block_number: Option<u64>,
        now: Timestamp,
    ) -> Confirmation {
        if self.registered || self.blockchain_tx.is_some() {
            return Confirmation::AlreadyConfirmed;
        }
        self.blockchain_tx = Some(tx);
        self.block_number = block_number;
        self.registered = true;
        self.registered_at = Some(now);
        Confirmation::Applied
    }
}

/// Kind of event recorded in the registry's audit history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    UploadPrepared,
    BlockchainConfirmed,
    VerifySuccess,
    VerifyFailed,
}

impl HistoryAction {
    pub fn is_verification(&self) -> bool {
        matches!(self, Self::VerifySuccess | Self::VerifyFailed)
    }
}

/// One entry of the registry's audit history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: Timestamp,
    pub action: HistoryAction,
    #[serde(rename = "fileName", default)]
    pub file_name: Option<String>,
    #[serde(rename = "documentID", default)]
    pub document_id: Option<DocumentId>,
    #[serde(rename = "fileHash", default)]
    pub file_hash: Option<FileHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub success: bool,
    #[serde(rename = "blockchainTx", default)]
    pub blockchain_tx: Option<TxHash>,
    #[serde(rename = "blockNumber", default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Aggregate counts over the registry and its history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_documents: u64,
    pub registered_documents: u64,
    pub pending_documents: u64,
    pub total_verifications: u64,
    pub successful_verifications: u64,
    pub failed_verifications: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DocumentRecord {
        DocumentRecord::staged(
            DocumentId::new("d1"),
            "contract.pdf",
            FileHash::new([7u8; 32]),
            "alice",
            Timestamp::new(100),
        )
    }

    #[test]
    fn confirm_sets_tx_once() {
        let mut r = record();
        assert_eq!(
            r.confirm(TxHash::new("0xT1"), Some(5), Timestamp::new(200)),
            Confirmation::Applied
        );
        assert!(r.registered);
        assert_eq!(r.blockchain_tx, Some(TxHash::new("0xT1")));

        let hash_before = r.file_hash;
        assert_eq!(
            r.confirm(TxHash::new("0xT2"), Some(9), Timestamp::new(300)),
            Confirmation::AlreadyConfirmed
        );
        assert_eq!(r.blockchain_tx, Some(TxHash::new("0xT1")));
        assert_eq!(r.block_number, Some(5));
        assert_eq!(r.registered_at, Some(Timestamp::new(200)));
        assert_eq!(r.file_hash, hash_before);
    }

    #[test]
    fn wire_form_uses_registry_keys() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["documentID"], "d1");
        assert_eq!(json["fileName"], "contract.pdf");
        assert_eq!(json["registered"], false);
        assert!(json["blockchainTx"].is_null());
    }

    #[test]
    fn sparse_listing_entry_uses_defaults() {
        let json = serde_json::json!({
            "documentID": "d9",
            "fileHash": format!("0x{}", "AB".repeat(32)),
        });
        let r: DocumentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(r.owner, "anonymous");
        assert!(!r.registered);
        assert_eq!(r.file_hash.to_hex(), "ab".repeat(32));
    }

    #[test]
    fn history_action_snake_case() {
        let s = serde_json::to_string(&HistoryAction::BlockchainConfirmed).unwrap();
        assert_eq!(s, "\"blockchain_confirmed\"");
        assert!(HistoryAction::VerifyFailed.is_verification());
        assert!(!HistoryAction::UploadPrepared.is_verification());
    }
}
