//! Request and reply bodies of the registry's HTTP surface.
//!
//! Replies are deliberately permissive: every field the registry may omit
//! is optional, and validation happens in the `into_*` conversions where
//! the caller decides what a missing field means.

use docchain_types::{DocumentId, DocumentRecord, FileHash, Timestamp, TxHash};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BackendError;

/// `POST /api/upload` multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub owner: String,
}

/// `POST /api/upload` reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadReply {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "documentID", default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    #[serde(rename = "fileHash", default, skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
    #[serde(rename = "fileName", default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A successfully staged document, as acknowledged by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedDocument {
    pub document_id: DocumentId,
    pub file_hash: FileHash,
    pub file_name: String,
    pub owner: Option<String>,
}

impl UploadReply {
    /// Validate the reply into a [`StagedDocument`].
    ///
    /// Requires `success`, a non-empty `documentID`, a well-formed
    /// `fileHash` and a `fileName`.
    pub fn into_staged(self) -> Result<StagedDocument, BackendError> {
        if !self.success {
            return Err(BackendError::Rejected(
                self.error
                    .or(self.message)
                    .unwrap_or_else(|| "upload was not accepted".to_string()),
            ));
        }
        let document_id = self
            .document_id
            .filter(|id| !id.as_str().is_empty())
            .ok_or_else(|| BackendError::InvalidResponse("upload reply has no documentID".into()))?;
        let file_hash = self
            .file_hash
            .as_deref()
            .ok_or_else(|| BackendError::InvalidResponse("upload reply has no fileHash".into()))
            .and_then(|h| {
                FileHash::parse(h).map_err(|e| BackendError::InvalidResponse(e.to_string()))
            })?;
        let file_name = self
            .file_name
            .ok_or_else(|| BackendError::InvalidResponse("upload reply has no fileName".into()))?;
        Ok(StagedDocument {
            document_id,
            file_hash,
            file_name,
            owner: self.owner,
        })
    }
}

/// `GET /api/contract` reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractInfo {
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub contract_abi: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer: Option<String>,
}

impl ContractInfo {
    /// The contract address and ABI, or an error naming what is missing.
    pub fn require(&self) -> Result<(&str, &Value), BackendError> {
        let address = self
            .contract_address
            .as_deref()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| BackendError::InvalidResponse("contract_address missing".into()))?;
        let abi = self
            .contract_abi
            .as_ref()
            .filter(|abi| !abi.is_null())
            .ok_or_else(|| BackendError::InvalidResponse("contract_abi missing".into()))?;
        Ok((address, abi))
    }
}

/// `POST /api/confirm_register` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmRequest {
    #[serde(rename = "documentID")]
    pub document_id: DocumentId,
    #[serde(rename = "blockchainTx")]
    pub blockchain_tx: TxHash,
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<u64>,
}

/// `POST /api/confirm_register` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmReply {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "documentID", default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    #[serde(rename = "blockchainTx", default, skip_serializing_if = "Option::is_none")]
    pub blockchain_tx: Option<TxHash>,
    #[serde(rename = "blockNumber", default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `POST /verify` multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub document_id: Option<DocumentId>,
}

/// `POST /verify` reply.
///
/// Registries of different vintages fill different subsets of these
/// fields; see [`crate::verdict`] for how they are read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_hash: Option<String>,
    #[serde(rename = "documentID", default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_tx: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "fileName", default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(rename = "blockNumber", default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

/// One row of the `GET /api/documents` listing, read only as far as the
/// listing scan needs.
///
/// Rows written by older registries may carry a null `fileHash` or
/// `timestamp`; those still parse here and simply never match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListedDocument {
    #[serde(rename = "documentID", default)]
    pub document_id: Option<DocumentId>,
    #[serde(rename = "fileHash", default)]
    pub file_hash: Option<String>,
    #[serde(rename = "blockchainTx", default)]
    pub blockchain_tx: Option<TxHash>,
}

impl ListedDocument {
    /// Whether this row records `hash`, ignoring case and `0x`.
    pub fn matches(&self, hash: &FileHash) -> bool {
        self.file_hash
            .as_deref()
            .is_some_and(|stored| hash.matches_hex(stored))
    }
}

impl From<DocumentRecord> for ListedDocument {
    fn from(record: DocumentRecord) -> Self {
        Self {
            document_id: Some(record.document_id),
            file_hash: Some(record.file_hash.to_hex()),
            blockchain_tx: record.blockchain_tx,
        }
    }
}

/// `GET /health` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReply {
    pub status: String,
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hash() -> String {
        "cd".repeat(32)
    }

    #[test]
    fn staged_from_complete_reply() {
        let reply: UploadReply = serde_json::from_value(json!({
            "success": true,
            "documentID": "d1",
            "fileHash": format!("0x{}", hash().to_uppercase()),
            "fileName": "a.pdf",
            "owner": "alice",
            "instruction": "CALL_CONTRACT_WITH_METAMASK"
        }))
        .unwrap();
        let staged = reply.into_staged().unwrap();
        assert_eq!(staged.document_id.as_str(), "d1");
        assert_eq!(staged.file_hash.to_hex(), hash());
        assert_eq!(staged.owner.as_deref(), Some("alice"));
    }

    #[test]
    fn unsuccessful_reply_carries_error_text() {
        let reply: UploadReply =
            serde_json::from_value(json!({"success": false, "error": "File type not allowed"}))
                .unwrap();
        assert_eq!(
            reply.into_staged(),
            Err(BackendError::Rejected("File type not allowed".into()))
        );
    }

    #[test]
    fn reply_without_id_is_invalid() {
        let reply: UploadReply = serde_json::from_value(json!({
            "success": true, "fileHash": hash(), "fileName": "a.pdf"
        }))
        .unwrap();
        assert!(matches!(
            reply.into_staged(),
            Err(BackendError::InvalidResponse(_))
        ));
    }

    #[test]
    fn contract_info_requires_address_and_abi() {
        let full = ContractInfo {
            contract_address: Some("0xabc".into()),
            contract_abi: Some(json!([])),
            ..Default::default()
        };
        assert!(full.require().is_ok());

        let no_abi = ContractInfo {
            contract_address: Some("0xabc".into()),
            contract_abi: Some(Value::Null),
            ..Default::default()
        };
        assert!(no_abi.require().is_err());

        assert!(ContractInfo::default().require().is_err());
    }

    #[test]
    fn listed_row_with_null_hash_parses_and_never_matches() {
        let row: ListedDocument = serde_json::from_value(json!({
            "documentID": "legacy-1",
            "fileName": "old.pdf",
            "fileHash": null,
            "timestamp": null
        }))
        .unwrap();
        assert_eq!(row.document_id, Some(DocumentId::new("legacy-1")));
        assert!(!row.matches(&FileHash::parse(&hash()).unwrap()));

        let row: ListedDocument = serde_json::from_value(json!({
            "documentID": "d2",
            "fileHash": hash().to_uppercase()
        }))
        .unwrap();
        assert!(row.matches(&FileHash::parse(&hash()).unwrap()));
    }

    #[test]
    fn confirm_request_wire_keys() {
        let req = ConfirmRequest {
            document_id: DocumentId::new("d1"),
            blockchain_tx: TxHash::new("0xT1"),
            block_number: Some(5),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"documentID": "d1", "blockchainTx": "0xT1", "blockNumber": 5})
        );
    }
}
