//! In-memory document registry.
//!
//! All methods take the current time explicitly so tests can drive a
//! deterministic clock.

use std::cmp::Reverse;
use std::collections::{HashMap, VecDeque};

use docchain_backend::{UploadReply, VerifyReply};
use docchain_crypto::fingerprint;
use docchain_types::record::Confirmation;
use docchain_types::validate::{check_extension, check_size, sanitize_file_name, validate_owner};
use docchain_types::{
    DocumentId, DocumentRecord, FileHash, HistoryAction, HistoryEntry, RegistryStats, Timestamp,
    TxHash, TypesError,
};
use uuid::Uuid;

use crate::error::RegistryError;

/// Audit history entries kept by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Documents keyed by id plus a bounded audit history.
pub struct Registry {
    documents: HashMap<DocumentId, DocumentRecord>,
    /// Insertion order of `documents`, used to break timestamp ties.
    order: Vec<DocumentId>,
    history: VecDeque<HistoryEntry>,
    history_limit: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            documents: HashMap::new(),
            order: Vec::new(),
            history: VecDeque::new(),
            history_limit,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &DocumentId) -> Option<&DocumentRecord> {
        self.documents.get(id)
    }

    fn record_event(&mut self, entry: HistoryEntry) {
        self.history.push_back(entry);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    /// Stage a document under a fresh UUIDv4 id.
    pub fn upload(
        &mut self,
        file_name: &str,
        bytes: &[u8],
        owner: Option<&str>,
        now: Timestamp,
    ) -> Result<DocumentRecord, RegistryError> {
        check_extension(file_name)?;
        check_size(bytes.len() as u64)?;
        let file_name = sanitize_file_name(file_name);
        if file_name.is_empty() {
            return Err(TypesError::EmptyFileName.into());
        }
        let owner = validate_owner(owner)?;

        let id = DocumentId::new(Uuid::new_v4().to_string());
        let record = DocumentRecord::staged(id.clone(), file_name, fingerprint(bytes), owner, now);

        self.record_event(HistoryEntry {
            timestamp: now,
            action: HistoryAction::UploadPrepared,
            file_name: Some(record.file_name.clone()),
            document_id: Some(id.clone()),
            file_hash: Some(record.file_hash),
            owner: Some(record.owner.clone()),
            success: true,
            blockchain_tx: None,
            block_number: None,
            reason: None,
        });
        tracing::info!(document_id = %id, file_name = %record.file_name, "document staged");

        self.documents.insert(id.clone(), record.clone());
        self.order.push(id);
        Ok(record)
    }

    /// Record the anchoring transaction for a staged document.
    ///
    /// Confirming an already confirmed document changes nothing and hands
    /// back the stored record.
    pub fn confirm(
        &mut self,
        document_id: &str,
        blockchain_tx: &str,
        block_number: Option<u64>,
        now: Timestamp,
    ) -> Result<(DocumentRecord, Confirmation), RegistryError> {
        if document_id.trim().is_empty() || blockchain_tx.trim().is_empty() {
            return Err(RegistryError::MissingField(
                "documentID and blockchainTx are required",
            ));
        }
        let id = DocumentId::parse(document_id)?;
        let record = self.documents.get_mut(&id).ok_or(RegistryError::NotFound)?;

        let result = record.confirm(TxHash::new(blockchain_tx.trim()), block_number, now);
        let record = record.clone();
        match result {
            Confirmation::Applied => {
                tracing::info!(document_id = %id, tx = %blockchain_tx, "registration confirmed");
                self.record_event(HistoryEntry {
                    timestamp: now,
                    action: HistoryAction::BlockchainConfirmed,
                    file_name: Some(record.file_name.clone()),
                    document_id: Some(id),
                    file_hash: Some(record.file_hash),
                    owner: None,
                    success: true,
                    blockchain_tx: record.blockchain_tx.clone(),
                    block_number: record.block_number,
                    reason: None,
                });
            }
            Confirmation::AlreadyConfirmed => {
                tracing::debug!(document_id = %id, "already confirmed, ignoring");
            }
        }
        Ok((record, result))
    }

    /// Check a presented file, against `hint` if given, else by hash.
    pub fn verify(
        &mut self,
        file_name: &str,
        bytes: &[u8],
        hint: Option<&str>,
        now: Timestamp,
    ) -> Result<VerifyReply, RegistryError> {
        if file_name.is_empty() {
            return Err(TypesError::EmptyFileName.into());
        }
        let computed = fingerprint(bytes);
        let hint = hint
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(DocumentId::parse)
            .transpose()?;

        let reply = match hint {
            Some(id) => match self.documents.get(&id) {
                None => {
                    self.verify_event(
                        now,
                        file_name,
                        Some(id.clone()),
                        computed,
                        None,
                        Some("not_registered"),
                    );
                    VerifyReply {
                        verified: Some(false),
                        reason: Some("not_registered".into()),
                        computed_hash: Some(computed.to_hex()),
                        document_id: Some(id),
                        message: Some("Document ID not found in registry".into()),
                        ..Default::default()
                    }
                }
                Some(record) if record.file_hash == computed => {
                    let reply = verified_reply(record, computed, true);
                    let (name, tx) = (record.file_name.clone(), record.blockchain_tx.clone());
                    self.verify_event(now, &name, Some(id), computed, tx, None);
                    reply
                }
                Some(record) => {
                    let reply = VerifyReply {
                        verified: Some(false),
                        reason: Some("tampered".into()),
                        computed_hash: Some(computed.to_hex()),
                        stored_hash: Some(record.file_hash.to_hex()),
                        document_id: Some(id.clone()),
                        file_name: Some(record.file_name.clone()),
                        blockchain_tx: record.blockchain_tx.clone(),
                        message: Some(
                            "Document has been tampered with. Hash mismatch detected.".into(),
                        ),
                        ..Default::default()
                    };
                    let (name, tx) = (record.file_name.clone(), record.blockchain_tx.clone());
                    self.verify_event(now, &name, Some(id), computed, tx, Some("tampered"));
                    reply
                }
            },
            None => {
                let found = self
                    .order
                    .iter()
                    .filter_map(|id| self.documents.get(id))
                    .find(|r| r.file_hash == computed)
                    .cloned();
                match found {
                    Some(record) => {
                        let reply = verified_reply(&record, computed, false);
                        self.verify_event(
                            now,
                            &record.file_name,
                            Some(record.document_id.clone()),
                            computed,
                            record.blockchain_tx.clone(),
                            None,
                        );
                        reply
                    }
                    None => {
                        self.verify_event(
                            now,
                            file_name,
                            None,
                            computed,
                            None,
                            Some("not_registered"),
                        );
                        VerifyReply {
                            verified: Some(false),
                            reason: Some("not_registered".into()),
                            computed_hash: Some(computed.to_hex()),
                            message: Some(
                                "Document not found in registry. Hash not recognized.".into(),
                            ),
                            ..Default::default()
                        }
                    }
                }
            }
        };
        Ok(reply)
    }

    fn verify_event(
        &mut self,
        now: Timestamp,
        file_name: &str,
        document_id: Option<DocumentId>,
        computed: FileHash,
        blockchain_tx: Option<TxHash>,
        failure: Option<&str>,
    ) {
        self.record_event(HistoryEntry {
            timestamp: now,
            action: if failure.is_none() {
                HistoryAction::VerifySuccess
            } else {
                HistoryAction::VerifyFailed
            },
            file_name: Some(file_name.to_string()),
            document_id,
            file_hash: Some(computed),
            owner: None,
            success: failure.is_none(),
            blockchain_tx,
            block_number: None,
            reason: failure.map(str::to_string),
        });
    }

    /// Every document, newest first.
    pub fn documents(&self) -> Vec<DocumentRecord> {
        let mut docs: Vec<DocumentRecord> = self
            .order
            .iter()
            .rev()
            .filter_map(|id| self.documents.get(id).cloned())
            .collect();
        docs.sort_by_key(|d| Reverse(d.timestamp));
        docs
    }

    /// Retained history, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        let mut entries: Vec<HistoryEntry> = self.history.iter().rev().cloned().collect();
        entries.sort_by_key(|e| Reverse(e.timestamp));
        entries
    }

    pub fn stats(&self) -> RegistryStats {
        let total = self.documents.len() as u64;
        let registered = self.documents.values().filter(|d| d.registered).count() as u64;
        let verifications = self
            .history
            .iter()
            .filter(|h| h.action.is_verification())
            .count() as u64;
        let successful = self
            .history
            .iter()
            .filter(|h| h.action == HistoryAction::VerifySuccess)
            .count() as u64;
        RegistryStats {
            total_documents: total,
            registered_documents: registered,
            pending_documents: total - registered,
            total_verifications: verifications,
            successful_verifications: successful,
            failed_verifications: verifications - successful,
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn verified_reply(record: &DocumentRecord, computed: FileHash, with_stored: bool) -> VerifyReply {
    VerifyReply {
        verified: Some(true),
        reason: Some("verified".into()),
        computed_hash: Some(computed.to_hex()),
        stored_hash: with_stored.then(|| record.file_hash.to_hex()),
        document_id: Some(record.document_id.clone()),
        file_name: Some(record.file_name.clone()),
        owner: Some(record.owner.clone()),
        timestamp: Some(record.timestamp),
        blockchain_tx: record.blockchain_tx.clone(),
        block_number: record.block_number,
        message: Some("Document verified successfully. Hashes match.".into()),
    }
}

/// Upload reply for a freshly staged record.
pub fn upload_reply(record: &DocumentRecord) -> UploadReply {
    UploadReply {
        success: true,
        document_id: Some(record.document_id.clone()),
        file_hash: Some(record.file_hash.to_hex()),
        file_name: Some(record.file_name.clone()),
        owner: Some(record.owner.clone()),
        timestamp: Some(record.timestamp),
        message: Some("File uploaded. Complete registration by anchoring it on the ledger.".into()),
        error: None,
    }
}

/// Verify-shaped body for a verify request the registry refuses.
pub fn rejected_verify(error: &RegistryError) -> VerifyReply {
    let reason = match error {
        RegistryError::Invalid(TypesError::InvalidDocumentId(_)) => "invalid_document_id",
        RegistryError::Invalid(TypesError::EmptyFileName) => "empty_filename",
        RegistryError::MissingField(_) => "no_file",
        _ => "validation_error",
    };
    VerifyReply {
        verified: Some(false),
        reason: Some(reason.into()),
        message: Some(error.to_string()),
        ..Default::default()
    }
}
