//! Typed reading of a verify reply.
//!
//! Registries signal their answer in several ways: an explicit `verified`
//! flag, a free-text `reason`, or just the `stored_hash` they hold. The
//! substring matching needed to interpret `reason` lives here and nowhere
//! else; callers work with [`BackendVerdict`].

use docchain_types::{DocumentId, TxHash};

use crate::wire::VerifyReply;

/// What a free-text `reason` says about the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonKind {
    NotRegistered,
    Tampered,
    Other,
}

/// Classify a `reason` string.
///
/// Absence wins over mismatch when both appear, matching the order in
/// which a verify reply is interpreted.
pub fn classify_reason(reason: &str) -> ReasonKind {
    let text: String = reason
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();

    const ABSENT: &[&str] = &["not registered", "not found", "unregistered", "no record"];
    const TAMPERED: &[&str] = &["tamper", "mismatch", "modified", "altered"];

    if ABSENT.iter().any(|p| text.contains(p)) {
        ReasonKind::NotRegistered
    } else if TAMPERED.iter().any(|p| text.contains(p)) {
        ReasonKind::Tampered
    } else {
        ReasonKind::Other
    }
}

/// The registry's answer to a verify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendVerdict {
    /// `verified` was `true`.
    Verified {
        document_id: Option<DocumentId>,
        tx_hash: Option<TxHash>,
    },
    /// `reason` says the document is absent from the registry.
    NotRegistered,
    /// `reason` says the content does not match what was registered.
    Tampered {
        stored_hash: Option<String>,
        document_id: Option<DocumentId>,
        tx_hash: Option<TxHash>,
    },
    /// No verdict, but the registry disclosed the hash it holds.
    StoredHash {
        stored_hash: String,
        document_id: Option<DocumentId>,
        tx_hash: Option<TxHash>,
    },
    /// Nothing decisive; carries the `reason` text if any.
    Unclassified(Option<String>),
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl VerifyReply {
    /// Interpret this reply. First match wins:
    /// 1. `verified == true`
    /// 2. `reason` reads as not registered
    /// 3. `reason` reads as tampered
    /// 4. `stored_hash` present
    /// 5. otherwise unclassified
    pub fn verdict(&self) -> BackendVerdict {
        let document_id = self
            .document_id
            .clone()
            .filter(|id| !id.as_str().is_empty());
        let tx_hash = self.blockchain_tx.clone().filter(|tx| !tx.is_empty());
        let stored_hash = non_empty(&self.stored_hash);
        let reason = non_empty(&self.reason);

        if self.verified == Some(true) {
            return BackendVerdict::Verified {
                document_id,
                tx_hash,
            };
        }

        match reason.as_deref().map(classify_reason) {
            Some(ReasonKind::NotRegistered) => return BackendVerdict::NotRegistered,
            Some(ReasonKind::Tampered) => {
                return BackendVerdict::Tampered {
                    stored_hash,
                    document_id,
                    tx_hash,
                }
            }
            _ => {}
        }

        match stored_hash {
            Some(stored_hash) => BackendVerdict::StoredHash {
                stored_hash,
                document_id,
                tx_hash,
            },
            None => BackendVerdict::Unclassified(reason),
        }
    }
}
