//! Fundamental types for DocChain.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! document identifiers, content hashes, ledger transaction ids, timestamps,
//! registry records, and the input validation rules both ends agree on.

pub mod error;
pub mod hash;
pub mod id;
pub mod record;
pub mod time;
pub mod validate;

pub use error::TypesError;
pub use hash::{normalize_hex, FileHash, TxHash};
pub use id::DocumentId;
pub use record::{DocumentRecord, HistoryAction, HistoryEntry, RegistryStats};
pub use time::Timestamp;
