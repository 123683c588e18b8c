//! Verification reconciler for DocChain.
//!
//! Given a presented file (and optionally the document id it claims to be),
//! decide whether it is the registered document, a modified copy of one, or
//! unknown to the registry. The registry's own verdict is preferred; when it
//! gives none, the reconciler compares hashes itself and finally falls back
//! to scanning the document listing.
//!
//! Verification never writes to the registry's records.

pub mod error;
pub mod outcome;
pub mod reconciler;

pub use error::VerificationError;
pub use outcome::VerificationOutcome;
pub use reconciler::Reconciler;
