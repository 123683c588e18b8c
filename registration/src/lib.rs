//! Registration coordinator for DocChain.
//!
//! Registering a document is a three-step commit:
//! 1. stage the file with the registry, which assigns a document id
//! 2. anchor `(documentID, fileName, fileHash)` in a ledger transaction
//! 3. tell the registry which transaction anchored it
//!
//! Progress is modelled as a small state machine
//! (`Idle → Staged → Submitted → Mined → Confirmed`). `Mined` is a durable
//! checkpoint: once a receipt exists, a failed step 3 can be re-driven from
//! the checkpoint alone.

pub mod coordinator;
pub mod error;
pub mod state;

pub use coordinator::{Coordinator, CoordinatorOptions};
pub use error::RegistrationError;
pub use state::{
    ConfirmedRegistration, MinedCheckpoint, RegistrationOutcome, RegistrationState,
    TransactionAttempt,
};
