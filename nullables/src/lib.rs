//! Nullable infrastructure for deterministic testing.
//!
//! Everything outside the process (the clock, the registry, the wallet)
//! is reached through a trait. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be scripted and inspected programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod backend;
pub mod clock;
pub mod ledger;

pub use backend::NullBackend;
pub use clock::NullClock;
pub use ledger::{LedgerGate, NullLedger, SentCall};
