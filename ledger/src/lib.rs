//! Ledger transaction adapter for DocChain.
//!
//! The registry anchors a document by having a wallet sign and submit a
//! contract call carrying `(documentID, fileName, fileHash)`. This crate
//! defines the capability the registration flow relies on:
//! - [`LedgerAdapter`]: request accounts, estimate gas, send a call and
//!   stream back the pending hash and mined receipt
//! - [`FunctionSpec`]: contract function resolution from an ABI and
//!   call-data encoding
//! - gas estimation with a hardcoded fallback
//! - [`JsonRpcProvider`]: an adapter over a node's `eth_*` JSON-RPC API

pub mod abi;
pub mod adapter;
pub mod error;
pub mod gas;
pub mod provider;

pub use abi::FunctionSpec;
pub use adapter::{LedgerAdapter, LedgerCall, LedgerTarget, Receipt, TxEvent};
pub use error::LedgerError;
pub use gas::{gas_limit_for, FALLBACK_GAS_LIMIT};
pub use provider::JsonRpcProvider;
