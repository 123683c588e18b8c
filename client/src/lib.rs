//! Client session for DocChain.
//!
//! A [`Session`] holds what a user is working with (the selected file and
//! its fingerprint) and wires the registration coordinator and the
//! verification reconciler to a registry backend and, optionally, a ledger
//! adapter. One register, verify or confirm runs at a time per session.

pub mod config;
pub mod error;
pub mod session;

pub use config::{ClientConfig, LedgerConfig};
pub use error::{InputError, SessionError};
pub use session::{Dashboard, Session};
