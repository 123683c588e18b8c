//! Reference registry for DocChain.
//!
//! Keeps documents and their audit history in memory and serves them over
//! the same HTTP surface the client speaks:
//!
//! | Method | Path                    | Purpose                          |
//! |--------|-------------------------|----------------------------------|
//! | POST   | `/api/upload`           | stage a document                 |
//! | GET    | `/api/contract`         | contract address and ABI         |
//! | POST   | `/api/confirm_register` | record the anchoring transaction |
//! | POST   | `/verify`               | check a file against the registry|
//! | GET    | `/api/documents`        | listing, newest first            |
//! | GET    | `/api/history`          | audit history, newest first      |
//! | GET    | `/api/stats`            | aggregate counts                 |
//! | GET    | `/health`               | liveness                         |
//!
//! Nothing is persisted; restarting the server empties the registry.

pub mod config;
pub mod error;
pub mod registry;
pub mod router;

pub use config::ServerConfig;
pub use error::{RegistryError, ServerError};
pub use registry::{Registry, DEFAULT_HISTORY_LIMIT};
pub use router::{router, AppState, RegistryServer};
