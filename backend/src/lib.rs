//! Registry backend client for DocChain.
//!
//! The registry is an HTTP service that stages uploads, records ledger
//! confirmations, answers verification requests, and serves the document
//! listing, audit history and stats. This crate provides:
//! - [`RegistryBackend`]: the trait the registration and verification
//!   flows are written against
//! - [`HttpBackend`]: the `reqwest` implementation
//! - request/reply wire types
//! - [`BackendVerdict`]: the typed reading of a loosely-typed verify reply

pub mod backend;
pub mod error;
pub mod http;
pub mod verdict;
pub mod wire;

pub use backend::RegistryBackend;
pub use error::BackendError;
pub use http::HttpBackend;
pub use verdict::{classify_reason, BackendVerdict, ReasonKind};
pub use wire::{
    ConfirmReply, ConfirmRequest, ContractInfo, HealthReply, ListedDocument, StagedDocument,
    UploadReply, UploadRequest, VerifyReply, VerifyRequest,
};
