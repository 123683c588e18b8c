//! Client configuration with TOML file support.

use docchain_ledger::abi::DEFAULT_METHOD;
use docchain_types::validate::DEFAULT_OWNER;
use docchain_utils::LogFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SessionError;

/// Configuration for a DocChain client.
///
/// Can be loaded from a TOML file via [`ClientConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Command-line flags override
/// individual fields after loading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Registry base URL.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Whole-request timeout for registry calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connect timeout for registry calls.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Owner recorded on registration when none is given.
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Ledger anchoring. Without it registrations stay staged.
    #[serde(default)]
    pub ledger: Option<LedgerConfig>,
}

/// JSON-RPC node used to sign and submit registration transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub rpc_url: String,

    /// Sending account. Defaults to the first account the node exposes.
    #[serde(default)]
    pub from: Option<String>,

    /// Contract function invoked to anchor a document.
    #[serde(default = "default_method")]
    pub method: String,

    /// Interval between receipt polls.
    #[serde(default = "default_receipt_poll_millis")]
    pub receipt_poll_millis: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_backend_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_owner() -> String {
    DEFAULT_OWNER.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

fn default_receipt_poll_millis() -> u64 {
    2000
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, SessionError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SessionError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, SessionError> {
        toml::from_str(s).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, SessionError> {
        toml::to_string_pretty(self).map_err(|e| SessionError::Config(e.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl LedgerConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            from: None,
            method: default_method(),
            receipt_poll_millis: default_receipt_poll_millis(),
        }
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_millis)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            owner: default_owner(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            ledger: None,
        }
    }
}
