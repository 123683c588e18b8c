//! Registry server configuration with TOML file support.

use docchain_backend::ContractInfo;
use docchain_types::validate::MAX_UPLOAD_BYTES;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ServerError;
use crate::registry::DEFAULT_HISTORY_LIMIT;

/// Configuration for the reference registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Registry contract that clients anchor documents in.
    #[serde(default)]
    pub contract_address: Option<String>,

    /// JSON file holding the contract ABI (an array, or an object with an
    /// `abi` array as emitted by most toolchains).
    #[serde(default)]
    pub contract_abi_path: Option<PathBuf>,

    /// Network name reported by `/api/contract`.
    #[serde(default = "default_network")]
    pub network: String,

    /// Block explorer prefix; the contract address is appended.
    #[serde(default = "default_explorer")]
    pub explorer_url: String,

    /// Largest accepted request body.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Number of audit history entries retained.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_network() -> String {
    "Sepolia Testnet".to_string()
}

fn default_explorer() -> String {
    "https://sepolia.etherscan.io/address/".to_string()
}

fn default_max_upload_bytes() -> u64 {
    MAX_UPLOAD_BYTES
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, ServerError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ServerError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ServerError> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ServerError> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Build the `/api/contract` reply, reading the ABI file if configured.
    ///
    /// A missing address or ABI is not an error here: the registry still
    /// stages and verifies, and clients report the ledger as unavailable.
    pub fn contract_info(&self) -> Result<ContractInfo, ServerError> {
        let contract_abi = match &self.contract_abi_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
                let value: serde_json::Value = serde_json::from_str(&raw)
                    .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
                match value {
                    serde_json::Value::Object(mut obj) if obj.contains_key("abi") => {
                        obj.remove("abi")
                    }
                    other => Some(other),
                }
            }
            None => None,
        };
        let explorer = self
            .contract_address
            .as_ref()
            .map(|address| format!("{}{address}", self.explorer_url));
        Ok(ContractInfo {
            contract_address: self.contract_address.clone(),
            contract_abi,
            network: Some(self.network.clone()),
            explorer,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            contract_address: None,
            contract_abi_path: None,
            network: default_network(),
            explorer_url: default_explorer(),
            max_upload_bytes: default_max_upload_bytes(),
            history_limit: default_history_limit(),
        }
    }
}
