//! `reqwest` implementation of [`RegistryBackend`].

use async_trait::async_trait;
use docchain_types::{DocumentRecord, HistoryEntry, RegistryStats};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::backend::RegistryBackend;
use crate::error::BackendError;
use crate::wire::{
    ConfirmReply, ConfirmRequest, ContractInfo, HealthReply, ListedDocument, UploadReply,
    UploadRequest, VerifyReply, VerifyRequest,
};

pub const UPLOAD_PATH: &str = "/api/upload";
pub const CONTRACT_PATH: &str = "/api/contract";
pub const CONFIRM_PATH: &str = "/api/confirm_register";
pub const VERIFY_PATH: &str = "/verify";
pub const DOCUMENTS_PATH: &str = "/api/documents";
pub const HISTORY_PATH: &str = "/api/history";
pub const STATS_PATH: &str = "/api/stats";
pub const HEALTH_PATH: &str = "/health";

/// HTTP client for a DocChain registry.
///
/// Wraps `reqwest::Client` with the registry's base URL and provides typed
/// methods for each endpoint.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client targeting the given base URL (e.g. `http://127.0.0.1:5000`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_timeouts(base_url, Duration::from_secs(30), Duration::from_secs(10))
    }

    /// Create a client with explicit request and connect timeouts.
    pub fn with_timeouts(
        base_url: impl Into<String>,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// The configured registry URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("GET {path}: {e}")))?;
        decode(path, response).await
    }

    fn file_part(file_name: &str, bytes: &[u8]) -> Part {
        Part::bytes(bytes.to_vec()).file_name(file_name.to_string())
    }
}

/// Decode a JSON body, mapping non-2xx statuses to [`BackendError::Status`]
/// with the registry's `error` text when it sent one.
async fn decode<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> Result<T, BackendError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| BackendError::Transport(format!("{path}: failed to read body: {e}")))?;

    if !status.is_success() {
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or(body);
        return Err(BackendError::Status {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body)
        .map_err(|e| BackendError::InvalidResponse(format!("{path}: {e}")))
}

/// Read a listing row by row. Rows that do not parse as `T` are logged and
/// dropped; only a body that is not an array fails.
fn parse_listing<T: DeserializeOwned>(path: &str, rows: Vec<Value>) -> Vec<T> {
    let total = rows.len();
    let parsed: Vec<T> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(i, row)| match serde_json::from_value(row) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("{path}: skipping listing row {i}: {e}");
                None
            }
        })
        .collect();
    if parsed.len() < total {
        tracing::debug!("{path}: kept {} of {total} rows", parsed.len());
    }
    parsed
}

#[async_trait]
impl RegistryBackend for HttpBackend {
    async fn upload(&self, request: &UploadRequest) -> Result<UploadReply, BackendError> {
        let form = Form::new()
            .part("file", Self::file_part(&request.file_name, &request.bytes))
            .text("owner", request.owner.clone());

        let response = self
            .http
            .post(self.url(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("POST {UPLOAD_PATH}: {e}")))?;
        decode(UPLOAD_PATH, response).await
    }

    async fn contract(&self) -> Result<ContractInfo, BackendError> {
        self.get_json(CONTRACT_PATH).await
    }

    async fn confirm(&self, request: &ConfirmRequest) -> Result<ConfirmReply, BackendError> {
        let response = self
            .http
            .post(self.url(CONFIRM_PATH))
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("POST {CONFIRM_PATH}: {e}")))?;
        decode(CONFIRM_PATH, response).await
    }

    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyReply, BackendError> {
        let mut form =
            Form::new().part("file", Self::file_part(&request.file_name, &request.bytes));
        if let Some(id) = &request.document_id {
            form = form.text("documentID", id.to_string());
        }

        let response = self
            .http
            .post(self.url(VERIFY_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("POST {VERIFY_PATH}: {e}")))?;

        // The registry answers validation failures with a 4xx that still
        // carries a verify-shaped body; keep it so the reason is visible.
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| {
                BackendError::Transport(format!("{VERIFY_PATH}: failed to read body: {e}"))
            })?;
        match serde_json::from_str::<VerifyReply>(&body) {
            Ok(reply) => Ok(reply),
            Err(_) if !status.is_success() => Err(BackendError::Status {
                status: status.as_u16(),
                message: body,
            }),
            Err(e) => Err(BackendError::InvalidResponse(format!("{VERIFY_PATH}: {e}"))),
        }
    }

    async fn documents(&self) -> Result<Vec<DocumentRecord>, BackendError> {
        let rows: Vec<Value> = self.get_json(DOCUMENTS_PATH).await?;
        Ok(parse_listing(DOCUMENTS_PATH, rows))
    }

    async fn listing(&self) -> Result<Vec<ListedDocument>, BackendError> {
        let rows: Vec<Value> = self.get_json(DOCUMENTS_PATH).await?;
        Ok(parse_listing(DOCUMENTS_PATH, rows))
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, BackendError> {
        self.get_json(HISTORY_PATH).await
    }

    async fn stats(&self) -> Result<RegistryStats, BackendError> {
        self.get_json(STATS_PATH).await
    }

    async fn health(&self) -> Result<HealthReply, BackendError> {
        self.get_json(HEALTH_PATH).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let backend = HttpBackend::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(backend.base_url(), "http://127.0.0.1:5000");
        assert_eq!(backend.url(VERIFY_PATH), "http://127.0.0.1:5000/verify");
    }

    #[test]
    fn listing_keeps_rows_around_a_legacy_one() {
        let hash = "cd".repeat(32);
        let rows: Vec<Value> = serde_json::from_value(serde_json::json!([
            {
                "documentID": "legacy-1",
                "fileName": "old.pdf",
                "fileHash": null,
                "timestamp": null
            },
            {
                "documentID": "d2",
                "fileName": "new.pdf",
                "fileHash": hash,
                "owner": "alice",
                "timestamp": 1709287200,
                "blockchainTx": "0xT2",
                "registered": true
            }
        ]))
        .unwrap();

        let listed: Vec<ListedDocument> = parse_listing(DOCUMENTS_PATH, rows.clone());
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].file_hash, None);
        assert_eq!(listed[1].file_hash.as_deref(), Some(hash.as_str()));

        let records: Vec<DocumentRecord> = parse_listing(DOCUMENTS_PATH, rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].document_id.as_str(), "d2");
    }

    #[tokio::test]
    async fn unreachable_registry_is_a_transport_error() {
        let backend = HttpBackend::with_timeouts(
            "http://127.0.0.1:9",
            Duration::from_secs(2),
            Duration::from_secs(1),
        )
        .unwrap();
        let err = backend.documents().await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
