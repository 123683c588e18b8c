//! Axum HTTP surface over a shared [`Registry`].

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docchain_backend::{ConfirmReply, ContractInfo, HealthReply, VerifyReply};
use docchain_types::Timestamp;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{RegistryError, ServerError};
use crate::registry::{rejected_verify, upload_reply, Registry};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RwLock<Registry>>,
    pub contract: Arc<ContractInfo>,
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn new(registry: Registry, contract: ContractInfo, max_upload_bytes: u64) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            contract: Arc::new(contract),
            max_upload_bytes,
        }
    }
}

/// Build the registry router.
pub fn router(state: AppState) -> Router {
    let limit = usize::try_from(state.max_upload_bytes).unwrap_or(usize::MAX);
    Router::new()
        .route("/api/upload", post(upload))
        .route("/api/contract", get(contract))
        .route("/api/confirm_register", post(confirm))
        .route("/verify", post(verify))
        .route("/api/documents", get(documents))
        .route("/api/history", get(history))
        .route("/api/stats", get(stats))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The registry server, configured from a [`ServerConfig`].
pub struct RegistryServer {
    config: ServerConfig,
    state: AppState,
}

impl RegistryServer {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let contract = config.contract_info()?;
        if contract.require().is_err() {
            warn!("no contract address or ABI configured; clients cannot anchor registrations");
        }
        let state = AppState::new(
            Registry::with_history_limit(config.history_limit),
            contract,
            config.max_upload_bytes,
        );
        Ok(Self { config, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn start(&self) -> Result<(), ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        info!("registry listening on {}", listener.local_addr()?);
        axum::serve(listener, router(self.state.clone())).await?;
        Ok(())
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn status_of(error: &RegistryError) -> StatusCode {
    StatusCode::from_u16(error.status()).unwrap_or(StatusCode::BAD_REQUEST)
}

fn multipart_message(error: &MultipartError, max_upload_bytes: u64) -> String {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        format!(
            "File too large. Maximum size is {} MB",
            max_upload_bytes / (1024 * 1024)
        )
    } else {
        error.body_text()
    }
}

#[derive(Default)]
struct UploadForm {
    file: Option<(String, Bytes)>,
    owner: Option<String>,
    document_id: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, MultipartError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                form.file = Some((file_name, field.bytes().await?));
            }
            "owner" => form.owner = Some(field.text().await?),
            "documentID" | "documentId" | "document_id" => {
                form.document_id = Some(field.text().await?)
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn upload(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            return error_response(e.status(), multipart_message(&e, state.max_upload_bytes))
        }
    };
    let Some((file_name, bytes)) = form.file else {
        return error_response(StatusCode::BAD_REQUEST, "No file provided");
    };

    let mut registry = state.registry.write().await;
    match registry.upload(&file_name, &bytes, form.owner.as_deref(), Timestamp::now()) {
        Ok(record) => Json(upload_reply(&record)).into_response(),
        Err(e) => {
            warn!("upload rejected: {e}");
            error_response(status_of(&e), e.to_string())
        }
    }
}

async fn contract(State(state): State<AppState>) -> Json<ContractInfo> {
    Json(state.contract.as_ref().clone())
}

async fn confirm(State(state): State<AppState>, body: Bytes) -> Response {
    let Ok(body) = serde_json::from_slice::<Value>(&body) else {
        return error_response(StatusCode::BAD_REQUEST, "request body is not JSON");
    };
    let block_number = body.get("blockNumber").and_then(Value::as_u64);

    let mut registry = state.registry.write().await;
    match registry.confirm(
        str_field(&body, "documentID"),
        str_field(&body, "blockchainTx"),
        block_number,
        Timestamp::now(),
    ) {
        Ok((record, _)) => Json(ConfirmReply {
            success: true,
            document_id: Some(record.document_id),
            blockchain_tx: record.blockchain_tx,
            block_number: record.block_number,
            message: Some("Blockchain registration confirmed successfully".into()),
            error: None,
        })
        .into_response(),
        Err(e) => error_response(status_of(&e), e.to_string()),
    }
}

fn str_field<'a>(body: &'a Value, key: &str) -> &'a str {
    body.get(key).and_then(Value::as_str).unwrap_or_default()
}

async fn verify(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            let reply = VerifyReply {
                verified: Some(false),
                reason: Some("validation_error".into()),
                message: Some(multipart_message(&e, state.max_upload_bytes)),
                ..Default::default()
            };
            return (e.status(), Json(reply)).into_response();
        }
    };
    let Some((file_name, bytes)) = form.file else {
        let reply = rejected_verify(&RegistryError::MissingField("No file uploaded"));
        return (StatusCode::BAD_REQUEST, Json(reply)).into_response();
    };

    let mut registry = state.registry.write().await;
    match registry.verify(&file_name, &bytes, form.document_id.as_deref(), Timestamp::now()) {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => (status_of(&e), Json(rejected_verify(&e))).into_response(),
    }
}

async fn documents(State(state): State<AppState>) -> Response {
    Json(state.registry.read().await.documents()).into_response()
}

async fn history(State(state): State<AppState>) -> Response {
    Json(state.registry.read().await.history()).into_response()
}

async fn stats(State(state): State<AppState>) -> Response {
    Json(state.registry.read().await.stats()).into_response()
}

async fn health() -> Json<HealthReply> {
    Json(HealthReply {
        status: "healthy".into(),
        timestamp: Timestamp::now(),
        version: Some(env!("CARGO_PKG_VERSION").into()),
    })
}
