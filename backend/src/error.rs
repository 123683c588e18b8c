use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("backend rejected the request: {0}")]
    Rejected(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Whether the registry reported the document as unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}
