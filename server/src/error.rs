use docchain_types::TypesError;
use thiserror::Error;

/// A request the registry refuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{0}")]
    Invalid(#[from] TypesError),

    #[error("{0}")]
    MissingField(&'static str),

    #[error("Document not found in registry")]
    NotFound,
}

impl RegistryError {
    /// HTTP status the registry answers with.
    pub fn status(&self) -> u16 {
        match self {
            Self::Invalid(TypesError::FileTooLarge { .. }) => 413,
            Self::Invalid(_) | Self::MissingField(_) => 400,
            Self::NotFound => 404,
        }
    }
}

/// Startup and serving failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
