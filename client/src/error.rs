use docchain_backend::BackendError;
use docchain_registration::RegistrationError;
use docchain_types::TypesError;
use docchain_verification::VerificationError;
use thiserror::Error;

/// A request rejected before anything was sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("no file selected")]
    NoFileSelected,

    #[error(transparent)]
    Invalid(#[from] TypesError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("another operation is already running in this session")]
    Busy,

    #[error("invalid input: {0}")]
    Input(#[from] InputError),

    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("registry request failed: {0}")]
    Backend(#[from] BackendError),

    #[error("config error: {0}")]
    Config(String),
}

impl From<TypesError> for SessionError {
    fn from(e: TypesError) -> Self {
        Self::Input(InputError::Invalid(e))
    }
}
