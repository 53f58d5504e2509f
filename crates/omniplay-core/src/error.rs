//! Error types for Omniplay Core

use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Adapter error types
///
/// Errors are `Clone` because a single readiness failure (or a shared SDK
/// load failure) is handed to every caller queued behind it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Loading errors
    #[error("Failed to load backend: {0}")]
    LoadFailure(String),

    #[error("Mount target not found: {0}")]
    MountNotFound(String),

    // Construction errors
    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),

    #[error("Provider {provider} does not support the {operation} feature")]
    UnsupportedOperation { provider: String, operation: String },

    // Cross-document channel errors
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    // Lifecycle errors
    #[error("Player {0} has been cleared")]
    Cleared(String),

    // Registry errors
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Player with id {0} not found")]
    PlayerNotFound(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a load failure
    pub fn load(msg: impl Into<String>) -> Self {
        Error::LoadFailure(msg.into())
    }

    /// Create an unsupported-operation error for logging
    pub fn unsupported(provider: impl Into<String>, operation: impl Into<String>) -> Self {
        Error::UnsupportedOperation {
            provider: provider.into(),
            operation: operation.into(),
        }
    }

    /// Returns true if this error is terminal for the adapter instance
    ///
    /// A terminal error means the adapter must be discarded and recreated.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::LoadFailure(_)
                | Error::MountNotFound(_)
                | Error::MalformedMessage(_)
                | Error::Cleared(_)
        )
    }

    /// Returns the error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::LoadFailure(_) => "LOAD_FAILURE",
            Error::MountNotFound(_) => "MOUNT_NOT_FOUND",
            Error::UnsupportedBackend(_) => "UNSUPPORTED_BACKEND",
            Error::UnsupportedOperation { .. } => "UNSUPPORTED_OPERATION",
            Error::MalformedMessage(_) => "MALFORMED_MESSAGE",
            Error::Cleared(_) => "CLEARED",
            Error::InvalidOptions(_) => "INVALID_OPTIONS",
            Error::PlayerNotFound(_) => "PLAYER_NOT_FOUND",
            Error::Internal(_) => "INTERNAL",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedMessage(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::LoadFailure(err.to_string())
    }
}
