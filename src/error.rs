//! Error types for the risk layer

use thiserror::Error;

use crate::provider::ProviderError;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the risk layer
///
/// Analyzers never surface this; they degrade to [`crate::outcome::Outcome`].
/// It is used at the edges: snapshot loading, storage reads and the binary.
#[derive(Error, Debug)]
pub enum Error {
    // Provider errors
    #[error(transparent)]
    Provider(#[from] ProviderError),

    // Persistence collaborator errors
    #[error("Snapshot store error: {0}")]
    Storage(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Provider(e) => e.is_retryable(),
            _ => false,
        }
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
