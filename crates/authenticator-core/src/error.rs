//! Error types for the authenticator core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The credential file exists but could not be parsed
    #[error("Malformed credential store: {0}")]
    MalformedStore(String),

    /// A writer panicked while holding the store lock
    #[error("Credential store lock poisoned")]
    LockPoisoned,

    /// Account identifier string could not be parsed
    #[error("Invalid account uid: {0}")]
    InvalidUid(String),

    /// Wrong number of presses handed to the PIN encoder
    #[error("A PIN needs exactly {expected} presses, got {actual}")]
    InvalidPinLength { expected: usize, actual: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}
