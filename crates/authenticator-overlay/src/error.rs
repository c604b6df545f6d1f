//! Error types for the overlay

use thiserror::Error;

/// Result type alias for overlay operations
pub type Result<T> = std::result::Result<T, OverlayError>;

/// Errors that can occur while running the overlay
#[derive(Debug, Error)]
pub enum OverlayError {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] authenticator_core::CoreError),

    /// Renderer error
    #[error("Graphics error: {0}")]
    Gfx(#[from] authenticator_gfx::GfxError),

    /// The controllers could not be acquired
    #[error("Input error: {0}")]
    Input(String),

    /// Input focus could not be moved to the overlay
    #[error("Focus error: {0}")]
    Focus(String),

    /// Logging could not be set up
    #[error("Logging error: {0}")]
    Logging(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
