//! Error types for the renderer

use thiserror::Error;

/// Result type alias for rendering operations
pub type Result<T> = std::result::Result<T, GfxError>;

/// Errors that can occur while setting up or presenting the overlay
#[derive(Debug, Error)]
pub enum GfxError {
    /// The display backend failed (layer, vsync or presentation)
    #[error("Display error: {0}")]
    Display(String),

    /// A font could not be loaded or parsed
    #[error("Font error: {0}")]
    Font(String),

    /// Canvas dimensions the tiled layout cannot address
    #[error("Invalid geometry {width}x{height}: {reason}")]
    InvalidGeometry {
        width: u32,
        height: u32,
        reason: &'static str,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
