//! Error types for the core decision pipeline.

use thiserror::Error;

/// Core pipeline error type.
#[derive(Debug, Error)]
pub enum CoreError {
    /// External classifier call failed, timed out, or returned malformed output.
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Malformed packet or undecodable image.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
