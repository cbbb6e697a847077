//! Error types for the analysis pipeline.
//!
//! Every variant here is recoverable and fails open: the queue logs it,
//! records the resource as not blocked, and moves on. Nothing in this
//! taxonomy may break connectivity or hang the content pipeline.

use thiserror::Error;

/// Analysis pipeline error type.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Resource download failed or timed out.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Downloaded bytes were not a decodable image.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Core pipeline error (classifier and friends).
    #[error(transparent)]
    Core(#[from] warden_core::CoreError),

    /// Persistence error; the pipeline degrades to memory-only.
    #[error("Storage error: {0}")]
    Storage(#[from] warden_storage::StorageError),
}

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
