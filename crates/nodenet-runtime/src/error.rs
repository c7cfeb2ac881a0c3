//! Error types for the runtime layer.

use thiserror::Error;

/// Top-level error type of runtime operations.
///
/// Engine failures pass through unchanged; persistence adds I/O and JSON
/// failure modes on top.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An engine-level failure.
    #[error(transparent)]
    Core(#[from] nodenet_core::CoreError),

    /// Filesystem access to the data directory failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted nodenet file could not be read or written.
    #[error("persistence error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
