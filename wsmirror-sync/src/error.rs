//! Error types for wsmirror-sync.

use std::path::PathBuf;

use thiserror::Error;

use wsmirror_core::ConfigError;

/// All errors that abort a sync run.
///
/// Per-record, per-batch and per-install problems are not errors; they are
/// logged and collected into the run report instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration or identifier-list failure.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted state file exists but does not match the expected schema.
    #[error("state file {path} is corrupt: {source}")]
    StateParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error (state store save path).
    #[error("state JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The metadata source could not be reached or answered with a failure.
    #[error("metadata request failed: {0}")]
    Metadata(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
