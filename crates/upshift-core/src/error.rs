//! Error types for upshift.
//!
//! `UpshiftError` covers every failure the core surfaces to callers. Rule-level
//! failures inside the rewrite pipeline use [`TransformError`](crate::transform::TransformError)
//! and are folded into per-file accounting rather than propagated.

use crate::transform::{TransformError, TransformTag};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the upshift library.
#[derive(Debug, Error)]
pub enum UpshiftError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Project root is not a directory: {0}")]
    NotADirectory(PathBuf),

    // File system errors
    #[error("File access error at {path:?}: {message}")]
    FileAccess {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Rewrite errors
    #[error("{tag}: {source}")]
    Transformation {
        tag: TransformTag,
        #[source]
        source: TransformError,
    },

    // Compatibility gate
    #[error("Project is not compatible with the upgrade ({blocking} blocking issue(s))")]
    Incompatible { blocking: usize },

    // Snapshot errors
    #[error("Snapshot error: {message}")]
    Snapshot { message: String },

    #[error("Snapshot not found: {id}")]
    SnapshotNotFound { id: String },

    // External processes
    #[error("Command `{command}` failed: {message}")]
    Command { command: String, message: String },

    #[error("Command timed out after {0:?}")]
    Timeout(std::time::Duration),

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

/// Result type alias for upshift operations.
pub type Result<T> = std::result::Result<T, UpshiftError>;

impl From<std::io::Error> for UpshiftError {
    fn from(err: std::io::Error) -> Self {
        UpshiftError::FileAccess {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for UpshiftError {
    fn from(err: serde_json::Error) -> Self {
        UpshiftError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl UpshiftError {
    /// Create a file access error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        UpshiftError::FileAccess {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        UpshiftError::Configuration {
            message: message.into(),
        }
    }

    /// Create a snapshot error.
    pub fn snapshot(message: impl Into<String>) -> Self {
        UpshiftError::Snapshot {
            message: message.into(),
        }
    }
}
