//! Error types for the reload core.
//!
//! Registry operations are total and never fail. Everything that can go wrong
//! while building a data generation is captured as a [`ReloadError`] and then
//! folded into the [`ReloadStatus`] carried by the response.

use crate::pipeline::ReloadStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the reload core.
#[derive(Debug, Error)]
pub enum ReloadError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Cannot access data file {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Validation errors
    #[error("Invalid data in {path}: {reason}")]
    ContentInvalid { path: PathBuf, reason: String },

    // Install errors
    #[error("Failed to install {source_path} to {target}: {message}")]
    Install {
        source_path: PathBuf,
        target: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

/// Result type alias for reload operations.
pub type Result<T> = std::result::Result<T, ReloadError>;

impl ReloadError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ReloadError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a content validation error.
    pub fn content_invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ReloadError::ContentInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Map this error to the response status reported to the caller.
    ///
    /// Plain IO errors count as file access failures.
    pub fn status(&self) -> ReloadStatus {
        match self {
            ReloadError::Io { .. } | ReloadError::FileAccess { .. } => ReloadStatus::MmapFailure,
            ReloadError::ContentInvalid { .. } => ReloadStatus::DataBroken,
            ReloadError::Install { .. } => ReloadStatus::InstallFailure,
        }
    }
}
