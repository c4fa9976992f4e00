//! Error types for the notification policies

use std::path::PathBuf;

use thiserror::Error;

/// Result type for notice operations
pub type Result<T> = std::result::Result<T, NoticeError>;

/// Notice errors
///
/// Absent project state (no API, no build output, no cli.json) is never an
/// error; those cases resolve to [`crate::NoticeOutcome::Unchanged`].
#[derive(Error, Debug)]
pub enum NoticeError {
    #[error("Invalid GraphQL schema in {path}: {message}")]
    SchemaParse { path: PathBuf, message: String },

    #[error("Invalid project file {path}: {message}")]
    InvalidProjectFile { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}
