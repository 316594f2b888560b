use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a [`Backend`](crate::backend::Backend) implementation.
///
/// Stores never translate these; they reach the caller as
/// [`StoreError::Backend`].
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("quota exceeded writing {key:?} (limit {limit} bytes)")]
    QuotaExceeded { key: String, limit: usize },

    #[error("backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("corrupt backend data in {}: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by [`Store`](crate::Store) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The raw key contains the namespace separator.
    #[error("{separator:?} is not allowed in key {key:?}: it is the namespace separator")]
    KeyFormat { key: String, separator: char },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
