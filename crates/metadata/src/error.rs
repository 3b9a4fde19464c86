//! Metadata store error types.

use thiserror::Error;

/// Metadata store operation errors.
///
/// `NotFound` is a distinct variant because the registry coordinator
/// treats it as a cache-miss signal on read paths.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MetadataError {
    /// Whether this error is the cache-miss signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;
