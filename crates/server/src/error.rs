//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid digest: {0}")]
    BadDigest(String),

    #[error("invalid range: {0}")]
    BadRange(String),

    #[error("invalid chunk offset: expected {expected}, got {got}")]
    OutOfOrderChunk { expected: i64, got: i64 },

    #[error("upload session not found: {0}")]
    SessionMissing(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] reg_storage::StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] reg_metadata::MetadataError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadDigest(_) => "bad_digest",
            Self::BadRange(_) => "bad_range",
            Self::OutOfOrderChunk { .. } => "out_of_order_chunk",
            Self::SessionMissing(_) => "session_missing",
            Self::Internal(_) => "internal_error",
            Self::Storage(_) => "storage_error",
            Self::Metadata(_) => "index_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadDigest(_) => StatusCode::BAD_REQUEST,
            Self::BadRange(_) => StatusCode::BAD_REQUEST,
            Self::OutOfOrderChunk { .. } => StatusCode::BAD_REQUEST,
            Self::SessionMissing(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(e) => match e {
                reg_storage::StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Metadata(e) => match e {
                reg_metadata::MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
