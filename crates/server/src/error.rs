//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Stable reason code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("password reset required")]
    PasswordResetRequired,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("purchase required")]
    PurchaseRequired,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] depot_storage::StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] depot_metadata::MetadataError),

    #[error("{0}")]
    Core(#[from] depot_core::Error),

    #[error("credential error: {0}")]
    Auth(#[from] depot_auth::AuthError),
}

impl ApiError {
    /// Get the stable reason code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::HashMismatch { .. } => "hash_mismatch",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::PasswordResetRequired => "password_reset_required",
            Self::Forbidden(_) => "forbidden",
            Self::PurchaseRequired => "purchase_required",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal_error",
            Self::Storage(e) => match e {
                depot_storage::StorageError::NotFound(_) => "not_found",
                _ => "storage_error",
            },
            Self::Metadata(e) => match e {
                depot_metadata::MetadataError::NotFound(_) => "not_found",
                depot_metadata::MetadataError::AlreadyExists(_) => "conflict",
                depot_metadata::MetadataError::Constraint(_) => "conflict",
                _ => "metadata_error",
            },
            Self::Core(_) => "validation_error",
            Self::Auth(_) => "unauthorized",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::HashMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::PasswordResetRequired => StatusCode::FORBIDDEN,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::PurchaseRequired => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(e) => match e {
                depot_storage::StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                // Storage I/O failures are transient; 500 signals safe-to-retry.
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Metadata(e) => match e {
                depot_metadata::MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                depot_metadata::MetadataError::AlreadyExists(_) => StatusCode::CONFLICT,
                depot_metadata::MetadataError::Constraint(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::PurchaseRequired.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::PasswordResetRequired.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_core_errors_map_to_validation() {
        let err = ApiError::Core(depot_core::Error::InvalidPath("..".into()));
        assert_eq!(err.code(), "validation_error");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_metadata_already_exists_maps_to_conflict() {
        let err = ApiError::Metadata(depot_metadata::MetadataError::AlreadyExists("x".into()));
        assert_eq!(err.code(), "conflict");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
