//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid app slug: {0}")]
    InvalidSlug(String),

    #[error("invalid build coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("duplicate path in manifest: {0}")]
    DuplicatePath(String),

    #[error("invalid path in manifest: {0}")]
    InvalidPath(String),

    #[error("chunk offset gap in {path}: expected offset {expected}, got {actual}")]
    OffsetGap {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("size mismatch for {path}: declared {declared}, chunks sum to {actual}")]
    SizeMismatch {
        path: String,
        declared: u64,
        actual: u64,
    },

    #[error("total size mismatch: declared {declared}, files sum to {actual}")]
    TotalMismatch { declared: u64, actual: u64 },

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
