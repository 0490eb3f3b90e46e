//! Auth error types.

use thiserror::Error;

/// Credential operation errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid access token: {0}")]
    InvalidToken(String),

    #[error("access token expired")]
    Expired,

    #[error("credential error: {0}")]
    Credential(String),
}

/// Result type for credential operations.
pub type AuthResult<T> = std::result::Result<T, AuthError>;
