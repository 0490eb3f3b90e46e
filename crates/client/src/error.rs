//! Client error types.
//!
//! Corruption failures (`ChunkCorrupt`, `FileCorrupt`) are distinct from
//! network errors so callers can tell "try again" apart from "this build is
//! broken".

use thiserror::Error;

/// Client operation errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API error ({status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Core(#[from] depot_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk corrupt in transit: {hash}")]
    ChunkCorrupt { hash: String },

    #[error("file corrupt after reconstruction: {path}")]
    FileCorrupt { path: String },

    #[error("manifest path escapes install root: {0}")]
    UnsafePath(String),

    #[error("unexpected server response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Whether this failure means the downloaded build itself is broken, as
    /// opposed to a transient transport problem.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::ChunkCorrupt { .. } | Self::FileCorrupt { .. })
    }
}

/// Result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;
