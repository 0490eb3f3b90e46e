//! Core domain types and shared logic for the Depot distribution service.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Content hashes and chunk identities
//! - Build coordinates (app slug, version, platform, channel)
//! - Manifest structure and validation
//! - Roles, access-token claims and refresh-token framing
//! - Configuration types

pub mod chunk;
pub mod config;
pub mod coords;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod token;

pub use chunk::{Chunk, ChunkHash, ChunkRef};
pub use coords::{AppSlug, BuildCoords, Channel, Platform, Version};
pub use error::{Error, Result};
pub use hash::{ContentHash, ContentHasher};
pub use manifest::{FileEntry, Manifest};
pub use token::{AccessClaims, RefreshToken, Role};

/// Default chunk size: 8 MiB
pub const DEFAULT_CHUNK_SIZE: u64 = 8 * 1024 * 1024;

/// Maximum chunk size: 32 MiB
pub const MAX_CHUNK_SIZE: u64 = 32 * 1024 * 1024;

/// Minimum chunk size: 64 KiB
pub const MIN_CHUNK_SIZE: u64 = 64 * 1024;
