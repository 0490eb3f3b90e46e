//! Manifest types and validation.
//!
//! A manifest is the authoritative description of a build: an ordered list of
//! files, each composed of an ordered, contiguous run of content-addressed
//! chunks. Validation is all-or-nothing; a manifest that fails any check is
//! rejected as a whole.

use crate::chunk::{ChunkHash, ChunkRef};
use crate::coords::BuildCoords;
use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One file within a manifest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileEntry {
    /// Relative path within the build tree (forward slashes).
    pub path: String,
    /// Total file size in bytes.
    pub size: u64,
    /// Whole-file content hash.
    #[serde(rename = "sha256")]
    pub hash: ContentHash,
    /// Ordered, contiguous chunk references.
    pub chunks: Vec<ChunkRef>,
}

/// A manifest describing one (app, version, platform, channel) build.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manifest {
    /// App slug.
    pub app: String,
    /// Build version.
    pub version: String,
    /// Target platform.
    pub platform: String,
    /// Release channel.
    pub channel: String,
    /// Declared total size of all files.
    pub total_size: u64,
    /// Ordered list of files.
    pub files: Vec<FileEntry>,
    /// Base location for chunk retrieval.
    pub chunk_base: String,
    /// Optional detached signature over the manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Manifest {
    /// Parse and validate the build coordinates embedded in the manifest.
    pub fn coords(&self) -> crate::Result<BuildCoords> {
        BuildCoords::parse(&self.app, &self.version, &self.platform, &self.channel)
    }

    /// Validate internal consistency of the file list.
    ///
    /// Checks, in order per file: path safety and normalization, duplicate
    /// normalized paths, contiguous chunk offsets starting at 0, per-file
    /// chunk size sum against the declared file size; finally the sum of all
    /// file sizes against the declared total. Fails fast on the first
    /// violation.
    pub fn validate(&self) -> crate::Result<()> {
        let mut seen_paths = HashSet::new();
        let mut files_total: u64 = 0;

        for file in &self.files {
            let normalized = normalize_path(&file.path)?;
            if !seen_paths.insert(normalized) {
                return Err(crate::Error::DuplicatePath(file.path.clone()));
            }

            let mut expected_offset: u64 = 0;
            for chunk in &file.chunks {
                if chunk.offset != expected_offset {
                    return Err(crate::Error::OffsetGap {
                        path: file.path.clone(),
                        expected: expected_offset,
                        actual: chunk.offset,
                    });
                }
                expected_offset = expected_offset.saturating_add(chunk.size);
            }

            if expected_offset != file.size {
                return Err(crate::Error::SizeMismatch {
                    path: file.path.clone(),
                    declared: file.size,
                    actual: expected_offset,
                });
            }

            files_total = files_total.saturating_add(file.size);
        }

        if files_total != self.total_size {
            return Err(crate::Error::TotalMismatch {
                declared: self.total_size,
                actual: files_total,
            });
        }

        Ok(())
    }

    /// Collect the distinct chunk hashes referenced by this manifest,
    /// in first-appearance order.
    pub fn distinct_chunk_hashes(&self) -> Vec<ChunkHash> {
        let mut seen = HashSet::new();
        let mut hashes = Vec::new();
        for file in &self.files {
            for chunk in &file.chunks {
                if seen.insert(chunk.hash) {
                    hashes.push(chunk.hash);
                }
            }
        }
        hashes
    }

    /// Check whether a chunk hash appears anywhere in this manifest.
    pub fn references_chunk(&self, hash: &ChunkHash) -> bool {
        self.files
            .iter()
            .any(|f| f.chunks.iter().any(|c| &c.hash == hash))
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::Error::Serialization(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::Error::Serialization(e.to_string()))
    }
}

/// Normalize an externally supplied relative path.
///
/// Backslashes are normalized to forward slashes. Rejects absolute paths,
/// `.`/`..` and empty segments, and drive-letter-style prefixes. The result
/// is safe to join under a fixed root on both server and client.
pub fn normalize_path(raw: &str) -> crate::Result<String> {
    let raw = raw.trim().replace('\\', "/");
    if raw.is_empty() {
        return Err(crate::Error::InvalidPath("empty path".to_string()));
    }
    if raw.starts_with('/') {
        return Err(crate::Error::InvalidPath(format!("absolute path: {raw}")));
    }

    let mut segments = Vec::new();
    for segment in raw.split('/') {
        if segment.is_empty() {
            return Err(crate::Error::InvalidPath(format!(
                "empty path segment: {raw}"
            )));
        }
        if segment == "." || segment == ".." {
            return Err(crate::Error::InvalidPath(format!(
                "traversal segment in path: {raw}"
            )));
        }
        if segment.contains(':') {
            return Err(crate::Error::InvalidPath(format!(
                "drive-style segment in path: {raw}"
            )));
        }
        segments.push(segment);
    }

    Ok(segments.join("/"))
}
