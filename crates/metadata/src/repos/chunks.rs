//! Chunk index repository.

use crate::error::MetadataResult;
use crate::models::ChunkRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for the content-addressed chunk index.
#[async_trait]
pub trait ChunkRepo: Send + Sync {
    /// Record an upload of a chunk.
    ///
    /// A single atomic insert-or-increment: creates the record with
    /// refcount 1 on first upload of a hash, increments the refcount on
    /// every subsequent upload. Returns true if the record was newly
    /// created. Concurrent calls for the same new hash must not lose an
    /// increment.
    async fn record_chunk(
        &self,
        chunk_hash: &str,
        size_bytes: i64,
        object_key: &str,
        created_at: OffsetDateTime,
    ) -> MetadataResult<bool>;

    /// O(1) existence check against the index.
    async fn chunk_exists(&self, chunk_hash: &str) -> MetadataResult<bool>;

    /// Get a chunk record.
    async fn get_chunk(&self, chunk_hash: &str) -> MetadataResult<Option<ChunkRow>>;

    /// Return the subset of `chunk_hashes` absent from the index,
    /// preserving input order.
    async fn missing_chunks(&self, chunk_hashes: &[String]) -> MetadataResult<Vec<String>>;
}
