//! Manifest repository.

use crate::error::MetadataResult;
use crate::models::ManifestRow;
use async_trait::async_trait;

/// Repository for persisted manifest records.
#[async_trait]
pub trait ManifestRepo: Send + Sync {
    /// Record the manifest for a finalized build.
    async fn create_manifest(&self, manifest: &ManifestRow) -> MetadataResult<()>;

    /// Get the manifest record for a build.
    async fn get_manifest(&self, build_id: i64) -> MetadataResult<Option<ManifestRow>>;
}
