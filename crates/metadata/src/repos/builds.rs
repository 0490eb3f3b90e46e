//! Build repository.

use crate::error::MetadataResult;
use crate::models::BuildRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for builds.
#[async_trait]
pub trait BuildRepo: Send + Sync {
    /// Create a draft build, returning the new build id.
    async fn create_build(
        &self,
        app_id: i64,
        version: &str,
        platform: &str,
        channel: &str,
        created_at: OffsetDateTime,
    ) -> MetadataResult<i64>;

    /// Get a build by id.
    async fn get_build(&self, build_id: i64) -> MetadataResult<Option<BuildRow>>;

    /// Transition a build draft -> ready, recording its manifest key.
    ///
    /// Guarded on the current status being `draft`; returns false if the
    /// build was already finalized (callers reject the second finalize).
    async fn mark_build_ready(&self, build_id: i64, manifest_key: &str) -> MetadataResult<bool>;

    /// Resolve the most recent ready build for the given coordinates,
    /// or the exact version if one is supplied.
    async fn latest_ready_build(
        &self,
        app_id: i64,
        platform: &str,
        channel: &str,
        version: Option<&str>,
    ) -> MetadataResult<Option<BuildRow>>;
}
