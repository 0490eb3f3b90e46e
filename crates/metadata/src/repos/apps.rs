//! App repository.

use crate::error::MetadataResult;
use crate::models::AppRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for apps.
#[async_trait]
pub trait AppRepo: Send + Sync {
    /// Create an app, returning the new app id.
    /// Fails `AlreadyExists` if the slug is taken.
    async fn create_app(
        &self,
        slug: &str,
        title: &str,
        owner_user_id: i64,
        created_at: OffsetDateTime,
    ) -> MetadataResult<i64>;

    /// Get an app by id.
    async fn get_app(&self, app_id: i64) -> MetadataResult<Option<AppRow>>;

    /// Get an app by slug.
    async fn get_app_by_slug(&self, slug: &str) -> MetadataResult<Option<AppRow>>;

    /// Set the public visibility flag.
    async fn set_app_visible(&self, app_id: i64, visible: bool) -> MetadataResult<()>;
}
