//! Purchase repository.

use crate::error::MetadataResult;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for purchase records. This core only reads them as an
/// authorization predicate and appends new entitlements.
#[async_trait]
pub trait PurchaseRepo: Send + Sync {
    /// Record a purchase, returning the new purchase id.
    async fn record_purchase(
        &self,
        user_id: i64,
        app_id: i64,
        price_cents: i64,
        purchased_at: OffsetDateTime,
    ) -> MetadataResult<i64>;

    /// Check whether a purchase links the user to the app.
    async fn purchase_exists(&self, user_id: i64, app_id: i64) -> MetadataResult<bool>;
}
