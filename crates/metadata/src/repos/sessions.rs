//! Session repository.

use crate::error::MetadataResult;
use crate::models::SessionRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for refresh-token sessions.
#[async_trait]
pub trait SessionRepo: Send + Sync {
    /// Create a session.
    async fn create_session(&self, session: &SessionRow) -> MetadataResult<()>;

    /// Get a session by id.
    async fn get_session(&self, session_id: Uuid) -> MetadataResult<Option<SessionRow>>;

    /// Atomically rotate the refresh-secret hash.
    ///
    /// The update is guarded on the currently stored hash and on the session
    /// being unrevoked, so of two concurrent refresh calls at most one can
    /// succeed; the loser observes `false` and must treat the presented
    /// secret as stale. This is what makes reuse detection race-free.
    async fn rotate_refresh_hash(
        &self,
        session_id: Uuid,
        presented_hash: &str,
        new_hash: &str,
        new_expires_at: OffsetDateTime,
        used_at: OffsetDateTime,
    ) -> MetadataResult<bool>;

    /// Revoke a session. Idempotent; the first revocation timestamp wins.
    async fn revoke_session(
        &self,
        session_id: Uuid,
        revoked_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Revoke every active session for a user. Returns the number revoked.
    async fn revoke_all_for_user(
        &self,
        user_id: i64,
        revoked_at: OffsetDateTime,
    ) -> MetadataResult<u64>;

    /// Update last-use time.
    async fn touch_session(
        &self,
        session_id: Uuid,
        used_at: OffsetDateTime,
    ) -> MetadataResult<()>;
}
