//! Database models mapping to the metadata schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Users and sessions
// =============================================================================

/// User account record. `password_hash` is a salted PBKDF2 hash; the
/// plaintext is never stored. `reset_hash` holds an optional forced-reset
/// credential.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub reset_hash: Option<String>,
    pub role: String,
    pub created_at: OffsetDateTime,
}

/// Fields for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: OffsetDateTime,
}

/// Session record. Only the hash of the rotating refresh secret is stored.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub session_id: Uuid,
    pub user_id: i64,
    pub refresh_hash: String,
    pub device_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub last_used_at: Option<OffsetDateTime>,
    pub expires_at: OffsetDateTime,
    pub revoked_at: Option<OffsetDateTime>,
}

impl SessionRow {
    /// Check if the session is still active (not revoked, not expired).
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        self.revoked_at.is_none() && now <= self.expires_at
    }
}

// =============================================================================
// Apps, builds, submissions, purchases
// =============================================================================

/// App record. `visible` is set by the most recent approved submission.
#[derive(Debug, Clone, FromRow)]
pub struct AppRow {
    pub app_id: i64,
    pub slug: String,
    pub title: String,
    pub owner_user_id: i64,
    pub visible: bool,
    pub created_at: OffsetDateTime,
}

/// Build record: one (app, version, platform, channel) row.
#[derive(Debug, Clone, FromRow)]
pub struct BuildRow {
    pub build_id: i64,
    pub app_id: i64,
    pub version: String,
    pub platform: String,
    pub channel: String,
    pub status: String,
    pub manifest_key: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Review submission tied 1:1 to a finalized build.
#[derive(Debug, Clone, FromRow)]
pub struct SubmissionRow {
    pub submission_id: i64,
    pub build_id: i64,
    pub status: String,
    pub note: Option<String>,
    pub created_at: OffsetDateTime,
    pub decided_at: Option<OffsetDateTime>,
}

/// Purchase record: the download-entitlement predicate.
#[derive(Debug, Clone, FromRow)]
pub struct PurchaseRow {
    pub purchase_id: i64,
    pub user_id: i64,
    pub app_id: i64,
    pub price_cents: i64,
    pub purchased_at: OffsetDateTime,
}

// =============================================================================
// Chunk index and manifests
// =============================================================================

/// Content-addressed chunk record with reference count.
#[derive(Debug, Clone, FromRow)]
pub struct ChunkRow {
    pub chunk_hash: String,
    pub size_bytes: i64,
    pub object_key: String,
    pub refcount: i64,
    pub created_at: OffsetDateTime,
}

/// Persisted manifest record for a ready build.
#[derive(Debug, Clone, FromRow)]
pub struct ManifestRow {
    pub build_id: i64,
    pub object_key: String,
    pub total_size: i64,
    pub file_count: i64,
    pub created_at: OffsetDateTime,
}
