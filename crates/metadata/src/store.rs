//! Metadata store trait and SQLite implementation.

use crate::error::MetadataResult;
use crate::repos::{
    AppRepo, BuildRepo, ChunkRepo, ManifestRepo, PurchaseRepo, SessionRepo, SubmissionRepo,
    UserRepo,
};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore:
    UserRepo
    + SessionRepo
    + AppRepo
    + BuildRepo
    + SubmissionRepo
    + PurchaseRepo
    + ChunkRepo
    + ManifestRepo
    + Send
    + Sync
{
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store, migrating on open.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| crate::MetadataError::Internal(e.to_string()))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))
            .map_err(sqlx::Error::from)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // avoids persistent "database is locked" failures under axum
            // handler concurrency.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement all repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::error::MetadataError;
    use crate::models::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl UserRepo for SqliteStore {
        async fn create_user(&self, user: &NewUser) -> MetadataResult<i64> {
            let user_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO users (email, username, password_hash, role, created_at)
                VALUES (?, ?, ?, ?, ?)
                RETURNING user_id
                "#,
            )
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.role)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await?;
            Ok(user_id)
        }

        async fn get_user(&self, user_id: i64) -> MetadataResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_user_by_email(&self, email: &str) -> MetadataResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_user_by_username(&self, username: &str) -> MetadataResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>(
                "SELECT * FROM users WHERE username = ? COLLATE NOCASE",
            )
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn set_password_hash(
            &self,
            user_id: i64,
            password_hash: &str,
        ) -> MetadataResult<()> {
            let result = sqlx::query("UPDATE users SET password_hash = ? WHERE user_id = ?")
                .bind(password_hash)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("user {user_id}")));
            }
            Ok(())
        }

        async fn set_reset_hash(
            &self,
            user_id: i64,
            reset_hash: Option<&str>,
        ) -> MetadataResult<()> {
            let result = sqlx::query("UPDATE users SET reset_hash = ? WHERE user_id = ?")
                .bind(reset_hash)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("user {user_id}")));
            }
            Ok(())
        }

        async fn set_role(&self, user_id: i64, role: &str) -> MetadataResult<()> {
            let result = sqlx::query("UPDATE users SET role = ? WHERE user_id = ?")
                .bind(role)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("user {user_id}")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SessionRepo for SqliteStore {
        async fn create_session(&self, session: &SessionRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO sessions (
                    session_id, user_id, refresh_hash, device_id,
                    created_at, last_used_at, expires_at, revoked_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(session.session_id)
            .bind(session.user_id)
            .bind(&session.refresh_hash)
            .bind(&session.device_id)
            .bind(session.created_at)
            .bind(session.last_used_at)
            .bind(session.expires_at)
            .bind(session.revoked_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_session(&self, session_id: Uuid) -> MetadataResult<Option<SessionRow>> {
            let row =
                sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE session_id = ?")
                    .bind(session_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn rotate_refresh_hash(
            &self,
            session_id: Uuid,
            presented_hash: &str,
            new_hash: &str,
            new_expires_at: OffsetDateTime,
            used_at: OffsetDateTime,
        ) -> MetadataResult<bool> {
            // Compare-and-swap: the WHERE clause pins the stored hash, so a
            // stale secret (already rotated away, or a concurrent winner)
            // affects zero rows.
            let result = sqlx::query(
                r#"
                UPDATE sessions
                SET refresh_hash = ?, expires_at = ?, last_used_at = ?
                WHERE session_id = ? AND refresh_hash = ? AND revoked_at IS NULL
                "#,
            )
            .bind(new_hash)
            .bind(new_expires_at)
            .bind(used_at)
            .bind(session_id)
            .bind(presented_hash)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn revoke_session(
            &self,
            session_id: Uuid,
            revoked_at: OffsetDateTime,
        ) -> MetadataResult<()> {
            sqlx::query(
                "UPDATE sessions SET revoked_at = ? WHERE session_id = ? AND revoked_at IS NULL",
            )
            .bind(revoked_at)
            .bind(session_id)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn revoke_all_for_user(
            &self,
            user_id: i64,
            revoked_at: OffsetDateTime,
        ) -> MetadataResult<u64> {
            let result = sqlx::query(
                "UPDATE sessions SET revoked_at = ? WHERE user_id = ? AND revoked_at IS NULL",
            )
            .bind(revoked_at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected())
        }

        async fn touch_session(
            &self,
            session_id: Uuid,
            used_at: OffsetDateTime,
        ) -> MetadataResult<()> {
            sqlx::query("UPDATE sessions SET last_used_at = ? WHERE session_id = ?")
                .bind(used_at)
                .bind(session_id)
                .execute(&self.pool)
                .await?;
            Ok(())
        }
    }

    #[async_trait]
    impl AppRepo for SqliteStore {
        async fn create_app(
            &self,
            slug: &str,
            title: &str,
            owner_user_id: i64,
            created_at: OffsetDateTime,
        ) -> MetadataResult<i64> {
            let app_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO apps (slug, title, owner_user_id, visible, created_at)
                VALUES (?, ?, ?, 0, ?)
                RETURNING app_id
                "#,
            )
            .bind(slug)
            .bind(title)
            .bind(owner_user_id)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await?;
            Ok(app_id)
        }

        async fn get_app(&self, app_id: i64) -> MetadataResult<Option<AppRow>> {
            let row = sqlx::query_as::<_, AppRow>("SELECT * FROM apps WHERE app_id = ?")
                .bind(app_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_app_by_slug(&self, slug: &str) -> MetadataResult<Option<AppRow>> {
            let row = sqlx::query_as::<_, AppRow>("SELECT * FROM apps WHERE slug = ?")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn set_app_visible(&self, app_id: i64, visible: bool) -> MetadataResult<()> {
            let result = sqlx::query("UPDATE apps SET visible = ? WHERE app_id = ?")
                .bind(visible)
                .bind(app_id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("app {app_id}")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BuildRepo for SqliteStore {
        async fn create_build(
            &self,
            app_id: i64,
            version: &str,
            platform: &str,
            channel: &str,
            created_at: OffsetDateTime,
        ) -> MetadataResult<i64> {
            let build_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO builds (app_id, version, platform, channel, status, created_at)
                VALUES (?, ?, ?, ?, 'draft', ?)
                RETURNING build_id
                "#,
            )
            .bind(app_id)
            .bind(version)
            .bind(platform)
            .bind(channel)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await?;
            Ok(build_id)
        }

        async fn get_build(&self, build_id: i64) -> MetadataResult<Option<BuildRow>> {
            let row = sqlx::query_as::<_, BuildRow>("SELECT * FROM builds WHERE build_id = ?")
                .bind(build_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn mark_build_ready(
            &self,
            build_id: i64,
            manifest_key: &str,
        ) -> MetadataResult<bool> {
            // Guarded on draft status: a second finalize affects zero rows.
            let result = sqlx::query(
                "UPDATE builds SET status = 'ready', manifest_key = ? WHERE build_id = ? AND status = 'draft'",
            )
            .bind(manifest_key)
            .bind(build_id)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn latest_ready_build(
            &self,
            app_id: i64,
            platform: &str,
            channel: &str,
            version: Option<&str>,
        ) -> MetadataResult<Option<BuildRow>> {
            let row = match version {
                Some(version) => {
                    sqlx::query_as::<_, BuildRow>(
                        r#"
                        SELECT * FROM builds
                        WHERE app_id = ? AND platform = ? AND channel = ?
                          AND version = ? AND status = 'ready'
                        ORDER BY build_id DESC LIMIT 1
                        "#,
                    )
                    .bind(app_id)
                    .bind(platform)
                    .bind(channel)
                    .bind(version)
                    .fetch_optional(&self.pool)
                    .await?
                }
                None => {
                    sqlx::query_as::<_, BuildRow>(
                        r#"
                        SELECT * FROM builds
                        WHERE app_id = ? AND platform = ? AND channel = ? AND status = 'ready'
                        ORDER BY build_id DESC LIMIT 1
                        "#,
                    )
                    .bind(app_id)
                    .bind(platform)
                    .bind(channel)
                    .fetch_optional(&self.pool)
                    .await?
                }
            };
            Ok(row)
        }
    }

    #[async_trait]
    impl SubmissionRepo for SqliteStore {
        async fn create_submission(
            &self,
            build_id: i64,
            created_at: OffsetDateTime,
        ) -> MetadataResult<i64> {
            let submission_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO submissions (build_id, status, created_at)
                VALUES (?, 'pending', ?)
                RETURNING submission_id
                "#,
            )
            .bind(build_id)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await?;
            Ok(submission_id)
        }

        async fn get_submission(
            &self,
            submission_id: i64,
        ) -> MetadataResult<Option<SubmissionRow>> {
            let row = sqlx::query_as::<_, SubmissionRow>(
                "SELECT * FROM submissions WHERE submission_id = ?",
            )
            .bind(submission_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn list_submissions(
            &self,
            status: Option<&str>,
        ) -> MetadataResult<Vec<SubmissionRow>> {
            let rows = match status {
                Some(status) => {
                    sqlx::query_as::<_, SubmissionRow>(
                        "SELECT * FROM submissions WHERE status = ? ORDER BY submission_id DESC",
                    )
                    .bind(status)
                    .fetch_all(&self.pool)
                    .await?
                }
                None => {
                    sqlx::query_as::<_, SubmissionRow>(
                        "SELECT * FROM submissions ORDER BY submission_id DESC",
                    )
                    .fetch_all(&self.pool)
                    .await?
                }
            };
            Ok(rows)
        }

        async fn decide_submission(
            &self,
            submission_id: i64,
            status: &str,
            note: Option<&str>,
            decided_at: OffsetDateTime,
        ) -> MetadataResult<bool> {
            // Guarded on pending status so approve/reject are terminal and
            // two concurrent decisions cannot both win.
            let result = sqlx::query(
                r#"
                UPDATE submissions
                SET status = ?, note = ?, decided_at = ?
                WHERE submission_id = ? AND status = 'pending'
                "#,
            )
            .bind(status)
            .bind(note)
            .bind(decided_at)
            .bind(submission_id)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        }
    }

    #[async_trait]
    impl PurchaseRepo for SqliteStore {
        async fn record_purchase(
            &self,
            user_id: i64,
            app_id: i64,
            price_cents: i64,
            purchased_at: OffsetDateTime,
        ) -> MetadataResult<i64> {
            let purchase_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO purchases (user_id, app_id, price_cents, purchased_at)
                VALUES (?, ?, ?, ?)
                RETURNING purchase_id
                "#,
            )
            .bind(user_id)
            .bind(app_id)
            .bind(price_cents)
            .bind(purchased_at)
            .fetch_one(&self.pool)
            .await?;
            Ok(purchase_id)
        }

        async fn purchase_exists(&self, user_id: i64, app_id: i64) -> MetadataResult<bool> {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM purchases WHERE user_id = ? AND app_id = ?)",
            )
            .bind(user_id)
            .bind(app_id)
            .fetch_one(&self.pool)
            .await?;
            Ok(exists)
        }
    }

    #[async_trait]
    impl ChunkRepo for SqliteStore {
        async fn record_chunk(
            &self,
            chunk_hash: &str,
            size_bytes: i64,
            object_key: &str,
            created_at: OffsetDateTime,
        ) -> MetadataResult<bool> {
            // Atomic insert-or-increment. The unique primary key plus the
            // conflict clause make concurrent uploads of the same new hash
            // serialize at the storage layer; no increment is ever lost.
            let refcount: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO chunks (chunk_hash, size_bytes, object_key, refcount, created_at)
                VALUES (?, ?, ?, 1, ?)
                ON CONFLICT(chunk_hash) DO UPDATE SET refcount = refcount + 1
                RETURNING refcount
                "#,
            )
            .bind(chunk_hash)
            .bind(size_bytes)
            .bind(object_key)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await?;
            Ok(refcount == 1)
        }

        async fn chunk_exists(&self, chunk_hash: &str) -> MetadataResult<bool> {
            let row: Option<(i32,)> =
                sqlx::query_as("SELECT 1 FROM chunks WHERE chunk_hash = ?")
                    .bind(chunk_hash)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row.is_some())
        }

        async fn get_chunk(&self, chunk_hash: &str) -> MetadataResult<Option<ChunkRow>> {
            let row = sqlx::query_as::<_, ChunkRow>("SELECT * FROM chunks WHERE chunk_hash = ?")
                .bind(chunk_hash)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn missing_chunks(&self, chunk_hashes: &[String]) -> MetadataResult<Vec<String>> {
            use std::collections::HashSet;

            if chunk_hashes.is_empty() {
                return Ok(Vec::new());
            }

            // SQLite caps bound parameters around 999; batch the IN clause.
            const BATCH_SIZE: usize = 900;
            let mut present: HashSet<String> = HashSet::with_capacity(chunk_hashes.len());

            for batch in chunk_hashes.chunks(BATCH_SIZE) {
                let placeholders: Vec<&str> = batch.iter().map(|_| "?").collect();
                let query = format!(
                    "SELECT chunk_hash FROM chunks WHERE chunk_hash IN ({})",
                    placeholders.join(", ")
                );

                let mut query_builder = sqlx::query_scalar::<_, String>(&query);
                for hash in batch {
                    query_builder = query_builder.bind(hash);
                }

                for hash in query_builder.fetch_all(&self.pool).await? {
                    present.insert(hash);
                }
            }

            let mut seen = HashSet::new();
            Ok(chunk_hashes
                .iter()
                .filter(|h| !present.contains(*h) && seen.insert(*h))
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl ManifestRepo for SqliteStore {
        async fn create_manifest(&self, manifest: &ManifestRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO manifests (build_id, object_key, total_size, file_count, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(manifest.build_id)
            .bind(&manifest.object_key)
            .bind(manifest.total_size)
            .bind(manifest.file_count)
            .bind(manifest.created_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_manifest(&self, build_id: i64) -> MetadataResult<Option<ManifestRow>> {
            let row =
                sqlx::query_as::<_, ManifestRow>("SELECT * FROM manifests WHERE build_id = ?")
                    .bind(build_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }
    }
}

/// Database schema, applied idempotently on open.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    username TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    reset_hash TEXT,
    role TEXT NOT NULL DEFAULT 'user',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_username ON users(username COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS sessions (
    session_id BLOB PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(user_id),
    refresh_hash TEXT NOT NULL,
    device_id TEXT,
    created_at TEXT NOT NULL,
    last_used_at TEXT,
    expires_at TEXT NOT NULL,
    revoked_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);

CREATE TABLE IF NOT EXISTS apps (
    app_id INTEGER PRIMARY KEY AUTOINCREMENT,
    slug TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    owner_user_id INTEGER NOT NULL REFERENCES users(user_id),
    visible INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS builds (
    build_id INTEGER PRIMARY KEY AUTOINCREMENT,
    app_id INTEGER NOT NULL REFERENCES apps(app_id),
    version TEXT NOT NULL,
    platform TEXT NOT NULL,
    channel TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    manifest_key TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_builds_coords ON builds(app_id, platform, channel, version);

CREATE TABLE IF NOT EXISTS submissions (
    submission_id INTEGER PRIMARY KEY AUTOINCREMENT,
    build_id INTEGER NOT NULL REFERENCES builds(build_id),
    status TEXT NOT NULL DEFAULT 'pending',
    note TEXT,
    created_at TEXT NOT NULL,
    decided_at TEXT
);

CREATE TABLE IF NOT EXISTS purchases (
    purchase_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(user_id),
    app_id INTEGER NOT NULL REFERENCES apps(app_id),
    price_cents INTEGER NOT NULL,
    purchased_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_purchases_user_app ON purchases(user_id, app_id);

CREATE TABLE IF NOT EXISTS chunks (
    chunk_hash TEXT PRIMARY KEY,
    size_bytes INTEGER NOT NULL,
    object_key TEXT NOT NULL,
    refcount INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS manifests (
    build_id INTEGER PRIMARY KEY REFERENCES builds(build_id),
    object_key TEXT NOT NULL,
    total_size INTEGER NOT NULL,
    file_count INTEGER NOT NULL,
    created_at TEXT NOT NULL
);
"#;
