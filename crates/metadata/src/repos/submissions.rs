//! Submission repository.

use crate::error::MetadataResult;
use crate::models::SubmissionRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for review submissions.
#[async_trait]
pub trait SubmissionRepo: Send + Sync {
    /// Open a pending submission for a finalized build.
    async fn create_submission(
        &self,
        build_id: i64,
        created_at: OffsetDateTime,
    ) -> MetadataResult<i64>;

    /// Get a submission by id.
    async fn get_submission(&self, submission_id: i64) -> MetadataResult<Option<SubmissionRow>>;

    /// List submissions, optionally filtered by status.
    async fn list_submissions(&self, status: Option<&str>) -> MetadataResult<Vec<SubmissionRow>>;

    /// Decide a pending submission (approved/rejected).
    ///
    /// Guarded on the current status being `pending`; returns false if the
    /// submission was already processed.
    async fn decide_submission(
        &self,
        submission_id: i64,
        status: &str,
        note: Option<&str>,
        decided_at: OffsetDateTime,
    ) -> MetadataResult<bool>;
}
