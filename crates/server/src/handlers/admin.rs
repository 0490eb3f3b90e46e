//! Admin endpoints: review gate and user administration.

use crate::auth::require_auth;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::read_json_body;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, Request, State};
use depot_core::token::Role;
use depot_metadata::models::SubmissionRow;
use depot_metadata::repos::{AppRepo, BuildRepo, SessionRepo, SubmissionRepo, UserRepo};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Maximum request body size for admin endpoints (64 KiB).
const MAX_ADMIN_BODY_SIZE: usize = 64 * 1024;

/// Public view of a submission.
#[derive(Debug, Serialize)]
pub struct SubmissionInfo {
    pub id: i64,
    pub build_id: i64,
    pub status: String,
    pub note: Option<String>,
    pub created_at: String,
    pub decided_at: Option<String>,
}

impl From<&SubmissionRow> for SubmissionInfo {
    fn from(row: &SubmissionRow) -> Self {
        let fmt = time::format_description::well_known::Rfc3339;
        Self {
            id: row.submission_id,
            build_id: row.build_id,
            status: row.status.clone(),
            note: row.note.clone(),
            created_at: row.created_at.format(&fmt).unwrap_or_default(),
            decided_at: row.decided_at.and_then(|t| t.format(&fmt).ok()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListSubmissionsQuery {
    #[serde(default)]
    pub status: Option<String>,
}

/// GET /v1/admin/submissions - List review submissions (admin).
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<ListSubmissionsQuery>,
    req: Request,
) -> ApiResult<Json<Vec<SubmissionInfo>>> {
    let auth = require_auth(&req)?;
    auth.require_role(Role::Admin)?;

    if let Some(status) = &query.status {
        if !matches!(status.as_str(), "pending" | "approved" | "rejected") {
            return Err(ApiError::Validation(format!(
                "unknown submission status: {status}"
            )));
        }
    }

    let rows = state
        .metadata
        .list_submissions(query.status.as_deref())
        .await?;
    Ok(Json(rows.iter().map(SubmissionInfo::from).collect()))
}

/// Decide a pending submission; shared by approve and reject.
///
/// Distinguishes "never existed" (404) from "already processed" (409) only
/// after the compare-and-swap loses, so the happy path stays one write.
async fn decide(
    state: &AppState,
    submission_id: i64,
    status: &str,
    note: Option<&str>,
) -> ApiResult<SubmissionRow> {
    let decided = state
        .metadata
        .decide_submission(submission_id, status, note, OffsetDateTime::now_utc())
        .await?;

    if !decided {
        return match state.metadata.get_submission(submission_id).await? {
            None => Err(ApiError::NotFound(format!(
                "submission not found: {submission_id}"
            ))),
            Some(row) => Err(ApiError::Conflict(format!(
                "submission already {}",
                row.status
            ))),
        };
    }

    state
        .metadata
        .get_submission(submission_id)
        .await?
        .ok_or_else(|| ApiError::Internal("submission vanished after decide".to_string()))
}

/// POST /v1/admin/submissions/{id}/approve - Approve and publish (admin).
pub async fn approve_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<i64>,
    req: Request,
) -> ApiResult<Json<SubmissionInfo>> {
    let auth = require_auth(&req)?;
    auth.require_role(Role::Admin)?;

    let submission = decide(&state, submission_id, "approved", None).await?;

    // Approval flips the app's public visibility.
    let build = state
        .metadata
        .get_build(submission.build_id)
        .await?
        .ok_or_else(|| ApiError::Internal("approved submission has no build".to_string()))?;
    state.metadata.set_app_visible(build.app_id, true).await?;

    tracing::info!(submission_id, app_id = build.app_id, "submission approved");
    Ok(Json(SubmissionInfo::from(&submission)))
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub note: Option<String>,
}

/// POST /v1/admin/submissions/{id}/reject - Reject with a note (admin).
/// App visibility is left untouched.
pub async fn reject_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<i64>,
    req: Request,
) -> ApiResult<Json<SubmissionInfo>> {
    let auth = require_auth(&req)?;
    auth.require_role(Role::Admin)?;

    let body: RejectRequest = read_json_body(req.into_body(), MAX_ADMIN_BODY_SIZE)
        .await
        .unwrap_or_default();

    let submission = decide(&state, submission_id, "rejected", body.note.as_deref()).await?;
    tracing::info!(submission_id, "submission rejected");
    Ok(Json(SubmissionInfo::from(&submission)))
}

#[derive(Debug, Deserialize)]
pub struct ForceResetRequest {
    pub temporary_password: String,
}

/// POST /v1/admin/users/{id}/force-reset - Issue a temporary credential.
///
/// Stores only the hash of the temporary password and revokes every active
/// session, forcing re-authentication through the reset path.
pub async fn force_reset(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    req: Request,
) -> ApiResult<Json<serde_json::Value>> {
    let auth = require_auth(&req)?;
    auth.require_role(Role::Admin)?;

    let body: ForceResetRequest = read_json_body(req.into_body(), MAX_ADMIN_BODY_SIZE).await?;
    if body.temporary_password.is_empty() {
        return Err(ApiError::Validation(
            "temporary password is required".to_string(),
        ));
    }

    let user = state
        .metadata
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user not found: {user_id}")))?;

    let temporary = body.temporary_password.clone();
    let reset_hash = tokio::task::spawn_blocking(move || depot_auth::hash_password(&temporary))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?;

    state
        .metadata
        .set_reset_hash(user.user_id, Some(&reset_hash))
        .await?;
    let revoked = state
        .metadata
        .revoke_all_for_user(user.user_id, OffsetDateTime::now_utc())
        .await?;

    tracing::info!(user_id, revoked, "forced reset issued");
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

/// POST /v1/admin/users/{id}/role - Change a user's role (admin).
///
/// Role changes revoke all sessions so stale role claims cannot outlive the
/// change inside unexpired access tokens.
pub async fn set_role(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    req: Request,
) -> ApiResult<Json<serde_json::Value>> {
    let auth = require_auth(&req)?;
    auth.require_role(Role::Admin)?;

    let body: SetRoleRequest = read_json_body(req.into_body(), MAX_ADMIN_BODY_SIZE).await?;
    let role = Role::parse(&body.role)?;

    let user = state
        .metadata
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user not found: {user_id}")))?;

    state.metadata.set_role(user.user_id, role.as_str()).await?;
    let revoked = state
        .metadata
        .revoke_all_for_user(user.user_id, OffsetDateTime::now_utc())
        .await?;

    tracing::info!(user_id, role = %role, revoked, "role changed");
    Ok(Json(serde_json::json!({ "ok": true })))
}
