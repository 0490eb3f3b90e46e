//! Manifest download endpoint and shared build resolution.

use crate::auth::{AuthenticatedUser, authorize_download, require_auth};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, Query, Request, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use depot_core::manifest::Manifest;
use depot_metadata::models::{AppRow, BuildRow};
use depot_metadata::repos::{AppRepo, BuildRepo};
use serde::Deserialize;

/// Resolve an authorized, ready build and its parsed manifest.
///
/// This is the single gate both the manifest and chunk endpoints pass
/// through: download authorization happens before any storage access, and
/// the manifest the caller ends up with is always the one resolved from the
/// requested coordinates.
pub async fn resolve_authorized_manifest(
    state: &AppState,
    auth: &AuthenticatedUser,
    slug: &str,
    platform: &str,
    channel: &str,
    version: Option<&str>,
) -> ApiResult<(AppRow, BuildRow, Manifest)> {
    let app = state
        .metadata
        .get_app_by_slug(slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("app not found: {slug}")))?;

    authorize_download(state, auth, &app).await?;

    let build = state
        .metadata
        .latest_ready_build(app.app_id, platform, channel, version)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("no manifest for {slug}/{platform}/{channel}"))
        })?;

    let manifest_key = build.manifest_key.clone().ok_or_else(|| {
        ApiError::Internal(format!("ready build {} has no manifest key", build.build_id))
    })?;

    let manifest_bytes = state.storage.get(&manifest_key).await.map_err(|e| match e {
        depot_storage::StorageError::NotFound(_) => {
            ApiError::NotFound("manifest missing from storage".to_string())
        }
        other => other.into(),
    })?;

    let manifest = Manifest::from_json(
        std::str::from_utf8(&manifest_bytes)
            .map_err(|e| ApiError::Internal(format!("manifest is not UTF-8: {e}")))?,
    )
    .map_err(|e| ApiError::Internal(format!("stored manifest is corrupt: {e}")))?;

    Ok((app, build, manifest))
}

#[derive(Debug, Deserialize)]
pub struct ManifestQuery {
    #[serde(default)]
    pub version: Option<String>,
}

/// GET /v1/manifest/{slug}/{platform}/{channel} - Fetch a build manifest.
pub async fn get_manifest(
    State(state): State<AppState>,
    Path((slug, platform, channel)): Path<(String, String, String)>,
    Query(query): Query<ManifestQuery>,
    req: Request,
) -> ApiResult<Response> {
    let auth = require_auth(&req)?;

    let (_, _, manifest) = resolve_authorized_manifest(
        &state,
        auth,
        &slug,
        &platform,
        &channel,
        query.version.as_deref(),
    )
    .await?;

    let body = manifest.to_json()?;
    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}
