//! Build lifecycle endpoints: create, missing-chunk diff, finalize.

use crate::auth::{AuthenticatedUser, require_app_owner, require_auth};
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::read_json_body;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use depot_core::coords::{Channel, Platform, Version};
use depot_core::hash::is_hex_digest;
use depot_core::manifest::Manifest;
use depot_core::token::Role;
use depot_metadata::models::{AppRow, BuildRow, ManifestRow};
use depot_metadata::repos::{AppRepo, BuildRepo, ChunkRepo, ManifestRepo, SubmissionRepo};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Maximum request body size for build creation (64 KiB).
const MAX_BUILD_BODY_SIZE: usize = 64 * 1024;

/// Maximum request body size for missing-chunk diffs and manifests (10 MiB).
///
/// At ~100 bytes per chunk entry this supports hash sets well past a
/// terabyte of build content.
const MAX_MANIFEST_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Resolve a build and its app, enforcing publisher role and app ownership.
async fn resolve_owned_build(
    state: &AppState,
    auth: &AuthenticatedUser,
    build_id: i64,
) -> ApiResult<(BuildRow, AppRow)> {
    auth.require_role(Role::Publisher)?;

    let build = state
        .metadata
        .get_build(build_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("build not found: {build_id}")))?;
    let app = state
        .metadata
        .get_app(build.app_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("app not found: {}", build.app_id)))?;
    require_app_owner(auth, &app)?;

    Ok((build, app))
}

#[derive(Debug, Deserialize)]
pub struct CreateBuildRequest {
    pub app_id: i64,
    pub version: String,
    pub platform: String,
    pub channel: String,
}

#[derive(Debug, Serialize)]
pub struct CreateBuildResponse {
    pub id: i64,
}

/// POST /v1/builds - Create a draft build (publisher, app owner).
pub async fn create_build(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<CreateBuildResponse>)> {
    let auth = require_auth(&req)?.clone();
    auth.require_role(Role::Publisher)?;

    let body: CreateBuildRequest = read_json_body(req.into_body(), MAX_BUILD_BODY_SIZE).await?;

    let version = Version::new(body.version)?;
    let platform = Platform::parse(&body.platform)?;
    let channel = Channel::parse(&body.channel)?;

    let app = state
        .metadata
        .get_app(body.app_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("app not found: {}", body.app_id)))?;
    require_app_owner(&auth, &app)?;

    let build_id = state
        .metadata
        .create_build(
            app.app_id,
            version.as_str(),
            platform.as_str(),
            channel.as_str(),
            OffsetDateTime::now_utc(),
        )
        .await?;

    tracing::info!(build_id, app = %app.slug, %version, %platform, %channel, "build created");
    Ok((
        StatusCode::CREATED,
        Json(CreateBuildResponse { id: build_id }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct MissingChunksRequest {
    #[serde(default)]
    pub hashes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MissingChunksResponse {
    pub missing: Vec<String>,
}

/// POST /v1/builds/{id}/missing-chunks - Diff a hash set against the store.
///
/// Unchanged chunks across versions never re-transfer: the client uploads
/// only what this returns.
pub async fn missing_chunks(
    State(state): State<AppState>,
    Path(build_id): Path<i64>,
    req: Request,
) -> ApiResult<Json<MissingChunksResponse>> {
    let auth = require_auth(&req)?.clone();
    let _ = resolve_owned_build(&state, &auth, build_id).await?;

    let body: MissingChunksRequest =
        read_json_body(req.into_body(), MAX_MANIFEST_BODY_SIZE).await?;

    for (i, hash) in body.hashes.iter().enumerate() {
        if !is_hex_digest(hash) {
            return Err(ApiError::Validation(format!(
                "hashes[{i}] is not a 64-char hex digest"
            )));
        }
    }

    let missing = state.metadata.missing_chunks(&body.hashes).await?;
    Ok(Json(MissingChunksResponse { missing }))
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub manifest_url: String,
    pub submission_id: i64,
}

/// POST /v1/builds/{id}/finalize - Persist the manifest and open review.
///
/// Re-runs full manifest validation, requires the manifest coordinates to
/// match the build row, and requires every referenced chunk to already be in
/// the store. A build that is already ready rejects with a conflict rather
/// than overwriting its manifest.
pub async fn finalize_build(
    State(state): State<AppState>,
    Path(build_id): Path<i64>,
    req: Request,
) -> ApiResult<Json<FinalizeResponse>> {
    let auth = require_auth(&req)?.clone();
    let (build, app) = resolve_owned_build(&state, &auth, build_id).await?;

    if build.status != "draft" {
        return Err(ApiError::Conflict(format!(
            "build {build_id} is already finalized"
        )));
    }

    let manifest: Manifest = read_json_body(req.into_body(), MAX_MANIFEST_BODY_SIZE).await?;

    manifest.validate()?;
    let coords = manifest.coords()?;

    if coords.slug.as_str() != app.slug
        || coords.version.as_str() != build.version
        || coords.platform.as_str() != build.platform
        || coords.channel.as_str() != build.channel
    {
        return Err(ApiError::Validation(format!(
            "manifest coordinates {coords} do not match build {}/{}/{}/{}",
            app.slug, build.version, build.platform, build.channel
        )));
    }

    // Every referenced chunk must already exist; finalize never creates
    // chunk records.
    let hashes: Vec<String> = manifest
        .distinct_chunk_hashes()
        .iter()
        .map(|h| h.to_hex())
        .collect();
    let missing = state.metadata.missing_chunks(&hashes).await?;
    if !missing.is_empty() {
        return Err(ApiError::Validation(format!(
            "{} referenced chunks are not in the store (first: {})",
            missing.len(),
            missing[0]
        )));
    }

    let manifest_key = coords.manifest_object_key();
    let manifest_json = manifest.to_json()?;
    state
        .storage
        .put(&manifest_key, bytes::Bytes::from(manifest_json))
        .await?;

    if !state
        .metadata
        .mark_build_ready(build_id, &manifest_key)
        .await?
    {
        return Err(ApiError::Conflict(format!(
            "build {build_id} is already finalized"
        )));
    }

    let now = OffsetDateTime::now_utc();
    state
        .metadata
        .create_manifest(&ManifestRow {
            build_id,
            object_key: manifest_key.clone(),
            total_size: i64::try_from(manifest.total_size)
                .map_err(|_| ApiError::Validation("total_size exceeds i64".to_string()))?,
            file_count: manifest.files.len() as i64,
            created_at: now,
        })
        .await?;

    let submission_id = state.metadata.create_submission(build_id, now).await?;

    tracing::info!(
        build_id,
        submission_id,
        app = %app.slug,
        files = manifest.files.len(),
        "build finalized, submission opened"
    );

    Ok(Json(FinalizeResponse {
        manifest_url: manifest_key,
        submission_id,
    }))
}
