//! Chunk upload and download endpoints.

use crate::auth::require_auth;
use crate::error::{ApiError, ApiResult};
use crate::handlers::manifests::resolve_authorized_manifest;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, Request, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use depot_core::chunk::{Chunk, ChunkHash};
use depot_core::token::Role;
use depot_metadata::repos::ChunkRepo;
use serde::Deserialize;
use time::OffsetDateTime;

/// Slack on top of the configured max chunk size when reading upload bodies.
const CHUNK_UPLOAD_BUFFER: usize = 1024;

#[derive(Debug, serde::Serialize)]
pub struct UploadChunkResponse {
    pub ok: bool,
}

/// POST /v1/chunks/{hash} - Upload one chunk (publisher).
///
/// The body is hashed and must match the claimed hash exactly; a mismatch is
/// a client error and nothing is stored. Re-uploading a known hash is
/// idempotent for the bytes and increments the reference count.
pub async fn upload_chunk(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    req: Request,
) -> ApiResult<Json<UploadChunkResponse>> {
    let auth = require_auth(&req)?.clone();
    auth.require_role(Role::Publisher)?;

    let expected = ChunkHash::from_hex(&hash)
        .map_err(|e| ApiError::Validation(format!("invalid chunk hash: {e}")))?;

    let limit = state.config.server.max_chunk_size as usize + CHUNK_UPLOAD_BUFFER;
    let data = axum::body::to_bytes(req.into_body(), limit)
        .await
        .map_err(|e| ApiError::Validation(format!("failed to read chunk body: {e}")))?;

    if data.is_empty() {
        return Err(ApiError::Validation("empty chunk body".to_string()));
    }
    if data.len() as u64 > state.config.server.max_chunk_size {
        return Err(ApiError::Validation(format!(
            "chunk exceeds maximum size {}",
            state.config.server.max_chunk_size
        )));
    }

    let chunk = Chunk::new(data);
    chunk.verify(&expected).map_err(|_| ApiError::HashMismatch {
        expected: expected.to_hex(),
        actual: chunk.hash.to_hex(),
    })?;

    let object_key = expected.to_object_key();
    let size = chunk.size();

    // Bytes land first, then the index record. A crash in between leaves an
    // orphaned object, never an index entry pointing at nothing.
    let written = state
        .storage
        .put_if_not_exists(&object_key, chunk.data)
        .await?;
    let created = state
        .metadata
        .record_chunk(
            &expected.to_hex(),
            size as i64,
            &object_key,
            OffsetDateTime::now_utc(),
        )
        .await?;

    tracing::debug!(
        chunk = %expected,
        size,
        written,
        created,
        "chunk upload processed"
    );

    Ok(Json(UploadChunkResponse { ok: true }))
}

#[derive(Debug, Deserialize)]
pub struct ChunkQuery {
    pub slug: String,
    pub version: String,
    pub platform: String,
    pub channel: String,
}

/// GET /v1/chunks/{hash} - Download one chunk (authorized downloader).
///
/// The hash must appear in the manifest resolved from the supplied build
/// coordinates; holding a manifest for one app never unlocks another app's
/// bytes by hash guessing.
pub async fn download_chunk(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Query(query): Query<ChunkQuery>,
    req: Request,
) -> ApiResult<Response> {
    let auth = require_auth(&req)?;

    let chunk_hash = ChunkHash::from_hex(&hash)
        .map_err(|e| ApiError::Validation(format!("invalid chunk hash: {e}")))?;

    let (_, _, manifest) = resolve_authorized_manifest(
        &state,
        auth,
        &query.slug,
        &query.platform,
        &query.channel,
        Some(&query.version),
    )
    .await?;

    if !manifest.references_chunk(&chunk_hash) {
        return Err(ApiError::NotFound(format!(
            "chunk not part of this build: {chunk_hash}"
        )));
    }

    let data = state
        .storage
        .get(&chunk_hash.to_object_key())
        .await
        .map_err(|e| match e {
            depot_storage::StorageError::NotFound(_) => {
                ApiError::NotFound(format!("chunk not found: {chunk_hash}"))
            }
            other => other.into(),
        })?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        data,
    )
        .into_response())
}
