//! Shared handler utilities and the health endpoint.

use crate::error::{ApiError, ApiResult};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;

/// Health check (intentionally unauthenticated for load balancer probes).
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Read and decode a JSON request body with a size cap.
pub async fn read_json_body<T: DeserializeOwned>(
    body: axum::body::Body,
    limit: usize,
) -> ApiResult<T> {
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| ApiError::Validation(format!("failed to read body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Validation(format!("invalid JSON: {e}")))
}
