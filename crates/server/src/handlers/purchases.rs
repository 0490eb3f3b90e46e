//! Purchase recording endpoint.

use crate::auth::require_auth;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::read_json_body;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use depot_metadata::repos::{AppRepo, PurchaseRepo};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Maximum request body size for purchase reports (4 KiB).
const MAX_PURCHASE_BODY_SIZE: usize = 4 * 1024;

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub app_id: i64,
    pub price_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub id: i64,
}

/// POST /v1/purchases - Record an entitlement for the calling user.
///
/// Pricing and ledger concerns live elsewhere; this endpoint only creates
/// the record the download-authorization predicate reads.
pub async fn record_purchase(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<PurchaseResponse>)> {
    let auth = require_auth(&req)?.clone();

    let body: PurchaseRequest = read_json_body(req.into_body(), MAX_PURCHASE_BODY_SIZE).await?;

    if body.price_cents < 0 {
        return Err(ApiError::Validation("price must be non-negative".to_string()));
    }

    let app = state
        .metadata
        .get_app(body.app_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("app not found: {}", body.app_id)))?;
    if !app.visible {
        return Err(ApiError::NotFound(format!("app not found: {}", app.slug)));
    }

    let purchase_id = state
        .metadata
        .record_purchase(
            auth.user_id(),
            app.app_id,
            body.price_cents,
            OffsetDateTime::now_utc(),
        )
        .await?;

    tracing::info!(
        purchase_id,
        user_id = auth.user_id(),
        app = %app.slug,
        "purchase recorded"
    );

    Ok((StatusCode::CREATED, Json(PurchaseResponse { id: purchase_id })))
}
