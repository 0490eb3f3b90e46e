//! App management endpoints.

use crate::auth::require_auth;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::read_json_body;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use depot_core::coords::AppSlug;
use depot_core::token::Role;
use depot_metadata::repos::AppRepo;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Maximum request body size for app endpoints (64 KiB).
const MAX_APP_BODY_SIZE: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
pub struct CreateAppRequest {
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct CreateAppResponse {
    pub id: i64,
}

/// POST /v1/apps - Create an app (publisher).
pub async fn create_app(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<CreateAppResponse>)> {
    let auth = require_auth(&req)?.clone();
    auth.require_role(Role::Publisher)?;

    let body: CreateAppRequest = read_json_body(req.into_body(), MAX_APP_BODY_SIZE).await?;

    let slug = AppSlug::new(body.slug)?;
    let title = body.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }

    let app_id = match state
        .metadata
        .create_app(
            slug.as_str(),
            &title,
            auth.user_id(),
            OffsetDateTime::now_utc(),
        )
        .await
    {
        Ok(id) => id,
        Err(depot_metadata::MetadataError::AlreadyExists(_)) => {
            return Err(ApiError::Conflict(format!("slug already taken: {slug}")));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(app_id, slug = %slug, owner = auth.user_id(), "app created");
    Ok((StatusCode::CREATED, Json(CreateAppResponse { id: app_id })))
}
