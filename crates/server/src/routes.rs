//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        // Health check (intentionally unauthenticated for load balancers)
        .route("/v1/health", get(handlers::health_check))
        // Sessions
        .route("/v1/auth/register", post(handlers::register))
        .route("/v1/auth/login", post(handlers::login))
        .route("/v1/auth/refresh", post(handlers::refresh))
        .route("/v1/auth/logout", post(handlers::logout))
        .route("/v1/auth/reset-password", post(handlers::reset_password))
        .route("/v1/auth/me", get(handlers::me))
        // Publishing
        .route("/v1/apps", post(handlers::create_app))
        .route("/v1/builds", post(handlers::create_build))
        .route(
            "/v1/builds/{build_id}/missing-chunks",
            post(handlers::missing_chunks),
        )
        .route(
            "/v1/builds/{build_id}/finalize",
            post(handlers::finalize_build),
        )
        // Chunk store
        .route(
            "/v1/chunks/{chunk_hash}",
            post(handlers::upload_chunk).get(handlers::download_chunk),
        )
        // Downloads
        .route(
            "/v1/manifest/{slug}/{platform}/{channel}",
            get(handlers::get_manifest),
        )
        .route("/v1/purchases", post(handlers::record_purchase))
        // Review gate and user administration
        .route("/v1/admin/submissions", get(handlers::list_submissions))
        .route(
            "/v1/admin/submissions/{submission_id}/approve",
            post(handlers::approve_submission),
        )
        .route(
            "/v1/admin/submissions/{submission_id}/reject",
            post(handlers::reject_submission),
        )
        .route(
            "/v1/admin/users/{user_id}/force-reset",
            post(handlers::force_reset),
        )
        .route("/v1/admin/users/{user_id}/role", post(handlers::set_role));

    // Middleware layers are applied in reverse order (outermost first):
    // TraceLayer -> Auth -> Handler
    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
