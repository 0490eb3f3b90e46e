//! Integration tests for basic HTTP API behavior.

mod common;

use axum::http::StatusCode;
use common::server::json_request;
use common::TestServer;
use depot_core::token::Role;
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let (status, body) = json_request(&server.router, "GET", "/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("status").and_then(|v| v.as_str()), Some("ok"));
}

#[tokio::test]
async fn test_create_app_requires_auth() {
    let server = TestServer::new().await;

    let body = json!({ "slug": "my-game", "title": "My Game" });
    let (status, _) = json_request(&server.router, "POST", "/v1/apps", Some(body), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_app_requires_publisher_role() {
    let server = TestServer::new().await;
    let (_, user_token) = server.create_user("user@example.com", Role::User).await;

    let body = json!({ "slug": "my-game", "title": "My Game" });
    let (status, body) = json_request(
        &server.router,
        "POST",
        "/v1/apps",
        Some(body),
        Some(&user_token),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body.get("code").and_then(|v| v.as_str()), Some("forbidden"));
}

#[tokio::test]
async fn test_create_app_and_duplicate_slug_conflict() {
    let server = TestServer::new().await;
    let (_, publisher) = server.create_user("pub@example.com", Role::Publisher).await;

    let body = json!({ "slug": "my-game", "title": "My Game" });
    let (status, created) = json_request(
        &server.router,
        "POST",
        "/v1/apps",
        Some(body.clone()),
        Some(&publisher),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created.get("id").and_then(|v| v.as_i64()).is_some());

    let (status, conflict) = json_request(
        &server.router,
        "POST",
        "/v1/apps",
        Some(body),
        Some(&publisher),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(conflict.get("code").and_then(|v| v.as_str()), Some("conflict"));
}

#[tokio::test]
async fn test_create_app_rejects_bad_slug() {
    let server = TestServer::new().await;
    let (_, publisher) = server.create_user("pub@example.com", Role::Publisher).await;

    for slug in ["My-Game", "bad_slug", "spaces here", ""] {
        let body = json!({ "slug": slug, "title": "My Game" });
        let (status, err) = json_request(
            &server.router,
            "POST",
            "/v1/apps",
            Some(body),
            Some(&publisher),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "slug {slug:?}");
        assert_eq!(
            err.get("code").and_then(|v| v.as_str()),
            Some("validation_error")
        );
    }
}

#[tokio::test]
async fn test_create_build_validates_coordinates() {
    let server = TestServer::new().await;
    let (_, publisher) = server.create_user("pub@example.com", Role::Publisher).await;

    let (_, created) = json_request(
        &server.router,
        "POST",
        "/v1/apps",
        Some(json!({ "slug": "my-game", "title": "My Game" })),
        Some(&publisher),
    )
    .await;
    let app_id = created["id"].as_i64().unwrap();

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/builds",
        Some(json!({
            "app_id": app_id,
            "version": "1.0.0",
            "platform": "amiga",
            "channel": "stable"
        })),
        Some(&publisher),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = json_request(
        &server.router,
        "POST",
        "/v1/builds",
        Some(json!({
            "app_id": app_id,
            "version": "1.0.0",
            "platform": "linux",
            "channel": "stable"
        })),
        Some(&publisher),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["id"].as_i64().is_some());
}

#[tokio::test]
async fn test_create_build_rejects_non_owner() {
    let server = TestServer::new().await;
    let (_, owner) = server.create_user("owner@example.com", Role::Publisher).await;
    let (_, other) = server.create_user("other@example.com", Role::Publisher).await;

    let (_, created) = json_request(
        &server.router,
        "POST",
        "/v1/apps",
        Some(json!({ "slug": "owned-game", "title": "Owned" })),
        Some(&owner),
    )
    .await;
    let app_id = created["id"].as_i64().unwrap();

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/builds",
        Some(json!({
            "app_id": app_id,
            "version": "1.0.0",
            "platform": "linux",
            "channel": "stable"
        })),
        Some(&other),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_endpoints_require_admin() {
    let server = TestServer::new().await;
    let (_, publisher) = server.create_user("pub@example.com", Role::Publisher).await;

    let (status, _) = json_request(
        &server.router,
        "GET",
        "/v1/admin/submissions",
        None,
        Some(&publisher),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/admin/submissions/1/approve",
        None,
        Some(&publisher),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_approve_missing_submission_is_not_found() {
    let server = TestServer::new().await;
    let (_, admin) = server.create_user("admin@example.com", Role::Admin).await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/v1/admin/submissions/999/approve",
        None,
        Some(&admin),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body.get("code").and_then(|v| v.as_str()), Some("not_found"));
}
