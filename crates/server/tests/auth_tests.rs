//! Integration tests for sessions: registration, login, refresh rotation,
//! reuse detection, device binding and the forced-reset path.

mod common;

use axum::http::StatusCode;
use common::TestServer;
use common::server::json_request;
use depot_core::token::Role;
use depot_metadata::repos::UserRepo;
use serde_json::json;

#[tokio::test]
async fn test_register_login_me_flow() {
    let server = TestServer::new().await;

    let (status, registered) = json_request(
        &server.router,
        "POST",
        "/v1/auth/register",
        Some(json!({
            "email": "Alice@Example.com",
            "password": "correct horse",
            "username": "alice",
            "device_id": "laptop-1"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let access = registered["access_token"].as_str().unwrap().to_string();
    assert!(registered["refresh_token"].as_str().unwrap().contains('.'));
    // Email is normalized to lowercase.
    assert_eq!(registered["user"]["email"].as_str(), Some("alice@example.com"));
    assert_eq!(registered["user"]["role"].as_str(), Some("user"));

    let (status, me) = json_request(&server.router, "GET", "/v1/auth/me", None, Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"].as_str(), Some("alice"));

    // Duplicate email conflicts.
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/auth/register",
        Some(json!({
            "email": "alice@example.com",
            "password": "other",
            "username": "alice2"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Login by case-insensitive username.
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/auth/login",
        Some(json!({ "username": "ALICE", "password": "correct horse" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Wrong password is unauthorized.
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/auth/login",
        Some(json!({ "email": "alice@example.com", "password": "wrong" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_empty_fields() {
    let server = TestServer::new().await;

    for body in [
        json!({ "email": "", "password": "x", "username": "x" }),
        json!({ "email": "a@b.c", "password": "", "username": "x" }),
        json!({ "email": "a@b.c", "password": "x", "username": "  " }),
    ] {
        let (status, _) =
            json_request(&server.router, "POST", "/v1/auth/register", Some(body), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_refresh_rotation_and_reuse_detection() {
    let server = TestServer::new().await;

    let (_, registered) = json_request(
        &server.router,
        "POST",
        "/v1/auth/register",
        Some(json!({
            "email": "bob@example.com",
            "password": "secret",
            "username": "bob"
        })),
        None,
    )
    .await;
    let first_refresh = registered["refresh_token"].as_str().unwrap().to_string();

    // First refresh succeeds and hands out a new token.
    let (status, rotated) = json_request(
        &server.router,
        "POST",
        "/v1/auth/refresh",
        Some(json!({ "refresh_token": first_refresh })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second_refresh = rotated["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(first_refresh, second_refresh);

    // Replaying the previous token fails and revokes the session.
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/auth/refresh",
        Some(json!({ "refresh_token": first_refresh })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The legitimate newest token is now dead too: the session is revoked.
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/auth/refresh",
        Some(json!({ "refresh_token": second_refresh })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // And the session's access tokens no longer authorize anything.
    let rotated_access = rotated["access_token"].as_str().unwrap();
    let (status, _) = json_request(
        &server.router,
        "GET",
        "/v1/auth/me",
        None,
        Some(rotated_access),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rejects_garbage_tokens() {
    let server = TestServer::new().await;

    for token in ["", "no-dot", "not-a-uuid.aaaa", &format!("{}.{}", uuid::Uuid::new_v4(), "ab".repeat(32))] {
        let (status, _) = json_request(
            &server.router,
            "POST",
            "/v1/auth/refresh",
            Some(json!({ "refresh_token": token })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "token {token:?}");
    }
}

#[tokio::test]
async fn test_refresh_enforces_device_binding() {
    let server = TestServer::new().await;

    let (_, registered) = json_request(
        &server.router,
        "POST",
        "/v1/auth/register",
        Some(json!({
            "email": "carol@example.com",
            "password": "secret",
            "username": "carol",
            "device_id": "phone-1"
        })),
        None,
    )
    .await;
    let refresh_token = registered["refresh_token"].as_str().unwrap().to_string();

    // Missing or different device id is refused.
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/auth/refresh",
        Some(json!({ "refresh_token": refresh_token })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/auth/refresh",
        Some(json!({ "refresh_token": refresh_token, "device_id": "phone-2" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The bound device still works (device mismatch does not revoke).
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/auth/refresh",
        Some(json!({ "refresh_token": refresh_token, "device_id": "phone-1" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let server = TestServer::new().await;

    let (_, registered) = json_request(
        &server.router,
        "POST",
        "/v1/auth/register",
        Some(json!({
            "email": "dave@example.com",
            "password": "secret",
            "username": "dave"
        })),
        None,
    )
    .await;
    let access = registered["access_token"].as_str().unwrap().to_string();
    let refresh_token = registered["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/auth/logout",
        None,
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Both the access token and the refresh token are dead.
    let (status, _) = json_request(&server.router, "GET", "/v1/auth/me", None, Some(&access)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/auth/refresh",
        Some(json!({ "refresh_token": refresh_token })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forced_reset_flow() {
    let server = TestServer::new().await;
    let (_, admin) = server.create_user("admin@example.com", Role::Admin).await;

    let (_, registered) = json_request(
        &server.router,
        "POST",
        "/v1/auth/register",
        Some(json!({
            "email": "eve@example.com",
            "password": "old password",
            "username": "eve"
        })),
        None,
    )
    .await;
    let user_id = registered["user"]["id"].as_i64().unwrap();
    let old_access = registered["access_token"].as_str().unwrap().to_string();

    // Admin issues a temporary credential; existing sessions die.
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/admin/users/{user_id}/force-reset"),
        Some(json!({ "temporary_password": "temp-123" })),
        Some(&admin),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) =
        json_request(&server.router, "GET", "/v1/auth/me", None, Some(&old_access)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Logging in with the temporary credential flags the reset requirement.
    let (status, body) = json_request(
        &server.router,
        "POST",
        "/v1/auth/login",
        Some(json!({ "email": "eve@example.com", "password": "temp-123" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("password_reset_required")
    );

    // Completing the reset sets the new password and clears the credential.
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/auth/reset-password",
        Some(json!({
            "email": "eve@example.com",
            "reset_password": "temp-123",
            "new_password": "new password"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/auth/login",
        Some(json!({ "email": "eve@example.com", "password": "new password" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The old password no longer works.
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/auth/login",
        Some(json!({ "email": "eve@example.com", "password": "old password" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_change_revokes_sessions() {
    let server = TestServer::new().await;
    let (_, admin) = server.create_user("admin@example.com", Role::Admin).await;
    let (user_id, user_access) = server.create_user("frank@example.com", Role::User).await;

    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/admin/users/{user_id}/role"),
        Some(json!({ "role": "publisher" })),
        Some(&admin),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The pre-change access token no longer authorizes: the stale role claim
    // cannot outlive the role change.
    let (status, _) = json_request(
        &server.router,
        "GET",
        "/v1/auth/me",
        None,
        Some(&user_access),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = server.metadata().get_user(user_id).await.unwrap().unwrap();
    assert_eq!(user.role, "publisher");
}
