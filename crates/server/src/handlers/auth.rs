//! Session endpoints: register, login, refresh, logout, me, password reset.

use crate::auth::{issue_session, require_auth};
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::read_json_body;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use depot_core::token::{RefreshToken, Role};
use depot_metadata::models::{NewUser, UserRow};
use depot_metadata::repos::{SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Maximum request body size for auth endpoints (64 KiB).
const MAX_AUTH_BODY_SIZE: usize = 64 * 1024;

/// Public view of a user account.
#[derive(Clone, Debug, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub role: String,
}

impl From<&UserRow> for UserInfo {
    fn from(user: &UserRow) -> Self {
        Self {
            id: user.user_id,
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role.clone(),
        }
    }
}

/// Token pair plus user, returned by register/login/refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserInfo,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// POST /v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<AuthResponse>> {
    let body: RegisterRequest = read_json_body(req.into_body(), MAX_AUTH_BODY_SIZE).await?;

    let email = body.email.trim().to_lowercase();
    let username = body.username.trim().to_string();
    if email.is_empty() || body.password.is_empty() || username.is_empty() {
        return Err(ApiError::Validation(
            "email, password and username are required".to_string(),
        ));
    }

    let password = body.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || depot_auth::hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?;

    let new_user = NewUser {
        email: email.clone(),
        username,
        password_hash,
        role: Role::User.as_str().to_string(),
        created_at: OffsetDateTime::now_utc(),
    };
    let user_id = match state.metadata.create_user(&new_user).await {
        Ok(id) => id,
        Err(depot_metadata::MetadataError::AlreadyExists(_)) => {
            return Err(ApiError::Conflict("email already registered".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let user = state
        .metadata
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::Internal("user vanished after create".to_string()))?;

    let tokens = issue_session(&state, user_id, Role::User, body.device_id.as_deref()).await?;
    tracing::info!(user_id, "user registered");

    Ok(Json(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user: UserInfo::from(&user),
    }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    pub password: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// Verify a password against a stored hash off the async runtime.
async fn verify_blocking(password: String, stored: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || depot_auth::verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))
}

/// POST /v1/auth/login
pub async fn login(State(state): State<AppState>, req: Request) -> ApiResult<Json<AuthResponse>> {
    let body: LoginRequest = read_json_body(req.into_body(), MAX_AUTH_BODY_SIZE).await?;

    let user = match (&body.email, &body.username) {
        (Some(email), _) => {
            state
                .metadata
                .get_user_by_email(&email.trim().to_lowercase())
                .await?
        }
        (None, Some(username)) => state.metadata.get_user_by_username(username.trim()).await?,
        (None, None) => {
            return Err(ApiError::Validation(
                "email or username is required".to_string(),
            ));
        }
    };

    // A missing user still reports "invalid credentials" so login cannot be
    // used to probe which emails are registered.
    let user = user.ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    // Forced-reset credential: a match succeeds but must not yield a normal
    // session; the caller has to change the password first.
    if let Some(reset_hash) = user.reset_hash.clone() {
        if verify_blocking(body.password.clone(), reset_hash).await? {
            tracing::info!(user_id = user.user_id, "login with reset credential");
            return Err(ApiError::PasswordResetRequired);
        }
    }

    if !verify_blocking(body.password.clone(), user.password_hash.clone()).await? {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let role = Role::parse(&user.role)
        .map_err(|e| ApiError::Internal(format!("corrupt role on user row: {e}")))?;
    let tokens = issue_session(&state, user.user_id, role, body.device_id.as_deref()).await?;
    tracing::info!(user_id = user.user_id, "user logged in");

    Ok(Json(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user: UserInfo::from(&user),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// POST /v1/auth/refresh
///
/// Rotates the refresh secret on every success. Presenting a secret that has
/// already been rotated away is treated as evidence of token theft: the
/// session is revoked immediately and the caller gets a plain 401.
pub async fn refresh(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<AuthResponse>> {
    let body: RefreshRequest = read_json_body(req.into_body(), MAX_AUTH_BODY_SIZE).await?;
    let now = OffsetDateTime::now_utc();

    let token = RefreshToken::parse(&body.refresh_token)
        .map_err(|_| ApiError::Unauthorized("invalid refresh token".to_string()))?;

    let session = state
        .metadata
        .get_session(token.session_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid refresh token".to_string()))?;

    if !session.is_active(now) {
        return Err(ApiError::Unauthorized("invalid refresh token".to_string()));
    }

    if let Some(bound) = &session.device_id {
        if body.device_id.as_deref() != Some(bound.as_str()) {
            tracing::warn!(
                session_id = %session.session_id,
                user_id = session.user_id,
                "refresh device mismatch"
            );
            return Err(ApiError::Unauthorized("device mismatch".to_string()));
        }
    }

    let presented_hash = depot_auth::hash_secret(&token.secret);
    let new_secret = depot_auth::generate_secret();
    let rotated = state
        .metadata
        .rotate_refresh_hash(
            session.session_id,
            &presented_hash,
            &depot_auth::hash_secret(&new_secret),
            now + state.config.auth.refresh_ttl(),
            now,
        )
        .await?;

    if !rotated {
        // The session is live but the presented secret is not the current
        // one: a replay of a rotated-away token. Revoke the whole session so
        // the holder of the newest token is cut off too.
        state
            .metadata
            .revoke_session(session.session_id, now)
            .await?;
        tracing::warn!(
            session_id = %session.session_id,
            user_id = session.user_id,
            "refresh token reuse detected, session revoked"
        );
        return Err(ApiError::Unauthorized("invalid refresh token".to_string()));
    }

    let user = state
        .metadata
        .get_user(session.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("user not found".to_string()))?;
    let role = Role::parse(&user.role)
        .map_err(|e| ApiError::Internal(format!("corrupt role on user row: {e}")))?;

    let access_token = state.signer.sign(
        user.user_id,
        role,
        session.session_id,
        session.device_id.as_deref(),
    )?;
    let refresh_token = RefreshToken::new(session.session_id, new_secret).format();

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: UserInfo::from(&user),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// POST /v1/auth/logout
///
/// Revokes the bearer's session, or the session named by a presented refresh
/// token (only when its secret actually matches, so a stolen session id alone
/// cannot log anyone out).
pub async fn logout(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<serde_json::Value>> {
    let auth = req.extensions().get::<crate::auth::AuthenticatedUser>().cloned();
    let body: LogoutRequest = read_json_body(req.into_body(), MAX_AUTH_BODY_SIZE)
        .await
        .unwrap_or_default();
    let now = OffsetDateTime::now_utc();

    if let Some(auth) = auth {
        state.metadata.revoke_session(auth.claims.sid, now).await?;
    } else if let Some(refresh_token) = &body.refresh_token {
        if let Ok(token) = RefreshToken::parse(refresh_token) {
            if let Some(session) = state.metadata.get_session(token.session_id).await? {
                if session.refresh_hash == depot_auth::hash_secret(&token.secret) {
                    state
                        .metadata
                        .revoke_session(session.session_id, now)
                        .await?;
                }
            }
        }
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// GET /v1/auth/me
pub async fn me(State(state): State<AppState>, req: Request) -> ApiResult<Json<UserInfo>> {
    let auth = require_auth(&req)?;
    let user = state
        .metadata
        .get_user(auth.user_id())
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(Json(UserInfo::from(&user)))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// The temporary credential issued by an admin.
    pub reset_password: String,
    pub new_password: String,
}

/// POST /v1/auth/reset-password
///
/// Completes the forced-reset path: verifies the temporary credential, sets
/// the new password, clears the reset credential, and revokes every existing
/// session for the user.
pub async fn reset_password(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<serde_json::Value>> {
    let body: ResetPasswordRequest = read_json_body(req.into_body(), MAX_AUTH_BODY_SIZE).await?;

    if body.new_password.is_empty() {
        return Err(ApiError::Validation("new password is required".to_string()));
    }

    let user = match (&body.email, &body.username) {
        (Some(email), _) => {
            state
                .metadata
                .get_user_by_email(&email.trim().to_lowercase())
                .await?
        }
        (None, Some(username)) => state.metadata.get_user_by_username(username.trim()).await?,
        (None, None) => {
            return Err(ApiError::Validation(
                "email or username is required".to_string(),
            ));
        }
    };
    let user = user.ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    let reset_hash = user
        .reset_hash
        .clone()
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;
    if !verify_blocking(body.reset_password.clone(), reset_hash).await? {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let new_password = body.new_password.clone();
    let password_hash =
        tokio::task::spawn_blocking(move || depot_auth::hash_password(&new_password))
            .await
            .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?;

    state
        .metadata
        .set_password_hash(user.user_id, &password_hash)
        .await?;
    state.metadata.set_reset_hash(user.user_id, None).await?;
    let revoked = state
        .metadata
        .revoke_all_for_user(user.user_id, OffsetDateTime::now_utc())
        .await?;
    tracing::info!(user_id = user.user_id, revoked, "password reset completed");

    Ok(Json(serde_json::json!({ "ok": true })))
}
