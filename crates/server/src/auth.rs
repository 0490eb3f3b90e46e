//! Authentication and authorization middleware.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use depot_core::token::{AccessClaims, RefreshToken, Role};
use depot_metadata::models::{AppRow, SessionRow};
use depot_metadata::repos::{PurchaseRepo, SessionRepo};
use time::OffsetDateTime;
use uuid::Uuid;

/// Authenticated request extension.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    /// Verified access-token claims.
    pub claims: AccessClaims,
}

impl AuthenticatedUser {
    /// Require a role, returning `Forbidden` if the claims don't imply it.
    pub fn require_role(&self, required: Role) -> ApiResult<()> {
        if self.claims.has_role(required) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "requires {required} role"
            )))
        }
    }

    /// The authenticated user id.
    pub fn user_id(&self) -> i64 {
        self.claims.sub
    }
}

/// Extract bearer token from Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(&v[7..])
            } else {
                None
            }
        })
}

/// Authentication middleware.
///
/// A valid signature alone is not sufficient: the referenced session row is
/// re-checked on every request, so revocation takes effect before the access
/// token's own expiry elapses. Requests without a bearer header pass through
/// unauthenticated; handlers decide whether that is acceptable.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(token_str) = extract_bearer_token(&req) {
        let claims = state.signer.verify(token_str)?;

        let session = state
            .metadata
            .get_session(claims.sid)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("session not found".to_string()))?;

        if !session.is_active(OffsetDateTime::now_utc()) {
            return Err(ApiError::Unauthorized(
                "session revoked or expired".to_string(),
            ));
        }

        req.extensions_mut().insert(AuthenticatedUser { claims });
    }

    Ok(next.run(req).await)
}

/// Require authentication (bearer token must have been presented and valid).
pub fn require_auth(req: &Request) -> ApiResult<&AuthenticatedUser> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
}

/// Issued token pair for a session.
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Create a new session for a user and issue both tokens.
///
/// The refresh secret is generated here and leaves the process exactly once,
/// inside the returned `<session_id>.<secret>` string; only its hash is
/// persisted.
pub async fn issue_session(
    state: &AppState,
    user_id: i64,
    role: Role,
    device_id: Option<&str>,
) -> ApiResult<IssuedTokens> {
    let now = OffsetDateTime::now_utc();
    let session_id = Uuid::new_v4();
    let secret = depot_auth::generate_secret();

    let session = SessionRow {
        session_id,
        user_id,
        refresh_hash: depot_auth::hash_secret(&secret),
        device_id: device_id.map(str::to_string),
        created_at: now,
        last_used_at: None,
        expires_at: now + state.config.auth.refresh_ttl(),
        revoked_at: None,
    };
    state.metadata.create_session(&session).await?;

    let access_token = state.signer.sign(user_id, role, session_id, device_id)?;
    let refresh_token = RefreshToken::new(session_id, secret).format();

    Ok(IssuedTokens {
        access_token,
        refresh_token,
    })
}

/// Check download authorization for an app: admin, owner, or purchaser.
///
/// Unapproved apps are invisible to anyone but their owner and admins; for
/// visible apps, a missing purchase is reported distinctly so clients can
/// route the user to the storefront.
pub async fn authorize_download(
    state: &AppState,
    auth: &AuthenticatedUser,
    app: &AppRow,
) -> ApiResult<()> {
    if auth.claims.has_role(Role::Admin) || app.owner_user_id == auth.user_id() {
        return Ok(());
    }
    if !app.visible {
        return Err(ApiError::NotFound(format!("app not found: {}", app.slug)));
    }
    if state
        .metadata
        .purchase_exists(auth.user_id(), app.app_id)
        .await?
    {
        return Ok(());
    }
    Err(ApiError::PurchaseRequired)
}

/// Require that the authenticated user owns the app (or is admin).
pub fn require_app_owner(auth: &AuthenticatedUser, app: &AppRow) -> ApiResult<()> {
    if auth.claims.has_role(Role::Admin) || app.owner_user_id == auth.user_id() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("not the app owner".to_string()))
    }
}
