//! Signed access tokens.
//!
//! Short-lived HS256 tokens carrying `AccessClaims`. A valid signature alone
//! never authorizes a request; callers must also re-check the referenced
//! session row (see the server's auth middleware).

use crate::error::{AuthError, AuthResult};
use depot_core::token::{AccessClaims, Role};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Signs and verifies access tokens with a shared HMAC secret.
pub struct AccessTokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl AccessTokenSigner {
    /// Create a signer from the configured secret and token lifetime.
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issue a signed access token for a user/session pair.
    pub fn sign(
        &self,
        user_id: i64,
        role: Role,
        session_id: Uuid,
        device_id: Option<&str>,
    ) -> AuthResult<String> {
        let now = OffsetDateTime::now_utc();
        let claims = AccessClaims {
            sub: user_id,
            role,
            sid: session_id,
            device: device_id.map(str::to_string),
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Credential(format!("failed to sign access token: {e}")))
    }

    /// Verify a token's signature and expiry and return its claims.
    pub fn verify(&self, token: &str) -> AuthResult<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        match jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(AuthError::Expired),
                _ => Err(AuthError::InvalidToken(e.to_string())),
            },
        }
    }
}
