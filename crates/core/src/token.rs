//! Roles, access-token claims and refresh-token framing.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User roles for authorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular end user (download only).
    User,
    /// Publisher (may create apps and upload builds).
    Publisher,
    /// Administrator.
    Admin,
}

impl Role {
    /// Parse from string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "user" => Ok(Self::User),
            "publisher" => Ok(Self::Publisher),
            "admin" => Ok(Self::Admin),
            _ => Err(crate::Error::InvalidRole(s.to_string())),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Publisher => "publisher",
            Self::Admin => "admin",
        }
    }

    /// Check if this role implies another role.
    pub fn implies(&self, other: Role) -> bool {
        match self {
            Self::Admin => true, // Admin implies all
            Self::Publisher => matches!(other, Self::Publisher | Self::User),
            Self::User => matches!(other, Self::User),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Claims carried by a signed access token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id.
    pub sub: i64,
    /// User role at issue time.
    pub role: Role,
    /// Session id the token was issued under.
    pub sid: Uuid,
    /// Device binding, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

impl AccessClaims {
    /// Check a role requirement against these claims.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.implies(required)
    }
}

/// An opaque refresh token: session id plus the plaintext rotating secret.
///
/// Wire form is `<session_id>.<secret>`. Only the SHA-256 of the secret is
/// ever persisted server-side; the plaintext leaves the server exactly once,
/// at issue or rotation time.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken {
    /// The session this token belongs to.
    pub session_id: Uuid,
    /// The plaintext rotating secret (64 hex chars).
    pub secret: String,
}

impl RefreshToken {
    /// Assemble from parts.
    pub fn new(session_id: Uuid, secret: impl Into<String>) -> Self {
        Self {
            session_id,
            secret: secret.into(),
        }
    }

    /// Parse the wire form `<session_id>.<secret>`.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let (sid, secret) = s
            .split_once('.')
            .ok_or_else(|| crate::Error::InvalidToken("malformed refresh token".to_string()))?;
        let session_id = Uuid::parse_str(sid)
            .map_err(|e| crate::Error::InvalidToken(format!("invalid session id: {e}")))?;
        if secret.len() != 64 || !secret.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(crate::Error::InvalidToken(
                "invalid refresh secret".to_string(),
            ));
        }
        Ok(Self {
            session_id,
            secret: secret.to_string(),
        })
    }

    /// Format the wire form handed to clients.
    pub fn format(&self) -> String {
        format!("{}.{}", self.session_id, self.secret)
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never log the secret.
        write!(f, "RefreshToken({}, <redacted>)", self.session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_implies() {
        assert!(Role::Admin.implies(Role::User));
        assert!(Role::Admin.implies(Role::Publisher));
        assert!(Role::Admin.implies(Role::Admin));

        assert!(Role::Publisher.implies(Role::User));
        assert!(Role::Publisher.implies(Role::Publisher));
        assert!(!Role::Publisher.implies(Role::Admin));

        assert!(Role::User.implies(Role::User));
        assert!(!Role::User.implies(Role::Publisher));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("publisher").unwrap(), Role::Publisher);
        assert!(Role::parse("root").is_err());
    }

    #[test]
    fn test_refresh_token_roundtrip() {
        let token = RefreshToken::new(Uuid::new_v4(), "ab".repeat(32));
        let wire = token.format();
        let parsed = RefreshToken::parse(&wire).unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn test_refresh_token_rejects_malformed() {
        assert!(RefreshToken::parse("no-dot-here").is_err());
        assert!(RefreshToken::parse("not-a-uuid.aaaa").is_err());
        let sid = Uuid::new_v4();
        assert!(RefreshToken::parse(&format!("{sid}.short")).is_err());
        assert!(RefreshToken::parse(&format!("{sid}.{}", "zz".repeat(32))).is_err());
    }

    #[test]
    fn test_refresh_token_debug_redacts_secret() {
        let token = RefreshToken::new(Uuid::new_v4(), "ab".repeat(32));
        let debug = format!("{token:?}");
        assert!(!debug.contains(&token.secret));
    }
}
