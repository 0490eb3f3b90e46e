//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Default chunk size in bytes.
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: u64,
    /// Maximum chunk size in bytes.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: u64,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_chunk_size() -> u64 {
    crate::DEFAULT_CHUNK_SIZE
}

fn default_max_chunk_size() -> u64 {
    crate::MAX_CHUNK_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            default_chunk_size: default_chunk_size(),
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/storage"),
        }
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database.
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
        }
    }
}

/// Session and token configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign access tokens (HS256).
    pub token_secret: String,
    /// Access token lifetime in seconds (default: 15 minutes).
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds (default: 30 days).
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
    /// Bootstrap admin account, provisioned at startup if absent.
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Bootstrap admin credentials.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_username")]
    pub username: String,
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_access_ttl_secs() -> u64 {
    900 // 15 minutes
}

fn default_refresh_ttl_secs() -> u64 {
    30 * 24 * 3600 // 30 days
}

impl AuthConfig {
    /// Get the access token lifetime as a Duration.
    pub fn access_ttl(&self) -> Duration {
        Duration::seconds(i64::try_from(self.access_ttl_secs).unwrap_or(i64::MAX))
    }

    /// Get the refresh token lifetime as a Duration.
    pub fn refresh_ttl(&self) -> Duration {
        Duration::seconds(i64::try_from(self.refresh_ttl_secs).unwrap_or(i64::MAX))
    }

    /// Validate auth configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.token_secret.len() < 32 {
            return Err("auth.token_secret must be at least 32 characters".to_string());
        }
        if self.access_ttl_secs == 0 || self.refresh_ttl_secs == 0 {
            return Err("auth token lifetimes must be non-zero".to_string());
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Session and token configuration (required).
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses filesystem storage, SQLite metadata,
    /// and a fixed signing secret.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            metadata: MetadataConfig::default(),
            auth: AuthConfig {
                token_secret: "test-signing-secret-0123456789abcdef".to_string(),
                access_ttl_secs: default_access_ttl_secs(),
                refresh_ttl_secs: default_refresh_ttl_secs(),
                bootstrap_admin: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_config_validate() {
        let config = AppConfig::for_testing();
        assert!(config.auth.validate().is_ok());

        let mut short = config.auth.clone();
        short.token_secret = "short".to_string();
        assert!(short.validate().is_err());

        let mut zero = config.auth;
        zero.access_ttl_secs = 0;
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_auth_config_defaults_from_json() {
        let json = r#"{"token_secret":"0123456789abcdef0123456789abcdef"}"#;
        let config: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.access_ttl_secs, 900);
        assert_eq!(config.refresh_ttl_secs, 2_592_000);
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.default_chunk_size, crate::DEFAULT_CHUNK_SIZE);
        assert_eq!(config.max_chunk_size, crate::MAX_CHUNK_SIZE);
    }
}
