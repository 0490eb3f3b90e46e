//! Application state shared across handlers.

use depot_auth::AccessTokenSigner;
use depot_core::config::AppConfig;
use depot_metadata::MetadataStore;
use depot_storage::ObjectStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Object storage backend (chunk bytes and manifest JSON).
    pub storage: Arc<dyn ObjectStore>,
    /// Metadata store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Access token signer.
    pub signer: Arc<AccessTokenSigner>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Panics
    ///
    /// Panics if the auth configuration is invalid; misconfigured token
    /// secrets must never reach serving.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        if let Err(error) = config.auth.validate() {
            panic!("Invalid auth configuration: {error}");
        }

        let signer = AccessTokenSigner::new(&config.auth.token_secret, config.auth.access_ttl());

        Self {
            config: Arc::new(config),
            storage,
            metadata,
            signer: Arc::new(signer),
        }
    }
}
