//! Server test harness.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use depot_core::config::{AppConfig, MetadataConfig, StorageConfig};
use depot_core::token::Role;
use depot_metadata::models::NewUser;
use depot_metadata::repos::UserRepo;
use depot_metadata::{MetadataStore, SqliteStore};
use depot_server::auth::issue_session;
use depot_server::{AppState, create_router};
use depot_storage::{FilesystemBackend, ObjectStore};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary storage.
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let storage_path = temp_dir.path().join("storage");
        std::fs::create_dir_all(&storage_path).expect("Failed to create storage directory");
        let storage: Arc<dyn ObjectStore> = Arc::new(
            FilesystemBackend::new(&storage_path)
                .await
                .expect("Failed to create storage backend"),
        );

        let db_path = temp_dir.path().join("metadata.db");
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("Failed to create metadata store"),
        );

        let mut config = AppConfig::for_testing();
        config.storage = StorageConfig::Filesystem {
            path: storage_path,
        };
        config.metadata = MetadataConfig::Sqlite { path: db_path };

        let state = AppState::new(config, storage, metadata);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying metadata.
    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }

    /// Create a user directly in metadata and return (user_id, access_token).
    ///
    /// The password hash is a real one for "password" so login-path tests can
    /// reuse these accounts.
    pub async fn create_user(&self, email: &str, role: Role) -> (i64, String) {
        let username = email.split('@').next().unwrap_or("user").to_string();
        let user_id = self
            .metadata()
            .create_user(&NewUser {
                email: email.to_string(),
                username,
                password_hash: depot_auth::hash_password("password"),
                role: role.as_str().to_string(),
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .expect("Failed to create user");

        let tokens = issue_session(&self.state, user_id, role, None)
            .await
            .expect("Failed to issue session");
        (user_id, tokens.access_token)
    }
}

/// Make a JSON request against the router and decode the response.
#[allow(dead_code)]
pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    auth_token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = auth_token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Upload raw bytes to a chunk endpoint.
#[allow(dead_code)]
pub async fn upload_chunk_request(
    router: &axum::Router,
    hash: &str,
    data: &[u8],
    auth_token: &str,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/v1/chunks/{hash}"))
        .header("Authorization", format!("Bearer {auth_token}"))
        .header("Content-Type", "application/octet-stream")
        .body(Body::from(data.to_vec()))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Download raw bytes from a GET endpoint.
#[allow(dead_code)]
pub async fn get_bytes(
    router: &axum::Router,
    uri: &str,
    auth_token: &str,
) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("Authorization", format!("Bearer {auth_token}"))
        .body(Body::empty())
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body_bytes.to_vec())
}
