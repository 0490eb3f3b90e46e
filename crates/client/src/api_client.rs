//! Typed HTTP client for the Depot API.

use crate::error::{ClientError, ClientResult};
use bytes::Bytes;
use depot_core::manifest::Manifest;
use reqwest::Url;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;

/// Timeout for manifest/metadata calls.
const METADATA_TIMEOUT: Duration = Duration::from_secs(20);

/// Timeout for chunk transfer calls.
const CHUNK_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client; `token` is the bearer access token, if any.
    pub fn new(base_url: &str, token: Option<&str>) -> ClientResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidResponse(format!("invalid server URL: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.map(str::to_string),
        })
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidResponse(format!("failed to build URL: {e}")))
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> ClientResult<T> {
        let response = self.with_auth(req).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| ClientError::InvalidResponse(format!("bad JSON body: {e}")))
    }

    async fn send_bytes(&self, req: reqwest::RequestBuilder) -> ClientResult<Bytes> {
        let response = self.with_auth(req).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(response.bytes().await?)
    }

    // ----- sessions -----

    pub async fn register(&self, req: &RegisterRequest) -> ClientResult<AuthResponse> {
        let url = self.url("/v1/auth/register")?;
        self.send_json(self.http.post(url).timeout(METADATA_TIMEOUT).json(req))
            .await
    }

    pub async fn login(&self, req: &LoginRequest) -> ClientResult<AuthResponse> {
        let url = self.url("/v1/auth/login")?;
        self.send_json(self.http.post(url).timeout(METADATA_TIMEOUT).json(req))
            .await
    }

    pub async fn refresh(&self, refresh_token: &str, device_id: Option<&str>) -> ClientResult<AuthResponse> {
        let url = self.url("/v1/auth/refresh")?;
        let body = serde_json::json!({
            "refresh_token": refresh_token,
            "device_id": device_id,
        });
        self.send_json(self.http.post(url).timeout(METADATA_TIMEOUT).json(&body))
            .await
    }

    // ----- publishing -----

    pub async fn create_app(&self, slug: &str, title: &str) -> ClientResult<IdResponse> {
        let url = self.url("/v1/apps")?;
        let body = serde_json::json!({ "slug": slug, "title": title });
        self.send_json(self.http.post(url).timeout(METADATA_TIMEOUT).json(&body))
            .await
    }

    pub async fn create_build(
        &self,
        app_id: i64,
        version: &str,
        platform: &str,
        channel: &str,
    ) -> ClientResult<IdResponse> {
        let url = self.url("/v1/builds")?;
        let body = serde_json::json!({
            "app_id": app_id,
            "version": version,
            "platform": platform,
            "channel": channel,
        });
        self.send_json(self.http.post(url).timeout(METADATA_TIMEOUT).json(&body))
            .await
    }

    pub async fn missing_chunks(
        &self,
        build_id: i64,
        hashes: &[String],
    ) -> ClientResult<Vec<String>> {
        let url = self.url(&format!("/v1/builds/{build_id}/missing-chunks"))?;
        let body = serde_json::json!({ "hashes": hashes });
        let response: MissingChunksResponse = self
            .send_json(self.http.post(url).timeout(METADATA_TIMEOUT).json(&body))
            .await?;
        Ok(response.missing)
    }

    pub async fn upload_chunk(&self, hash: &str, data: Vec<u8>) -> ClientResult<()> {
        let url = self.url(&format!("/v1/chunks/{hash}"))?;
        let _: serde_json::Value = self
            .send_json(
                self.http
                    .post(url)
                    .timeout(CHUNK_TIMEOUT)
                    .header("Content-Type", "application/octet-stream")
                    .body(data),
            )
            .await?;
        Ok(())
    }

    pub async fn finalize_build(
        &self,
        build_id: i64,
        manifest: &Manifest,
    ) -> ClientResult<FinalizeResponse> {
        let url = self.url(&format!("/v1/builds/{build_id}/finalize"))?;
        self.send_json(self.http.post(url).timeout(METADATA_TIMEOUT).json(manifest))
            .await
    }

    // ----- downloads -----

    pub async fn get_manifest(
        &self,
        slug: &str,
        platform: &str,
        channel: &str,
        version: Option<&str>,
    ) -> ClientResult<Manifest> {
        let mut url = self.url(&format!("/v1/manifest/{slug}/{platform}/{channel}"))?;
        if let Some(version) = version {
            url.query_pairs_mut().append_pair("version", version);
        }
        self.send_json(self.http.get(url).timeout(METADATA_TIMEOUT))
            .await
    }

    pub async fn get_chunk(
        &self,
        hash: &str,
        slug: &str,
        version: &str,
        platform: &str,
        channel: &str,
    ) -> ClientResult<Bytes> {
        let mut url = self.url(&format!("/v1/chunks/{hash}"))?;
        url.query_pairs_mut()
            .append_pair("slug", slug)
            .append_pair("version", version)
            .append_pair("platform", platform)
            .append_pair("channel", channel);
        self.send_bytes(self.http.get(url).timeout(CHUNK_TIMEOUT))
            .await
    }
}

/// Decode a structured error body into `ClientError::Api`.
fn api_error(status: u16, body: &str) -> ClientError {
    #[derive(Deserialize)]
    struct Wire {
        code: String,
        message: String,
    }
    match serde_json::from_str::<Wire>(body) {
        Ok(wire) => ClientError::Api {
            status,
            code: wire.code,
            message: wire.message,
        },
        Err(_) => ClientError::Api {
            status,
            code: "unknown".to_string(),
            message: body.chars().take(200).collect(),
        },
    }
}

// =============================================================================
// Request/response types (mirrored from server handlers)
// =============================================================================

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserInfo,
}

#[derive(Debug, Deserialize)]
pub struct IdResponse {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct MissingChunksResponse {
    missing: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeResponse {
    pub manifest_url: String,
    pub submission_id: i64,
}
