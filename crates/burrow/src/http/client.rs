//! Minimal typed REST client for the agent's local API.
//!
//! One call, one response: requests run synchronously from the caller's
//! point of view and nothing is retried or cached. Non-success statuses and
//! transport failures map to distinct error variants so callers can tell
//! "service rejected request" from "service not reachable".

use std::sync::Arc;

use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

/// Hook applied to each request builder before it is sent, e.g. to attach
/// credentials or adjust timeouts.
pub type RequestHook =
    Arc<dyn Fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder + Send + Sync>;

/// Errors from local API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-success status.
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The service could not be reached at all.
    #[error("connection to local API failed: {0}")]
    Connection(String),

    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One response: status code, parsed body, raw headers. Transient, one per
/// call.
#[derive(Debug)]
pub struct ApiResponse<B> {
    pub status: u16,
    pub body: B,
    pub headers: HeaderMap,
}

/// Typed REST client against a fixed base URL.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    request_hook: Option<RequestHook>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("request_hook", &self.request_hook.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Create a client for the given base URL.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        // Ensure a TLS crypto provider is installed (reqwest uses rustls-no-provider).
        // The `Err` case just means it was already installed -- safe to ignore.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder().build().map_err(ApiError::Http)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_hook: None,
        })
    }

    /// Install a hook invoked on every request before it is sent.
    pub fn with_request_hook(mut self, hook: RequestHook) -> Self {
        self.request_hook = Some(hook);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full URL, percent-encoding each query parameter
    /// individually (including parentheses and spaces in values).
    fn url(&self, path: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!("{}{}", self.base_url, path);
        for (i, (key, value)) in params.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(&urlencoding::encode(key));
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    pub async fn get<B: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse<B>, ApiError> {
        self.execute(self.http.get(self.url(path, params))).await
    }

    pub async fn post<R: Serialize, B: DeserializeOwned>(
        &self,
        path: &str,
        body: &R,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse<B>, ApiError> {
        self.execute(self.http.post(self.url(path, params)).json(body))
            .await
    }

    pub async fn put<R: Serialize, B: DeserializeOwned>(
        &self,
        path: &str,
        body: &R,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse<B>, ApiError> {
        self.execute(self.http.put(self.url(path, params)).json(body))
            .await
    }

    /// DELETE returns the raw JSON value: success bodies are usually empty,
    /// which decodes to `Value::Null`.
    pub async fn delete(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse<serde_json::Value>, ApiError> {
        self.execute(self.http.delete(self.url(path, params))).await
    }

    async fn execute<B: DeserializeOwned>(
        &self,
        mut request: reqwest::RequestBuilder,
    ) -> Result<ApiResponse<B>, ApiError> {
        if let Some(hook) = &self.request_hook {
            request = hook(request);
        }

        let response = request.send().await.map_err(map_transport)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(map_transport)?;
        debug!(status, bytes = text.len(), "local API response");

        if status >= 400 {
            return Err(ApiError::Status { status, body: text });
        }
        let body: B = if text.trim().is_empty() {
            serde_json::from_value(serde_json::Value::Null)?
        } else {
            serde_json::from_str(&text)?
        };
        Ok(ApiResponse {
            status,
            body,
            headers,
        })
    }
}

/// Separate unreachable-service failures from in-protocol ones.
fn map_transport(err: reqwest::Error) -> ApiError {
    if err.is_connect() || err.is_timeout() {
        ApiError::Connection(err.to_string())
    } else {
        ApiError::Http(err)
    }
}
