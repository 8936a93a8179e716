//! Glean REST API client.
//!
//! Provides async HTTP client with:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff for transient failures
//! - Per-request credentials from [`Authorization`]
//!
//! Request and response bodies are passed through as JSON values; the tools
//! build the requests and the formatters read the responses.

use std::time::Duration;

use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::auth::Authorization;
use crate::config::{ClientConfig, api};
use crate::error::{ClientError, ClientResult};

/// Glean REST API client.
#[derive(Clone)]
pub struct GleanClient {
    /// HTTP client with middleware.
    client: ClientWithMiddleware,

    /// Backend base URL, ending in `/`.
    base_url: String,
}

impl GleanClient {
    /// Create a new client for the backend at `base_url`.
    pub fn new(base_url: impl Into<String>, config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .user_agent(concat!("glean-mcp/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_secs(1), Duration::from_secs(30))
            .build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client, base_url: base_url.into() })
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of a REST endpoint, e.g. `search`.
    #[must_use]
    pub fn api_url(&self, endpoint: &str) -> String {
        format!("{}{}{}", self.base_url, api::REST_PREFIX, endpoint)
    }

    /// `POST /rest/api/v1/search`
    pub async fn search(&self, auth: &Authorization, body: &Value) -> ClientResult<Value> {
        self.post("search", auth, body).await
    }

    /// `POST /rest/api/v1/chat`
    pub async fn chat(&self, auth: &Authorization, body: &Value) -> ClientResult<Value> {
        self.post("chat", auth, body).await
    }

    /// `POST /rest/api/v1/listentities`
    pub async fn list_entities(&self, auth: &Authorization, body: &Value) -> ClientResult<Value> {
        self.post("listentities", auth, body).await
    }

    /// `POST /rest/api/v1/getdocuments`
    pub async fn get_documents(&self, auth: &Authorization, body: &Value) -> ClientResult<Value> {
        self.post("getdocuments", auth, body).await
    }

    /// `GET <base>liveness_check`. Any 2xx means the instance is up.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn check_liveness(&self) -> ClientResult<()> {
        let url = format!("{}liveness_check", self.base_url);
        let response = self.client.get(&url).send().await?;
        handle_response(response).await?;
        debug!("Liveness check passed");
        Ok(())
    }

    /// Make an authenticated POST request.
    async fn post(&self, endpoint: &str, auth: &Authorization, body: &Value) -> ClientResult<Value> {
        let url = self.api_url(endpoint);
        let body_str = serde_json::to_string(body)?;

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        for (name, value) in auth.headers() {
            request = request.header(name, value);
        }

        debug!(%url, "Glean API request");
        let response = request.body(body_str).send().await?;
        let response = handle_response(response).await?;

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(ClientError::from)
    }
}

/// Pass 2xx responses through; map everything else onto [`ClientError`].
async fn handle_response(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
    let message = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "Glean API error");

    Err(ClientError::from_status(status.as_u16(), message.trim().to_string(), retry_after))
}

impl std::fmt::Debug for GleanClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GleanClient").field("base_url", &self.base_url).finish()
    }
}
