//! HTTP-backed policy provider
//!
//! Reads one policy document per region from a keyed document store:
//! `GET {base_url}/policies/{shard}/{region}`. A 404 means the region has no
//! policy row. The HTTP client is built on first fetch, so constructing the
//! provider never opens connections.

use crate::core::error::{ConfigError, ProviderError, RegionError, Result};
use crate::policy::provider::PolicyProvider;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Request deadline when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HttpPolicyProvider {
    client: OnceCell<Client>,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpPolicyProvider {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            client: OnceCell::new(),
            base_url,
            token,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a provider from environment variables
    ///
    /// Required: REGION_POLICY_URL
    /// Optional: REGION_POLICY_TOKEN (sent as a bearer token)
    /// Optional: REGION_POLICY_TIMEOUT_MS (defaults to 5000)
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("REGION_POLICY_URL")
            .map_err(|_| RegionError::Config(ConfigError::MissingVar("REGION_POLICY_URL".into())))?;
        let token = std::env::var("REGION_POLICY_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        let timeout = std::env::var("REGION_POLICY_TIMEOUT_MS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);

        Ok(Self::new(base_url, token).with_timeout(timeout))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the HTTP client has been built yet
    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }

    fn document_url(&self, shard_id: &str, region_id: &str) -> std::result::Result<Url, ProviderError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ProviderError::Transport(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Transport(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["policies", shard_id, region_id]);
        Ok(url)
    }

    async fn client(&self) -> std::result::Result<&Client, ProviderError> {
        self.client
            .get_or_try_init(|| async {
                tracing::debug!(base_url = %self.base_url, "Building policy store client");
                Client::builder()
                    .timeout(self.timeout)
                    .build()
                    .map_err(|e| ProviderError::Unavailable(e.to_string()))
            })
            .await
    }
}

#[async_trait]
impl PolicyProvider for HttpPolicyProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, shard_id: &str, region_id: &str) -> std::result::Result<Value, ProviderError> {
        let url = self.document_url(shard_id, region_id)?;
        let client = self.client().await?;

        let mut request = client.get(url).header("accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Value::Null);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}
