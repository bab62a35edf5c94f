//! Main client for the Easegress admin API.

use crate::api::*;
use crate::config::{ClientConfig, RetryConfig, DEFAULT_API_PREFIX};
use crate::error::{EasegressError, EasegressResult};
use crate::transport::HttpTransport;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Main client for interacting with the Easegress admin API.
#[derive(Clone)]
pub struct EasegressClient {
    config: Arc<ClientConfig>,
    pub(crate) http: HttpTransport,
}

impl EasegressClient {
    /// Create a new client builder.
    pub fn builder() -> EasegressClientBuilder {
        EasegressClientBuilder::new()
    }

    /// Create a client from configuration.
    pub fn from_config(config: ClientConfig) -> EasegressResult<Self> {
        let config = Arc::new(config);
        let http = HttpTransport::new(config.clone())?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the objects API.
    pub fn objects(&self) -> ObjectsApi<'_> {
        ObjectsApi::new(self)
    }

    /// Get the health API.
    pub fn health(&self) -> HealthApi<'_> {
        HealthApi::new(self)
    }
}

/// Builder for creating an EasegressClient.
pub struct EasegressClientBuilder {
    base_url: Option<String>,
    api_prefix: String,
    api_token: Option<String>,
    timeout: Duration,
    retry_config: RetryConfig,
}

impl EasegressClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            api_token: None,
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig::default(),
        }
    }

    /// Set the address of the admin API.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the path prefix of the admin API (default `/apis/v2`).
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Set a bearer token for authentication.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Build the client.
    pub fn build(self) -> EasegressResult<EasegressClient> {
        let base_url_str = self
            .base_url
            .ok_or_else(|| EasegressError::Config("base_url is required".to_string()))?;

        let base_url = Url::parse(&base_url_str)?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(EasegressError::Config(format!(
                "unsupported scheme in {}",
                base_url_str
            )));
        }

        EasegressClient::from_config(ClientConfig {
            base_url,
            api_prefix: self.api_prefix,
            api_token: self.api_token,
            timeout: self.timeout,
            retry_config: self.retry_config,
        })
    }
}

impl Default for EasegressClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
