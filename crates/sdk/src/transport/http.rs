//! HTTP transport layer for the Easegress client.

use crate::config::ClientConfig;
use crate::error::{EasegressError, EasegressResult};
use reqwest::{header, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// HTTP transport for making admin API requests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: Arc<ClientConfig>,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given configuration.
    pub fn new(config: Arc<ClientConfig>) -> EasegressResult<Self> {
        let mut headers = header::HeaderMap::new();

        if let Some(ref token) = config.api_token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| EasegressError::Config("Invalid API token format".to_string()))?,
            );
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Build a URL for `path`, relative to the base URL and API prefix.
    ///
    /// A path component in the base URL is kept, so the admin API can sit
    /// behind a reverse proxy under a sub-path.
    fn build_url(&self, path: &str) -> EasegressResult<url::Url> {
        let mut base = self.config.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }

        let prefix = self.config.api_prefix.trim_matches('/');
        let path = path.trim_start_matches('/');
        let relative = if prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", prefix, path)
        };

        Ok(base.join(&relative)?)
    }

    /// Execute a request with retries.
    ///
    /// A request that is not `idempotent` is only resent when it never
    /// reached the server. A timed out POST may already have created the
    /// object, so it is reported instead of repeated.
    async fn execute_with_retry(
        &self,
        request_builder: RequestBuilder,
        idempotent: bool,
    ) -> EasegressResult<Response> {
        let retry_config = &self.config.retry_config;
        let mut attempts = 0;

        loop {
            let request = request_builder
                .try_clone()
                .ok_or_else(|| EasegressError::Config("Request cannot be cloned".to_string()))?;

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();

                    if response.status().is_success() {
                        return Ok(response);
                    }

                    if attempts < retry_config.max_retries
                        && retry_config.should_retry_status(status)
                    {
                        let backoff = retry_config.backoff_for_attempt(attempts);
                        warn!(
                            status = status,
                            attempt = attempts + 1,
                            backoff_ms = backoff.as_millis(),
                            "Request failed, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        continue;
                    }

                    let body = response.text().await.unwrap_or_default();
                    return Err(EasegressError::from_response(status, &body));
                }
                Err(e) => {
                    let transient = e.is_connect() || (idempotent && e.is_timeout());
                    if attempts < retry_config.max_retries && transient {
                        let backoff = retry_config.backoff_for_attempt(attempts);
                        warn!(
                            error = %e,
                            attempt = attempts + 1,
                            backoff_ms = backoff.as_millis(),
                            "Request could not be completed, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Execute a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> EasegressResult<T> {
        let url = self.build_url(path)?;
        debug!(url = %url, "GET request");

        let response = self.execute_with_retry(self.client.get(url), true).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Execute a GET request, mapping 404 to `None`.
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> EasegressResult<Option<T>> {
        match self.get(path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Execute a GET request and discard the body.
    pub async fn get_no_response(&self, path: &str) -> EasegressResult<()> {
        let url = self.build_url(path)?;
        debug!(url = %url, "GET request (no response)");

        self.execute_with_retry(self.client.get(url), true).await?;
        Ok(())
    }

    /// Execute a POST request without a response body.
    pub async fn post_no_response<B: Serialize>(&self, path: &str, body: &B) -> EasegressResult<()> {
        let url = self.build_url(path)?;
        debug!(url = %url, "POST request (no response)");

        self.execute_with_retry(self.client.post(url).json(body), false)
            .await?;
        Ok(())
    }

    /// Execute a PUT request without a response body.
    pub async fn put_no_response<B: Serialize>(&self, path: &str, body: &B) -> EasegressResult<()> {
        let url = self.build_url(path)?;
        debug!(url = %url, "PUT request (no response)");

        self.execute_with_retry(self.client.put(url).json(body), true)
            .await?;
        Ok(())
    }

    /// Execute a DELETE request without a response body.
    pub async fn delete_no_response(&self, path: &str) -> EasegressResult<()> {
        let url = self.build_url(path)?;
        debug!(url = %url, "DELETE request (no response)");

        self.execute_with_retry(self.client.delete(url), true).await?;
        Ok(())
    }
}
