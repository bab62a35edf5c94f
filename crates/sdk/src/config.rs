//! Configuration types for the Easegress client.

use std::time::Duration;
use url::Url;

/// Default path prefix of the Easegress admin API.
pub const DEFAULT_API_PREFIX: &str = "/apis/v2";

/// Configuration for the Easegress client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address of the Easegress admin API, e.g. `http://127.0.0.1:2381`.
    pub base_url: Url,
    /// Path prefix prepended to every endpoint.
    pub api_prefix: String,
    /// Bearer token sent with every request.
    pub api_token: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Retry configuration.
    pub retry_config: RetryConfig,
}

impl ClientConfig {
    /// Create a new configuration with the given base URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            api_token: None,
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig::default(),
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries.
    pub max_retries: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub backoff_multiplier: f64,
    /// HTTP status codes to retry on.
    pub retry_on_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            // Easegress answers 500 for rejected specs, which never succeed on retry.
            retry_on_status_codes: vec![429, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Backoff before retry number `attempt` (zero based), capped at `max_backoff`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let backoff_ms = self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        std::cmp::min(Duration::from_millis(backoff_ms as u64), self.max_backoff)
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status_codes.contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_then_caps() {
        let config = RetryConfig::default();

        assert_eq!(config.backoff_for_attempt(0), Duration::from_millis(200));
        assert_eq!(config.backoff_for_attempt(1), Duration::from_millis(400));
        assert_eq!(config.backoff_for_attempt(2), Duration::from_millis(800));
        assert_eq!(config.backoff_for_attempt(20), Duration::from_secs(5));
    }

    #[test]
    fn test_rejected_specs_are_not_retried() {
        let config = RetryConfig::default();

        assert!(config.should_retry_status(503));
        assert!(config.should_retry_status(429));
        assert!(!config.should_retry_status(500));
        assert!(!config.should_retry_status(404));
        assert!(!config.should_retry_status(409));
    }

    #[test]
    fn test_client_config_defaults() {
        let url = Url::parse("http://127.0.0.1:2381").unwrap();
        let config = ClientConfig::new(url.clone());

        assert_eq!(config.base_url, url);
        assert_eq!(config.api_prefix, "/apis/v2");
        assert!(config.api_token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(RetryConfig::no_retry().max_retries, 0);
    }
}
