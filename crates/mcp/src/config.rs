use anyhow::{Context, Result};
use easegress_sdk::{EasegressClient, RetryConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub easegress: EasegressConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where and how to reach the Easegress admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EasegressConfig {
    #[serde(default = "default_api_address")]
    pub api_address: String,

    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives; `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_api_address() -> String {
    "http://127.0.0.1:2381".to_string()
}

fn default_api_prefix() -> String {
    easegress_sdk::config::DEFAULT_API_PREFIX.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_log_filter() -> String {
    "easegress_mcp=info,easegress_sdk=info".to_string()
}

impl Default for EasegressConfig {
    fn default() -> Self {
        Self {
            api_address: default_api_address(),
            api_prefix: default_api_prefix(),
            api_token: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

/// Values given on the command line or through the environment. Set fields
/// take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_address: Option<String>,
    pub api_prefix: Option<String>,
    pub api_token: Option<String>,
    pub timeout_secs: Option<u64>,
    pub log_format: Option<LogFormat>,
}

impl McpConfig {
    /// Load the configuration file, or defaults when no path is given.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let Some(path) = config_path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(address) = overrides.api_address {
            self.easegress.api_address = address;
        }
        if let Some(prefix) = overrides.api_prefix {
            self.easegress.api_prefix = prefix;
        }
        if let Some(token) = overrides.api_token.filter(|t| !t.is_empty()) {
            self.easegress.api_token = Some(token);
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.easegress.timeout_secs = timeout;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
    }

    /// Build the admin API client described by this configuration.
    pub fn client(&self) -> Result<EasegressClient> {
        let retry = RetryConfig {
            max_retries: self.easegress.max_retries,
            ..RetryConfig::default()
        };

        let mut builder = EasegressClient::builder()
            .base_url(&self.easegress.api_address)
            .api_prefix(&self.easegress.api_prefix)
            .timeout(Duration::from_secs(self.easegress.timeout_secs))
            .retry_config(retry);
        if let Some(token) = &self.easegress.api_token {
            builder = builder.api_token(token);
        }

        builder.build().context("Invalid Easegress API settings")
    }
}
