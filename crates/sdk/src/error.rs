//! Error types for the Easegress client.

use easegress_mcp_core::CoreError;
use serde::Deserialize;

/// Result type for client operations.
pub type EasegressResult<T> = Result<T, EasegressError>;

/// Errors that can occur when talking to the Easegress admin API.
#[derive(Debug, thiserror::Error)]
pub enum EasegressError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The admin API answered with a non-success status.
    #[error("Easegress API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The remote state could not be interpreted.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A plan stopped part way through.
    #[error("Applied {applied} of {total} changes; failed to {mutation}: {source}")]
    PartialApply {
        applied: usize,
        total: usize,
        mutation: String,
        #[source]
        source: Box<EasegressError>,
    },
}

impl EasegressError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Create an API error from a status code and response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<ErrorResponse>(body) {
            Ok(response) => response.message,
            Err(_) if body.trim().is_empty() => "empty response body".to_string(),
            Err(_) => body.trim().to_string(),
        };
        Self::Api { status, message }
    }
}

/// Error body returned by the Easegress admin API.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}
