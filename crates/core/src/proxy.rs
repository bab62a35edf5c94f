//! The logical reverse proxy exposed to tool callers.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

fn default_port() -> u16 {
    80
}

fn default_path() -> String {
    "/".to_string()
}

/// A reverse proxy: a route on an HTTP server forwarding to a pool of endpoints.
///
/// It is never stored as such; it is derived from one pipeline plus one path
/// entry of an HTTP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseProxy {
    pub name: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub is_path_prefix: bool,
    #[serde(default)]
    pub endpoints: Vec<String>,
}

/// The part of a reverse proxy that lives in an HTTP server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    pub port: u16,
    pub host: String,
    pub path: String,
    pub is_path_prefix: bool,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let host = if self.host.is_empty() { "*" } else { &self.host };
        let suffix = if self.is_path_prefix { "*" } else { "" };
        write!(f, "{}:{}{}{}", host, self.port, self.path, suffix)
    }
}

/// Check a proxy name: non-empty, ASCII letters, digits, `_` and `-` only.
pub fn validate_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::validation("name", "must not be empty"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(CoreError::validation(
            "name",
            format!("character {:?} is not allowed in {:?}", c, name),
        ));
    }
    Ok(())
}

fn validate_endpoint(endpoint: &str) -> CoreResult<()> {
    let url = Url::parse(endpoint)
        .map_err(|e| CoreError::validation("endpoints", format!("{:?}: {}", endpoint, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(CoreError::validation(
            "endpoints",
            format!("{:?}: only http and https are supported", endpoint),
        ));
    }
    if url.host_str().is_none() {
        return Err(CoreError::validation(
            "endpoints",
            format!("{:?}: missing host", endpoint),
        ));
    }
    Ok(())
}

impl ReverseProxy {
    pub fn route(&self) -> Route {
        Route {
            port: self.port,
            host: self.host.clone(),
            path: self.path.clone(),
            is_path_prefix: self.is_path_prefix,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_name(&self.name)?;

        if self.port == 0 {
            return Err(CoreError::validation("port", "must be between 1 and 65535"));
        }
        if self.host.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(CoreError::validation(
                "host",
                format!("{:?} is not a valid host", self.host),
            ));
        }
        if !self.path.starts_with('/') {
            return Err(CoreError::validation(
                "path",
                format!("{:?} must start with '/'", self.path),
            ));
        }
        if self.endpoints.is_empty() {
            return Err(CoreError::validation(
                "endpoints",
                "at least one endpoint is required",
            ));
        }

        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            validate_endpoint(endpoint)?;
            if !seen.insert(endpoint.as_str()) {
                return Err(CoreError::validation(
                    "endpoints",
                    format!("{:?} is listed twice", endpoint),
                ));
            }
        }

        Ok(())
    }
}

/// Partial update of a reverse proxy; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseProxyPatch {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_path_prefix: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<String>>,
}

impl ReverseProxyPatch {
    pub fn apply_to(&self, current: &ReverseProxy) -> ReverseProxy {
        ReverseProxy {
            name: current.name.clone(),
            port: self.port.unwrap_or(current.port),
            host: self.host.clone().unwrap_or_else(|| current.host.clone()),
            path: self.path.clone().unwrap_or_else(|| current.path.clone()),
            is_path_prefix: self.is_path_prefix.unwrap_or(current.is_path_prefix),
            endpoints: self
                .endpoints
                .clone()
                .unwrap_or_else(|| current.endpoints.clone()),
        }
    }
}
