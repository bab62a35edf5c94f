// Let's Encrypt certificate tools

use crate::manager::{describe_error, ProxyManager};
use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, json_schema_string, Tool, ToolAccess};
use anyhow::{Context, Result};
use easegress_mcp_core::{DnsProviderName, LetsEncryptConfig};
use serde::Deserialize;
use std::sync::Arc;

fn config_properties() -> serde_json::Value {
    let providers = format!(
        "DNS provider for the DNS-01 challenge, one of {} (default: cloudflare)",
        DnsProviderName::SUPPORTED.join(", ")
    );
    serde_json::json!({
        "email": json_schema_string("Account email registered with Let's Encrypt"),
        "domainName": json_schema_string("Domain to issue a certificate for; may start with '*.'"),
        "dnsProviderName": json_schema_string(&providers),
        "dnsProviderZone": json_schema_string("DNS zone the domain belongs to; needed for DNS-01"),
        "dnsProviderAPIToken": json_schema_string("API token of the DNS provider; needed for DNS-01")
    })
}

fn domain_schema() -> serde_json::Value {
    json_schema_object(
        serde_json::json!({
            "domainName": json_schema_string("Certificate domain")
        }),
        vec!["domainName"],
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DomainArgs {
    domain_name: String,
}

pub struct ListLetsEncryptTool {
    manager: Arc<ProxyManager>,
}

impl ListLetsEncryptTool {
    pub fn new(manager: Arc<ProxyManager>) -> Self {
        Self { manager }
    }
}

#[async_trait::async_trait]
impl Tool for ListLetsEncryptTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_lets_encrypt".to_string(),
            description: "List the Let's Encrypt certificate domains. API tokens are masked"
                .to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
            annotations: None,
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<CallToolResult> {
        match self.manager.list_lets_encrypt().await {
            Ok(configs) => Ok(CallToolResult::json(&configs)?),
            Err(e) => Ok(CallToolResult::error(describe_error(&e))),
        }
    }
}

pub struct GetLetsEncryptTool {
    manager: Arc<ProxyManager>,
}

impl GetLetsEncryptTool {
    pub fn new(manager: Arc<ProxyManager>) -> Self {
        Self { manager }
    }
}

#[async_trait::async_trait]
impl Tool for GetLetsEncryptTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_lets_encrypt".to_string(),
            description: "Get the Let's Encrypt settings of one domain. The API token is masked"
                .to_string(),
            input_schema: domain_schema(),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: DomainArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for get_lets_encrypt")?;

        match self.manager.get_lets_encrypt(&args.domain_name).await {
            Ok(Some(config)) => Ok(CallToolResult::json(&config)?),
            Ok(None) => Ok(CallToolResult::error(format!(
                "Let's Encrypt domain {} not found",
                args.domain_name
            ))),
            Err(e) => Ok(CallToolResult::error(describe_error(&e))),
        }
    }
}

/// Adds a domain to the managed auto-cert manager, creating it if needed.
pub struct CreateLetsEncryptTool {
    manager: Arc<ProxyManager>,
}

impl CreateLetsEncryptTool {
    pub fn new(manager: Arc<ProxyManager>) -> Self {
        Self { manager }
    }
}

#[async_trait::async_trait]
impl Tool for CreateLetsEncryptTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "create_lets_encrypt".to_string(),
            description: "Request Let's Encrypt certificates for a domain. HTTP-01 and \
                          TLS-ALPN-01 are always enabled; give a DNS provider zone and token \
                          to use DNS-01 as well"
                .to_string(),
            input_schema: json_schema_object(
                config_properties(),
                vec!["email", "domainName"],
            ),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let config: LetsEncryptConfig = serde_json::from_value(arguments)
            .context("Invalid arguments for create_lets_encrypt")?;

        match self.manager.create_lets_encrypt(&config).await {
            Ok(report) => Ok(CallToolResult::json(&report)?),
            Err(e) => Ok(CallToolResult::error(describe_error(&e))),
        }
    }

    fn access(&self) -> ToolAccess {
        ToolAccess::Write
    }
}

pub struct UpdateLetsEncryptTool {
    manager: Arc<ProxyManager>,
}

impl UpdateLetsEncryptTool {
    pub fn new(manager: Arc<ProxyManager>) -> Self {
        Self { manager }
    }
}

#[async_trait::async_trait]
impl Tool for UpdateLetsEncryptTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "update_lets_encrypt".to_string(),
            description: "Replace the Let's Encrypt settings of a domain. Omit the API token, \
                          or pass the masked value, to keep the stored one"
                .to_string(),
            input_schema: json_schema_object(
                config_properties(),
                vec!["email", "domainName"],
            ),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let config: LetsEncryptConfig = serde_json::from_value(arguments)
            .context("Invalid arguments for update_lets_encrypt")?;

        match self.manager.update_lets_encrypt(&config).await {
            Ok(report) => Ok(CallToolResult::json(&report)?),
            Err(e) => Ok(CallToolResult::error(describe_error(&e))),
        }
    }

    fn access(&self) -> ToolAccess {
        ToolAccess::Write
    }
}

/// Removes a domain; the auto-cert manager goes away with its last domain.
pub struct DeleteLetsEncryptTool {
    manager: Arc<ProxyManager>,
}

impl DeleteLetsEncryptTool {
    pub fn new(manager: Arc<ProxyManager>) -> Self {
        Self { manager }
    }
}

#[async_trait::async_trait]
impl Tool for DeleteLetsEncryptTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "delete_lets_encrypt".to_string(),
            description: "Stop managing certificates for a domain".to_string(),
            input_schema: domain_schema(),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: DomainArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for delete_lets_encrypt")?;

        match self.manager.delete_lets_encrypt(&args.domain_name).await {
            Ok(report) => Ok(CallToolResult::json(&report)?),
            Err(e) => Ok(CallToolResult::error(describe_error(&e))),
        }
    }

    fn access(&self) -> ToolAccess {
        ToolAccess::Destructive
    }
}
