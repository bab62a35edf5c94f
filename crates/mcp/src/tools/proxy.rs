// Reverse proxy tools

use crate::manager::{describe_error, ProxyManager};
use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{
    json_schema_array, json_schema_boolean, json_schema_integer, json_schema_object,
    json_schema_string, Tool, ToolAccess,
};
use anyhow::{Context, Result};
use easegress_mcp_core::{ReverseProxy, ReverseProxyPatch};
use serde::Deserialize;
use std::sync::Arc;

fn proxy_properties() -> serde_json::Value {
    serde_json::json!({
        "name": json_schema_string("Proxy name (letters, digits, '_' and '-')"),
        "port": json_schema_integer("Port the HTTP server listens on (default: 80)", 1, 65535),
        "host": json_schema_string("Host to match; empty matches any host"),
        "path": json_schema_string("Request path to match (default: /)"),
        "isPathPrefix": json_schema_boolean("Match every path starting with `path` (default: false)"),
        "endpoints": json_schema_array(
            json_schema_string("Backend URL, e.g. http://10.0.0.1:8080"),
            "Backend endpoints, balanced round robin"
        )
    })
}

#[derive(Debug, Deserialize)]
struct NameArgs {
    name: String,
}

/// Lists every reverse proxy managed through this server.
pub struct ListProxiesTool {
    manager: Arc<ProxyManager>,
}

impl ListProxiesTool {
    pub fn new(manager: Arc<ProxyManager>) -> Self {
        Self { manager }
    }
}

#[async_trait::async_trait]
impl Tool for ListProxiesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_http_reverse_proxies".to_string(),
            description: "List all HTTP reverse proxies with their port, host, path and endpoints"
                .to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
            annotations: None,
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<CallToolResult> {
        match self.manager.list_proxies().await {
            Ok(proxies) => Ok(CallToolResult::json(&proxies)?),
            Err(e) => Ok(CallToolResult::error(describe_error(&e))),
        }
    }
}

/// Shows one reverse proxy.
pub struct GetProxyTool {
    manager: Arc<ProxyManager>,
}

impl GetProxyTool {
    pub fn new(manager: Arc<ProxyManager>) -> Self {
        Self { manager }
    }
}

#[async_trait::async_trait]
impl Tool for GetProxyTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_http_reverse_proxy".to_string(),
            description: "Get one HTTP reverse proxy by name".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "name": json_schema_string("Proxy name")
                }),
                vec!["name"],
            ),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: NameArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for get_http_reverse_proxy")?;

        match self.manager.get_proxy(&args.name).await {
            Ok(Some(proxy)) => Ok(CallToolResult::json(&proxy)?),
            Ok(None) => Ok(CallToolResult::error(format!(
                "reverse proxy {} not found",
                args.name
            ))),
            Err(e) => Ok(CallToolResult::error(describe_error(&e))),
        }
    }
}

/// Creates a pipeline and mounts it on the HTTP server of the requested port.
pub struct CreateProxyTool {
    manager: Arc<ProxyManager>,
}

impl CreateProxyTool {
    pub fn new(manager: Arc<ProxyManager>) -> Self {
        Self { manager }
    }
}

#[async_trait::async_trait]
impl Tool for CreateProxyTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "create_http_reverse_proxy".to_string(),
            description: "Create an HTTP reverse proxy. Creates a pipeline for the endpoints and \
                          routes host/path on the given port to it, creating the HTTP server for \
                          that port if needed"
                .to_string(),
            input_schema: json_schema_object(proxy_properties(), vec!["name", "endpoints"]),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let desired: ReverseProxy = serde_json::from_value(arguments)
            .context("Invalid arguments for create_http_reverse_proxy")?;

        match self.manager.create_proxy(&desired).await {
            Ok(report) => Ok(CallToolResult::json(&report)?),
            Err(e) => Ok(CallToolResult::error(describe_error(&e))),
        }
    }

    fn access(&self) -> ToolAccess {
        ToolAccess::Write
    }
}

/// Changes some fields of an existing reverse proxy.
pub struct UpdateProxyTool {
    manager: Arc<ProxyManager>,
}

impl UpdateProxyTool {
    pub fn new(manager: Arc<ProxyManager>) -> Self {
        Self { manager }
    }
}

#[async_trait::async_trait]
impl Tool for UpdateProxyTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "update_http_reverse_proxy".to_string(),
            description: "Update an HTTP reverse proxy. Only the given fields change; moving to \
                          another port remounts the route on that port's HTTP server"
                .to_string(),
            input_schema: json_schema_object(proxy_properties(), vec!["name"]),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let patch: ReverseProxyPatch = serde_json::from_value(arguments)
            .context("Invalid arguments for update_http_reverse_proxy")?;

        match self.manager.update_proxy(&patch).await {
            Ok(report) => Ok(CallToolResult::json(&report)?),
            Err(e) => Ok(CallToolResult::error(describe_error(&e))),
        }
    }

    fn access(&self) -> ToolAccess {
        ToolAccess::Write
    }
}

/// Unmounts a reverse proxy and deletes its pipeline.
pub struct DeleteProxyTool {
    manager: Arc<ProxyManager>,
}

impl DeleteProxyTool {
    pub fn new(manager: Arc<ProxyManager>) -> Self {
        Self { manager }
    }
}

#[async_trait::async_trait]
impl Tool for DeleteProxyTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "delete_http_reverse_proxy".to_string(),
            description: "Delete an HTTP reverse proxy. HTTP servers left without routes are \
                          deleted as well"
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "name": json_schema_string("Proxy name")
                }),
                vec!["name"],
            ),
            annotations: None,
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: NameArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for delete_http_reverse_proxy")?;

        match self.manager.delete_proxy(&args.name).await {
            Ok(report) => Ok(CallToolResult::json(&report)?),
            Err(e) => Ok(CallToolResult::error(describe_error(&e))),
        }
    }

    fn access(&self) -> ToolAccess {
        ToolAccess::Destructive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easegress_sdk::{EasegressClient, RetryConfig};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager(server: &MockServer) -> Arc<ProxyManager> {
        let client = EasegressClient::builder()
            .base_url(server.uri())
            .retry_config(RetryConfig::no_retry())
            .build()
            .unwrap();
        Arc::new(ProxyManager::new(client))
    }

    async fn empty_instance() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/objects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_list_empty() {
        let server = empty_instance().await;
        let tool = ListProxiesTool::new(manager(&server));

        let result = tool.execute(json!({})).await.unwrap();
        assert!(!result.is_error());
        assert_eq!(result.content[0].as_text(), "[]");
    }

    #[tokio::test]
    async fn test_get_missing_is_tool_error() {
        let server = empty_instance().await;
        let tool = GetProxyTool::new(manager(&server));

        let result = tool.execute(json!({"name": "web"})).await.unwrap();
        assert!(result.is_error());
        assert!(result.content[0].as_text().contains("not found"));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_endpoint() {
        let server = empty_instance().await;
        let tool = CreateProxyTool::new(manager(&server));

        let result = tool
            .execute(json!({"name": "web", "endpoints": ["ftp://backend"]}))
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(result.content[0].as_text().contains("endpoints"));
    }

    #[tokio::test]
    async fn test_malformed_arguments_are_errors() {
        let server = empty_instance().await;
        let tool = CreateProxyTool::new(manager(&server));

        assert!(tool.execute(json!({"name": 42})).await.is_err());
        assert!(tool.execute(json!({"name": "web", "port": 70000})).await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_instance_is_tool_error() {
        let client = EasegressClient::builder()
            .base_url("http://127.0.0.1:1")
            .retry_config(RetryConfig::no_retry())
            .build()
            .unwrap();
        let tool = ListProxiesTool::new(Arc::new(ProxyManager::new(client)));

        let result = tool.execute(json!({})).await.unwrap();
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn test_access_levels() {
        let client = EasegressClient::builder()
            .base_url("http://127.0.0.1:2381")
            .build()
            .unwrap();
        let manager = Arc::new(ProxyManager::new(client));

        assert_eq!(ListProxiesTool::new(manager.clone()).access(), ToolAccess::ReadOnly);
        assert_eq!(CreateProxyTool::new(manager.clone()).access(), ToolAccess::Write);
        assert_eq!(DeleteProxyTool::new(manager).access(), ToolAccess::Destructive);
    }
}
