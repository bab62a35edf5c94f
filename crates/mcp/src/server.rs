// MCP server: newline-delimited JSON-RPC 2.0 over stdio

use crate::protocol::*;
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

/// Longest accepted request line.
const MAX_LINE_LENGTH: usize = 4 * 1024 * 1024;

const INSTRUCTIONS: &str = "Manage HTTP reverse proxies and Let's Encrypt certificates of an \
                            Easegress instance. Proxies are identified by name; certificate \
                            settings by domain name.";

pub struct McpServer {
    registry: ToolRegistry,
    info: ServerInfo,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            info: ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Serve on the process's stdin and stdout until stdin closes.
    pub async fn start(&self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve one client until `reader` reaches end of input.
    ///
    /// Requests are handled in arrival order, one at a time.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let mut out = FramedWrite::new(writer, LinesCodec::new());

        tracing::info!(tools = self.registry.len(), "MCP server ready");

        while let Some(line) = lines.next().await {
            let response = match line {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_message(&line).await,
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    tracing::warn!(max = MAX_LINE_LENGTH, "Oversized message, closing the session");
                    Some(JsonRpcResponse::error(
                        Value::Null,
                        JsonRpcError::parse_error("message exceeds maximum length"),
                    ))
                }
                Err(LinesCodecError::Io(e)) => {
                    return Err(e).context("Failed to read from client");
                }
            };

            if let Some(response) = response {
                let encoded = serde_json::to_string(&response)?;
                out.send(encoded)
                    .await
                    .context("Failed to write response")?;
            }
        }

        tracing::info!("Client closed the connection");
        Ok(())
    }

    /// Handle one raw message. Returns `None` for notifications.
    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse message");
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(e.to_string()),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("jsonrpc must be \"2.0\""),
            ));
        }

        self.handle_request(request).await
    }

    /// Dispatch a parsed request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            self.handle_notification(&request.method);
            return None;
        };

        tracing::debug!(method = %request.method, "Handling request");

        let result = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => tracing::info!("Client initialized"),
            "notifications/cancelled" => tracing::debug!("Client cancelled a request"),
            other => tracing::debug!(method = %other, "Ignoring notification"),
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = parse_params(params)?;
        if let Some(client) = &params.client_info {
            tracing::info!(
                client = %client.name,
                version = %client.version,
                protocol = %params.protocol_version,
                "Client connected"
            );
        }

        to_result(&InitializeResult {
            protocol_version: negotiate_protocol_version(&params.protocol_version).to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.info.clone(),
            instructions: Some(INSTRUCTIONS.to_string()),
        })
    }

    fn list_tools(&self) -> Result<Value, JsonRpcError> {
        to_result(&ListToolsResult {
            tools: self.registry.list_schemas(),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = parse_params(params)?;
        let tool = self
            .registry
            .get(&params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)))?;

        let arguments = match params.arguments {
            Value::Null => Value::Object(Default::default()),
            arguments => arguments,
        };

        tracing::info!(tool = %params.name, "Calling tool");
        let result = match tool.execute(arguments).await {
            Ok(result) => {
                if result.is_error() {
                    tracing::warn!(tool = %params.name, "Tool reported an error");
                }
                result
            }
            Err(e) => {
                tracing::warn!(tool = %params.name, error = %format!("{:#}", e), "Tool failed");
                CallToolResult::error(format!("{:#}", e))
            }
        };

        to_result(&result)
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
}

fn to_result<T: serde::Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{json_schema_object, Tool};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    struct Echo;

    #[async_trait::async_trait]
    impl Tool for Echo {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "echo".to_string(),
                description: "Echo the arguments".to_string(),
                input_schema: json_schema_object(json!({}), vec![]),
                annotations: None,
            }
        }

        async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
            if arguments.get("fail").is_some() {
                anyhow::bail!("asked to fail");
            }
            Ok(CallToolResult::text(arguments.to_string()))
        }
    }

    fn server() -> McpServer {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        McpServer::new(registry)
    }

    async fn call(server: &McpServer, message: Value) -> Value {
        let response = server.handle_message(&message.to_string()).await.unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = call(
            &server(),
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "test", "version": "0.0.1"}
                }
            }),
        )
        .await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"]["name"], "easegress-mcp");
        assert_eq!(response["result"]["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_ping_and_unknown_method() {
        let server = server();

        let response = call(&server, json!({"jsonrpc": "2.0", "id": "a", "method": "ping"})).await;
        assert_eq!(response["id"], "a");
        assert_eq!(response["result"], json!({}));

        let response = call(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "nope"})).await;
        assert_eq!(response["error"]["code"], JsonRpcError::METHOD_NOT_FOUND);

        let response = server
            .handle_request(JsonRpcRequest::new(7, "ping", json!({})))
            .await
            .unwrap();
        assert_eq!(response.id, 7);
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server();
        let message = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(server.handle_message(&message.to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_messages() {
        let server = server();

        let response = serde_json::to_value(server.handle_message("{not json").await.unwrap()).unwrap();
        assert_eq!(response["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert!(response["id"].is_null());

        let response = call(&server, json!({"jsonrpc": "1.0", "id": 3, "method": "ping"})).await;
        assert_eq!(response["error"]["code"], JsonRpcError::INVALID_REQUEST);
        assert_eq!(response["id"], 3);

        let response = call(&server, json!({"jsonrpc": "2.0", "id": 4})).await;
        assert_eq!(response["error"]["code"], JsonRpcError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_tools_list() {
        let response = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
        )
        .await;

        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "echo");
        assert_eq!(tools[0]["annotations"]["readOnlyHint"], true);
        assert!(tools[0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_tools_call() {
        let server = server();

        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "tools/call",
                "params": {"name": "echo", "arguments": {"x": 1}}
            }),
        )
        .await;
        assert_eq!(response["result"]["content"][0]["text"], r#"{"x":1}"#);
        assert!(response["result"].get("isError").is_none());

        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {"name": "echo", "arguments": {"fail": true}}
            }),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);

        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {"name": "missing"}
            }),
        )
        .await;
        assert_eq!(response["error"]["code"], JsonRpcError::INVALID_PARAMS);

        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call"}),
        )
        .await;
        assert_eq!(response["error"]["code"], JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_serve_over_stream() {
        let (client, server_side) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_side);

        let handle = tokio::spawn(async move { server().serve(server_read, server_write).await });

        let (client_read, mut client_write) = tokio::io::split(client);
        client_write
            .write_all(
                concat!(
                    r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
                    "\n\n",
                    r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
                    "\n",
                    r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
                    "\n"
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        client_write.shutdown().await.unwrap();

        let mut responses = BufReader::new(client_read).lines();
        let first: Value = serde_json::from_str(&responses.next_line().await.unwrap().unwrap()).unwrap();
        let second: Value = serde_json::from_str(&responses.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);

        handle.await.unwrap().unwrap();
        assert!(responses.next_line().await.unwrap().is_none());
    }
}
