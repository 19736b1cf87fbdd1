//! MCP server implementation.
//!
//! Wraps a `ToolRegistry` and the `anki://` resources and exposes them over
//! the MCP protocol. Every tool call and resource read is preceded by a
//! connectivity check so an unreachable Anki is reported with a clear
//! message instead of a half-finished operation.

use serde::Serialize;
use serde_json::Value;

use ankimcp_tool_runtime::{AnkiState, ToolContext, ToolError, ToolRegistry};

use crate::error::McpError;
use crate::resources::{AnkiResource, ResourceProvider};
use crate::transport::McpTransport;
use crate::types::*;

/// MCP server that bridges the Anki tools and resources to MCP clients.
pub struct McpServer {
    registry: ToolRegistry,
    anki: AnkiState,
    resources: ResourceProvider,
    context: ToolContext,
    server_name: String,
    server_version: String,
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server over the given tools and Anki handles.
    pub fn new(registry: ToolRegistry, anki: AnkiState) -> Self {
        let context = ToolContext {
            default_deck: anki.client.default_deck().to_string(),
        };
        Self {
            registry,
            resources: ResourceProvider::new(anki.clone()),
            anki,
            context,
            server_name: "anki-mcp".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            initialized: false,
        }
    }

    /// Set the server name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Whether a client has completed `initialize`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server loop, reading from and writing to the transport.
    ///
    /// Processes JSON-RPC requests until the transport is closed.
    pub async fn run<T: McpTransport>(&mut self, transport: &mut T) -> Result<(), McpError> {
        tracing::info!(server = %self.server_name, tools = self.registry.len(), "MCP server starting");

        loop {
            let line = match transport.receive().await? {
                Some(line) => line,
                None => {
                    tracing::info!("Transport closed, shutting down");
                    break;
                }
            };

            tracing::debug!(message = %line, "Received message");

            // Requests carry an "id"; notifications do not.
            let raw: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse JSON");
                    send_error(transport, RpcId::Null, McpError::JsonParse(e)).await?;
                    continue;
                }
            };

            if raw.get("id").is_none() {
                if let Ok(notif) = serde_json::from_value::<JsonRpcNotification>(raw) {
                    self.handle_notification(&notif);
                }
                continue;
            }

            let id = raw
                .get("id")
                .and_then(|id| serde_json::from_value::<RpcId>(id.clone()).ok())
                .unwrap_or(RpcId::Null);
            let request: JsonRpcRequest = match serde_json::from_value(raw) {
                Ok(req) => req,
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid JSON-RPC request");
                    send_error(transport, id, McpError::InvalidRequest(e.to_string())).await?;
                    continue;
                }
            };

            let response = self.handle_request(&request).await;
            let json = serde_json::to_string(&response)?;
            tracing::debug!(response = %json, "Sending response");
            transport.send(&json).await?;
        }

        Ok(())
    }

    /// Handle a single JSON-RPC request and produce a response.
    pub async fn handle_request(&mut self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        let outcome = match request.method.as_str() {
            "initialize" => self.handle_initialize(&request.params),
            "ping" => Ok(Value::Object(Default::default())),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(&request.params).await,
            "resources/list" => to_value(ListResourcesResult {
                resources: self.resources.list(),
            }),
            "resources/templates/list" => to_value(ListResourceTemplatesResult {
                resource_templates: self.resources.templates(),
            }),
            "resources/read" => self.handle_read_resource(&request.params).await,
            method => {
                tracing::warn!(method = %method, "Unknown method");
                Err(McpError::MethodNotFound(method.to_string()))
            }
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => {
                let rpc = err.to_rpc_error();
                JsonRpcResponse::error(id, rpc.code, rpc.message)
            }
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" => {
                tracing::info!("Client confirmed initialization");
            }
            "notifications/cancelled" => {
                tracing::debug!("Client cancelled a request");
            }
            method => {
                tracing::debug!(method = %method, "Unknown notification, ignoring");
            }
        }
    }

    fn handle_initialize(&mut self, params: &Option<Value>) -> Result<Value, McpError> {
        let params: InitializeParams = match params {
            Some(p) => serde_json::from_value(p.clone())
                .map_err(|e| McpError::InvalidParams(e.to_string()))?,
            None => InitializeParams::default(),
        };
        let client = params.client_info.as_ref();
        tracing::info!(
            client = client.map_or("unknown", |c| c.name.as_str()),
            client_version = client.and_then(|c| c.version.as_deref()).unwrap_or("-"),
            protocol = params.protocol_version.as_deref().unwrap_or("-"),
            "Handling initialize"
        );
        if let Some(requested) = params.protocol_version.as_deref() {
            if requested != PROTOCOL_VERSION {
                tracing::warn!(requested, supported = PROTOCOL_VERSION, "Protocol version differs");
            }
        }
        self.initialized = true;

        to_value(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
                resources: Some(ResourcesCapability::default()),
            },
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: Some(self.server_version.clone()),
            },
        })
    }

    fn handle_list_tools(&self) -> Result<Value, McpError> {
        tracing::debug!("Handling tools/list");
        let tools: Vec<ToolInfo> = self.registry.list().into_iter().map(ToolInfo::from).collect();
        to_value(ListToolsResult { tools })
    }

    /// Check AnkiConnect is reachable before touching the collection.
    async fn ensure_connected(&self) -> Result<(), McpError> {
        let version = self.anki.client.check_connection().await?;
        tracing::debug!(version, "AnkiConnect reachable");
        Ok(())
    }

    async fn handle_call_tool(&self, params: &Option<Value>) -> Result<Value, McpError> {
        let params = params
            .as_ref()
            .ok_or_else(|| McpError::InvalidParams("missing params".to_string()))?;
        let call_params: CallToolParams = serde_json::from_value(params.clone())
            .map_err(|e| McpError::InvalidParams(e.to_string()))?;

        tracing::debug!(tool = %call_params.name, "Handling tools/call");

        let tool = self
            .registry
            .get(&call_params.name)
            .ok_or_else(|| McpError::ToolNotFound(call_params.name.clone()))?;

        self.ensure_connected().await?;

        let arguments = match call_params.arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let result = match tool.execute(arguments, &self.context).await {
            Ok(tool_result) => CallToolResult {
                content: vec![ToolContent::Text {
                    text: tool_result.content,
                }],
                is_error: tool_result.is_error,
            },
            Err(ToolError::InvalidInput(msg)) => return Err(McpError::InvalidParams(msg)),
            Err(e) => {
                tracing::warn!(tool = %call_params.name, error = %e, "Tool failed");
                CallToolResult {
                    content: vec![ToolContent::Text {
                        text: e.to_string(),
                    }],
                    is_error: true,
                }
            }
        };

        to_value(result)
    }

    async fn handle_read_resource(&self, params: &Option<Value>) -> Result<Value, McpError> {
        let params = params
            .as_ref()
            .ok_or_else(|| McpError::InvalidParams("missing params".to_string()))?;
        let read: ReadResourceParams = serde_json::from_value(params.clone())
            .map_err(|e| McpError::InvalidParams(e.to_string()))?;

        tracing::debug!(uri = %read.uri, "Handling resources/read");

        let resource = AnkiResource::parse(&read.uri)?;
        self.ensure_connected().await?;
        to_value(self.resources.read(&read.uri, resource).await?)
    }
}

fn to_value(result: impl Serialize) -> Result<Value, McpError> {
    Ok(serde_json::to_value(result)?)
}

async fn send_error<T: McpTransport>(
    transport: &mut T,
    id: RpcId,
    error: McpError,
) -> Result<(), McpError> {
    let resp = JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: None,
        error: Some(error.to_rpc_error()),
    };
    let json = serde_json::to_string(&resp)?;
    transport.send(&json).await
}
