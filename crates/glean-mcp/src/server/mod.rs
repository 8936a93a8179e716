//! MCP server: request dispatch over newline-delimited JSON-RPC on stdio.

pub mod protocol;
pub mod stdio;

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::auth::GleanAuth;
use crate::client::GleanClient;
use crate::tools::{self, McpTool, ToolContext};
use protocol::{DEFAULT_PROTOCOL_VERSION, JsonRpcRequest, JsonRpcResponse, ToolDescriptor, codes};

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "glean";

/// MCP server for Glean.
pub struct McpServer {
    ctx: ToolContext,
    tools: Vec<Box<dyn McpTool>>,
}

impl McpServer {
    /// Serve every Glean tool with these credentials.
    #[must_use]
    pub fn new(client: GleanClient, auth: GleanAuth) -> Self {
        Self::with_context(ToolContext::new(Arc::new(client), Arc::new(auth)))
    }

    #[must_use]
    pub fn with_context(ctx: ToolContext) -> Self {
        Self { ctx, tools: tools::register_all_tools() }
    }

    /// Serve stdin/stdout until stdin closes.
    pub async fn run_stdio(&self) -> anyhow::Result<()> {
        info!(tools = self.tools.len(), "Starting MCP server on stdio");
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        stdio::serve(stdin, tokio::io::stdout(), self).await
    }

    /// Answer one request. Notifications yield `None`.
    pub async fn handle(&self, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!(method = %request.method, "Notification");
            return None;
        }

        let id = request.id.clone();
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, initialize_result(&request.params)),
            "tools/list" => JsonRpcResponse::success(id, self.tools_list()),
            "tools/call" => self.call_tool(id, &request.params).await,
            "ping" => JsonRpcResponse::success(id, json!({})),
            other => JsonRpcResponse::error(id, codes::METHOD_NOT_FOUND, format!("Method not found: {other}")),
        };
        Some(response)
    }

    fn tools_list(&self) -> Value {
        let tools: Vec<ToolDescriptor> = self
            .tools
            .iter()
            .map(|tool| ToolDescriptor {
                name: tool.name(),
                description: tool.description(),
                input_schema: tool.input_schema(),
            })
            .collect();
        json!({ "tools": tools })
    }

    /// Tool failures are results with `isError`, so the model sees the message.
    async fn call_tool(&self, id: Option<Value>, params: &Value) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing 'name' parameter");
        };
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            return JsonRpcResponse::error(id, codes::INVALID_PARAMS, format!("Unknown tool: {name}"));
        };
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        info!(tool = name, "Calling tool");
        match tool.execute(&self.ctx, arguments).await {
            Ok(output) => {
                let content: Vec<Value> =
                    output.content.into_iter().map(|text| json!({ "type": "text", "text": text })).collect();
                JsonRpcResponse::success(id, json!({ "content": content }))
            }
            Err(e) => {
                error!(tool = name, error = %e, "Tool failed");
                JsonRpcResponse::success(
                    id,
                    json!({
                        "content": [{ "type": "text", "text": e.to_user_message() }],
                        "isError": true
                    }),
                )
            }
        }
    }
}

fn initialize_result(params: &Value) -> Value {
    let protocol_version =
        params.get("protocolVersion").and_then(Value::as_str).unwrap_or(DEFAULT_PROTOCOL_VERSION);
    info!(protocol_version, "MCP initialize");

    json!({
        "protocolVersion": protocol_version,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer").field("tools", &self.tools.len()).finish()
    }
}
