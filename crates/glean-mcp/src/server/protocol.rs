//! JSON-RPC 2.0 framing for the MCP methods we serve.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version announced when the client does not send one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC error codes.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
}

/// Incoming request, or a notification when `id` is absent.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Option<Value>,
}

impl JsonRpcRequest {
    /// Notifications get no response.
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Outgoing response. `id` is `null` when the request could not be parsed.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub id: Option<Value>,
}

/// Exactly one of `result` or `error`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(JsonRpcError),
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    #[must_use]
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, outcome: Outcome::Result(result), id }
    }

    #[must_use]
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            outcome: Outcome::Error(JsonRpcError { code, message: message.into() }),
            id,
        }
    }
}

/// Entry of a `tools/list` result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}
