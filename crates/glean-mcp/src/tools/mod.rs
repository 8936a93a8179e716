//! MCP tool implementations.
//!
//! Each tool:
//! 1. Parses and validates input parameters
//! 2. Fetches credentials and calls the Glean REST API
//! 3. Formats the response as Markdown

mod chat;
mod documents;
mod people;
mod search;

pub use chat::ChatTool;
pub use documents::ReadDocumentsTool;
pub use people::PeopleProfileSearchTool;
pub use search::SearchTool;

use std::sync::Arc;

use crate::auth::{Authorization, GleanAuth};
use crate::client::GleanClient;
use crate::error::ToolResult;

/// Tool execution context.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// API client.
    pub client: Arc<GleanClient>,

    /// Credential source.
    pub auth: Arc<GleanAuth>,
}

impl ToolContext {
    /// Create a new tool context.
    #[must_use]
    pub fn new(client: Arc<GleanClient>, auth: Arc<GleanAuth>) -> Self {
        Self { client, auth }
    }

    /// Credentials for the next API call, refreshing OAuth tokens if needed.
    pub async fn authorization(&self) -> ToolResult<Authorization> {
        Ok(self.auth.authorization().await?)
    }
}

/// Text returned by a tool, one entry per MCP text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: Vec<String>,
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self { content: vec![text] }
    }
}

/// Trait for MCP tools.
#[async_trait::async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name (e.g., "search").
    fn name(&self) -> &'static str;

    /// Tool description for LLM.
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with given input.
    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<ToolOutput>;
}

/// Register all tools.
#[must_use]
pub fn register_all_tools() -> Vec<Box<dyn McpTool>> {
    vec![
        Box::new(SearchTool),
        Box::new(ChatTool),
        Box::new(PeopleProfileSearchTool),
        Box::new(ReadDocumentsTool),
    ]
}
