//! Company-wide search.

use serde_json::json;

use super::{McpTool, ToolContext, ToolOutput};
use crate::error::ToolResult;
use crate::formatters;
use crate::models::{SearchInput, SearchResponse};

/// Glean search tool.
pub struct SearchTool;

#[async_trait::async_trait]
impl McpTool for SearchTool {
    fn name(&self) -> &'static str {
        "search"
    }

    fn description(&self) -> &'static str {
        "Search Glean for documents, messages and pages across company datasources. \
         Returns titles, links and matching snippets."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Keywords to search for"
                },
                "datasources": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Only return results from these datasources (e.g. confluence, gdrive, slack)"
                },
                "pageSize": {
                    "type": "integer",
                    "default": 10,
                    "minimum": 1,
                    "maximum": 100,
                    "description": "Number of results to return"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<ToolOutput> {
        let params: SearchInput = serde_json::from_value(input)?;
        params.validate()?;

        let mut body = json!({
            "query": params.query,
            "pageSize": params.page_size,
        });
        if let Some(datasources) = params.datasources.as_ref().filter(|d| !d.is_empty()) {
            body["requestOptions"] = json!({ "datasourcesFilter": datasources });
        }

        let auth = ctx.authorization().await?;
        let value = ctx.client.search(&auth, &body).await?;
        let response: SearchResponse = serde_json::from_value(value)?;

        Ok(formatters::format_search_markdown(&params.query, &response).into())
    }
}
