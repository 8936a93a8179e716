//! Full-text document retrieval.

use serde_json::json;

use super::{McpTool, ToolContext, ToolOutput};
use crate::error::ToolResult;
use crate::formatters;
use crate::models::{GetDocumentsResponse, ReadDocumentsInput};

/// Document reader tool.
pub struct ReadDocumentsTool;

#[async_trait::async_trait]
impl McpTool for ReadDocumentsTool {
    fn name(&self) -> &'static str {
        "read_documents"
    }

    fn description(&self) -> &'static str {
        "Read the full text of documents by Glean document id or URL, \
         typically ones found with the search tool."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "ids": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Glean document ids"
                },
                "urls": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Document URLs"
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<ToolOutput> {
        let params: ReadDocumentsInput = serde_json::from_value(input)?;
        params.validate()?;

        let ids = params.ids.unwrap_or_default();
        let urls = params.urls.unwrap_or_default();

        let specs: Vec<_> = ids
            .iter()
            .map(|id| json!({ "id": id }))
            .chain(urls.iter().map(|url| json!({ "url": url })))
            .collect();
        let body = json!({
            "documentSpecs": specs,
            "includeFields": ["DOCUMENT_CONTENT"],
        });

        let auth = ctx.authorization().await?;
        let value = ctx.client.get_documents(&auth, &body).await?;
        let response: GetDocumentsResponse = serde_json::from_value(value)?;

        let requested: Vec<String> = ids.into_iter().chain(urls).collect();
        let text = formatters::format_documents_markdown(&requested, &response);
        Ok(ToolOutput { content: formatters::chunk_text(&text, formatters::MAX_CHUNK_CHARS) })
    }
}
