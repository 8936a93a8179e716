//! Glean Assistant chat.

use serde_json::{Value, json};

use super::{McpTool, ToolContext, ToolOutput};
use crate::error::ToolResult;
use crate::formatters::{self, MAX_CHUNK_CHARS};
use crate::models::{ChatInput, ChatResponse};

/// Glean Assistant chat tool.
pub struct ChatTool;

fn user_message(text: &str) -> Value {
    json!({
        "author": "USER",
        "messageType": "CONTENT",
        "fragments": [{ "text": text }]
    })
}

#[async_trait::async_trait]
impl McpTool for ChatTool {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn description(&self) -> &'static str {
        "Ask Glean Assistant a question. Answers are grounded in company knowledge \
         and list the documents they cite. Long answers arrive as several text parts."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The question or request for Glean Assistant"
                },
                "context": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Earlier messages in the conversation, oldest first"
                }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<ToolOutput> {
        let params: ChatInput = serde_json::from_value(input)?;
        params.validate()?;

        let mut messages: Vec<Value> = params
            .context
            .iter()
            .flatten()
            .filter(|m| !m.trim().is_empty())
            .map(|m| user_message(m))
            .collect();
        messages.push(user_message(&params.message));

        let body = json!({
            "messages": messages,
            "saveChat": false,
            "stream": false,
        });

        let auth = ctx.authorization().await?;
        let value = ctx.client.chat(&auth, &body).await?;
        let response: ChatResponse = serde_json::from_value(value)?;

        let text = formatters::format_chat_markdown(&response);
        let content = formatters::chunk_text(&text, MAX_CHUNK_CHARS);
        tracing::debug!(chunks = content.len(), chars = text.chars().count(), "Chat answer");

        Ok(ToolOutput { content })
    }
}
