//! People directory lookup.

use serde_json::json;

use super::{McpTool, ToolContext, ToolOutput};
use crate::error::ToolResult;
use crate::formatters;
use crate::models::{ListEntitiesResponse, PeopleProfileSearchInput};

/// Employee profile search tool.
pub struct PeopleProfileSearchTool;

#[async_trait::async_trait]
impl McpTool for PeopleProfileSearchTool {
    fn name(&self) -> &'static str {
        "people_profile_search"
    }

    fn description(&self) -> &'static str {
        "Find people in the company directory by name, title or keyword, \
         optionally filtered by fields such as department or location."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Name, title or keyword"
                },
                "filters": {
                    "type": "object",
                    "additionalProperties": {"type": "string"},
                    "description": "Exact-match filters, e.g. {\"department\": \"Engineering\"}"
                },
                "pageSize": {
                    "type": "integer",
                    "default": 10,
                    "minimum": 1,
                    "maximum": 100,
                    "description": "Number of profiles to return"
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<ToolOutput> {
        let params: PeopleProfileSearchInput = serde_json::from_value(input)?;
        params.validate()?;

        let mut body = json!({
            "entityType": "PEOPLE",
            "pageSize": params.page_size,
        });
        if let Some(query) = params.query.as_deref().filter(|q| !q.trim().is_empty()) {
            body["query"] = json!(query);
        }
        if let Some(filters) = &params.filters {
            let filter: Vec<_> = filters
                .iter()
                .map(|(field, value)| {
                    json!({
                        "fieldName": field,
                        "values": [{ "relationType": "EQUALS", "value": value }]
                    })
                })
                .collect();
            body["filter"] = json!(filter);
        }

        let auth = ctx.authorization().await?;
        let value = ctx.client.list_entities(&auth, &body).await?;
        let response: ListEntitiesResponse = serde_json::from_value(value)?;

        Ok(formatters::format_people_markdown(&response).into())
    }
}
