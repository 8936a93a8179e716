//! Input models for MCP tool parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ToolError, ToolResult};

/// Largest page size passed through to Glean.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Input for the `search` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInput {
    /// Keywords to search for.
    pub query: String,

    /// Restrict results to these datasources (e.g. `["confluence", "gdrive"]`).
    #[serde(default)]
    pub datasources: Option<Vec<String>>,

    /// Results to return.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl SearchInput {
    /// Reject empty queries and out-of-range page sizes.
    pub fn validate(&self) -> ToolResult<()> {
        require_text("query", &self.query)?;
        validate_page_size(self.page_size)
    }
}

/// Input for the `chat` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatInput {
    /// The question for Glean Assistant.
    pub message: String,

    /// Earlier messages in the conversation, oldest first.
    #[serde(default)]
    pub context: Option<Vec<String>>,
}

impl ChatInput {
    /// Reject empty messages.
    pub fn validate(&self) -> ToolResult<()> {
        require_text("message", &self.message)
    }
}

/// Input for the `people_profile_search` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeopleProfileSearchInput {
    /// Free-text name, title or keyword.
    #[serde(default)]
    pub query: Option<String>,

    /// Exact-match field filters, e.g. `{"department": "Engineering"}`.
    #[serde(default)]
    pub filters: Option<BTreeMap<String, String>>,

    /// Profiles to return.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl PeopleProfileSearchInput {
    /// Require a query or at least one filter.
    pub fn validate(&self) -> ToolResult<()> {
        let has_query = self.query.as_deref().is_some_and(|q| !q.trim().is_empty());
        let has_filters = self.filters.as_ref().is_some_and(|f| !f.is_empty());
        if !has_query && !has_filters {
            return Err(ToolError::validation("query", "provide a query or at least one filter"));
        }
        validate_page_size(self.page_size)
    }
}

/// Input for the `read_documents` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadDocumentsInput {
    /// Glean document ids.
    #[serde(default)]
    pub ids: Option<Vec<String>>,

    /// Document URLs.
    #[serde(default)]
    pub urls: Option<Vec<String>>,
}

impl ReadDocumentsInput {
    /// Require at least one id or URL.
    pub fn validate(&self) -> ToolResult<()> {
        if self.ids.as_ref().is_none_or(Vec::is_empty) && self.urls.as_ref().is_none_or(Vec::is_empty) {
            return Err(ToolError::validation("ids", "provide at least one document id or url"));
        }
        Ok(())
    }
}

fn default_page_size() -> u32 {
    10
}

fn require_text(field: &str, value: &str) -> ToolResult<()> {
    if value.trim().is_empty() {
        return Err(ToolError::validation(field, "cannot be empty"));
    }
    Ok(())
}

fn validate_page_size(page_size: u32) -> ToolResult<()> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ToolError::validation(
            "pageSize",
            format!("must be between 1 and {MAX_PAGE_SIZE}"),
        ));
    }
    Ok(())
}
