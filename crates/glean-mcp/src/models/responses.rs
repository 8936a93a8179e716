//! Read-side views of Glean API responses.
//!
//! Only the fields the formatters show are modelled; everything else in the
//! response is ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `POST /search` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,

    #[serde(default)]
    pub has_more_results: bool,
}

/// One search hit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub document: Option<Document>,

    #[serde(default)]
    pub snippets: Vec<Snippet>,
}

impl SearchResult {
    /// Title from the hit or its document.
    #[must_use]
    pub fn title_or_default(&self) -> &str {
        self.title
            .as_deref()
            .or_else(|| self.document.as_ref().and_then(|d| d.title.as_deref()))
            .unwrap_or("Untitled")
    }
}

/// A document as returned by search and getdocuments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub datasource: Option<String>,

    #[serde(default)]
    pub doc_type: Option<String>,

    #[serde(default)]
    pub metadata: Option<DocumentMetadata>,

    #[serde(default)]
    pub content: Option<DocumentContent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default)]
    pub author: Option<Person>,

    #[serde(default)]
    pub update_time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentContent {
    #[serde(default)]
    pub full_text_list: Vec<String>,
}

/// Highlighted text from a search hit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub snippet: Option<String>,
}

impl Snippet {
    /// Snippet text, whichever field carries it.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.text.as_deref().or(self.snippet.as_deref()).filter(|t| !t.trim().is_empty())
    }
}

/// `POST /chat` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub message_type: Option<String>,

    #[serde(default)]
    pub fragments: Vec<ChatFragment>,
}

impl ChatMessage {
    /// True for assistant answer text (not reasoning or tool updates).
    #[must_use]
    pub fn is_answer(&self) -> bool {
        self.author.as_deref() == Some("GLEAN_AI")
            && self.message_type.as_deref().is_none_or(|t| t == "CONTENT")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFragment {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub citation: Option<Citation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    #[serde(default)]
    pub source_document: Option<Document>,
}

/// `POST /listentities` response for people.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntitiesResponse {
    #[serde(default)]
    pub results: Vec<Person>,

    #[serde(default)]
    pub has_more_results: bool,
}

/// A person profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub metadata: Option<PersonMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonMetadata {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub department: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub manager: Option<Box<Person>>,
}

/// `POST /getdocuments` response, keyed by the requested id or URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDocumentsResponse {
    #[serde(default)]
    pub documents: BTreeMap<String, Document>,
}
