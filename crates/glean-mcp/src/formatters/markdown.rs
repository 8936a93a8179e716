//! Markdown output formatting.

use std::borrow::Cow;

use crate::models::{
    ChatResponse, Document, GetDocumentsResponse, ListEntitiesResponse, Person, SearchResponse,
};

/// Snippets longer than this are cut.
const MAX_SNIPPET_CHARS: usize = 400;

/// Format search results as Markdown.
#[must_use]
pub fn format_search_markdown(query: &str, response: &SearchResponse) -> String {
    if response.results.is_empty() {
        return format!("No results found for \"{query}\".");
    }

    let mut output =
        format!("# Search results for \"{query}\" ({} results)\n\n", response.results.len());

    for (i, result) in response.results.iter().enumerate() {
        output.push_str(&format!("## {}. {}\n\n", i + 1, result.title_or_default()));

        let document = result.document.as_ref();
        let mut meta = Vec::new();
        if let Some(datasource) = document.and_then(|d| d.datasource.as_deref()) {
            meta.push(format!("**Source**: {datasource}"));
        }
        if let Some(doc_type) = document.and_then(|d| d.doc_type.as_deref()) {
            meta.push(format!("**Type**: {doc_type}"));
        }
        if let Some(updated) = document.and_then(|d| d.metadata.as_ref()?.update_time.as_deref()) {
            meta.push(format!("**Updated**: {updated}"));
        }
        if !meta.is_empty() {
            output.push_str(&format!("{}\n\n", meta.join(" | ")));
        }

        if let Some(url) = result.url.as_deref().or_else(|| document.and_then(|d| d.url.as_deref())) {
            output.push_str(&format!("**URL**: {url}\n\n"));
        }

        for snippet in result.snippets.iter().filter_map(|s| s.as_text()) {
            output.push_str(&format!("> {}\n\n", truncate(snippet.trim(), MAX_SNIPPET_CHARS)));
        }

        output.push_str("---\n\n");
    }

    if response.has_more_results {
        output.push_str("_More results are available; refine the query or raise pageSize._\n");
    }

    output
}

/// Format a chat answer as Markdown: answer text, then cited sources.
#[must_use]
pub fn format_chat_markdown(response: &ChatResponse) -> String {
    let mut answer = String::new();
    let mut sources: Vec<(String, Option<String>)> = Vec::new();

    for message in response.messages.iter().filter(|m| m.is_answer()) {
        for fragment in &message.fragments {
            if let Some(text) = &fragment.text {
                answer.push_str(text);
            }
            if let Some(document) = fragment.citation.as_ref().and_then(|c| c.source_document.as_ref()) {
                let title = document.title.clone().unwrap_or_else(|| "Untitled".to_string());
                let entry = (title, document.url.clone());
                if !sources.contains(&entry) {
                    sources.push(entry);
                }
            }
        }
        if !answer.is_empty() && !answer.ends_with('\n') {
            answer.push_str("\n\n");
        }
    }

    if answer.trim().is_empty() {
        return "Glean Assistant returned no answer.".to_string();
    }

    let mut output = answer.trim_end().to_string();
    if !sources.is_empty() {
        output.push_str("\n\n## Sources\n\n");
        for (title, url) in &sources {
            match url {
                Some(url) => output.push_str(&format!("- [{title}]({url})\n")),
                None => output.push_str(&format!("- {title}\n")),
            }
        }
    }
    output
}

/// Format people profiles as Markdown.
#[must_use]
pub fn format_people_markdown(response: &ListEntitiesResponse) -> String {
    if response.results.is_empty() {
        return "No people found.".to_string();
    }

    let mut output = format!("# People ({} results)\n\n", response.results.len());

    for (i, person) in response.results.iter().enumerate() {
        output.push_str(&format_person_markdown(person, i + 1));
        output.push_str("\n---\n\n");
    }

    if response.has_more_results {
        output.push_str("_More profiles match; narrow the query or filters._\n");
    }

    output
}

fn format_person_markdown(person: &Person, index: usize) -> String {
    let mut output = format!("## {}. {}\n\n", index, person.name.as_deref().unwrap_or("Unknown"));

    let Some(metadata) = &person.metadata else {
        return output;
    };

    let mut meta = Vec::new();
    if let Some(title) = &metadata.title {
        meta.push(format!("**Title**: {title}"));
    }
    if let Some(department) = &metadata.department {
        meta.push(format!("**Department**: {department}"));
    }
    if let Some(location) = &metadata.location {
        meta.push(format!("**Location**: {location}"));
    }
    if !meta.is_empty() {
        output.push_str(&format!("{}\n\n", meta.join(" | ")));
    }

    if let Some(email) = &metadata.email {
        output.push_str(&format!("**Email**: {email}\n\n"));
    }
    if let Some(manager) = metadata.manager.as_ref().and_then(|m| m.name.as_deref()) {
        output.push_str(&format!("**Manager**: {manager}\n"));
    }

    output
}

/// Format fetched documents as Markdown, in request order.
#[must_use]
pub fn format_documents_markdown(requested: &[String], response: &GetDocumentsResponse) -> String {
    if response.documents.is_empty() {
        return "No documents found.".to_string();
    }

    let mut output = String::new();
    let mut shown = 0;

    for key in requested {
        match response.documents.get(key) {
            Some(document) => {
                shown += 1;
                output.push_str(&format_document_markdown(document, key));
            }
            None => output.push_str(&format!("## {key}\n\n_Document not found or not accessible._\n")),
        }
        output.push_str("\n---\n\n");
    }

    // Documents keyed differently than requested (e.g. canonicalized URLs).
    if shown < response.documents.len() {
        for (key, document) in &response.documents {
            if !requested.contains(key) {
                output.push_str(&format_document_markdown(document, key));
                output.push_str("\n---\n\n");
            }
        }
    }

    output
}

fn format_document_markdown(document: &Document, key: &str) -> String {
    let mut output = format!("## {}\n\n", document.title.as_deref().unwrap_or(key));

    if let Some(url) = &document.url {
        output.push_str(&format!("**URL**: {url}\n\n"));
    }
    if let Some(datasource) = &document.datasource {
        output.push_str(&format!("**Source**: {datasource}\n\n"));
    }

    let body = document
        .content
        .as_ref()
        .map(|c| c.full_text_list.join("\n"))
        .filter(|t| !t.trim().is_empty());
    match body {
        Some(body) => {
            output.push_str(&body);
            output.push('\n');
        }
        None => output.push_str("_No content available._\n"),
    }

    output
}

fn truncate(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => Cow::Owned(format!("{}...", &text[..end])),
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_empty() {
        let output = format_search_markdown("nothing", &SearchResponse::default());
        assert_eq!(output, "No results found for \"nothing\".");
    }

    #[test]
    fn test_search_layout() {
        let response: SearchResponse = serde_json::from_value(json!({
            "results": [{
                "title": "Oncall runbook",
                "url": "https://wiki.example.com/oncall",
                "document": {"datasource": "confluence", "docType": "page"},
                "snippets": [{"text": "Page the secondary after 15 minutes"}]
            }]
        }))
        .unwrap();

        let output = format_search_markdown("oncall", &response);
        assert!(output.contains("## 1. Oncall runbook"));
        assert!(output.contains("**Source**: confluence | **Type**: page"));
        assert!(output.contains("**URL**: https://wiki.example.com/oncall"));
        assert!(output.contains("> Page the secondary after 15 minutes"));
    }

    #[test]
    fn test_chat_collects_citations_once() {
        let response: ChatResponse = serde_json::from_value(json!({
            "messages": [
                {"author": "USER", "fragments": [{"text": "question"}]},
                {"author": "GLEAN_AI", "messageType": "CONTENT", "fragments": [
                    {"text": "The answer."},
                    {"citation": {"sourceDocument": {"title": "Doc", "url": "https://d"}}},
                    {"citation": {"sourceDocument": {"title": "Doc", "url": "https://d"}}}
                ]}
            ]
        }))
        .unwrap();

        let output = format_chat_markdown(&response);
        assert!(output.starts_with("The answer."));
        assert!(!output.contains("question"));
        assert_eq!(output.matches("- [Doc](https://d)").count(), 1);
    }

    #[test]
    fn test_chat_without_answer() {
        assert_eq!(format_chat_markdown(&ChatResponse::default()), "Glean Assistant returned no answer.");
    }

    #[test]
    fn test_documents_missing_key() {
        let response: GetDocumentsResponse = serde_json::from_value(json!({
            "documents": {"a": {"title": "A", "content": {"fullTextList": ["line 1", "line 2"]}}}
        }))
        .unwrap();

        let output = format_documents_markdown(&["a".to_string(), "b".to_string()], &response);
        assert!(output.contains("## A"));
        assert!(output.contains("line 1\nline 2"));
        assert!(output.contains("## b\n\n_Document not found or not accessible._"));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("hi", 5), "hi");
    }
}
