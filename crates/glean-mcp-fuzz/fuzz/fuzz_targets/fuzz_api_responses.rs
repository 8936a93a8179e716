#![no_main]

use glean_mcp::formatters;
use glean_mcp::models::{ChatResponse, GetDocumentsResponse, ListEntitiesResponse, SearchResponse};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    if let Ok(response) = serde_json::from_value::<SearchResponse>(json.clone()) {
        let _ = formatters::format_search_markdown("fuzz", &response);
    }
    if let Ok(response) = serde_json::from_value::<ChatResponse>(json.clone()) {
        let _ = formatters::format_chat_markdown(&response);
    }
    if let Ok(response) = serde_json::from_value::<ListEntitiesResponse>(json.clone()) {
        let _ = formatters::format_people_markdown(&response);
    }
    if let Ok(response) = serde_json::from_value::<GetDocumentsResponse>(json) {
        let requested: Vec<String> = response.documents.keys().cloned().collect();
        let _ = formatters::format_documents_markdown(&requested, &response);
    }
});
