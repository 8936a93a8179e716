#![no_main]

use glean_mcp::models::{ChatInput, PeopleProfileSearchInput, ReadDocumentsInput, SearchInput};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) {
        if let Ok(input) = serde_json::from_value::<SearchInput>(json.clone()) {
            let _ = input.validate();
        }
        if let Ok(input) = serde_json::from_value::<ChatInput>(json.clone()) {
            let _ = input.validate();
        }
        if let Ok(input) = serde_json::from_value::<PeopleProfileSearchInput>(json.clone()) {
            let _ = input.validate();
        }
        if let Ok(input) = serde_json::from_value::<ReadDocumentsInput>(json) {
            let _ = input.validate();
        }
    }
});
