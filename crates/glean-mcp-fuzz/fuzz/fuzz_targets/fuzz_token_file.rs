#![no_main]

use glean_mcp::auth::TokenSet;
use glean_mcp::auth::token::TokenResponse;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // A token file that parses must survive a save/load cycle.
    if let Ok(tokens) = serde_json::from_slice::<TokenSet>(data) {
        let json = serde_json::to_string(&tokens).unwrap();
        let again: TokenSet = serde_json::from_str(&json).unwrap();
        assert!(again == tokens);
    }

    if let Ok(response) = serde_json::from_slice::<TokenResponse>(data) {
        let _ = response.into_result();
    }
});
