#![no_main]

use glean_mcp::formatters::chunk_text;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u8, &str)| {
    let (max, text) = input;
    let max = usize::from(max).max(1);

    let chunks = chunk_text(text, max);
    assert_eq!(chunks.concat(), text);
    assert!(chunks.iter().all(|c| c.chars().count() <= max));
});
