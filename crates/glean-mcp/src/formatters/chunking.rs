//! Splitting long tool output into MCP text contents.

/// Largest chunk, in characters, returned as one text content.
pub const MAX_CHUNK_CHARS: usize = 15_000;

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Each cut is made after the last paragraph break in the window, else after
/// the last newline, else at the character limit. Concatenating the chunks
/// gives back `text`.
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while let Some((window_end, _)) = rest.char_indices().nth(max_chars) {
        let window = &rest[..window_end];
        let split = window
            .rfind("\n\n")
            .map(|i| i + 2)
            .or_else(|| window.rfind('\n').map(|i| i + 1))
            .unwrap_or(window_end);

        chunks.push(rest[..split].to_string());
        rest = &rest[split..];
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}
