//! Output formatting for tool results.

mod chunking;
mod markdown;

pub use chunking::{MAX_CHUNK_CHARS, chunk_text};
pub use markdown::*;
