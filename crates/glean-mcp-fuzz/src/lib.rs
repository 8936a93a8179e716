//! Fuzzing library for glean-mcp.
//!
//! Targets cover everything parsed from outside the process: the saved token
//! file, token-endpoint responses, tool arguments from MCP hosts and Glean API
//! responses fed to the Markdown formatters.
//!
//! # Usage
//!
//! ```bash
//! cd crates/glean-mcp-fuzz
//! cargo +nightly fuzz run fuzz_token_file -- -max_total_time=60
//! ```

pub use glean_mcp::{auth, formatters, models};
