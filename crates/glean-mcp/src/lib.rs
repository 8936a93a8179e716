//! Glean MCP Server
//!
//! A Model Context Protocol (MCP) server and configurator for Glean. Exposes
//! Glean search, chat, people lookup and document reading as MCP tools, and
//! signs users in with the OAuth 2.0 device authorization grant.
//!
//! # Features
//!
//! - **Device flow sign-in**: RFC 8628 with PKCE, persisted tokens and refresh
//! - **4 MCP Tools**: `search`, `chat`, `people_profile_search`, `read_documents`
//! - **Host setup**: writes MCP config for Claude Desktop, Claude Code, Cursor,
//!   Windsurf, VS Code and Goose
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use glean_mcp::auth::{DeviceFlowSettings, GleanAuth, StateDir, TerminalInteraction, auth_http_client};
//! use glean_mcp::config::{self, ClientConfig, ConfigFlags, ConfigSources};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sources = ConfigSources::load(ConfigFlags::default(), None)?;
//!     let config = config::resolve(&sources)?;
//!     let http = auth_http_client(&ClientConfig::default())?;
//!     let auth = GleanAuth::new(
//!         config,
//!         http,
//!         &StateDir::from_env()?,
//!         Arc::new(TerminalInteraction),
//!         DeviceFlowSettings::default(),
//!     );
//!
//!     let authorization = auth.authorization().await?;
//!     println!("{:?}", authorization.auth_type);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod configure;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod models;
pub mod server;
pub mod tools;

pub use auth::GleanAuth;
pub use client::GleanClient;
pub use config::GleanConfig;
pub use error::{AuthError, ClientError, ConfigError, ToolError};
