//! What gets written into a host's MCP config.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::config::{GleanConfig, env};

/// Subcommand the host runs for a local server.
pub const SERVER_SUBCOMMAND: &str = "server";

/// Path of the hosted MCP endpoint below the backend base URL.
pub const REMOTE_MCP_PATH: &str = "mcp/default";

/// How a host reaches the Glean MCP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerDescriptor {
    /// Spawn this binary over stdio.
    Local {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    },
    /// Connect to the hosted endpoint over HTTP.
    Remote {
        url: String,
        headers: BTreeMap<String, String>,
    },
}

impl ServerDescriptor {
    /// Run `command server` with the Glean settings in its environment.
    #[must_use]
    pub fn local(command: impl Into<String>, config: &GleanConfig) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert(env::BASE_URL.to_string(), config.base_url().to_string());

        match config {
            GleanConfig::Token(token) => {
                vars.insert(env::API_TOKEN.to_string(), token.api_token.clone());
                if let Some(act_as) = &token.act_as {
                    vars.insert(env::ACT_AS.to_string(), act_as.clone());
                }
            }
            GleanConfig::OAuth(oauth) => {
                let optional = [
                    (env::OAUTH_ISSUER, &oauth.issuer),
                    (env::OAUTH_CLIENT_ID, &oauth.client_id),
                    (env::OAUTH_CLIENT_SECRET, &oauth.client_secret),
                ];
                for (key, value) in optional {
                    if let Some(value) = value {
                        vars.insert(key.to_string(), value.clone());
                    }
                }
            }
        }

        Self::Local { command: command.into(), args: vec![SERVER_SUBCOMMAND.to_string()], env: vars }
    }

    /// Point at `<base_url>mcp/default`. API tokens travel as a bearer header.
    #[must_use]
    pub fn remote(config: &GleanConfig) -> Self {
        let mut headers = BTreeMap::new();
        if let GleanConfig::Token(token) = config {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token.api_token));
            if let Some(act_as) = &token.act_as {
                headers.insert(crate::auth::ACT_AS_HEADER.to_string(), act_as.clone());
            }
        }
        Self::Remote { url: format!("{}{REMOTE_MCP_PATH}", config.base_url()), headers }
    }

    /// Entry for hosts keyed by `mcpServers` (Claude Desktop, Cursor, Windsurf, Claude Code).
    #[must_use]
    pub fn to_mcp_servers_entry(&self) -> Value {
        match self {
            Self::Local { command, args, env } => json!({
                "command": command,
                "args": args,
                "env": env,
            }),
            Self::Remote { url, headers } => with_headers(json!({ "type": "http", "url": url }), headers),
        }
    }

    /// Entry for VS Code's `servers` map.
    #[must_use]
    pub fn to_vscode_entry(&self) -> Value {
        match self {
            Self::Local { command, args, env } => json!({
                "type": "stdio",
                "command": command,
                "args": args,
                "env": env,
            }),
            Self::Remote { url, headers } => with_headers(json!({ "type": "http", "url": url }), headers),
        }
    }

    /// Entry for Goose's `extensions` map.
    #[must_use]
    pub fn to_goose_entry(&self, name: &str) -> Value {
        match self {
            Self::Local { command, args, env } => json!({
                "name": name,
                "type": "stdio",
                "cmd": command,
                "args": args,
                "envs": env,
                "enabled": true,
                "timeout": 300,
            }),
            Self::Remote { url, headers } => with_headers(
                json!({
                    "name": name,
                    "type": "streamable_http",
                    "uri": url,
                    "enabled": true,
                    "timeout": 300,
                }),
                headers,
            ),
        }
    }
}

fn with_headers(mut entry: Value, headers: &BTreeMap<String, String>) -> Value {
    if !headers.is_empty() {
        if let Value::Object(map) = &mut entry {
            let headers: Map<String, Value> =
                headers.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect();
            map.insert("headers".to_string(), Value::Object(headers));
        }
    }
    entry
}
