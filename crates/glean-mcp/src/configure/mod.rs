//! MCP host configuration writers.
//!
//! Each supported host keeps its MCP servers in one file. `configure` merges a
//! `glean` entry into that file and `remove` deletes it again; every other key
//! is left as it was. A file that does not parse is reported and never
//! overwritten.

mod descriptor;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

pub use descriptor::{REMOTE_MCP_PATH, SERVER_SUBCOMMAND, ServerDescriptor};

use crate::client::GleanClient;
use crate::error::{ConfigError, ConfigureError};

/// Key of our entry in every host config.
pub const SERVER_NAME: &str = "glean";

/// MCP hosts we can configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Host {
    ClaudeDesktop,
    ClaudeCode,
    Cursor,
    Windsurf,
    #[value(name = "vscode")]
    VsCode,
    Goose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    /// JSON object with our entry under `key`.
    Json { key: &'static str },
    /// Goose YAML with our entry under `extensions`.
    GooseYaml,
}

impl Host {
    /// Every supported host.
    pub const ALL: [Self; 6] =
        [Self::ClaudeDesktop, Self::ClaudeCode, Self::Cursor, Self::Windsurf, Self::VsCode, Self::Goose];

    /// Display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::ClaudeDesktop => "Claude Desktop",
            Self::ClaudeCode => "Claude Code",
            Self::Cursor => "Cursor",
            Self::Windsurf => "Windsurf",
            Self::VsCode => "VS Code",
            Self::Goose => "Goose",
        }
    }

    /// Location of this host's MCP config.
    #[must_use]
    pub fn config_path(self, dirs: &HostDirs) -> PathBuf {
        match self {
            Self::ClaudeDesktop => dirs.config.join("Claude").join("claude_desktop_config.json"),
            Self::ClaudeCode => dirs.home.join(".claude.json"),
            Self::Cursor => dirs.home.join(".cursor").join("mcp.json"),
            Self::Windsurf => dirs.home.join(".codeium").join("windsurf").join("mcp_config.json"),
            Self::VsCode => dirs.config.join("Code").join("User").join("mcp.json"),
            Self::Goose => dirs.home.join(".config").join("goose").join("config.yaml"),
        }
    }

    const fn format(self) -> Format {
        match self {
            Self::VsCode => Format::Json { key: "servers" },
            Self::Goose => Format::GooseYaml,
            _ => Format::Json { key: "mcpServers" },
        }
    }

    fn entry(self, descriptor: &ServerDescriptor) -> Value {
        match self {
            Self::VsCode => descriptor.to_vscode_entry(),
            Self::Goose => descriptor.to_goose_entry(SERVER_NAME),
            _ => descriptor.to_mcp_servers_entry(),
        }
    }
}

/// Directories host config paths are anchored on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDirs {
    /// User home.
    pub home: PathBuf,
    /// Platform config dir (`~/.config`, `~/Library/Application Support`, `%APPDATA%`).
    pub config: PathBuf,
}

impl HostDirs {
    /// Directories of the current user.
    pub fn from_env() -> Result<Self, ConfigError> {
        let dirs = directories::BaseDirs::new().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self { home: dirs.home_dir().to_path_buf(), config: dirs.config_dir().to_path_buf() })
    }

    /// Use one root for everything (tests).
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self { home: root.join("home"), config: root.join("config") }
    }
}

/// Check the instance answers before writing anything.
pub async fn preflight(client: &GleanClient) -> Result<(), ConfigureError> {
    client.check_liveness().await.map_err(|e| ConfigureError::Preflight {
        url: format!("{}liveness_check", client.base_url()),
        reason: e.to_string(),
    })
}

/// Add or replace the `glean` entry in `host`'s config. Returns the file written.
pub fn configure_host(
    host: Host,
    dirs: &HostDirs,
    descriptor: &ServerDescriptor,
) -> Result<PathBuf, ConfigureError> {
    let path = host.config_path(dirs);
    write_entry(host, &path, descriptor)?;
    info!(host = host.display_name(), path = %path.display(), "Configured MCP host");
    Ok(path)
}

/// Remove the `glean` entry from `host`'s config. `Ok(false)` if there was none.
pub fn remove_host(host: Host, dirs: &HostDirs) -> Result<bool, ConfigureError> {
    let path = host.config_path(dirs);
    let removed = remove_entry(host, &path)?;
    if removed {
        info!(host = host.display_name(), path = %path.display(), "Removed Glean from MCP host");
    }
    Ok(removed)
}

/// Merge `descriptor` into the config file at `path`.
pub fn write_entry(host: Host, path: &Path, descriptor: &ServerDescriptor) -> Result<(), ConfigureError> {
    let entry = host.entry(descriptor);

    match host.format() {
        Format::Json { key } => {
            let mut root = read_json(path)?;
            let Some(servers) = object_entry(&mut root, key) else {
                return Err(invalid_shape(path, "JSON", key));
            };
            servers.insert(SERVER_NAME.to_string(), entry);
            write_json(path, &root)
        }
        Format::GooseYaml => {
            let mut root = read_yaml(path)?;
            let entry = serde_yaml::to_value(&entry).map_err(|e| serialize_error(path, &e))?;
            let Some(extensions) = yaml_mapping_entry(&mut root, "extensions") else {
                return Err(invalid_shape(path, "YAML", "extensions"));
            };
            extensions.insert(serde_yaml::Value::String(SERVER_NAME.to_string()), entry);
            write_yaml(path, &root)
        }
    }
}

/// Delete our entry from the config file at `path`. Other keys are untouched.
pub fn remove_entry(host: Host, path: &Path) -> Result<bool, ConfigureError> {
    if !path.exists() {
        debug!(path = %path.display(), "No host config to update");
        return Ok(false);
    }

    match host.format() {
        Format::Json { key } => {
            let mut root = read_json(path)?;
            let removed = root
                .get_mut(key)
                .and_then(Value::as_object_mut)
                .and_then(|servers| servers.remove(SERVER_NAME))
                .is_some();
            if removed {
                write_json(path, &root)?;
            }
            Ok(removed)
        }
        Format::GooseYaml => {
            let mut root = read_yaml(path)?;
            let removed = root
                .get_mut("extensions")
                .and_then(serde_yaml::Value::as_mapping_mut)
                .and_then(|extensions| extensions.remove(SERVER_NAME))
                .is_some();
            if removed {
                write_yaml(path, &root)?;
            }
            Ok(removed)
        }
    }
}

/// Read an existing document; missing or blank files are an empty object.
fn read_existing(path: &Path) -> Result<Option<String>, ConfigureError> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(None),
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigureError::Io { path: path.to_path_buf(), source }),
    }
}

fn read_json(path: &Path) -> Result<Value, ConfigureError> {
    let Some(content) = read_existing(path)? else {
        return Ok(Value::Object(serde_json::Map::new()));
    };
    let root: Value = serde_json::from_str(&content).map_err(|e| ConfigureError::InvalidExisting {
        path: path.to_path_buf(),
        format: "JSON",
        reason: e.to_string(),
    })?;
    if !root.is_object() {
        return Err(ConfigureError::InvalidExisting {
            path: path.to_path_buf(),
            format: "JSON",
            reason: "top level is not an object".to_string(),
        });
    }
    Ok(root)
}

fn read_yaml(path: &Path) -> Result<serde_yaml::Value, ConfigureError> {
    let Some(content) = read_existing(path)? else {
        return Ok(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    };
    let root: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|e| ConfigureError::InvalidExisting {
            path: path.to_path_buf(),
            format: "YAML",
            reason: e.to_string(),
        })?;
    match root {
        serde_yaml::Value::Mapping(_) => Ok(root),
        serde_yaml::Value::Null => Ok(serde_yaml::Value::Mapping(serde_yaml::Mapping::new())),
        _ => Err(ConfigureError::InvalidExisting {
            path: path.to_path_buf(),
            format: "YAML",
            reason: "top level is not a mapping".to_string(),
        }),
    }
}

/// The object under `key`, created if absent. `None` if `key` holds a non-object.
fn object_entry<'a>(root: &'a mut Value, key: &str) -> Option<&'a mut serde_json::Map<String, Value>> {
    let map = root.as_object_mut()?;
    let value = map.entry(key).or_insert_with(|| Value::Object(serde_json::Map::new()));
    if value.is_null() {
        *value = Value::Object(serde_json::Map::new());
    }
    value.as_object_mut()
}

fn yaml_mapping_entry<'a>(
    root: &'a mut serde_yaml::Value,
    key: &str,
) -> Option<&'a mut serde_yaml::Mapping> {
    let map = root.as_mapping_mut()?;
    let value = map
        .entry(serde_yaml::Value::String(key.to_string()))
        .or_insert_with(|| serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    if value.is_null() {
        *value = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());
    }
    value.as_mapping_mut()
}

fn write_json(path: &Path, root: &Value) -> Result<(), ConfigureError> {
    let mut body = serde_json::to_string_pretty(root).map_err(|e| serialize_error(path, &e))?;
    body.push('\n');
    write_file(path, &body)
}

fn write_yaml(path: &Path, root: &serde_yaml::Value) -> Result<(), ConfigureError> {
    let body = serde_yaml::to_string(root).map_err(|e| serialize_error(path, &e))?;
    write_file(path, &body)
}

fn write_file(path: &Path, body: &str) -> Result<(), ConfigureError> {
    let io_error = |source| ConfigureError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, body).map_err(io_error)
}

fn serialize_error(path: &Path, err: &dyn std::fmt::Display) -> ConfigureError {
    ConfigureError::Serialize { path: path.to_path_buf(), reason: err.to_string() }
}

fn invalid_shape(path: &Path, format: &'static str, key: &str) -> ConfigureError {
    ConfigureError::InvalidExisting {
        path: path.to_path_buf(),
        format,
        reason: format!("'{key}' is not an object"),
    }
}
