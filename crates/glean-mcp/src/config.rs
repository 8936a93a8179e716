//! Configuration for the Glean MCP server.
//!
//! Connection settings come from three layers, highest precedence first:
//! command-line flags, an optional env file, and the process environment.
//! [`resolve`] folds them into a single [`GleanConfig`].

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// Request timeout (chat responses can take a while to generate).
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Maximum transient retries for API calls.
    pub const MAX_RETRIES: u32 = 3;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);

    /// REST API prefix below the instance base URL.
    pub const REST_PREFIX: &str = "rest/api/v1/";
}

/// Environment variable names.
pub mod env {
    /// Instance name, e.g. `acme` for `https://acme-be.glean.com/`.
    pub const INSTANCE: &str = "GLEAN_INSTANCE";
    /// Legacy alias for [`INSTANCE`].
    pub const SUBDOMAIN: &str = "GLEAN_SUBDOMAIN";
    /// Full backend URL; wins over the instance name in the same layer.
    pub const BASE_URL: &str = "GLEAN_BASE_URL";
    /// Static API token. Selects token authentication.
    pub const API_TOKEN: &str = "GLEAN_API_TOKEN";
    /// User to impersonate with a global API token.
    pub const ACT_AS: &str = "GLEAN_ACT_AS";
    /// OAuth issuer override (skips protected resource discovery with the client id).
    pub const OAUTH_ISSUER: &str = "GLEAN_OAUTH_ISSUER";
    /// OAuth client id override.
    pub const OAUTH_CLIENT_ID: &str = "GLEAN_OAUTH_CLIENT_ID";
    /// OAuth client secret, sent only to the token endpoint.
    pub const OAUTH_CLIENT_SECRET: &str = "GLEAN_OAUTH_CLIENT_SECRET";
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Transient retries (5xx, connection resets).
    pub max_retries: u32,
}

impl ClientConfig {
    /// Create a test configuration with short timeouts and no retries.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            max_retries: 0,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            max_retries: api::MAX_RETRIES,
        }
    }
}

/// How requests to Glean are authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// Device-flow OAuth tokens with refresh.
    OAuth,
    /// Static API token.
    Token,
}

/// Settings for static API token authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenConfig {
    /// Backend base URL, always ending in `/`.
    pub base_url: String,
    /// API token.
    pub api_token: String,
    /// User to act as (global tokens only).
    pub act_as: Option<String>,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("base_url", &self.base_url)
            .field("act_as", &self.act_as)
            .finish()
    }
}

/// Settings for OAuth device-flow authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    /// Backend base URL, always ending in `/`.
    pub base_url: String,
    /// Issuer override.
    pub issuer: Option<String>,
    /// Client id override.
    pub client_id: Option<String>,
    /// Client secret (token endpoint only).
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("base_url", &self.base_url)
            .field("issuer", &self.issuer)
            .field("client_id", &self.client_id)
            .field("has_client_secret", &self.client_secret.is_some())
            .finish()
    }
}

/// Resolved Glean connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GleanConfig {
    /// Static API token.
    Token(TokenConfig),
    /// OAuth device flow.
    OAuth(OAuthConfig),
}

impl GleanConfig {
    /// Backend base URL, ending in `/`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match self {
            Self::Token(config) => &config.base_url,
            Self::OAuth(config) => &config.base_url,
        }
    }

    /// Authentication mode.
    #[must_use]
    pub const fn auth_type(&self) -> AuthType {
        match self {
            Self::Token(_) => AuthType::Token,
            Self::OAuth(_) => AuthType::OAuth,
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigFlags {
    /// `--instance`
    pub instance: Option<String>,
    /// `--base-url`
    pub base_url: Option<String>,
    /// `--token`
    pub api_token: Option<String>,
    /// `--act-as`
    pub act_as: Option<String>,
}

/// The three configuration layers.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Command-line flags.
    pub flags: ConfigFlags,
    /// Variables from an env file.
    pub env_file: HashMap<String, String>,
    /// Process environment.
    pub process: HashMap<String, String>,
}

impl ConfigSources {
    /// Gather sources from flags, an optional env file and the current process environment.
    pub fn load(flags: ConfigFlags, env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let env_file = match env_file {
            Some(path) => read_env_file(path)?,
            None => HashMap::new(),
        };
        Ok(Self { flags, env_file, process: std::env::vars().collect() })
    }

    /// Look up a variable, env file first.
    fn var(&self, key: &str) -> Option<String> {
        non_empty(self.env_file.get(key)).or_else(|| non_empty(self.process.get(key)))
    }

    fn layers(&self) -> [Layer<'_>; 3] {
        [Layer::Flags(&self.flags), Layer::Env(&self.env_file), Layer::Env(&self.process)]
    }
}

/// Parse an env file without touching the process environment.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let env_error = |reason: String| ConfigError::EnvFile { path: path.to_path_buf(), reason };

    let iter = dotenv::from_path_iter(path).map_err(|e| env_error(e.to_string()))?;
    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| env_error(e.to_string()))?;
        vars.insert(key, value);
    }
    Ok(vars)
}

enum Layer<'a> {
    Flags(&'a ConfigFlags),
    Env(&'a HashMap<String, String>),
}

impl Layer<'_> {
    fn base_url(&self) -> Option<String> {
        match self {
            Self::Flags(flags) => non_empty(flags.base_url.as_ref()),
            Self::Env(vars) => non_empty(vars.get(env::BASE_URL)),
        }
    }

    fn instance(&self) -> Option<String> {
        match self {
            Self::Flags(flags) => non_empty(flags.instance.as_ref()),
            Self::Env(vars) => {
                non_empty(vars.get(env::INSTANCE)).or_else(|| non_empty(vars.get(env::SUBDOMAIN)))
            }
        }
    }

    fn api_token(&self) -> Option<String> {
        match self {
            Self::Flags(flags) => non_empty(flags.api_token.as_ref()),
            Self::Env(vars) => non_empty(vars.get(env::API_TOKEN)),
        }
    }

    fn act_as(&self) -> Option<String> {
        match self {
            Self::Flags(flags) => non_empty(flags.act_as.as_ref()),
            Self::Env(vars) => non_empty(vars.get(env::ACT_AS)),
        }
    }
}

/// Resolve the layered sources into one configuration.
///
/// The first layer that names a server (base URL or instance) decides it, and
/// within a layer a base URL wins over an instance. Each credential field is
/// taken from the highest layer that sets it. An API token selects
/// [`GleanConfig::Token`]; otherwise OAuth is used.
pub fn resolve(sources: &ConfigSources) -> Result<GleanConfig, ConfigError> {
    let layers = sources.layers();

    let base_url = layers
        .iter()
        .find_map(|layer| {
            layer
                .base_url()
                .map(|url| normalize_base_url(&url))
                .or_else(|| layer.instance().map(|instance| Ok(instance_base_url(&instance))))
        })
        .ok_or(ConfigError::MissingInstance)??;

    let api_token = layers.iter().find_map(Layer::api_token);
    let act_as = layers.iter().find_map(Layer::act_as);

    let config = match api_token {
        Some(api_token) => GleanConfig::Token(TokenConfig { base_url, api_token, act_as }),
        None => GleanConfig::OAuth(OAuthConfig {
            base_url,
            issuer: sources.var(env::OAUTH_ISSUER),
            client_id: sources.var(env::OAUTH_CLIENT_ID),
            client_secret: sources.var(env::OAUTH_CLIENT_SECRET),
        }),
    };

    tracing::debug!(auth_type = ?config.auth_type(), base_url = config.base_url(), "Resolved Glean config");
    Ok(config)
}

/// Backend URL for an instance name.
#[must_use]
pub fn instance_base_url(instance: &str) -> String {
    format!("https://{}-be.glean.com/", instance.trim())
}

/// Validate a base URL and make sure it ends in `/`.
pub fn normalize_base_url(value: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl { value: value.to_string(), reason };

    let mut url = url::Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url.to_string())
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}
