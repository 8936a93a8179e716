//! Error types for the Glean MCP server.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.
//! Authentication errors carry a stable `ERR_A_NN` code that downstream tooling
//! and test fixtures match on; see [`AuthError::code`].

use std::path::PathBuf;
use std::time::Duration;

/// Remediation hint appended to metadata discovery failures.
const ADMIN_HINT: &str = "Contact your Glean administrator to verify OAuth is configured for this instance";

/// Errors from the authentication subsystem.
///
/// Every variant renders as a single line prefixed with its code, so the CLI can
/// print it verbatim.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("ERR_A_01: Unable to fetch protected resource metadata from {url}: {reason}. {hint}", hint = ADMIN_HINT)]
    ProtectedResourceFetch { url: String, reason: String },

    #[error("ERR_A_02: Protected resource metadata from {url} is not valid JSON: {reason}. {hint}", hint = ADMIN_HINT)]
    ProtectedResourceParse { url: String, reason: String },

    #[error("ERR_A_03: Protected resource metadata from {url} lists no authorization_servers. {hint}", hint = ADMIN_HINT)]
    MissingAuthorizationServers { url: String },

    #[error("ERR_A_04: Protected resource metadata from {url} has no glean_device_flow_client_id. {hint}", hint = ADMIN_HINT)]
    MissingDeviceFlowClientId { url: String },

    #[error("ERR_A_05: Unable to fetch authorization server metadata for {issuer}: {reason}. {hint}", hint = ADMIN_HINT)]
    AuthorizationServerFetch { issuer: String, reason: String },

    #[error("ERR_A_06: Authorization server metadata from {url} is not valid JSON: {reason}. {hint}", hint = ADMIN_HINT)]
    AuthorizationServerParse { url: String, reason: String },

    #[error("ERR_A_07: Authorization server metadata from {url} has no device_authorization_endpoint. {hint}", hint = ADMIN_HINT)]
    MissingDeviceAuthorizationEndpoint { url: String },

    #[error("ERR_A_08: Authorization server metadata from {url} has no token_endpoint. {hint}", hint = ADMIN_HINT)]
    MissingTokenEndpoint { url: String },

    #[error("ERR_A_09: Device authorization request failed: {reason}")]
    DeviceAuthorizationRequest { reason: String },

    #[error("ERR_A_10: Unexpected device authorization response: {reason}")]
    DeviceAuthorizationResponse { reason: String },

    #[error("ERR_A_11: Token polling request failed: {reason}")]
    PollingRequest { reason: String },

    #[error("ERR_A_12: Authorization was not granted: {detail}")]
    PollingRejected { error: String, detail: String },

    #[error(
        "ERR_A_13: The authorization server issued no refresh token for client {client_id}. \
         Ask your Glean administrator to enable refresh tokens for this OAuth client"
    )]
    NoRefreshTokenIssued { client_id: String },

    #[error("ERR_A_14: Device authorization requires an interactive terminal. Run `glean-mcp auth` from a terminal")]
    NotInteractive,

    #[error("ERR_A_15: No saved Glean tokens. Run `glean-mcp auth` to sign in")]
    NotAuthorized,

    #[error("ERR_A_16: Saved Glean tokens have expired and cannot be refreshed. Run `glean-mcp auth` to sign in again")]
    NoRefreshToken,

    #[error(
        "ERR_A_17: OAuth refresh and device authorization are unavailable because an API token is configured. \
         Unset GLEAN_API_TOKEN to use OAuth"
    )]
    TokenAuthType,

    #[error("ERR_A_18: Token refresh failed: {detail}")]
    RefreshFailed { error: Option<String>, detail: String },

    #[error("ERR_A_19: Timed out after {} seconds waiting for device authorization", .0.as_secs())]
    Timeout(Duration),

    #[error("ERR_A_20: {0}")]
    Config(#[from] ConfigError),

    #[error("ERR_A_21: Unable to save tokens to {path}: {reason}")]
    Store { path: PathBuf, reason: String },
}

impl AuthError {
    /// Stable machine-checkable code for this failure.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ProtectedResourceFetch { .. } => "ERR_A_01",
            Self::ProtectedResourceParse { .. } => "ERR_A_02",
            Self::MissingAuthorizationServers { .. } => "ERR_A_03",
            Self::MissingDeviceFlowClientId { .. } => "ERR_A_04",
            Self::AuthorizationServerFetch { .. } => "ERR_A_05",
            Self::AuthorizationServerParse { .. } => "ERR_A_06",
            Self::MissingDeviceAuthorizationEndpoint { .. } => "ERR_A_07",
            Self::MissingTokenEndpoint { .. } => "ERR_A_08",
            Self::DeviceAuthorizationRequest { .. } => "ERR_A_09",
            Self::DeviceAuthorizationResponse { .. } => "ERR_A_10",
            Self::PollingRequest { .. } => "ERR_A_11",
            Self::PollingRejected { .. } => "ERR_A_12",
            Self::NoRefreshTokenIssued { .. } => "ERR_A_13",
            Self::NotInteractive => "ERR_A_14",
            Self::NotAuthorized => "ERR_A_15",
            Self::NoRefreshToken => "ERR_A_16",
            Self::TokenAuthType => "ERR_A_17",
            Self::RefreshFailed { .. } => "ERR_A_18",
            Self::Timeout(_) => "ERR_A_19",
            Self::Config(_) => "ERR_A_20",
            Self::Store { .. } => "ERR_A_21",
        }
    }

    /// Build a rejection from an OAuth error body, keeping the server's description verbatim.
    #[must_use]
    pub fn polling_rejected(error: impl Into<String>, description: Option<&str>) -> Self {
        let error = error.into();
        let detail = oauth_detail(&error, description);
        Self::PollingRejected { error, detail }
    }

    /// Build a refresh failure from an OAuth error body.
    #[must_use]
    pub fn refresh_rejected(error: impl Into<String>, description: Option<&str>) -> Self {
        let error = error.into();
        let detail = oauth_detail(&error, description);
        Self::RefreshFailed { error: Some(error), detail }
    }

    /// Build a refresh failure that carries no OAuth error code (transport, bad body).
    #[must_use]
    pub fn refresh_failed(reason: impl Into<String>) -> Self {
        Self::RefreshFailed { error: None, detail: reason.into() }
    }
}

fn oauth_detail(error: &str, description: Option<&str>) -> String {
    match description {
        Some(description) if !description.is_empty() => format!("{error}: {description}"),
        _ => error.to_string(),
    }
}

/// Errors resolving the Glean connection settings.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Neither an instance name nor a base URL was provided.
    #[error("Glean instance is not configured. Set GLEAN_INSTANCE or GLEAN_BASE_URL")]
    MissingInstance,

    /// A base URL that does not parse as an absolute http(s) URL.
    #[error("Invalid Glean base URL '{value}': {reason}")]
    InvalidBaseUrl {
        /// Offending value
        value: String,
        /// Parse failure
        reason: String,
    },

    /// The env file exists but could not be read.
    #[error("Unable to read env file {}: {reason}", .path.display())]
    EnvFile {
        /// Env file path
        path: PathBuf,
        /// Read or parse failure
        reason: String,
    },

    /// No home directory to anchor per-user state.
    #[error("Unable to determine the home directory for per-user state")]
    NoHomeDir,
}

/// Errors writing MCP host configuration files.
#[derive(thiserror::Error, Debug)]
pub enum ConfigureError {
    /// Existing host config could not be parsed; it is left untouched.
    #[error("Existing config at {} is not valid {format}: {reason}", .path.display())]
    InvalidExisting {
        /// Config file path
        path: PathBuf,
        /// `JSON` or `YAML`
        format: &'static str,
        /// Parser message
        reason: String,
    },

    /// Filesystem failure.
    #[error("Unable to update {}: {source}", .path.display())]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Serialization failure writing the merged document.
    #[error("Unable to serialize config for {}: {reason}", .path.display())]
    Serialize {
        /// Config file path
        path: PathBuf,
        /// Serializer message
        reason: String,
    },

    /// The instance preflight check failed.
    #[error("Glean instance at {url} did not respond to the liveness check: {reason}")]
    Preflight {
        /// URL probed
        url: String,
        /// Failure detail
        reason: String,
    },

    /// Settings could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors from the Glean REST API.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// Connection, DNS or TLS failure after retries.
    #[error("Unable to reach Glean: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    /// Request could not be built or the body could not be read.
    #[error("Glean request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// 429
    #[error("Glean is rate limiting requests; retry after {} seconds", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// 401 or 403
    #[error("Glean rejected the credentials (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// 404
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Any other 4xx.
    #[error("Glean rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// 5xx and anything unexpected.
    #[error("Glean returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// Response body was not the JSON we expected.
    #[error("Unexpected Glean response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ClientError {
    /// Classify a non-2xx response. `retry_after` is the `Retry-After` header in seconds.
    #[must_use]
    pub fn from_status(status: u16, message: String, retry_after: Option<u64>) -> Self {
        match status {
            429 => Self::RateLimited { retry_after: Duration::from_secs(retry_after.unwrap_or(60)) },
            401 | 403 => Self::Unauthorized { status, message },
            404 => Self::NotFound { message },
            400..=499 => Self::Rejected { status, message },
            _ => Self::Server { status, message },
        }
    }
}

/// Errors from MCP tool execution.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    /// Error from the API client
    #[error("API error: {0}")]
    Client(#[from] ClientError),

    /// No usable credentials
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Input validation failed
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Convert to a user-friendly error message for MCP response.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::Client(ClientError::RateLimited { retry_after }) => {
                format!("Rate limited by Glean. Please wait {} seconds before retrying.", retry_after.as_secs())
            }
            Self::Client(ClientError::Unauthorized { .. }) => {
                "Glean rejected the credentials. Run `glean-mcp auth` or check GLEAN_API_TOKEN."
                    .to_string()
            }
            Self::Client(ClientError::NotFound { .. }) => {
                "Glean could not find that. Check the document id or URL.".to_string()
            }
            Self::Validation { field, message } => {
                format!("Invalid input for '{field}': {message}")
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display_starts_with_code() {
        let errors = [
            AuthError::NotInteractive,
            AuthError::NotAuthorized,
            AuthError::NoRefreshToken,
            AuthError::TokenAuthType,
            AuthError::Timeout(Duration::from_secs(600)),
            AuthError::NoRefreshTokenIssued { client_id: "client-123".into() },
            AuthError::Config(ConfigError::MissingInstance),
        ];
        for err in errors {
            assert!(err.to_string().starts_with(err.code()), "{err}");
        }
    }

    #[test]
    fn test_auth_error_codes_are_distinct() {
        let codes = [
            AuthError::NotAuthorized.code(),
            AuthError::NoRefreshToken.code(),
            AuthError::TokenAuthType.code(),
            AuthError::NotInteractive.code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn test_polling_rejected_keeps_description() {
        let err = AuthError::polling_rejected("expired_token", Some("The device code has expired"));
        assert_eq!(err.code(), "ERR_A_12");
        assert!(err.to_string().contains("expired_token: The device code has expired"));

        let err = AuthError::polling_rejected("access_denied", None);
        assert!(err.to_string().ends_with("access_denied"));
    }

    #[test]
    fn test_refresh_rejected_keeps_description() {
        let err = AuthError::refresh_rejected("invalid_grant", Some("Refresh token revoked"));
        assert_eq!(err.code(), "ERR_A_18");
        assert!(err.to_string().contains("invalid_grant: Refresh token revoked"));
    }

    #[test]
    fn test_no_refresh_token_issued_names_client() {
        let err = AuthError::NoRefreshTokenIssued { client_id: "client-123".into() };
        assert!(err.to_string().contains("client-123"));
    }

    #[test]
    fn test_metadata_errors_carry_admin_hint() {
        let err = AuthError::MissingAuthorizationServers { url: "https://x".into() };
        assert!(err.to_string().contains("administrator"));
    }

    #[test]
    fn test_client_error_from_status() {
        assert!(matches!(
            ClientError::from_status(429, String::new(), Some(7)),
            ClientError::RateLimited { retry_after } if retry_after == Duration::from_secs(7)
        ));
        assert!(matches!(
            ClientError::from_status(429, String::new(), None),
            ClientError::RateLimited { retry_after } if retry_after == Duration::from_secs(60)
        ));
        assert!(matches!(ClientError::from_status(403, "no".into(), None), ClientError::Unauthorized { status: 403, .. }));
        assert!(matches!(ClientError::from_status(404, "doc".into(), None), ClientError::NotFound { .. }));
        assert!(matches!(ClientError::from_status(422, "bad".into(), None), ClientError::Rejected { status: 422, .. }));
        assert!(matches!(ClientError::from_status(502, "gw".into(), None), ClientError::Server { status: 502, .. }));
    }

    #[test]
    fn test_rate_limit_user_message() {
        let err = ToolError::from(ClientError::from_status(429, String::new(), Some(30)));
        assert_eq!(err.to_user_message(), "Rate limited by Glean. Please wait 30 seconds before retrying.");
    }

    #[test]
    fn test_tool_error_user_message() {
        let err = ToolError::validation("query", "cannot be empty");
        assert!(err.to_user_message().contains("query"));
        assert!(err.to_user_message().contains("cannot be empty"));
    }
}
