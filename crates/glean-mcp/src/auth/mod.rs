//! Glean authentication.
//!
//! [`GleanAuth`] is the single entry point used by the CLI and the tools:
//! - `force_authorize` runs the OAuth device flow and saves tokens
//! - `force_refresh_tokens` trades the saved refresh token for a new access token
//! - `ensure_auth_token_presence` is the guard run before each authenticated call
//! - `authorization` yields the headers a Glean API request needs
//!
//! API-token configurations bypass OAuth entirely.

pub mod device_flow;
pub mod interaction;
pub mod metadata;
pub mod pkce;
pub mod refresh;
pub mod store;
pub mod token;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};

pub use device_flow::{DeviceAuthorizationSession, DeviceFlow, DeviceFlowSettings};
pub use interaction::{Interaction, TerminalInteraction};
pub use metadata::{AuthorizationServer, MetadataResolver, OAuthServerConfig, ProtectedResource};
pub use pkce::Pkce;
pub use refresh::{TokenRefresher, TokenState, check_tokens};
pub use store::{FileTokenStore, MetadataCache, StateDir, TokenStore};
pub use token::TokenSet;

use crate::config::{AuthType, ClientConfig, GleanConfig, OAuthConfig};
use crate::error::AuthError;

/// Header naming the credential kind for OAuth bearer tokens.
pub const AUTH_TYPE_HEADER: &str = "X-Glean-Auth-Type";

/// Header carrying the impersonated user for API tokens.
pub const ACT_AS_HEADER: &str = "X-Glean-ActAs";

/// Credentials for one Glean API request.
#[derive(Clone, PartialEq, Eq)]
pub struct Authorization {
    pub bearer: String,
    pub auth_type: AuthType,
    pub act_as: Option<String>,
}

impl Authorization {
    /// Request headers as name/value pairs.
    #[must_use]
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("Authorization", format!("Bearer {}", self.bearer))];
        match self.auth_type {
            AuthType::OAuth => headers.push((AUTH_TYPE_HEADER, "OAUTH".to_string())),
            AuthType::Token => {
                if let Some(act_as) = &self.act_as {
                    headers.push((ACT_AS_HEADER, act_as.clone()));
                }
            }
        }
        headers
    }
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorization")
            .field("auth_type", &self.auth_type)
            .field("act_as", &self.act_as)
            .finish()
    }
}

/// Build the plain HTTP client used for OAuth endpoints.
///
/// OAuth calls are never retried by middleware; the device flow has its own
/// polling rules.
pub fn auth_http_client(config: &ClientConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(concat!("glean-mcp/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Authentication context shared by the CLI and the MCP server.
#[derive(Clone)]
pub struct GleanAuth {
    config: GleanConfig,
    store: Arc<dyn TokenStore>,
    resolver: MetadataResolver,
    device_flow: DeviceFlow,
    refresher: TokenRefresher,
}

impl std::fmt::Debug for GleanAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GleanAuth")
            .field("config", &self.config)
            .field("device_flow", &self.device_flow)
            .finish()
    }
}

impl GleanAuth {
    /// Wire up auth for `config`, keeping state in `state`.
    #[must_use]
    pub fn new(
        config: GleanConfig,
        http: reqwest::Client,
        state: &StateDir,
        interaction: Arc<dyn Interaction>,
        settings: DeviceFlowSettings,
    ) -> Self {
        Self {
            config,
            store: Arc::new(FileTokenStore::new(state)),
            resolver: MetadataResolver::new(http.clone(), MetadataCache::new(state)),
            device_flow: DeviceFlow::new(http.clone(), interaction, settings),
            refresher: TokenRefresher::new(http),
        }
    }

    /// Replace the token store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = store;
        self
    }

    /// Resolved Glean settings.
    #[must_use]
    pub fn config(&self) -> &GleanConfig {
        &self.config
    }

    /// Saved tokens, if any.
    #[must_use]
    pub fn saved_tokens(&self) -> Option<TokenSet> {
        self.store.load()
    }

    fn oauth_config(&self) -> Result<&OAuthConfig, AuthError> {
        match &self.config {
            GleanConfig::OAuth(oauth) => Ok(oauth),
            GleanConfig::Token(_) => Err(AuthError::TokenAuthType),
        }
    }

    /// Discover the OAuth server for the configured instance.
    pub async fn resolve_server(&self) -> Result<OAuthServerConfig, AuthError> {
        let oauth = self.oauth_config()?;
        self.resolver.resolve(oauth).await
    }

    /// Run the device flow, optionally against an already resolved server.
    #[instrument(skip_all)]
    pub async fn force_authorize(
        &self,
        server: Option<OAuthServerConfig>,
    ) -> Result<TokenSet, AuthError> {
        self.device_flow.ensure_interactive()?;

        let server = match server {
            Some(server) => server,
            None => self.resolve_server().await?,
        };
        let server = if server.pkce.is_some() { server } else { server.with_fresh_pkce() };
        debug!(pkce = server.pkce.is_some(), "Starting device authorization");

        self.device_flow.authorize(&server, self.store.as_ref()).await
    }

    /// Refresh the saved tokens unconditionally.
    #[instrument(skip_all)]
    pub async fn force_refresh_tokens(&self) -> Result<TokenSet, AuthError> {
        let oauth = self.oauth_config()?;
        let tokens = self.store.load().ok_or(AuthError::NotAuthorized)?;
        if tokens.refresh_token.is_none() {
            return Err(AuthError::NoRefreshToken);
        }
        let server = self.resolver.resolve(oauth).await?;
        self.refresher.refresh(&server, &tokens, self.store.as_ref()).await
    }

    /// Make sure a usable access token is saved, refreshing if expired.
    ///
    /// `Ok(false)` means nothing is saved and the user has to sign in.
    #[instrument(skip_all)]
    pub async fn ensure_auth_token_presence(&self) -> Result<bool, AuthError> {
        match check_tokens(self.store.as_ref(), Utc::now())? {
            TokenState::Missing => Ok(false),
            TokenState::Valid(_) => Ok(true),
            TokenState::NeedsRefresh(tokens) => {
                let server = self.resolve_server().await?;
                self.refresher.refresh(&server, &tokens, self.store.as_ref()).await?;
                Ok(true)
            }
        }
    }

    /// Credentials for the next Glean API request.
    pub async fn authorization(&self) -> Result<Authorization, AuthError> {
        if let GleanConfig::Token(token) = &self.config {
            return Ok(Authorization {
                bearer: token.api_token.clone(),
                auth_type: AuthType::Token,
                act_as: token.act_as.clone(),
            });
        }

        if !self.ensure_auth_token_presence().await? {
            return Err(AuthError::NotAuthorized);
        }
        let tokens = self.store.load().ok_or(AuthError::NotAuthorized)?;
        Ok(Authorization { bearer: tokens.access_token, auth_type: AuthType::OAuth, act_as: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_headers() {
        let auth = Authorization {
            bearer: "tok".into(),
            auth_type: AuthType::OAuth,
            act_as: Some("ignored@example.com".into()),
        };
        assert_eq!(
            auth.headers(),
            vec![
                ("Authorization", "Bearer tok".to_string()),
                (AUTH_TYPE_HEADER, "OAUTH".to_string()),
            ]
        );
    }

    #[test]
    fn test_token_headers_with_act_as() {
        let auth = Authorization {
            bearer: "tok".into(),
            auth_type: AuthType::Token,
            act_as: Some("alice@example.com".into()),
        };
        assert_eq!(
            auth.headers(),
            vec![
                ("Authorization", "Bearer tok".to_string()),
                (ACT_AS_HEADER, "alice@example.com".to_string()),
            ]
        );
    }

    #[test]
    fn test_debug_hides_bearer() {
        let auth = Authorization { bearer: "secret".into(), auth_type: AuthType::Token, act_as: None };
        assert!(!format!("{auth:?}").contains("secret"));
    }
}
