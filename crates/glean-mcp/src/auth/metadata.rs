//! OAuth metadata discovery.
//!
//! Implements the two lookups needed before a device flow can start:
//! - RFC 9728: `/.well-known/oauth-protected-resource` on the Glean backend,
//!   which names the issuer and the device-flow client id
//! - RFC 8414 / OpenID Discovery: the issuer's `openid-configuration`, falling
//!   back to `oauth-authorization-server`
//!
//! Both responses are normalized into canonical structs right after the HTTP
//! call. Resolved configs are cached in `oauth.json` (see [`MetadataCache`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::pkce::{Pkce, S256};
use super::store::MetadataCache;
use crate::config::{AuthType, OAuthConfig};
use crate::error::AuthError;

const PROTECTED_RESOURCE_PATH: &str = "/.well-known/oauth-protected-resource";
const OPENID_CONFIGURATION: &str = ".well-known/openid-configuration";
const OAUTH_AUTHORIZATION_SERVER: &str = ".well-known/oauth-authorization-server";

/// Everything needed to run the device flow and refresh tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthServerConfig {
    pub base_url: String,
    pub issuer: String,
    pub client_id: String,
    /// Sent to the token endpoint only. Never cached.
    #[serde(skip)]
    pub client_secret: Option<String>,
    pub device_authorization_endpoint: String,
    pub token_endpoint: String,
    pub auth_type: AuthType,
    /// `code_challenge_methods_supported` advertised by the issuer.
    #[serde(default)]
    pub code_challenge_methods: Vec<String>,
    /// Per-flow PKCE pair. Never cached.
    #[serde(skip)]
    pub pkce: Option<Pkce>,
}

impl OAuthServerConfig {
    /// True if the issuer advertises S256 challenges.
    #[must_use]
    pub fn supports_pkce(&self) -> bool {
        self.code_challenge_methods.iter().any(|m| m == S256)
    }

    /// Attach a fresh PKCE pair when the issuer supports it.
    #[must_use]
    pub fn with_fresh_pkce(mut self) -> Self {
        self.pkce = self.supports_pkce().then(Pkce::generate);
        self
    }
}

impl std::fmt::Debug for OAuthServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthServerConfig")
            .field("issuer", &self.issuer)
            .field("client_id", &self.client_id)
            .field("has_client_secret", &self.client_secret.is_some())
            .field("device_authorization_endpoint", &self.device_authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("auth_type", &self.auth_type)
            .field("pkce", &self.pkce.is_some())
            .finish()
    }
}

/// Result of protected resource discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedResource {
    pub issuer: String,
    pub client_id: String,
}

/// Result of authorization server discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationServer {
    pub device_authorization_endpoint: String,
    pub token_endpoint: String,
    pub code_challenge_methods: Vec<String>,
}

#[derive(Deserialize)]
struct ProtectedResourceDocument {
    #[serde(default)]
    authorization_servers: Option<Vec<String>>,
    #[serde(default)]
    glean_device_flow_client_id: Option<String>,
}

#[derive(Deserialize)]
struct AuthorizationServerDocument {
    #[serde(default)]
    device_authorization_endpoint: Option<String>,
    #[serde(default)]
    token_endpoint: Option<String>,
    #[serde(default)]
    code_challenge_methods_supported: Vec<String>,
}

/// Discovers and caches OAuth server metadata.
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    http: reqwest::Client,
    cache: MetadataCache,
}

impl MetadataResolver {
    /// Create a resolver.
    #[must_use]
    pub fn new(http: reqwest::Client, cache: MetadataCache) -> Self {
        Self { http, cache }
    }

    /// `GET <origin>/.well-known/oauth-protected-resource`.
    ///
    /// The first entry of `authorization_servers` is the issuer.
    pub async fn fetch_protected_resource_metadata(
        &self,
        base_url: &str,
    ) -> Result<ProtectedResource, AuthError> {
        let url = url::Url::parse(base_url)
            .and_then(|base| base.join(PROTECTED_RESOURCE_PATH))
            .map_err(|e| AuthError::ProtectedResourceFetch {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?
            .to_string();

        debug!(%url, "Fetching protected resource metadata");
        let body = self
            .get_document(&url)
            .await
            .map_err(|reason| AuthError::ProtectedResourceFetch { url: url.clone(), reason })?;

        let document: ProtectedResourceDocument = serde_json::from_str(&body).map_err(|e| {
            AuthError::ProtectedResourceParse { url: url.clone(), reason: e.to_string() }
        })?;

        let issuer = document
            .authorization_servers
            .and_then(|servers| servers.into_iter().next())
            .filter(|issuer| !issuer.trim().is_empty())
            .ok_or_else(|| AuthError::MissingAuthorizationServers { url: url.clone() })?;
        let client_id = document
            .glean_device_flow_client_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(AuthError::MissingDeviceFlowClientId { url })?;

        Ok(ProtectedResource { issuer, client_id })
    }

    /// Discover the issuer's device authorization and token endpoints.
    ///
    /// `openid-configuration` is tried first. Only a transport failure or a
    /// non-2xx status falls back to `oauth-authorization-server`; a reachable
    /// primary with a bad body fails immediately.
    pub async fn fetch_authorization_server_metadata(
        &self,
        issuer: &str,
    ) -> Result<AuthorizationServer, AuthError> {
        let primary = well_known(issuer, OPENID_CONFIGURATION);
        let primary_reason = match self.get_document(&primary).await {
            Ok(body) => return parse_authorization_server(&primary, &body),
            Err(reason) => reason,
        };
        debug!(url = %primary, reason = %primary_reason, "Falling back to oauth-authorization-server");

        let fallback = well_known(issuer, OAUTH_AUTHORIZATION_SERVER);
        match self.get_document(&fallback).await {
            Ok(body) => parse_authorization_server(&fallback, &body),
            Err(reason) => Err(AuthError::AuthorizationServerFetch {
                issuer: issuer.to_string(),
                reason: format!("{primary}: {primary_reason}; {fallback}: {reason}"),
            }),
        }
    }

    /// Resolve the full server config for an OAuth setup.
    ///
    /// Protected resource discovery is skipped when both issuer and client id
    /// are configured. Authorization server metadata comes from the cache when
    /// it is fresh for the same issuer and client.
    pub async fn resolve(&self, config: &OAuthConfig) -> Result<OAuthServerConfig, AuthError> {
        self.resolve_at(config, Utc::now()).await
    }

    pub(crate) async fn resolve_at(
        &self,
        config: &OAuthConfig,
        now: DateTime<Utc>,
    ) -> Result<OAuthServerConfig, AuthError> {
        let (issuer, client_id) = match (&config.issuer, &config.client_id) {
            (Some(issuer), Some(client_id)) => (issuer.clone(), client_id.clone()),
            _ => {
                let resource = self.fetch_protected_resource_metadata(&config.base_url).await?;
                (
                    config.issuer.clone().unwrap_or(resource.issuer),
                    config.client_id.clone().unwrap_or(resource.client_id),
                )
            }
        };

        if let Some(mut cached) = self.cache.load_fresh(&issuer, &client_id, now) {
            debug!(%issuer, "Using cached authorization server metadata");
            cached.base_url.clone_from(&config.base_url);
            cached.client_secret.clone_from(&config.client_secret);
            return Ok(cached);
        }

        let server = self.fetch_authorization_server_metadata(&issuer).await?;
        info!(%issuer, %client_id, "Resolved OAuth server metadata");

        let resolved = OAuthServerConfig {
            base_url: config.base_url.clone(),
            issuer,
            client_id,
            client_secret: config.client_secret.clone(),
            device_authorization_endpoint: server.device_authorization_endpoint,
            token_endpoint: server.token_endpoint,
            auth_type: AuthType::OAuth,
            code_challenge_methods: server.code_challenge_methods,
            pkce: None,
        };

        if let Err(e) = self.cache.save(&resolved, now) {
            warn!(error = %e, "Unable to cache OAuth server metadata");
        }
        Ok(resolved)
    }

    /// GET a document. `Err` carries a reason for transport failures and non-2xx statuses.
    async fn get_document(&self, url: &str) -> Result<String, String> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }
        response.text().await.map_err(|e| e.to_string())
    }
}

fn well_known(issuer: &str, document: &str) -> String {
    format!("{}/{document}", issuer.trim_end_matches('/'))
}

fn parse_authorization_server(url: &str, body: &str) -> Result<AuthorizationServer, AuthError> {
    let document: AuthorizationServerDocument = serde_json::from_str(body).map_err(|e| {
        AuthError::AuthorizationServerParse { url: url.to_string(), reason: e.to_string() }
    })?;

    let device_authorization_endpoint = document
        .device_authorization_endpoint
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AuthError::MissingDeviceAuthorizationEndpoint { url: url.to_string() })?;
    let token_endpoint = document
        .token_endpoint
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AuthError::MissingTokenEndpoint { url: url.to_string() })?;

    Ok(AuthorizationServer {
        device_authorization_endpoint,
        token_endpoint,
        code_challenge_methods: document.code_challenge_methods_supported,
    })
}
