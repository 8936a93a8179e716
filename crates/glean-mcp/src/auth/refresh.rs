//! Token refresh and the validity guard run before each authenticated call.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use super::metadata::OAuthServerConfig;
use super::store::TokenStore;
use super::token::{TokenResponse, TokenSet};
use crate::config::AuthType;
use crate::error::AuthError;

/// What the saved tokens allow without touching the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    /// Nothing saved.
    Missing,
    /// Usable as-is.
    Valid(TokenSet),
    /// Expired, with a refresh token to trade in.
    NeedsRefresh(TokenSet),
}

/// Classify saved tokens at `now`.
///
/// Expired tokens without a refresh token are `ERR_A_16`.
pub fn check_tokens(store: &dyn TokenStore, now: DateTime<Utc>) -> Result<TokenState, AuthError> {
    let Some(tokens) = store.load() else {
        return Ok(TokenState::Missing);
    };
    if !tokens.is_expired_at(now) {
        return Ok(TokenState::Valid(tokens));
    }
    if tokens.refresh_token.is_none() {
        return Err(AuthError::NoRefreshToken);
    }
    debug!(expired_at = ?tokens.expires_at, "Access token expired");
    Ok(TokenState::NeedsRefresh(tokens))
}

/// Trades refresh tokens for new access tokens.
#[derive(Debug, Clone)]
pub struct TokenRefresher {
    http: reqwest::Client,
}

impl TokenRefresher {
    /// Create a refresher.
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Refresh `tokens` against `server` and persist the result.
    ///
    /// The old refresh token is kept when the server does not rotate it.
    #[instrument(skip_all, fields(issuer = %server.issuer))]
    pub async fn refresh(
        &self,
        server: &OAuthServerConfig,
        tokens: &TokenSet,
        store: &dyn TokenStore,
    ) -> Result<TokenSet, AuthError> {
        if server.auth_type == AuthType::Token {
            return Err(AuthError::TokenAuthType);
        }
        let refresh_token = tokens.refresh_token.as_deref().ok_or(AuthError::NoRefreshToken)?;

        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", server.client_id.as_str()),
        ];
        if let Some(secret) = &server.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http
            .post(&server.token_endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::refresh_failed(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AuthError::refresh_failed(e.to_string()))?;
        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::refresh_failed(format!("HTTP {}: {e}", status.as_u16())))?;

        let grant = match parsed.into_result() {
            Some(Ok(grant)) if status.is_success() => grant,
            Some(Err(body)) => {
                return Err(AuthError::refresh_rejected(body.error, body.description.as_deref()));
            }
            _ => {
                return Err(AuthError::refresh_failed(format!(
                    "HTTP {}: response has no access_token",
                    status.as_u16()
                )));
            }
        };

        let mut refreshed = TokenSet::from_grant(&grant, Utc::now());
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = tokens.refresh_token.clone();
        }
        store.save(&refreshed)?;
        info!(expires_at = ?refreshed.expires_at, "Refreshed access token");
        Ok(refreshed)
    }
}
