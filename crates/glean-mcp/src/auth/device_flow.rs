//! OAuth 2.0 Device Authorization Grant (RFC 8628) with optional PKCE.
//!
//! The flow runs two futures side by side:
//! - the polling loop against the token endpoint, bounded by a hard timeout
//! - a keypress observer that opens the browser if Enter arrives first
//!
//! A [`CancellationToken`] fired by the polling side decides both whether the
//! browser may still be opened and when the observer is torn down.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::interaction::Interaction;
use super::metadata::OAuthServerConfig;
use super::store::TokenStore;
use super::token::{TokenGrant, TokenResponse, TokenSet};
use crate::config::AuthType;
use crate::error::AuthError;

/// `grant_type` for device code polling.
pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Timing knobs for the device flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFlowSettings {
    /// Hard limit on polling, measured from the first poll.
    pub timeout: Duration,
    /// Lower bound on the polling interval.
    pub min_interval: Duration,
    /// Added to the interval on every `slow_down`.
    pub slow_down_increment: Duration,
    /// Used when the server sends no `interval`.
    pub default_interval: Duration,
}

impl Default for DeviceFlowSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10 * 60),
            min_interval: Duration::from_secs(1),
            slow_down_increment: Duration::from_secs(5),
            default_interval: Duration::from_secs(5),
        }
    }
}

impl DeviceFlowSettings {
    /// Millisecond timings for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            min_interval: Duration::from_millis(1),
            slow_down_increment: Duration::from_millis(20),
            default_interval: Duration::from_millis(10),
        }
    }
}

/// A pending device authorization, normalized from the server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAuthorizationSession {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: Option<u64>,
    pub interval: Duration,
}

#[derive(Deserialize)]
struct DeviceAuthorizationResponse {
    #[serde(default)]
    device_code: Option<String>,
    #[serde(default)]
    user_code: Option<String>,
    #[serde(default)]
    verification_uri: Option<String>,
    /// Pre-RFC spelling still sent by some servers.
    #[serde(default)]
    verification_url: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    interval: Option<u64>,
}

impl DeviceAuthorizationResponse {
    fn into_session(
        self,
        settings: &DeviceFlowSettings,
    ) -> Result<DeviceAuthorizationSession, AuthError> {
        let missing = |field: &str| AuthError::DeviceAuthorizationResponse {
            reason: format!("missing {field}"),
        };
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let device_code = non_empty(self.device_code).ok_or_else(|| missing("device_code"))?;
        let user_code = non_empty(self.user_code).ok_or_else(|| missing("user_code"))?;
        let verification_uri = non_empty(self.verification_uri)
            .or_else(|| non_empty(self.verification_url))
            .ok_or_else(|| missing("verification_uri"))?;
        let interval = self
            .interval
            .map_or(settings.default_interval, Duration::from_secs)
            .max(settings.min_interval);

        Ok(DeviceAuthorizationSession {
            device_code,
            user_code,
            verification_uri,
            expires_in: self.expires_in,
            interval,
        })
    }
}

/// Result of a single poll that did not end the flow.
#[derive(Debug)]
enum PollOutcome {
    Granted(TokenGrant),
    Pending,
    SlowDown,
}

/// Runs device authorizations.
#[derive(Clone)]
pub struct DeviceFlow {
    http: reqwest::Client,
    interaction: Arc<dyn Interaction>,
    settings: DeviceFlowSettings,
}

impl std::fmt::Debug for DeviceFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceFlow").field("settings", &self.settings).finish()
    }
}

impl DeviceFlow {
    /// Create a device flow runner.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        interaction: Arc<dyn Interaction>,
        settings: DeviceFlowSettings,
    ) -> Self {
        Self { http, interaction, settings }
    }

    /// Fail with `ERR_A_14` unless a person can answer the prompt.
    pub fn ensure_interactive(&self) -> Result<(), AuthError> {
        if self.interaction.is_interactive() {
            Ok(())
        } else {
            Err(AuthError::NotInteractive)
        }
    }

    /// Run the whole flow against `server` and persist the result.
    #[instrument(skip_all, fields(issuer = %server.issuer, client_id = %server.client_id))]
    pub async fn authorize(
        &self,
        server: &OAuthServerConfig,
        store: &dyn TokenStore,
    ) -> Result<TokenSet, AuthError> {
        self.ensure_interactive()?;
        if server.auth_type == AuthType::Token {
            return Err(AuthError::TokenAuthType);
        }

        debug!(state = "awaiting_device_code", "Device flow");
        let session = self.request_device_authorization(server).await?;

        debug!(state = "awaiting_user_action", expires_in = ?session.expires_in, "Device flow");
        self.interaction.show_device_code(&session);

        let grant = self.race_user_and_polling(server, &session).await?;

        if grant.refresh_token.is_none() {
            warn!("Authorization server issued no refresh token");
            return Err(AuthError::NoRefreshTokenIssued { client_id: server.client_id.clone() });
        }

        let tokens = TokenSet::from_grant(&grant, Utc::now());
        store.save(&tokens)?;
        info!(expires_at = ?tokens.expires_at, "Device authorization succeeded");
        Ok(tokens)
    }

    /// `POST device_authorization_endpoint`. Never sends the client secret.
    pub async fn request_device_authorization(
        &self,
        server: &OAuthServerConfig,
    ) -> Result<DeviceAuthorizationSession, AuthError> {
        let mut form = vec![("client_id", server.client_id.as_str())];
        if let Some(pkce) = &server.pkce {
            form.push(("code_challenge", pkce.challenge.as_str()));
            form.push(("code_challenge_method", pkce.method()));
        }

        let response = self
            .http
            .post(&server.device_authorization_endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::DeviceAuthorizationRequest { reason: e.to_string() })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::DeviceAuthorizationRequest { reason: e.to_string() })?;

        if !status.is_success() {
            return Err(AuthError::DeviceAuthorizationRequest {
                reason: format!("HTTP {}: {}", status.as_u16(), body.trim()),
            });
        }

        let response: DeviceAuthorizationResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::DeviceAuthorizationResponse { reason: e.to_string() })?;
        response.into_session(&self.settings)
    }

    /// Poll until granted while watching for Enter.
    async fn race_user_and_polling(
        &self,
        server: &OAuthServerConfig,
        session: &DeviceAuthorizationSession,
    ) -> Result<TokenGrant, AuthError> {
        let resolved = CancellationToken::new();

        let polling = async {
            debug!(state = "polling", interval = ?session.interval, "Device flow");
            let result =
                match tokio::time::timeout(self.settings.timeout, self.poll_until_granted(server, session))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(AuthError::Timeout(self.settings.timeout)),
                };
            resolved.cancel();
            match &result {
                Ok(_) => debug!(state = "succeeded", "Device flow"),
                Err(AuthError::Timeout(_)) => debug!(state = "timed_out", "Device flow"),
                Err(e) => debug!(state = "failed", code = e.code(), "Device flow"),
            }
            result
        };

        let keypress = async {
            tokio::select! {
                biased;
                () = resolved.cancelled() => {
                    debug!("Polling resolved before Enter; not opening the browser");
                }
                pressed = self.interaction.wait_for_enter() => {
                    if pressed && !resolved.is_cancelled() {
                        self.interaction.open_browser(&session.verification_uri);
                    }
                }
            }
        };

        let (result, ()) = tokio::join!(polling, keypress);
        result
    }

    async fn poll_until_granted(
        &self,
        server: &OAuthServerConfig,
        session: &DeviceAuthorizationSession,
    ) -> Result<TokenGrant, AuthError> {
        let mut interval = session.interval;
        let mut attempt: u32 = 0;

        loop {
            tokio::time::sleep(interval).await;
            attempt += 1;

            match self.poll_once(server, session).await? {
                PollOutcome::Granted(grant) => return Ok(grant),
                PollOutcome::Pending => {
                    debug!(attempt, "Authorization pending");
                }
                PollOutcome::SlowDown => {
                    interval += self.settings.slow_down_increment;
                    debug!(attempt, ?interval, "Server asked to slow down");
                }
            }
        }
    }

    async fn poll_once(
        &self,
        server: &OAuthServerConfig,
        session: &DeviceAuthorizationSession,
    ) -> Result<PollOutcome, AuthError> {
        let mut form = vec![
            ("grant_type", DEVICE_CODE_GRANT_TYPE),
            ("device_code", session.device_code.as_str()),
            ("client_id", server.client_id.as_str()),
        ];
        if let Some(secret) = &server.client_secret {
            form.push(("client_secret", secret.as_str()));
        }
        if let Some(pkce) = &server.pkce {
            form.push(("code_verifier", pkce.verifier.as_str()));
        }

        let response = self
            .http
            .post(&server.token_endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::PollingRequest { reason: e.to_string() })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::PollingRequest { reason: e.to_string() })?;

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::PollingRequest { reason: format!("HTTP {}: {e}", status.as_u16()) }
        })?;

        match parsed.into_result() {
            Some(Ok(grant)) => Ok(PollOutcome::Granted(grant)),
            Some(Err(body)) => match body.error.as_str() {
                "authorization_pending" => Ok(PollOutcome::Pending),
                "slow_down" => Ok(PollOutcome::SlowDown),
                _ => Err(AuthError::polling_rejected(body.error, body.description.as_deref())),
            },
            None => Err(AuthError::PollingRequest {
                reason: format!(
                    "HTTP {}: response has neither access_token nor error",
                    status.as_u16()
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: serde_json::Value) -> DeviceAuthorizationResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_session_prefers_verification_uri() {
        let session = response(serde_json::json!({
            "device_code": "dc",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://auth.example.com/device",
            "verification_url": "https://auth.example.com/legacy",
            "interval": 7
        }))
        .into_session(&DeviceFlowSettings::default())
        .unwrap();

        assert_eq!(session.verification_uri, "https://auth.example.com/device");
        assert_eq!(session.interval, Duration::from_secs(7));
    }

    #[test]
    fn test_session_accepts_verification_url() {
        let session = response(serde_json::json!({
            "device_code": "dc",
            "user_code": "ABCD-EFGH",
            "verification_url": "https://auth.example.com/legacy"
        }))
        .into_session(&DeviceFlowSettings::default())
        .unwrap();

        assert_eq!(session.verification_uri, "https://auth.example.com/legacy");
        assert_eq!(session.interval, Duration::from_secs(5));
        assert_eq!(session.expires_in, None);
    }

    #[test]
    fn test_session_missing_fields() {
        let settings = DeviceFlowSettings::default();

        let err = response(serde_json::json!({"device_code": "dc", "user_code": "u"}))
            .into_session(&settings)
            .unwrap_err();
        assert_eq!(err.code(), "ERR_A_10");
        assert!(err.to_string().contains("verification_uri"));

        let err = response(serde_json::json!({"user_code": "u", "verification_uri": "v"}))
            .into_session(&settings)
            .unwrap_err();
        assert!(err.to_string().contains("device_code"));
    }

    #[test]
    fn test_interval_respects_minimum() {
        let settings = DeviceFlowSettings::default();
        let session = response(serde_json::json!({
            "device_code": "dc",
            "user_code": "u",
            "verification_uri": "v",
            "interval": 0
        }))
        .into_session(&settings)
        .unwrap();
        assert_eq!(session.interval, settings.min_interval);
    }

    #[test]
    fn test_default_settings() {
        let settings = DeviceFlowSettings::default();
        assert_eq!(settings.timeout, Duration::from_secs(600));
        assert_eq!(settings.slow_down_increment, Duration::from_secs(5));
    }
}
