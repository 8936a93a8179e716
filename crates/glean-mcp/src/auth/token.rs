//! OAuth token set and token-endpoint response shapes.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Tokens persisted between runs.
///
/// `expires_at` is kept at millisecond precision so a save/load cycle is lossless.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    /// Bearer credential.
    pub access_token: String,

    /// Credential used to obtain a new access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Access token expiry. `None` means the token does not expire.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "iso_millis")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSet {
    /// Create a token set with an absolute expiry.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_at.map(|at| at.trunc_subsecs(3)),
        }
    }

    /// Build a token set from a token-endpoint response received at `now`.
    ///
    /// An `expires_in` too large to represent is treated as no expiry.
    #[must_use]
    pub fn from_grant(grant: &TokenGrant, now: DateTime<Utc>) -> Self {
        let expires_at = grant
            .expires_in
            .and_then(|secs| TimeDelta::try_seconds(secs).and_then(|d| now.checked_add_signed(d)));
        Self::new(grant.access_token.clone(), grant.refresh_token.clone(), expires_at)
    }

    /// True if `expires_at` is set and not after `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// True if the access token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Raw token-endpoint response body (RFC 6749 §5.1 / §5.2, RFC 8628 §3.5).
///
/// Success and error bodies share one shape; [`TokenResponse::into_result`] splits them.
#[derive(Debug, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// A successful token grant.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// An OAuth error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthErrorBody {
    pub error: String,
    pub description: Option<String>,
}

impl TokenResponse {
    /// Split into a grant or an OAuth error. `None` if the body is neither.
    #[must_use]
    pub fn into_result(self) -> Option<Result<TokenGrant, OAuthErrorBody>> {
        if let Some(error) = self.error.filter(|e| !e.is_empty()) {
            return Some(Err(OAuthErrorBody { error, description: self.error_description }));
        }
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        Some(Ok(TokenGrant {
            access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expires_in: self.expires_in,
        }))
    }
}

mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|at| at.with_timezone(&Utc))
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
