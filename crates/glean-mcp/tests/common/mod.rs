//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use glean_mcp::auth::{
    DeviceAuthorizationSession, DeviceFlowSettings, GleanAuth, Interaction, StateDir,
};
use glean_mcp::client::GleanClient;
use glean_mcp::config::{ClientConfig, GleanConfig, OAuthConfig, TokenConfig};
use glean_mcp::tools::ToolContext;

pub const CLIENT_ID: &str = "client-123";

/// A user who may or may not press Enter.
pub struct ScriptedInteraction {
    interactive: bool,
    enter_after: Option<Duration>,
    pub shown: Mutex<Vec<DeviceAuthorizationSession>>,
    pub opened: Mutex<Vec<String>>,
}

impl ScriptedInteraction {
    /// Interactive terminal where Enter is never pressed.
    pub fn idle() -> Arc<Self> {
        Arc::new(Self::new(true, None))
    }

    /// Interactive terminal where Enter arrives after `delay`.
    pub fn pressing_enter_after(delay: Duration) -> Arc<Self> {
        Arc::new(Self::new(true, Some(delay)))
    }

    /// No terminal attached.
    pub fn headless() -> Arc<Self> {
        Arc::new(Self::new(false, None))
    }

    fn new(interactive: bool, enter_after: Option<Duration>) -> Self {
        Self { interactive, enter_after, shown: Mutex::default(), opened: Mutex::default() }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Interaction for ScriptedInteraction {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn show_device_code(&self, session: &DeviceAuthorizationSession) {
        self.shown.lock().unwrap().push(session.clone());
    }

    async fn wait_for_enter(&self) -> bool {
        match self.enter_after {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                true
            }
            None => std::future::pending().await,
        }
    }

    fn open_browser(&self, url: &str) {
        self.opened.lock().unwrap().push(url.to_string());
    }
}

/// Temporary state directory.
pub fn temp_state() -> (TempDir, StateDir) {
    let dir = TempDir::new().unwrap();
    let state = StateDir::new(dir.path().join("glean"));
    (dir, state)
}

/// Backend base URL for a mock server.
pub fn base_url(server: &MockServer) -> String {
    format!("{}/", server.uri())
}

/// OAuth config with issuer and client id preset (no protected resource lookup).
pub fn oauth_config(server: &MockServer) -> GleanConfig {
    GleanConfig::OAuth(OAuthConfig {
        base_url: base_url(server),
        issuer: Some(server.uri()),
        client_id: Some(CLIENT_ID.to_string()),
        client_secret: None,
    })
}

/// API token config.
pub fn token_config(server: &MockServer) -> GleanConfig {
    GleanConfig::Token(TokenConfig {
        base_url: base_url(server),
        api_token: "test-token".to_string(),
        act_as: None,
    })
}

pub fn auth_for(
    config: GleanConfig,
    state: &StateDir,
    interaction: Arc<ScriptedInteraction>,
) -> GleanAuth {
    GleanAuth::new(
        config,
        reqwest::Client::new(),
        state,
        interaction,
        DeviceFlowSettings::for_testing(),
    )
}

pub fn tool_context(server: &MockServer, auth: GleanAuth) -> ToolContext {
    let client = GleanClient::new(base_url(server), &ClientConfig::for_testing()).unwrap();
    ToolContext::new(Arc::new(client), Arc::new(auth))
}

/// Authorization server metadata pointing back at the mock server.
pub fn as_metadata(server: &MockServer) -> serde_json::Value {
    json!({
        "issuer": server.uri(),
        "device_authorization_endpoint": format!("{}/device", server.uri()),
        "token_endpoint": format!("{}/token", server.uri()),
        "code_challenge_methods_supported": ["S256"]
    })
}

pub async fn mount_as_metadata(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(as_metadata(server)))
        .mount(server)
        .await;
}

pub async fn mount_device_authorization(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/device"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "dc-1",
            "user_code": "ABCD-1234",
            "verification_uri": format!("{}/activate", server.uri()),
            "expires_in": 600
        })))
        .mount(server)
        .await;
}

pub fn pending() -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({"error": "authorization_pending"}))
}

pub fn granted() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": "at-1",
        "refresh_token": "rt-1",
        "expires_in": 3600,
        "token_type": "Bearer"
    }))
}

/// Requests received on `path`.
pub async fn requests_to(server: &MockServer, request_path: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == request_path)
        .collect()
}
