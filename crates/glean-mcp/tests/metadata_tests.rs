//! OAuth metadata discovery against a mocked Glean backend and issuer.

mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use glean_mcp::auth::{MetadataCache, MetadataResolver};
use glean_mcp::config::OAuthConfig;

use common::{CLIENT_ID, as_metadata, base_url, temp_state};

fn resolver(state: &glean_mcp::auth::StateDir) -> MetadataResolver {
    MetadataResolver::new(reqwest::Client::new(), MetadataCache::new(state))
}

// =============================================================================
// Protected resource metadata
// =============================================================================

#[tokio::test]
async fn test_protected_resource_example() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-protected-resource"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resource": server.uri(),
            "authorization_servers": ["https://auth.example.com"],
            "glean_device_flow_client_id": "client-123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, state) = temp_state();
    // The path of the base URL is ignored; discovery uses the origin.
    let resource = resolver(&state)
        .fetch_protected_resource_metadata(&format!("{}/some/prefix/", server.uri()))
        .await
        .unwrap();

    assert_eq!(resource.issuer, "https://auth.example.com");
    assert_eq!(resource.client_id, "client-123");
}

#[tokio::test]
async fn test_protected_resource_errors() {
    let cases = [
        (ResponseTemplate::new(404), "ERR_A_01"),
        (ResponseTemplate::new(200).set_body_string("<html>"), "ERR_A_02"),
        (
            ResponseTemplate::new(200)
                .set_body_json(json!({"authorization_servers": [], "glean_device_flow_client_id": "c"})),
            "ERR_A_03",
        ),
        (
            ResponseTemplate::new(200).set_body_json(json!({
                "authorization_servers": [" ", "https://auth.example.com"],
                "glean_device_flow_client_id": "c"
            })),
            "ERR_A_03",
        ),
        (
            ResponseTemplate::new(200)
                .set_body_json(json!({"authorization_servers": ["https://auth.example.com"]})),
            "ERR_A_04",
        ),
    ];

    for (response, code) in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/oauth-protected-resource"))
            .respond_with(response)
            .mount(&server)
            .await;

        let (_dir, state) = temp_state();
        let err = resolver(&state)
            .fetch_protected_resource_metadata(&base_url(&server))
            .await
            .unwrap_err();

        assert_eq!(err.code(), code, "{err}");
        assert!(err.to_string().contains("administrator"));
    }
}

// =============================================================================
// Authorization server metadata
// =============================================================================

#[tokio::test]
async fn test_working_primary_never_calls_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(as_metadata(&server)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(as_metadata(&server)))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, state) = temp_state();
    let metadata = resolver(&state).fetch_authorization_server_metadata(&server.uri()).await.unwrap();

    assert_eq!(metadata.token_endpoint, format!("{}/token", server.uri()));
    assert_eq!(metadata.device_authorization_endpoint, format!("{}/device", server.uri()));
    assert_eq!(metadata.code_challenge_methods, vec!["S256"]);
}

#[tokio::test]
async fn test_non_2xx_primary_falls_back_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(as_metadata(&server)))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, state) = temp_state();
    let metadata = resolver(&state).fetch_authorization_server_metadata(&server.uri()).await.unwrap();
    assert_eq!(metadata.token_endpoint, format!("{}/token", server.uri()));
}

#[tokio::test]
async fn test_unreachable_primary_falls_back_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(as_metadata(&server))
                .set_delay(Duration::from_secs(5)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(as_metadata(&server)))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, state) = temp_state();
    let http = reqwest::Client::builder().timeout(Duration::from_millis(200)).build().unwrap();
    let resolver = MetadataResolver::new(http, MetadataCache::new(&state));

    let metadata = resolver.fetch_authorization_server_metadata(&server.uri()).await.unwrap();
    assert_eq!(metadata.device_authorization_endpoint, format!("{}/device", server.uri()));
}

#[tokio::test]
async fn test_malformed_primary_does_not_fall_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(as_metadata(&server)))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, state) = temp_state();
    let err = resolver(&state).fetch_authorization_server_metadata(&server.uri()).await.unwrap_err();

    assert_eq!(err.code(), "ERR_A_06");
    assert!(err.to_string().contains("openid-configuration"), "{err}");
}

#[tokio::test]
async fn test_both_endpoints_failing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let (_dir, state) = temp_state();
    let err = resolver(&state).fetch_authorization_server_metadata(&server.uri()).await.unwrap_err();

    assert_eq!(err.code(), "ERR_A_05");
    assert!(err.to_string().contains("HTTP 503"));
}

#[tokio::test]
async fn test_missing_endpoints_are_distinct() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"token_endpoint": "https://t"})),
        )
        .mount(&server)
        .await;

    let (_dir, state) = temp_state();
    let err = resolver(&state).fetch_authorization_server_metadata(&server.uri()).await.unwrap_err();
    assert_eq!(err.code(), "ERR_A_07");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"device_authorization_endpoint": "https://d"})),
        )
        .mount(&server)
        .await;

    let err = resolver(&state).fetch_authorization_server_metadata(&server.uri()).await.unwrap_err();
    assert_eq!(err.code(), "ERR_A_08");
}

// =============================================================================
// Full resolution and caching
// =============================================================================

#[tokio::test]
async fn test_configured_issuer_skips_protected_resource() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-protected-resource"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    common::mount_as_metadata(&server).await;

    let (_dir, state) = temp_state();
    let config = OAuthConfig {
        base_url: base_url(&server),
        issuer: Some(server.uri()),
        client_id: Some(CLIENT_ID.to_string()),
        client_secret: Some("shh".to_string()),
    };

    let resolved = resolver(&state).resolve(&config).await.unwrap();
    assert_eq!(resolved.client_id, CLIENT_ID);
    assert_eq!(resolved.client_secret.as_deref(), Some("shh"));
    assert!(resolved.supports_pkce());
}

#[tokio::test]
async fn test_discovers_issuer_and_reuses_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-protected-resource"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authorization_servers": [server.uri()],
            "glean_device_flow_client_id": CLIENT_ID
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(as_metadata(&server)))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, state) = temp_state();
    let config = OAuthConfig {
        base_url: base_url(&server),
        issuer: None,
        client_id: None,
        client_secret: None,
    };

    let first = resolver(&state).resolve(&config).await.unwrap();
    let second = resolver(&state).resolve(&config).await.unwrap();

    assert_eq!(first.issuer, server.uri());
    assert_eq!(first, second);
    assert!(state.oauth_path().exists());
}
