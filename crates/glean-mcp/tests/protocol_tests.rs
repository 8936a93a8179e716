//! JSON-RPC handling over an in-memory stdio pair.

mod common;

use serde_json::{Value, json};
use wiremock::MockServer;

use glean_mcp::server::McpServer;
use glean_mcp::server::stdio::serve;
use glean_mcp::tools::ToolContext;

use common::{ScriptedInteraction, auth_for, oauth_config, temp_state, token_config, tool_context};

async fn run(ctx: &ToolContext, input: &str) -> Vec<Value> {
    let server = McpServer::with_context(ctx.clone());
    let mut out = Vec::new();
    serve(input.as_bytes(), &mut out, &server).await.unwrap();

    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_initialize_and_list() {
    let server = MockServer::start().await;
    let (_dir, state) = temp_state();
    let ctx = tool_context(&server, auth_for(token_config(&server), &state, ScriptedInteraction::headless()));

    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26"}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        "\n",
    );
    let responses = run(&ctx, input).await;

    assert_eq!(responses.len(), 2, "notifications get no response");
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "glean");

    let names: Vec<&str> = responses[1]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["search", "chat", "people_profile_search", "read_documents"]);
    assert!(responses[1]["result"]["tools"][0]["inputSchema"].is_object());
}

#[tokio::test]
async fn test_parse_error_and_unknown_method() {
    let server = MockServer::start().await;
    let (_dir, state) = temp_state();
    let ctx = tool_context(&server, auth_for(token_config(&server), &state, ScriptedInteraction::headless()));

    let input = "not json\n{\"jsonrpc\":\"2.0\",\"id\":\"a\",\"method\":\"resources/list\"}\n";
    let responses = run(&ctx, input).await;

    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[1]["id"], "a");
    assert_eq!(responses[1]["error"]["code"], -32601);
}

// =============================================================================
// tools/call
// =============================================================================

#[tokio::test]
async fn test_unknown_tool() {
    let server = MockServer::start().await;
    let (_dir, state) = temp_state();
    let ctx = tool_context(&server, auth_for(token_config(&server), &state, ScriptedInteraction::headless()));

    let request = json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "nope"}});
    let responses = run(&ctx, &format!("{request}\n")).await;

    assert_eq!(responses[0]["error"]["code"], -32602);
}

#[tokio::test]
async fn test_auth_failure_is_tool_error_result() {
    let server = MockServer::start().await;
    let (_dir, state) = temp_state();
    let ctx = tool_context(&server, auth_for(oauth_config(&server), &state, ScriptedInteraction::headless()));

    let request = json!({
        "jsonrpc": "2.0",
        "id": 4,
        "method": "tools/call",
        "params": {"name": "search", "arguments": {"query": "x"}}
    });
    let responses = run(&ctx, &format!("{request}\n")).await;

    let result = &responses[0]["result"];
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("ERR_A_15"), "{text}");
    assert!(responses[0].get("error").is_none());
}

#[tokio::test]
async fn test_validation_failure_is_tool_error_result() {
    let server = MockServer::start().await;
    let (_dir, state) = temp_state();
    let ctx = tool_context(&server, auth_for(token_config(&server), &state, ScriptedInteraction::headless()));

    let request = json!({
        "jsonrpc": "2.0",
        "id": 5,
        "method": "tools/call",
        "params": {"name": "read_documents", "arguments": {}}
    });
    let responses = run(&ctx, &format!("{request}\n")).await;

    assert_eq!(responses[0]["result"]["isError"], true);
    assert!(responses[0]["result"]["content"][0]["text"].as_str().unwrap().contains("'ids'"));
}
