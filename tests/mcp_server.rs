mod common;
use common::app_for;

use method_mcp::mcp::server::McpServer;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn server_for(mock: &MockServer) -> McpServer {
    McpServer::new(Arc::new(app_for(mock)))
}

async fn roundtrip(server: &McpServer, message: Value) -> Value {
    let response = server
        .handle_message(&message.to_string())
        .await
        .expect("reply expected");
    serde_json::to_value(&response).expect("serializable")
}

#[tokio::test]
async fn tools_list_returns_the_whole_catalogue() {
    let mock = MockServer::start().await;
    let server = server_for(&mock).await;

    let reply = roundtrip(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
    let tools = reply["result"]["tools"].as_array().expect("tools");
    assert_eq!(tools.len(), 20);
    assert!(tools.iter().all(|tool| tool["inputSchema"]["type"] == "object"));
    assert!(tools.iter().any(|tool| tool["name"] == "method_apikeys_update"));
}

#[tokio::test]
async fn schema_violations_are_invalid_params() {
    let mock = MockServer::start().await;
    let server = server_for(&mock).await;

    let reply = roundtrip(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {"name": "method_tables_query", "arguments": {"table": "Customer", "top": 0}}
        }),
    )
    .await;
    assert_eq!(reply["error"]["code"], json!(-32602));
    let message = reply["error"]["message"].as_str().expect("message");
    assert!(message.contains("/top"), "{}", message);
}

#[tokio::test]
async fn unknown_methods_are_not_found() {
    let mock = MockServer::start().await;
    let server = server_for(&mock).await;

    let reply = roundtrip(&server, json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"})).await;
    assert_eq!(reply["error"]["code"], json!(-32601));
    assert_eq!(reply["id"], json!(3));
}

#[tokio::test]
async fn ping_answers_with_an_empty_object() {
    let mock = MockServer::start().await;
    let server = server_for(&mock).await;

    let reply = roundtrip(&server, json!({"jsonrpc": "2.0", "id": "p", "method": "ping"})).await;
    assert_eq!(reply["result"], json!({}));
}

#[tokio::test]
async fn tool_results_are_text_content() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "FullName": "Ada Lovelace",
            "Email": "ada@example.com"
        })))
        .mount(&mock)
        .await;
    let server = server_for(&mock).await;

    let reply = roundtrip(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {"name": "method_user_get_info", "arguments": null}
        }),
    )
    .await;
    let result = &reply["result"];
    assert_eq!(result["isError"], json!(false));
    assert_eq!(result["content"][0]["type"], json!("text"));
    let envelope: Value =
        serde_json::from_str(result["content"][0]["text"].as_str().expect("text")).expect("json");
    assert_eq!(envelope["data"]["FullName"], json!("Ada Lovelace"));
}

#[tokio::test]
async fn upstream_failures_stay_inside_the_result() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock)
        .await;
    let server = server_for(&mock).await;

    let reply = roundtrip(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": {
                "name": "method_user_get_info",
                "arguments": {"response_format": "markdown"}
            }
        }),
    )
    .await;
    assert!(reply.get("error").is_none());
    assert_eq!(reply["result"]["isError"], json!(true));
    let text = reply["result"]["content"][0]["text"].as_str().expect("text");
    assert!(
        text.starts_with("Error: Authentication failed. Your API key or access token is invalid or expired."),
        "{}",
        text
    );
}
