mod common;
use common::{client_for, instant_retries, quiet_logger};

use async_trait::async_trait;
use bytes::Bytes;
use method_mcp::config::Config;
use method_mcp::errors::{ApiErrorKind, ClientError};
use method_mcp::services::auth::AuthStrategy;
use method_mcp::services::client::{ApiClient, ClientOptions, QueryParams};
use method_mcp::services::transport::{HttpRequest, RawResponse, Transport};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Plays back a fixed list of outcomes, one per request.
struct ScriptedTransport {
    script: Mutex<Vec<Result<RawResponse, ClientError>>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn new(mut script: Vec<Result<RawResponse, ClientError>>) -> Arc<Self> {
        script.reverse();
        Arc::new(Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, _request: HttpRequest) -> Result<RawResponse, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("script lock")
            .pop()
            .unwrap_or_else(|| Err(ClientError::unexpected("script", "exhausted")))
    }
}

fn ok_json(body: serde_json::Value) -> Result<RawResponse, ClientError> {
    Ok(RawResponse {
        status: 200,
        headers: HashMap::new(),
        body: Bytes::from(body.to_string()),
    })
}

fn status(code: u16) -> Result<RawResponse, ClientError> {
    Ok(RawResponse {
        status: code,
        headers: HashMap::new(),
        body: Bytes::from_static(br#"{"error":{"message":"nope"}}"#),
    })
}

fn scripted_client(transport: Arc<ScriptedTransport>) -> ApiClient {
    let config = Config::with_api_key("http://api.test/api/v1/", "test-key");
    let auth = AuthStrategy::select(&config.credentials).expect("auth");
    ApiClient::with_transport(&config, ClientOptions::default(), auth, transport, quiet_logger())
        .expect("client")
        .with_retry_policy(instant_retries())
}

#[tokio::test]
async fn connection_failures_are_retried_until_success() {
    let transport = ScriptedTransport::new(vec![
        Err(ClientError::Connection("refused".to_string())),
        Err(ClientError::Timeout("slow".to_string())),
        ok_json(json!({"FullName": "Ada"})),
    ]);
    let client = scripted_client(transport.clone());

    let user = client.get("me", QueryParams::new()).await.expect("third attempt succeeds");
    assert_eq!(user["FullName"], json!("Ada"));
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn retries_stop_at_the_attempt_limit() {
    let transport = ScriptedTransport::new(vec![
        Err(ClientError::Connection("refused".to_string())),
        Err(ClientError::Connection("refused".to_string())),
        Err(ClientError::Connection("refused".to_string())),
        ok_json(json!({})),
    ]);
    let client = scripted_client(transport.clone());

    let err = client.get("me", QueryParams::new()).await.expect_err("gives up");
    assert_eq!(transport.calls(), 3);
    assert!(err.message.starts_with("Error: Unable to connect to Method API."), "{}", err.message);
}

#[tokio::test]
async fn http_errors_are_not_retried() {
    let transport = ScriptedTransport::new(vec![status(404), ok_json(json!({}))]);
    let client = scripted_client(transport.clone());

    let err = client
        .get("tables/Customer/1", QueryParams::new())
        .await
        .expect_err("404");
    assert_eq!(transport.calls(), 1);
    assert_eq!(err.status, Some(404));
    assert!(err.message.contains("Resource not found - nope"), "{}", err.message);
}

#[tokio::test]
async fn no_content_becomes_a_success_marker() {
    let transport = ScriptedTransport::new(vec![Ok(RawResponse {
        status: 204,
        headers: HashMap::new(),
        body: Bytes::new(),
    })]);
    let client = scripted_client(transport);

    let value = client.delete("files/3").await.expect("deleted");
    assert_eq!(
        value,
        json!({"success": true, "message": "Operation completed successfully"})
    );
}

#[tokio::test]
async fn rate_limit_keeps_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get("me", QueryParams::new()).await.expect_err("429");
    assert_eq!(err.kind, ApiErrorKind::RateLimit);
    assert_eq!(err.status, Some(429));
    assert_eq!(err.retry_after, Some(30));

    let rendered = method_mcp::errors::translate(&ClientError::Api(err)).render();
    assert!(rendered.to_lowercase().contains("rate limit"), "{}", rendered);
    assert!(rendered.contains("30"), "{}", rendered);
}
