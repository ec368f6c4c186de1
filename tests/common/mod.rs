#![allow(dead_code)]

use method_mcp::app::App;
use method_mcp::config::Config;
use method_mcp::services::client::{ApiClient, ClientOptions, RetryPolicy};
use method_mcp::services::logger::{LogLevel, Logger};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use wiremock::MockServer;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub fn quiet_logger() -> Logger {
    Logger::new("method-mcp-test", LogLevel::Error)
}

/// Three attempts, no waiting between them.
pub fn instant_retries() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    }
}

pub fn config_for(server: &MockServer) -> Config {
    Config::with_api_key(format!("{}/api/v1/", server.uri()), "test-key-0042")
}

pub fn client_for(server: &MockServer) -> Arc<ApiClient> {
    let config = config_for(server);
    let client = ApiClient::new(&config, ClientOptions::default(), quiet_logger())
        .expect("api client")
        .with_retry_policy(instant_retries());
    Arc::new(client)
}

pub fn app_for(server: &MockServer) -> App {
    App::with_client(config_for(server), client_for(server)).expect("app")
}

/// Runs a tool through the executor and parses the JSON envelope.
pub async fn call_json(app: &App, tool: &str, args: Value) -> (Value, bool) {
    let output = app.tool_executor.execute(tool, args).await;
    let parsed = serde_json::from_str(&output.text).expect("json envelope");
    (parsed, output.is_error)
}

pub async fn call_text(app: &App, tool: &str, args: Value) -> (String, bool) {
    let output = app.tool_executor.execute(tool, args).await;
    (output.text, output.is_error)
}
