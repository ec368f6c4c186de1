mod common;
use common::ENV_LOCK;

use method_mcp::app::App;
use method_mcp::config::{Config, TransportMode};
use std::time::Duration;

const KEYS: &[&str] = &[
    "METHOD_API_KEY",
    "METHOD_CLIENT_ID",
    "METHOD_CLIENT_SECRET",
    "METHOD_REDIRECT_URI",
    "METHOD_API_BASE_URL",
    "METHOD_REQUEST_TIMEOUT",
    "METHOD_MAX_RETRIES",
    "METHOD_TRANSPORT",
    "METHOD_HTTP_PORT",
    "METHOD_DEBUG",
];

fn snapshot() -> Vec<(&'static str, Option<String>)> {
    KEYS.iter().map(|key| (*key, std::env::var(key).ok())).collect()
}

fn restore(previous: Vec<(&'static str, Option<String>)>) {
    for (key, value) in previous {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}

fn clear() {
    for key in KEYS {
        std::env::remove_var(key);
    }
}

#[tokio::test]
async fn from_env_reads_method_variables() {
    let _guard = ENV_LOCK.lock().await;
    let previous = snapshot();
    clear();

    std::env::set_var("METHOD_API_KEY", "env-key-9876");
    std::env::set_var("METHOD_REQUEST_TIMEOUT", "5");
    std::env::set_var("METHOD_TRANSPORT", "http");
    std::env::set_var("METHOD_HTTP_PORT", "8123");

    let config = Config::from_env();
    assert_eq!(config.credentials.api_key.as_deref(), Some("env-key-9876"));
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.transport, TransportMode::Http);
    assert_eq!(config.http_port, 8123);
    assert!(config.warnings.is_empty());

    let app = App::initialize(config).expect("api key is enough");
    assert_eq!(app.client.auth_method(), "api_key");
    assert_eq!(app.client.timeout(), Duration::from_secs(5));

    restore(previous);
}

#[tokio::test]
async fn oauth_only_configuration_is_refused() {
    let _guard = ENV_LOCK.lock().await;
    let previous = snapshot();
    clear();

    std::env::set_var("METHOD_CLIENT_ID", "cid");
    std::env::set_var("METHOD_CLIENT_SECRET", "secret");

    let err = App::initialize(Config::from_env()).err().expect("oauth not available");
    assert!(err.message.contains("Client Credentials flow is not yet implemented"), "{}", err.message);

    restore(previous);
}

#[tokio::test]
async fn no_credentials_name_the_variables() {
    let _guard = ENV_LOCK.lock().await;
    let previous = snapshot();
    clear();

    let err = App::initialize(Config::from_env()).err().expect("nothing configured");
    assert!(err.message.contains("METHOD_API_KEY"), "{}", err.message);

    restore(previous);
}
