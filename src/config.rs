use crate::constants::{api, env_keys, network, retry};
use crate::services::logger::LogLevel;
use crate::utils::redact::mask_secret;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Stdio,
    Http,
}

impl TransportMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "stdio" => Some(TransportMode::Stdio),
            "http" | "streamable-http" => Some(TransportMode::Http),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransportMode::Stdio => "stdio",
            TransportMode::Http => "http",
        }
    }
}

/// Raw credential inputs. Empty values are stored as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            api_key: None,
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            authorize_url: api::DEFAULT_OAUTH_AUTHORIZE_URL.to_string(),
            token_url: api::DEFAULT_OAUTH_TOKEN_URL.to_string(),
        }
    }
}

impl Credentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::default()
        }
    }
}

/// Process configuration, resolved once at startup and passed down.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: usize,
    pub transport: TransportMode,
    pub http_port: u16,
    pub debug: bool,
    pub log_level: LogLevel,
    /// Problems found while reading the environment, logged at startup.
    pub warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            base_url: api::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_millis(network::TIMEOUT_API_REQUEST_MS),
            max_retries: retry::MAX_ATTEMPTS,
            transport: TransportMode::Stdio,
            http_port: network::DEFAULT_HTTP_PORT,
            debug: false,
            log_level: LogLevel::Info,
            warnings: Vec::new(),
        }
    }
}

pub fn is_truthy(value: impl AsRef<str>) -> bool {
    matches!(
        value.as_ref().trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Malformed numbers fall back to
    /// their defaults instead of failing startup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let defaults = Config::default();

        let credentials = Credentials {
            api_key: non_empty(env_keys::API_KEY),
            client_id: non_empty(env_keys::CLIENT_ID),
            client_secret: non_empty(env_keys::CLIENT_SECRET),
            redirect_uri: non_empty(env_keys::REDIRECT_URI),
            authorize_url: non_empty(env_keys::OAUTH_AUTHORIZE_URL)
                .unwrap_or(defaults.credentials.authorize_url),
            token_url: non_empty(env_keys::OAUTH_TOKEN_URL)
                .unwrap_or(defaults.credentials.token_url),
        };

        let mut warnings = Vec::new();
        let timeout = match non_empty(env_keys::REQUEST_TIMEOUT) {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|secs| *secs > 0.0)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .unwrap_or_else(|| {
                    warnings.push(format!(
                        "Invalid METHOD_REQUEST_TIMEOUT '{}', using {} seconds",
                        raw,
                        defaults.timeout.as_secs()
                    ));
                    defaults.timeout
                }),
            None => defaults.timeout,
        };

        let max_retries = non_empty(env_keys::MAX_RETRIES)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(defaults.max_retries);

        let transport = match non_empty(env_keys::TRANSPORT) {
            Some(raw) => TransportMode::parse(&raw).unwrap_or_else(|| {
                warnings.push(format!(
                    "Unknown {} '{}', falling back to stdio",
                    env_keys::TRANSPORT,
                    raw
                ));
                TransportMode::Stdio
            }),
            None => defaults.transport,
        };

        let http_port = non_empty(env_keys::HTTP_PORT)
            .and_then(|raw| raw.trim().parse::<u16>().ok())
            .filter(|port| *port > 0)
            .unwrap_or(defaults.http_port);

        let debug = non_empty(env_keys::DEBUG)
            .map(is_truthy)
            .unwrap_or(false);

        let log_level = if debug {
            LogLevel::Debug
        } else {
            non_empty(env_keys::LOG_LEVEL)
                .map(|raw| LogLevel::parse(&raw))
                .unwrap_or(defaults.log_level)
        };

        Self {
            credentials,
            base_url: non_empty(env_keys::API_BASE_URL).unwrap_or(defaults.base_url),
            timeout,
            max_retries,
            transport,
            http_port,
            debug,
            log_level,
            warnings,
        }
    }

    /// Config for a single API key against `base_url`, everything else default.
    pub fn with_api_key(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::api_key(api_key),
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Startup summary safe to log: secrets are masked.
    pub fn summary(&self) -> Value {
        serde_json::json!({
            "base_url": self.base_url,
            "timeout_secs": self.timeout.as_secs_f64(),
            "max_retries": self.max_retries,
            "transport": self.transport.as_str(),
            "http_port": self.http_port,
            "api_key": self.credentials.api_key.as_deref().map(mask_secret),
            "client_id": self.credentials.client_id,
            "client_secret": self.credentials.client_secret.as_deref().map(mask_secret),
        })
    }
}
