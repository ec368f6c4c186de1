use crate::config::Credentials;
use crate::constants::api::{API_KEY_SCHEME, JSON_CONTENT_TYPE};
use crate::errors::ApiError;
use std::collections::BTreeMap;

pub type AuthHeaders = BTreeMap<String, String>;

const NO_CREDENTIALS: &str = "No authentication credentials found. Please set one of:\n\
1. METHOD_API_KEY for API key authentication (recommended)\n\
2. METHOD_CLIENT_ID and METHOD_CLIENT_SECRET for OAuth2 (coming soon)\n\
See .env.example for configuration details.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyAuth {
    api_key: String,
}

impl ApiKeyAuth {
    pub fn new(api_key: &str) -> Result<Self, ApiError> {
        let trimmed = api_key.trim();
        if trimmed.is_empty() {
            return Err(ApiError::authentication("API key cannot be empty"));
        }
        Ok(Self {
            api_key: trimmed.to_string(),
        })
    }

    pub fn get_headers(&self) -> AuthHeaders {
        let mut headers = AuthHeaders::new();
        headers.insert(
            "Authorization".to_string(),
            format!("{} {}", API_KEY_SCHEME, self.api_key),
        );
        headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        headers
    }

    pub fn is_valid(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth2AuthorizationCode {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth2ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth2Implicit {
    pub client_id: String,
    pub authorize_url: String,
}

/// One authentication mechanism. Chosen once per client and never swapped.
///
/// Only `ApiKey` produces headers today. The OAuth2 variants keep their
/// configuration so the selection order is observable, but their header
/// call fails with a "not implemented" authentication error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStrategy {
    ApiKey(ApiKeyAuth),
    ClientCredentials(OAuth2ClientCredentials),
    AuthorizationCode(OAuth2AuthorizationCode),
    Implicit(OAuth2Implicit),
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn not_implemented(flow: &str) -> ApiError {
    ApiError::authentication(format!(
        "OAuth2 {} is not yet implemented. Please use API Key authentication (METHOD_API_KEY) for now. OAuth2 support is coming in a future release.",
        flow
    ))
}

impl AuthStrategy {
    /// Picks the first strategy whose inputs are all present:
    /// API key, then client credentials (id + secret), then authorization
    /// code (id + redirect URI), then implicit (id).
    pub fn select(credentials: &Credentials) -> Result<Self, ApiError> {
        if let Some(api_key) = credentials.api_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(AuthStrategy::ApiKey(ApiKeyAuth::new(api_key)?));
        }
        let client_id = present(&credentials.client_id);
        let client_secret = present(&credentials.client_secret);
        let redirect_uri = present(&credentials.redirect_uri);

        match (client_id, client_secret, redirect_uri) {
            (Some(id), Some(secret), _) => {
                Ok(AuthStrategy::ClientCredentials(OAuth2ClientCredentials {
                    client_id: id.to_string(),
                    client_secret: secret.to_string(),
                    token_url: credentials.token_url.clone(),
                }))
            }
            (Some(id), None, Some(redirect)) => {
                Ok(AuthStrategy::AuthorizationCode(OAuth2AuthorizationCode {
                    client_id: id.to_string(),
                    client_secret: None,
                    redirect_uri: redirect.to_string(),
                    authorize_url: credentials.authorize_url.clone(),
                    token_url: credentials.token_url.clone(),
                }))
            }
            (Some(id), None, None) => Ok(AuthStrategy::Implicit(OAuth2Implicit {
                client_id: id.to_string(),
                authorize_url: credentials.authorize_url.clone(),
            })),
            (None, _, _) => Err(ApiError::authentication(NO_CREDENTIALS)),
        }
    }

    /// Headers to attach to a request. Called fresh for every attempt.
    pub fn get_headers(&self) -> Result<AuthHeaders, ApiError> {
        match self {
            AuthStrategy::ApiKey(auth) => Ok(auth.get_headers()),
            AuthStrategy::ClientCredentials(_) => Err(not_implemented("Client Credentials flow")),
            AuthStrategy::AuthorizationCode(_) => {
                Err(not_implemented("Authorization Code flow"))
            }
            AuthStrategy::Implicit(_) => Err(not_implemented("Implicit flow")),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            AuthStrategy::ApiKey(auth) => auth.is_valid(),
            _ => false,
        }
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            AuthStrategy::ApiKey(_) => "api_key",
            AuthStrategy::ClientCredentials(_) => "oauth2_client_credentials",
            AuthStrategy::AuthorizationCode(_) => "oauth2_authorization_code",
            AuthStrategy::Implicit(_) => "oauth2_implicit",
        }
    }
}
