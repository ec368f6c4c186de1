use crate::config::Config;
use crate::constants::limits::LOG_BODY_PREVIEW_BYTES;
use crate::constants::{api, retry};
use crate::errors::{translate, ApiError, ClientError};
use crate::services::auth::AuthStrategy;
use crate::services::logger::Logger;
use crate::services::transport::{
    HttpRequest, MultipartForm, RawResponse, ReqwestTransport, RequestBody, Transport,
};
use crate::utils::redact::{redact_headers, redact_text};
use crate::utils::text::scalar_text;
use bytes::Bytes;
use reqwest::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Query string parameters. Order is irrelevant; `null` values are skipped.
pub type QueryParams = BTreeMap<String, Value>;

#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub endpoint: String,
    pub params: QueryParams,
    pub body: RequestBody,
}

impl RequestDescriptor {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            params: QueryParams::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn with_multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }
}

/// Explicit overrides; each wins over the corresponding config value.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub max_retries: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(retry::BASE_DELAY_MS),
            max_delay: Duration::from_millis(retry::MAX_DELAY_MS),
        }
    }

    /// Wait before the attempt following `attempt` (1-based): base, 2x, 4x... capped.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(2u32.saturating_pow(exponent));
        delay.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(retry::MAX_ATTEMPTS)
    }
}

#[derive(Debug, Clone)]
pub struct Download {
    pub bytes: Bytes,
    pub content_type: String,
    pub file_name: Option<String>,
}

pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
    auth: AuthStrategy,
    transport: Arc<dyn Transport>,
    logger: Logger,
}

impl ApiClient {
    /// Selects the auth strategy from `config` and builds the reqwest transport.
    pub fn new(config: &Config, options: ClientOptions, logger: Logger) -> Result<Self, ApiError> {
        let auth = AuthStrategy::select(&config.credentials)?;
        let timeout = options.timeout.unwrap_or(config.timeout);
        let transport = ReqwestTransport::new(timeout).map_err(classify_error)?;
        Self::with_transport(config, options, auth, Arc::new(transport), logger)
    }

    pub fn with_transport(
        config: &Config,
        options: ClientOptions,
        auth: AuthStrategy,
        transport: Arc<dyn Transport>,
        logger: Logger,
    ) -> Result<Self, ApiError> {
        if !auth.is_valid() {
            return Err(auth
                .get_headers()
                .err()
                .unwrap_or_else(|| ApiError::authentication("Authentication is not valid")));
        }
        let raw_base = options.base_url.unwrap_or_else(|| config.base_url.clone());
        let base_url = raw_base.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|err| {
            ApiError::validation(format!("Invalid API base URL '{}': {}", raw_base, err))
        })?;

        Ok(Self {
            base_url,
            timeout: options.timeout.unwrap_or(config.timeout),
            retry: RetryPolicy::new(options.max_retries.unwrap_or(config.max_retries)),
            auth,
            transport,
            logger,
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn auth_method(&self) -> &'static str {
        self.auth.method_name()
    }

    /// `base_url` + endpoint with its leading slashes stripped, plus query.
    pub fn url_for(&self, endpoint: &str, params: &QueryParams) -> Result<Url, ApiError> {
        let joined = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let mut url = Url::parse(&joined).map_err(|err| {
            ApiError::validation(format!("Invalid endpoint '{}': {}", endpoint, err))
        })?;
        let present: Vec<(&String, &Value)> =
            params.iter().filter(|(_, value)| !value.is_null()).collect();
        if !present.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in present {
                pairs.append_pair(key, &scalar_text(value));
            }
        }
        Ok(url)
    }

    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<Value, ApiError> {
        let response = self.execute(&descriptor).await.map_err(|err| {
            self.log_failure(&descriptor, &err);
            classify_error(err)
        })?;
        if response.status == 204 || response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::json!({
                "success": true,
                "message": "Operation completed successfully",
            }));
        }
        serde_json::from_slice(&response.body).map_err(|err| classify_error(ClientError::from(err)))
    }

    pub async fn get(&self, endpoint: &str, params: QueryParams) -> Result<Value, ApiError> {
        self.request(RequestDescriptor::new(Method::GET, endpoint).with_params(params))
            .await
    }

    pub async fn post(&self, endpoint: &str, body: Value) -> Result<Value, ApiError> {
        self.request(RequestDescriptor::new(Method::POST, endpoint).with_json(body))
            .await
    }

    pub async fn patch(&self, endpoint: &str, body: Value) -> Result<Value, ApiError> {
        self.request(RequestDescriptor::new(Method::PATCH, endpoint).with_json(body))
            .await
    }

    pub async fn put(&self, endpoint: &str, body: Value) -> Result<Value, ApiError> {
        self.request(RequestDescriptor::new(Method::PUT, endpoint).with_json(body))
            .await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.request(RequestDescriptor::new(Method::DELETE, endpoint))
            .await
    }

    /// Multipart POST. The JSON content type from the auth headers is dropped
    /// so the form boundary header is used instead.
    pub async fn upload(&self, endpoint: &str, form: MultipartForm) -> Result<Value, ApiError> {
        self.request(RequestDescriptor::new(Method::POST, endpoint).with_multipart(form))
            .await
    }

    /// Binary GET: returns the raw body instead of decoding JSON.
    pub async fn download(&self, endpoint: &str) -> Result<Download, ApiError> {
        let descriptor = RequestDescriptor::new(Method::GET, endpoint);
        let response = self.execute(&descriptor).await.map_err(|err| {
            self.log_failure(&descriptor, &err);
            classify_error(err)
        })?;
        let content_type = response
            .header("content-type")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(api::BINARY_CONTENT_TYPE)
            .to_string();
        let file_name = response
            .header("content-disposition")
            .and_then(parse_content_disposition);
        Ok(Download {
            bytes: response.body,
            content_type,
            file_name,
        })
    }

    async fn execute(&self, descriptor: &RequestDescriptor) -> Result<RawResponse, ClientError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(descriptor).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    self.logger.warn(
                        "HTTP retry",
                        Some(&serde_json::json!({
                            "attempt": attempt,
                            "delay_ms": delay.as_millis() as u64,
                            "endpoint": descriptor.endpoint,
                            "error": err.to_string(),
                        })),
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(&self, descriptor: &RequestDescriptor) -> Result<RawResponse, ClientError> {
        let mut headers = self.auth.get_headers()?;
        if matches!(descriptor.body, RequestBody::Multipart(_)) {
            headers.retain(|key, _| !key.eq_ignore_ascii_case("content-type"));
        }
        let url = self.url_for(&descriptor.endpoint, &descriptor.params)?;
        self.logger.debug(
            "API request",
            Some(&serde_json::json!({
                "method": descriptor.method.as_str(),
                "url": url.as_str(),
                "headers": redact_headers(&headers),
            })),
        );

        let response = self
            .transport
            .send(HttpRequest {
                method: descriptor.method.clone(),
                url,
                headers,
                body: descriptor.body.clone(),
            })
            .await?;

        let retry_after = response
            .header("retry-after")
            .and_then(|value| value.trim().parse::<u64>().ok());
        if response.status == 429 {
            let mut err = ApiError::rate_limit("Rate limit exceeded")
                .with_status(429)
                .with_retry_after(retry_after);
            if let Ok(body) = serde_json::from_slice::<Value>(&response.body) {
                err = err.with_response(body);
            }
            return Err(err.into());
        }
        if !response.is_success() {
            let body = String::from_utf8_lossy(&response.body).into_owned();
            return Err(ClientError::Status {
                status: response.status,
                reason: reqwest::StatusCode::from_u16(response.status)
                    .ok()
                    .and_then(|code| code.canonical_reason())
                    .unwrap_or("")
                    .to_string(),
                endpoint: descriptor.endpoint.clone(),
                body: Some(body).filter(|text| !text.is_empty()),
                retry_after,
            });
        }
        Ok(response)
    }

    fn log_failure(&self, descriptor: &RequestDescriptor, err: &ClientError) {
        self.logger.warn(
            "API request failed",
            Some(&serde_json::json!({
                "method": descriptor.method.as_str(),
                "endpoint": descriptor.endpoint,
                "status": err.status(),
                "error": redact_text(&err.to_string(), LOG_BODY_PREVIEW_BYTES),
            })),
        );
    }
}

/// Taxonomy members pass through untouched; anything else is wrapped in a
/// generic API error that already carries its translated text.
pub fn classify_error(err: ClientError) -> ApiError {
    match err {
        ClientError::Api(api) => api,
        other => {
            let translated = translate(&other);
            let mut wrapped = ApiError::api(translated.render()).with_translation(translated);
            if let Some(status) = other.status() {
                wrapped = wrapped.with_status(status);
            }
            if let Some(body) = other.response_json() {
                wrapped = wrapped.with_response(body);
            }
            wrapped
        }
    }
}

/// `attachment; filename="report.pdf"` → `report.pdf`.
pub fn parse_content_disposition(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| {
            let (key, raw) = part.split_once('=')?;
            if !key.trim().eq_ignore_ascii_case("filename") {
                return None;
            }
            let name = raw.trim().trim_matches('"').trim();
            if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            }
        })
}
