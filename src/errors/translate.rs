use crate::errors::{ApiError, ApiErrorKind, ClientError};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Auth,
    Permission,
    NotFound,
    RateLimit,
    Server,
    Timeout,
    Connection,
    Unexpected,
}

/// Agent-facing description of a failure: what went wrong and what to do next.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedError {
    pub message: String,
    pub suggestion: String,
    pub category: ErrorCategory,
}

impl NormalizedError {
    pub fn new(
        category: ErrorCategory,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            category,
        }
    }

    /// Single-string form. Always starts with `Error:`.
    pub fn render(&self) -> String {
        if self.suggestion.is_empty() {
            format!("Error: {}", self.message)
        } else {
            format!("Error: {}\nSuggestion: {}", self.message, self.suggestion)
        }
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

const SUGGEST_VALIDATION: &str = "Check that all required fields are provided and have valid values. Review the API documentation for parameter requirements.";
const SUGGEST_AUTH: &str = "Check that METHOD_API_KEY is correctly set in your environment. If using OAuth2, ensure your token hasn't expired and refresh if needed.";
const SUGGEST_PERMISSION: &str = "Your account doesn't have permission to perform this operation. Check that you have the required role (e.g., Admin for API key creation) or that the resource belongs to your account.";
const SUGGEST_NOT_FOUND: &str = "Verify that the table name, record ID, or file ID is correct. Use list/query tools to find the correct identifier.";
const SUGGEST_RATE_LIMIT: &str = "Wait before making more requests. Method CRM limits: 100 req/min per account, 5,000-25,000 daily depending on licenses.";
const SUGGEST_SERVER: &str = "This is a temporary server issue. Wait a moment and retry. If the problem persists, check Method CRM status page or contact support.";
const SUGGEST_UNAVAILABLE: &str = "The API is undergoing maintenance or experiencing high load. Wait a few minutes and retry your request.";
const SUGGEST_TIMEOUT: &str = "The API might be slow or your network connection interrupted. Try again, or increase METHOD_REQUEST_TIMEOUT in your configuration.";
const SUGGEST_CONNECTION: &str = "Check your internet connection and verify that METHOD_API_BASE_URL is correct (default: https://rest.method.me/api/v1/).";
const SUGGEST_UNEXPECTED: &str = "This is an unexpected error. Check your input parameters and ensure the Method API is accessible. If the problem persists, report this issue.";

/// Maps any client failure to an actionable message. Total: never panics and
/// never returns an empty message.
pub fn translate(error: &ClientError) -> NormalizedError {
    match error {
        ClientError::Status {
            status,
            retry_after,
            ..
        } => translate_status(*status, *retry_after, &upstream_message(error)),
        ClientError::Timeout(_) => NormalizedError::new(
            ErrorCategory::Timeout,
            "Request timed out while waiting for Method API response.",
            SUGGEST_TIMEOUT,
        ),
        ClientError::Connection(_) => NormalizedError::new(
            ErrorCategory::Connection,
            "Unable to connect to Method API.",
            SUGGEST_CONNECTION,
        ),
        ClientError::Api(err) => translate_api_error(err),
        ClientError::Unexpected { kind, message } => {
            let kind = if kind.trim().is_empty() {
                "error"
            } else {
                kind.as_str()
            };
            NormalizedError::new(
                ErrorCategory::Unexpected,
                format!("Unexpected {} occurred - {}", kind, message),
                SUGGEST_UNEXPECTED,
            )
        }
    }
}

fn translate_status(status: u16, retry_after: Option<u64>, upstream: &str) -> NormalizedError {
    match status {
        400 => NormalizedError::new(
            ErrorCategory::Validation,
            format!("Validation failed - {}", upstream),
            SUGGEST_VALIDATION,
        ),
        401 => NormalizedError::new(
            ErrorCategory::Auth,
            "Authentication failed. Your API key or access token is invalid or expired.",
            SUGGEST_AUTH,
        ),
        403 => NormalizedError::new(
            ErrorCategory::Permission,
            format!("Permission denied - {}", upstream),
            SUGGEST_PERMISSION,
        ),
        404 => NormalizedError::new(
            ErrorCategory::NotFound,
            format!("Resource not found - {}", upstream),
            SUGGEST_NOT_FOUND,
        ),
        429 => NormalizedError::new(
            ErrorCategory::RateLimit,
            format!(
                "Rate limit exceeded (100 requests/minute or daily limit reached).\nRetry-After: {} seconds",
                retry_after
                    .map(|secs| secs.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            ),
            SUGGEST_RATE_LIMIT,
        ),
        500 => NormalizedError::new(
            ErrorCategory::Server,
            "Method API server error occurred.",
            SUGGEST_SERVER,
        ),
        503 => NormalizedError::new(
            ErrorCategory::Server,
            "Method API service temporarily unavailable.",
            SUGGEST_UNAVAILABLE,
        ),
        other => NormalizedError::new(
            status_category(Some(other)),
            format!("API request failed with status {} - {}", other, upstream),
            "",
        ),
    }
}

fn translate_api_error(err: &ApiError) -> NormalizedError {
    if let Some(translated) = &err.translated {
        return translated.clone();
    }
    match err.kind {
        ApiErrorKind::Authentication => NormalizedError::new(
            ErrorCategory::Auth,
            err.message.clone(),
            "Verify your authentication credentials.",
        ),
        ApiErrorKind::RateLimit => {
            let message = match err.retry_after {
                Some(secs) => format!(
                    "{}. Retry after {} seconds.",
                    err.message.trim_end_matches('.'),
                    secs
                ),
                None => err.message.clone(),
            };
            NormalizedError::new(
                ErrorCategory::RateLimit,
                message,
                "Wait before making more requests to respect rate limits.",
            )
        }
        ApiErrorKind::Validation => NormalizedError::new(
            ErrorCategory::Validation,
            err.message.clone(),
            "Check your input parameters and try again.",
        ),
        ApiErrorKind::NotFound => NormalizedError::new(
            ErrorCategory::NotFound,
            err.message.clone(),
            "Verify the resource ID and try again.",
        ),
        ApiErrorKind::Permission => NormalizedError::new(
            ErrorCategory::Permission,
            err.message.clone(),
            "Check your account permissions.",
        ),
        ApiErrorKind::Api => NormalizedError::new(
            status_category(err.status),
            err.message
                .strip_prefix("Error: ")
                .unwrap_or(&err.message)
                .to_string(),
            "",
        ),
    }
}

fn status_category(status: Option<u16>) -> ErrorCategory {
    match status {
        Some(400) | Some(422) => ErrorCategory::Validation,
        Some(401) => ErrorCategory::Auth,
        Some(403) => ErrorCategory::Permission,
        Some(404) => ErrorCategory::NotFound,
        Some(429) => ErrorCategory::RateLimit,
        Some(code) if code >= 500 => ErrorCategory::Server,
        _ => ErrorCategory::Unexpected,
    }
}

/// Reads `error.message` from a JSON error body, falling back to the error's
/// own text when the body is missing or malformed.
pub fn upstream_message(error: &ClientError) -> String {
    error
        .response_json()
        .as_ref()
        .and_then(|body| body.get("error"))
        .and_then(|inner| inner.get("message"))
        .and_then(Value::as_str)
        .map(|text| text.to_string())
        .unwrap_or_else(|| error.to_string())
}
