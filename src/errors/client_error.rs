use crate::errors::ApiError;
use serde_json::Value;
use thiserror::Error;

/// Every way a single API round trip can fail before it is classified.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("HTTP {status} {reason} for {endpoint}")]
    Status {
        status: u16,
        reason: String,
        endpoint: String,
        body: Option<String>,
        retry_after: Option<u64>,
    },
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("{kind}: {message}")]
    Unexpected { kind: String, message: String },
}

impl ClientError {
    pub fn unexpected(kind: impl Into<String>, message: impl Into<String>) -> Self {
        ClientError::Unexpected {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Only network-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Timeout(_) | ClientError::Connection(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Api(err) => err.status,
            _ => None,
        }
    }

    /// Error body decoded as JSON, when the upstream sent one.
    pub fn response_json(&self) -> Option<Value> {
        match self {
            ClientError::Status {
                body: Some(body), ..
            } => serde_json::from_str(body).ok(),
            ClientError::Api(err) => err.response.clone(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::unexpected("JSONDecodeError", err.to_string())
    }
}
