use crate::constants::limits::MAX_IDENTIFIER_LENGTH;
use crate::constants::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::errors::ApiError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Arguments every tool accepts but no handler input struct declares.
const SHARED_ARGS: &[&str] = &["response_format"];

#[derive(Clone, Default)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    /// Deserializes tool arguments into a typed input. Unknown fields are
    /// rejected by the input structs themselves.
    pub fn parse_input<T: DeserializeOwned>(&self, args: Value) -> Result<T, ApiError> {
        let args = match args {
            Value::Null => Value::Object(Map::new()),
            Value::Object(mut map) => {
                for key in SHARED_ARGS {
                    map.remove(*key);
                }
                Value::Object(map)
            }
            other => other,
        };
        serde_json::from_value(args).map_err(ApiError::from)
    }

    /// Table names and record/file/key ids end up as URL path segments, so
    /// separators and traversal sequences are refused.
    pub fn ensure_identifier(&self, value: &str, label: &str) -> Result<String, ApiError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ApiError::validation(format!(
                "{} must be a non-empty string",
                label
            )));
        }
        if trimmed.chars().count() > MAX_IDENTIFIER_LENGTH {
            return Err(ApiError::validation(format!(
                "{} must be at most {} characters",
                label, MAX_IDENTIFIER_LENGTH
            )));
        }
        if trimmed.contains(['/', '\\', '?', '#', '\0']) || trimmed.contains("..") {
            return Err(ApiError::validation(format!(
                "{} contains invalid characters",
                label
            )));
        }
        Ok(trimmed.to_string())
    }

    pub fn ensure_string(&self, value: &str, label: &str, max_chars: usize) -> Result<String, ApiError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ApiError::validation(format!(
                "{} must be a non-empty string",
                label
            )));
        }
        if trimmed.chars().count() > max_chars {
            return Err(ApiError::validation(format!(
                "{} must be at most {} characters",
                label, max_chars
            )));
        }
        Ok(trimmed.to_string())
    }

    /// Trims optional text; blank becomes `None`.
    pub fn optional_text(&self, value: Option<String>) -> Option<String> {
        value
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }

    pub fn optional_limited(
        &self,
        value: Option<String>,
        label: &str,
        max_chars: usize,
    ) -> Result<Option<String>, ApiError> {
        match self.optional_text(value) {
            Some(text) if text.chars().count() > max_chars => Err(ApiError::validation(format!(
                "{} must be at most {} characters",
                label, max_chars
            ))),
            other => Ok(other),
        }
    }

    pub fn ensure_fields(&self, value: &Map<String, Value>, label: &str) -> Result<(), ApiError> {
        if value.is_empty() {
            return Err(ApiError::validation(format!(
                "{} must contain at least one field",
                label
            )));
        }
        Ok(())
    }

    pub fn ensure_top(&self, value: Option<u64>) -> Result<u64, ApiError> {
        let top = value.unwrap_or(DEFAULT_PAGE_SIZE);
        if top == 0 || top > MAX_PAGE_SIZE {
            return Err(ApiError::validation(format!(
                "top must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(top)
    }
}
