use crate::errors::NormalizedError;
use crate::utils::markdown::pretty_json;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Json,
    Markdown,
}

impl ResponseFormat {
    /// Reads `response_format`; anything other than `markdown` means JSON.
    pub fn from_args(args: &Value) -> Self {
        match args
            .get("response_format")
            .and_then(Value::as_str)
            .map(|raw| raw.trim().to_lowercase())
            .as_deref()
        {
            Some("markdown") | Some("md") => ResponseFormat::Markdown,
            _ => ResponseFormat::Json,
        }
    }

    pub fn is_markdown(self) -> bool {
        self == ResponseFormat::Markdown
    }
}

/// `{success, message?, data}` on success. On failure the `error` member of
/// `data` (or `data` itself as text) becomes the `error` field.
pub fn format_json_response(data: Value, success: bool, message: Option<&str>) -> String {
    let mut envelope = Map::new();
    envelope.insert("success".to_string(), Value::Bool(success));
    if let Some(message) = message.filter(|m| !m.is_empty()) {
        envelope.insert("message".to_string(), Value::String(message.to_string()));
    }
    if success {
        envelope.insert("data".to_string(), data);
    } else {
        let error = match data {
            Value::Object(mut map) if map.contains_key("error") => {
                map.remove("error").unwrap_or(Value::Null)
            }
            Value::String(text) => Value::String(text),
            other => Value::String(other.to_string()),
        };
        envelope.insert("error".to_string(), error);
    }
    pretty_json(&Value::Object(envelope))
}

/// Renders a translated failure for the requested format.
pub fn format_error_response(error: &NormalizedError, format: ResponseFormat) -> String {
    let rendered = error.render();
    match format {
        ResponseFormat::Markdown => rendered,
        ResponseFormat::Json => format_json_response(
            serde_json::json!({ "error": rendered }),
            false,
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCategory;
    use serde_json::json;

    #[test]
    fn success_envelope_round_trips_data() {
        let data = json!({"records": [{"Name": "Acme", "Active": true}], "count": 1});
        let text = format_json_response(data.clone(), true, Some("Query executed"));
        let parsed: Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(parsed["success"], json!(true));
        assert_eq!(parsed["message"], json!("Query executed"));
        assert_eq!(parsed["data"], data);
        assert!(text.contains("\n  \"success\""));
    }

    #[test]
    fn message_is_omitted_when_absent() {
        let parsed: Value =
            serde_json::from_str(&format_json_response(json!([]), true, None)).expect("json");
        assert!(parsed.get("message").is_none());
    }

    #[test]
    fn failure_lifts_error_member() {
        let parsed: Value = serde_json::from_str(&format_json_response(
            json!({"error": "Error: boom"}),
            false,
            None,
        ))
        .expect("json");
        assert_eq!(parsed, json!({"success": false, "error": "Error: boom"}));
    }

    #[test]
    fn error_response_per_format() {
        let err = NormalizedError::new(ErrorCategory::NotFound, "Resource not found - x", "Check ids.");
        assert_eq!(
            format_error_response(&err, ResponseFormat::Markdown),
            "Error: Resource not found - x\nSuggestion: Check ids."
        );
        let parsed: Value =
            serde_json::from_str(&format_error_response(&err, ResponseFormat::Json)).expect("json");
        assert_eq!(parsed["success"], json!(false));
        assert!(parsed["error"].as_str().unwrap_or_default().starts_with("Error: Resource"));
    }

    #[test]
    fn format_selector_defaults_to_json() {
        assert_eq!(ResponseFormat::from_args(&json!({})), ResponseFormat::Json);
        assert_eq!(
            ResponseFormat::from_args(&json!({"response_format": "Markdown"})),
            ResponseFormat::Markdown
        );
        assert_eq!(
            ResponseFormat::from_args(&json!({"response_format": "xml"})),
            ResponseFormat::Json
        );
    }
}
