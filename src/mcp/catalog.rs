use crate::errors::{ErrorCode, McpError};
use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

const MAX_REPORTED_ERRORS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
}

static TOOL_CATALOG: Lazy<Vec<ToolDef>> = Lazy::new(|| {
    let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tool_catalog.json"));
    serde_json::from_str(raw).expect("tool_catalog.json must be valid JSON")
});

static TOOL_MAP: Lazy<HashMap<String, ToolDef>> = Lazy::new(|| {
    TOOL_CATALOG
        .iter()
        .cloned()
        .map(|tool| (tool.name.clone(), tool))
        .collect()
});

static TOOL_VALIDATORS: Lazy<HashMap<String, JSONSchema>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for tool in TOOL_CATALOG.iter() {
        if let Ok(schema) = JSONSchema::compile(&tool.input_schema) {
            map.insert(tool.name.clone(), schema);
        }
    }
    map
});

pub fn tool_catalog() -> &'static [ToolDef] {
    &TOOL_CATALOG
}

pub fn tool_by_name(name: &str) -> Option<&'static ToolDef> {
    TOOL_MAP.get(name)
}

/// `tools/list` payload entries, in catalogue order.
pub fn list_tools() -> Vec<Value> {
    TOOL_CATALOG
        .iter()
        .map(|tool| serde_json::to_value(tool).unwrap_or(Value::Null))
        .collect()
}

pub fn validate_tool_args(tool_name: &str, args: &Value) -> Result<(), McpError> {
    if tool_by_name(tool_name).is_none() {
        return Err(McpError::invalid_params(format!("Unknown tool: {}", tool_name)));
    }
    let Some(schema) = TOOL_VALIDATORS.get(tool_name) else {
        return Ok(());
    };
    if let Err(errors) = schema.validate(args) {
        let message = format_schema_errors(tool_name, errors);
        return Err(McpError::new(ErrorCode::InvalidParams, message));
    }
    Ok(())
}

fn format_schema_errors(tool_name: &str, errors: jsonschema::ErrorIterator) -> String {
    let mut lines = vec![format!("Invalid arguments for {}", tool_name)];

    for err in errors.take(MAX_REPORTED_ERRORS) {
        let instance_path = if err.instance_path.to_string().is_empty() {
            "(root)".to_string()
        } else {
            err.instance_path.to_string()
        };
        let line = match &err.kind {
            ValidationErrorKind::AdditionalProperties { unexpected } => {
                if unexpected.is_empty() {
                    format!("{}: unknown field", instance_path)
                } else {
                    let names: Vec<String> =
                        unexpected.iter().map(|name| format!("'{}'", name)).collect();
                    format!("{}: unknown field {}", instance_path, names.join(", "))
                }
            }
            ValidationErrorKind::Enum { options } => {
                let allowed: Vec<String> = options
                    .as_array()
                    .map(|arr| {
                        arr.iter()
                            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                            .collect()
                    })
                    .unwrap_or_default();
                if allowed.is_empty() {
                    format!("{}: invalid value", instance_path)
                } else {
                    format!("{}: expected one of {}", instance_path, allowed.join(", "))
                }
            }
            ValidationErrorKind::Required { property } => {
                let prop = property
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| property.to_string());
                format!("{}: missing required field '{}'", instance_path, prop)
            }
            ValidationErrorKind::Type { kind } => {
                format!("{}: expected {}", instance_path, format_type_kind(kind))
            }
            _ => format!("{}: {}", instance_path, err),
        };
        lines.push(format!("- {}", line));
    }
    lines.join("\n")
}

fn format_type_kind(kind: &TypeKind) -> String {
    match kind {
        TypeKind::Single(primitive) => primitive.to_string(),
        TypeKind::Multiple(types) => {
            let list: Vec<String> = (*types).into_iter().map(|t| t.to_string()).collect();
            if list.is_empty() {
                "unknown".to_string()
            } else {
                list.join(" | ")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn catalogue_is_complete_and_prefixed() {
        let tools = tool_catalog();
        assert_eq!(tools.len(), 20);
        for tool in tools {
            assert!(tool.name.starts_with("method_"), "{}", tool.name);
            assert!(TOOL_VALIDATORS.contains_key(&tool.name), "schema for {}", tool.name);
            assert_eq!(tool.input_schema["additionalProperties"], json!(false));
            assert_eq!(
                tool.input_schema["properties"]["response_format"]["enum"],
                json!(["json", "markdown"])
            );
        }
    }

    #[test]
    fn listed_tools_carry_titles_and_annotations() {
        let listed = list_tools();
        let delete = listed
            .iter()
            .find(|tool| tool["name"] == "method_tables_delete")
            .expect("delete tool");
        assert_eq!(delete["title"], "Delete Table Record");
        assert_eq!(delete["annotations"]["destructiveHint"], json!(true));
        assert!(delete.get("inputSchema").is_some());
    }

    #[test]
    fn valid_arguments_pass() {
        validate_tool_args(
            "method_tables_query",
            &json!({"table": "Customer", "top": 5, "response_format": "markdown"}),
        )
        .expect("valid");
    }

    #[test]
    fn violations_are_listed() {
        let err = validate_tool_args(
            "method_tables_query",
            &json!({"top": 500, "tabel": "x", "response_format": "xml"}),
        )
        .expect_err("invalid");
        assert_eq!(err.code, ErrorCode::InvalidParams);
        assert!(err.message.starts_with("Invalid arguments for method_tables_query"));
        assert!(err.message.contains("missing required field 'table'"));
        assert!(err.message.contains("unknown field 'tabel'"));
        assert!(err.message.contains("/response_format: expected one of json, markdown"));
        assert!(err.message.contains("/top"));
    }

    #[test]
    fn wrong_types_are_reported() {
        let err = validate_tool_args("method_files_download", &json!({"file_id": 12}))
            .expect_err("invalid");
        assert!(err.message.contains("/file_id: expected string"));
    }

    #[test]
    fn unknown_tools_are_rejected() {
        let err = validate_tool_args("method_nope", &json!({})).expect_err("unknown");
        assert_eq!(err.message, "Unknown tool: method_nope");
    }
}
