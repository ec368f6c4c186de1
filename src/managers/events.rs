use crate::errors::ApiError;
use crate::managers::{counted_title, first_present, list_payload, success_banner};
use crate::mcp::envelope::{format_json_response, ResponseFormat};
use crate::services::client::{ApiClient, QueryParams};
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::markdown::{self, pretty_json};
use crate::utils::pagination::Page;
use crate::utils::text::scalar_text;
use crate::utils::tool_errors::unknown_action_error;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

const EVENT_ACTIONS: &[&str] = &[
    "create_routine",
    "list_routines",
    "get_routine",
    "delete_routine",
];
const ROUTINES_ENDPOINT: &str = "eda/event-routines";
const MAX_NAME_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRoutineInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub trigger_config: Map<String, Value>,
    pub actions: Vec<Map<String, Value>>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListRoutinesInput {
    #[serde(default)]
    pub top: Option<u64>,
    #[serde(default)]
    pub skip: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutineIdInput {
    pub routine_id: String,
}

/// Full Markdown view of one routine.
pub fn render_routine_markdown(routine: &Value) -> String {
    let name = scalar_text(&first_present(routine, &["Name"]));
    let status = match first_present(routine, &["Enabled", "IsEnabled"]) {
        Value::Bool(false) => "❌ Disabled",
        _ => "✅ Enabled",
    };
    let mut out = vec![
        format!("# Event Routine: {}", if name.is_empty() { "Unnamed" } else { name.as_str() }),
        String::new(),
        format!("**Status**: {}", status),
    ];
    if let Some(description) = routine
        .get("Description")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
    {
        out.push(format!("**Description**: {}", description));
    }

    out.push(String::new());
    out.push("## Trigger Configuration".to_string());
    out.push(String::new());
    out.push(format!(
        "```json\n{}\n```",
        pretty_json(&first_present(routine, &["TriggerConfig"]))
    ));

    out.push(String::new());
    out.push("## Actions".to_string());
    out.push(String::new());
    match routine.get("Actions").and_then(Value::as_array) {
        Some(actions) if !actions.is_empty() => {
            for (index, action) in actions.iter().enumerate() {
                out.push(format!("{}. `{}`", index + 1, action));
            }
        }
        _ => out.push("No actions configured.".to_string()),
    }

    let metadata: Map<String, Value> = ["Id", "CreatedDate", "ModifiedDate", "CreatedBy"]
        .iter()
        .filter_map(|key| {
            routine
                .get(*key)
                .filter(|value| !value.is_null())
                .map(|value| (key.to_string(), value.clone()))
        })
        .collect();
    if !metadata.is_empty() {
        out.push(String::new());
        out.push("## Metadata".to_string());
        out.push(String::new());
        out.push(markdown::field_lines(&Value::Object(metadata)));
    }
    out.join("\n")
}

/// Event routines (`eda/event-routines`): triggers plus ordered actions.
#[derive(Clone)]
pub struct EventsManager {
    logger: Logger,
    validation: Validation,
    client: Arc<ApiClient>,
}

impl EventsManager {
    pub fn new(logger: Logger, validation: Validation, client: Arc<ApiClient>) -> Self {
        Self {
            logger: logger.child("events"),
            validation,
            client,
        }
    }

    pub async fn handle_action(&self, action: &str, args: Value) -> Result<String, ApiError> {
        let format = ResponseFormat::from_args(&args);
        match action {
            "create_routine" => self.create_routine(self.validation.parse_input(args)?, format).await,
            "list_routines" => self.list_routines(self.validation.parse_input(args)?, format).await,
            "get_routine" => self.get_routine(self.validation.parse_input(args)?, format).await,
            "delete_routine" => self.delete_routine(self.validation.parse_input(args)?, format).await,
            _ => Err(unknown_action_error("events", action, EVENT_ACTIONS)),
        }
    }

    pub async fn create_routine(
        &self,
        input: CreateRoutineInput,
        format: ResponseFormat,
    ) -> Result<String, ApiError> {
        let name = self.validation.ensure_string(&input.name, "name", MAX_NAME_CHARS)?;
        let description = self.validation.optional_limited(
            input.description,
            "description",
            MAX_DESCRIPTION_CHARS,
        )?;
        if input.actions.is_empty() {
            return Err(ApiError::validation("actions must contain at least one action"));
        }
        let enabled = input.enabled.unwrap_or(true);
        let actions: Vec<Value> = input.actions.into_iter().map(Value::Object).collect();
        let trigger_config = Value::Object(input.trigger_config);

        let mut body = serde_json::json!({
            "Name": name,
            "TriggerConfig": trigger_config,
            "Actions": actions,
            "Enabled": enabled,
        });
        if let (Some(map), Some(text)) = (body.as_object_mut(), description.as_ref()) {
            map.insert("Description".to_string(), Value::String(text.clone()));
        }
        let created = self.client.post(ROUTINES_ENDPOINT, body).await?;
        self.logger.info(
            "event routine created",
            Some(&serde_json::json!({"name": name, "actions": actions.len()})),
        );

        let data = serde_json::json!({
            "RoutineId": first_present(&created, &["Id", "RoutineId"]),
            "Name": name,
            "Description": description,
            "TriggerConfig": trigger_config,
            "Actions": actions,
            "Enabled": enabled,
            "CreatedAt": first_present(&created, &["CreatedDate", "CreatedAt"]),
        });
        let message = format!("Event routine '{}' created successfully", name);
        Ok(match format {
            ResponseFormat::Json => format_json_response(data, true, Some(&message)),
            ResponseFormat::Markdown => format!(
                "{}\n\n{}",
                success_banner("Event Routine Created"),
                markdown::field_lines(&data)
            ),
        })
    }

    pub async fn list_routines(
        &self,
        input: ListRoutinesInput,
        format: ResponseFormat,
    ) -> Result<String, ApiError> {
        let top = self.validation.ensure_top(input.top)?;
        let skip = input.skip.unwrap_or(0);
        let mut params = QueryParams::new();
        params.insert("$top".to_string(), Value::from(top));
        params.insert("$skip".to_string(), Value::from(skip));

        let response = self.client.get(ROUTINES_ENDPOINT, params).await?;
        let page = Page::from_response(&response);
        let pagination = page.pagination(skip, top);

        match format {
            ResponseFormat::Json => Ok(format_json_response(
                list_payload(&pagination, "routines", page.records),
                true,
                None,
            )),
            ResponseFormat::Markdown => {
                if page.records.is_empty() {
                    return Ok("# Event Routines\n\nNo event routines configured.".to_string());
                }
                Ok(format!(
                    "{}\n\n{}",
                    markdown::list(
                        &counted_title("Event Routines", &pagination, ""),
                        &page.records,
                        Some("Name")
                    ),
                    pagination.footer()
                ))
            }
        }
    }

    pub async fn get_routine(&self, input: RoutineIdInput, format: ResponseFormat) -> Result<String, ApiError> {
        let routine_id = self.validation.ensure_identifier(&input.routine_id, "routine_id")?;
        let routine = self
            .client
            .get(&format!("{}/{}", ROUTINES_ENDPOINT, routine_id), QueryParams::new())
            .await?;
        Ok(match format {
            ResponseFormat::Json => {
                format_json_response(routine, true, Some("Event routine retrieved successfully"))
            }
            ResponseFormat::Markdown => render_routine_markdown(&routine),
        })
    }

    pub async fn delete_routine(&self, input: RoutineIdInput, format: ResponseFormat) -> Result<String, ApiError> {
        let routine_id = self.validation.ensure_identifier(&input.routine_id, "routine_id")?;
        self.client
            .delete(&format!("{}/{}", ROUTINES_ENDPOINT, routine_id))
            .await?;

        let data = serde_json::json!({
            "RoutineId": routine_id,
            "Status": "Deleted",
            "Message": format!("Event routine {} has been permanently deleted", routine_id),
            "Warning": "This cannot be undone. The routine will no longer run when its trigger fires.",
            "NextSteps": [
                "Check that no workflow still depends on this routine",
                "Use method_events_create_routine to recreate it if needed",
            ],
        });
        Ok(match format {
            ResponseFormat::Json => {
                format_json_response(data, true, Some("Event routine deleted successfully"))
            }
            ResponseFormat::Markdown => format!(
                "{}\n\n{}",
                success_banner("Event Routine Deleted"),
                markdown::field_lines(&data)
            ),
        })
    }
}

#[async_trait]
impl ToolHandler for EventsManager {
    async fn handle(&self, action: &str, args: Value) -> Result<String, ApiError> {
        self.handle_action(action, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn routine_markdown_shows_status_trigger_and_actions() {
        let rendered = render_routine_markdown(&json!({
            "Id": 12,
            "Name": "Welcome email",
            "Enabled": false,
            "TriggerConfig": {"table": "Customer", "event": "created"},
            "Actions": [{"type": "email"}, {"type": "task"}],
        }));
        assert!(rendered.starts_with("# Event Routine: Welcome email\n\n**Status**: ❌ Disabled"));
        assert!(rendered.contains("\"event\": \"created\""));
        assert!(rendered.contains("1. `{\"type\":\"email\"}`"));
        assert!(rendered.contains("2. `{\"type\":\"task\"}`"));
        assert!(rendered.contains("## Metadata\n\n- **Id**: 12"));
    }
}
