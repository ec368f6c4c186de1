use crate::errors::ApiError;
use crate::managers::first_present;
use crate::mcp::envelope::{format_json_response, ResponseFormat};
use crate::services::client::{ApiClient, QueryParams};
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::text::scalar_text;
use crate::utils::tool_errors::unknown_action_error;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const USER_ACTIONS: &[&str] = &["get_info"];

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetInfoInput {}

fn shown(value: &Value) -> String {
    if value.is_null() {
        "N/A".to_string()
    } else {
        scalar_text(value)
    }
}

/// Markdown profile of the `me` payload.
pub fn render_user_markdown(user: &Value) -> String {
    let line = |label: &str, keys: &[&str]| format!("- **{}**: {}", label, shown(&first_present(user, keys)));

    let status = match first_present(user, &["IsActive", "Active"]) {
        Value::Bool(true) => "Active",
        Value::Bool(false) => "Inactive",
        _ => "N/A",
    };

    let permissions: Vec<String> = user
        .get("Permissions")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|item| format!("- {}", scalar_text(item))).collect())
        .unwrap_or_default();

    let mut out = vec![
        "# User Information".to_string(),
        String::new(),
        line("Name", &["FullName", "Name"]),
        line("Username", &["UserName", "Username"]),
        line("Email", &["Email"]),
        line("Role", &["Role"]),
        line("Company", &["CompanyName", "Company"]),
        String::new(),
        "## Account Details".to_string(),
        String::new(),
        line("Account ID", &["AccountId", "Id"]),
        format!("- **Status**: {}", status),
        line("Account Created", &["CreatedDate"]),
        line("Last Login", &["LastLoginDate", "LastLogin"]),
        String::new(),
        "## Permissions".to_string(),
        String::new(),
    ];
    if permissions.is_empty() {
        out.push("- None listed".to_string());
    } else {
        out.extend(permissions);
    }
    out.join("\n")
}

#[derive(Clone)]
pub struct UserManager {
    logger: Logger,
    validation: Validation,
    client: Arc<ApiClient>,
}

impl UserManager {
    pub fn new(logger: Logger, validation: Validation, client: Arc<ApiClient>) -> Self {
        Self {
            logger: logger.child("user"),
            validation,
            client,
        }
    }

    pub async fn handle_action(&self, action: &str, args: Value) -> Result<String, ApiError> {
        let format = ResponseFormat::from_args(&args);
        match action {
            "get_info" => {
                let _input: GetInfoInput = self.validation.parse_input(args)?;
                self.get_info(format).await
            }
            _ => Err(unknown_action_error("user", action, USER_ACTIONS)),
        }
    }

    pub async fn get_info(&self, format: ResponseFormat) -> Result<String, ApiError> {
        let user = self.client.get("me", QueryParams::new()).await?;
        self.logger.debug(
            "user info",
            Some(&serde_json::json!({"auth_method": self.client.auth_method()})),
        );
        Ok(match format {
            ResponseFormat::Json => format_json_response(user, true, None),
            ResponseFormat::Markdown => render_user_markdown(&user),
        })
    }
}

#[async_trait]
impl ToolHandler for UserManager {
    async fn handle(&self, action: &str, args: Value) -> Result<String, ApiError> {
        self.handle_action(action, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn markdown_profile_has_sections_and_fallbacks() {
        let rendered = render_user_markdown(&json!({
            "FullName": "Ada Lovelace",
            "Email": "ada@example.com",
            "IsActive": true,
            "Permissions": ["tables.read", "files.write"],
        }));
        assert!(rendered.starts_with("# User Information\n\n- **Name**: Ada Lovelace"));
        assert!(rendered.contains("- **Username**: N/A"));
        assert!(rendered.contains("- **Status**: Active"));
        assert!(rendered.contains("## Permissions\n\n- tables.read\n- files.write"));
    }
}
