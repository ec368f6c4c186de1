use crate::errors::ApiError;
use crate::managers::{counted_title, first_present, list_payload, success_banner};
use crate::mcp::envelope::{format_json_response, ResponseFormat};
use crate::services::client::{ApiClient, QueryParams};
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::markdown;
use crate::utils::pagination::Page;
use crate::utils::redact::{mask_record_secrets, mask_secret};
use crate::utils::tool_errors::unknown_action_error;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

const APIKEY_ACTIONS: &[&str] = &["create", "list", "update", "delete"];
const MAX_NAME_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 500;
const SECURITY_NOTE: &str =
    "API key values are masked. The full key is only shown once, when it is created.";
const NO_UPDATE_FIELDS: &str = "No fields provided for update. Provide at least one of: name, description, permissions, is_active.";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateKeyInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListKeysInput {
    #[serde(default)]
    pub top: Option<u64>,
    #[serde(default)]
    pub skip: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateKeyInput {
    pub key_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyIdInput {
    pub key_id: String,
}

/// Masks every credential-looking field and fills `MaskedKey` from the raw
/// `ApiKey`/`Key` value when the API did not send one.
pub fn mask_key_record(record: &mut Value) {
    let raw = ["ApiKey", "Key"]
        .iter()
        .find_map(|key| record.get(*key).and_then(Value::as_str))
        .map(mask_secret);
    if let Some(map) = record.as_object_mut() {
        if let Some(masked) = raw {
            map.entry("MaskedKey".to_string())
                .or_insert_with(|| Value::String(masked.clone()));
            if map.get("Key").map(Value::is_string).unwrap_or(false) {
                map.insert("Key".to_string(), Value::String(masked));
            }
        }
    }
    mask_record_secrets(record);
}

/// Administration of account API keys (`apikeys`).
#[derive(Clone)]
pub struct ApiKeysManager {
    logger: Logger,
    validation: Validation,
    client: Arc<ApiClient>,
}

impl ApiKeysManager {
    pub fn new(logger: Logger, validation: Validation, client: Arc<ApiClient>) -> Self {
        Self {
            logger: logger.child("apikeys"),
            validation,
            client,
        }
    }

    pub async fn handle_action(&self, action: &str, args: Value) -> Result<String, ApiError> {
        let format = ResponseFormat::from_args(&args);
        match action {
            "create" => self.create(self.validation.parse_input(args)?, format).await,
            "list" => self.list(self.validation.parse_input(args)?, format).await,
            "update" => self.update(self.validation.parse_input(args)?, format).await,
            "delete" => self.delete(self.validation.parse_input(args)?, format).await,
            _ => Err(unknown_action_error("apikeys", action, APIKEY_ACTIONS)),
        }
    }

    pub async fn create(&self, input: CreateKeyInput, format: ResponseFormat) -> Result<String, ApiError> {
        let name = self.validation.ensure_string(&input.name, "name", MAX_NAME_CHARS)?;
        let description = self.validation.optional_limited(
            input.description,
            "description",
            MAX_DESCRIPTION_CHARS,
        )?;

        let mut body = Map::new();
        body.insert("Name".to_string(), Value::String(name.clone()));
        if let Some(text) = description.as_ref() {
            body.insert("Description".to_string(), Value::String(text.clone()));
        }
        if let Some(permissions) = input.permissions.as_ref() {
            body.insert("Permissions".to_string(), serde_json::json!(permissions));
        }
        let created = self.client.post("apikeys", Value::Object(body)).await?;
        self.logger.info("api key created", Some(&serde_json::json!({"name": name})));

        let data = serde_json::json!({
            "KeyId": first_present(&created, &["Id", "KeyId"]),
            "Name": name,
            "Description": description,
            "ApiKey": first_present(&created, &["ApiKey", "Key"]),
            "Permissions": first_present(&created, &["Permissions"]),
            "CreatedAt": first_present(&created, &["CreatedDate", "CreatedAt"]),
            "CreatedBy": first_present(&created, &["CreatedBy"]),
            "Warning": "Store this API key securely now. It will not be shown again.",
            "SecurityTips": [
                "Keep the key in a secret manager or environment variable, never in source control",
                "Grant only the permissions the integration needs",
                "Rotate keys regularly and revoke unused ones",
            ],
        });
        let message = format!("API key '{}' created successfully", name);
        Ok(match format {
            ResponseFormat::Json => format_json_response(data, true, Some(&message)),
            ResponseFormat::Markdown => format!(
                "{}\n\n{}",
                success_banner("API Key Created"),
                markdown::field_lines(&data)
            ),
        })
    }

    pub async fn list(&self, input: ListKeysInput, format: ResponseFormat) -> Result<String, ApiError> {
        let top = self.validation.ensure_top(input.top)?;
        let skip = input.skip.unwrap_or(0);
        let mut params = QueryParams::new();
        params.insert("$top".to_string(), Value::from(top));
        params.insert("$skip".to_string(), Value::from(skip));

        let response = self.client.get("apikeys", params).await?;
        let mut page = Page::from_response(&response);
        page.records.iter_mut().for_each(mask_key_record);
        let pagination = page.pagination(skip, top);

        match format {
            ResponseFormat::Json => {
                let mut data = list_payload(&pagination, "api_keys", page.records);
                if let Some(map) = data.as_object_mut() {
                    map.insert(
                        "security_note".to_string(),
                        Value::String(SECURITY_NOTE.to_string()),
                    );
                }
                Ok(format_json_response(data, true, None))
            }
            ResponseFormat::Markdown => {
                if page.records.is_empty() {
                    return Ok("# API Keys\n\nNo API keys found.".to_string());
                }
                Ok(format!(
                    "{}\n\n{}\n\n> {}",
                    markdown::list(
                        &counted_title("API Keys", &pagination, ""),
                        &page.records,
                        Some("Name")
                    ),
                    pagination.footer(),
                    SECURITY_NOTE
                ))
            }
        }
    }

    pub async fn update(&self, input: UpdateKeyInput, format: ResponseFormat) -> Result<String, ApiError> {
        let key_id = self.validation.ensure_identifier(&input.key_id, "key_id")?;

        let mut body = Map::new();
        if let Some(name) = self.validation.optional_limited(input.name, "name", MAX_NAME_CHARS)? {
            body.insert("Name".to_string(), Value::String(name));
        }
        if let Some(text) = self.validation.optional_limited(
            input.description,
            "description",
            MAX_DESCRIPTION_CHARS,
        )? {
            body.insert("Description".to_string(), Value::String(text));
        }
        if let Some(permissions) = input.permissions {
            body.insert("Permissions".to_string(), serde_json::json!(permissions));
        }
        if let Some(active) = input.is_active {
            body.insert("IsActive".to_string(), Value::Bool(active));
        }
        if body.is_empty() {
            return Err(ApiError::validation(NO_UPDATE_FIELDS));
        }

        let updated_fields: Vec<String> = body.keys().cloned().collect();
        let mut result = self
            .client
            .put(&format!("apikeys/{}", key_id), Value::Object(body))
            .await?;
        mask_key_record(&mut result);

        let data = serde_json::json!({
            "KeyId": key_id,
            "UpdatedFields": updated_fields,
            "Result": result,
        });
        Ok(match format {
            ResponseFormat::Json => {
                format_json_response(data, true, Some("API key updated successfully"))
            }
            ResponseFormat::Markdown => format!(
                "{}\n\n{}",
                success_banner("API Key Updated"),
                markdown::field_lines(&data)
            ),
        })
    }

    pub async fn delete(&self, input: KeyIdInput, format: ResponseFormat) -> Result<String, ApiError> {
        let key_id = self.validation.ensure_identifier(&input.key_id, "key_id")?;
        self.client.delete(&format!("apikeys/{}", key_id)).await?;
        self.logger.info("api key revoked", Some(&serde_json::json!({"key_id": key_id})));

        let data = serde_json::json!({
            "KeyId": key_id,
            "Status": "Revoked",
            "Message": format!("API key {} has been revoked", key_id),
            "Warning": "Any application still using this key loses access immediately.",
            "NextSteps": [
                "Update integrations that used this key",
                "Create a replacement with method_apikeys_create if needed",
            ],
        });
        Ok(match format {
            ResponseFormat::Json => {
                format_json_response(data, true, Some("API key deleted successfully"))
            }
            ResponseFormat::Markdown => format!(
                "{}\n\n{}",
                success_banner("API Key Revoked"),
                markdown::field_lines(&data)
            ),
        })
    }
}

#[async_trait]
impl ToolHandler for ApiKeysManager {
    async fn handle(&self, action: &str, args: Value) -> Result<String, ApiError> {
        self.handle_action(action, args).await
    }
}
