use crate::constants::api::BINARY_CONTENT_TYPE;
use crate::constants::limits::MAX_UPLOAD_BYTES;
use crate::errors::ApiError;
use crate::managers::{counted_title, first_present, list_payload, success_banner};
use crate::mcp::envelope::{format_json_response, ResponseFormat};
use crate::services::client::{ApiClient, QueryParams};
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::services::transport::MultipartForm;
use crate::services::validation::Validation;
use crate::utils::markdown;
use crate::utils::odata::build_query_filter;
use crate::utils::pagination::Page;
use crate::utils::tool_errors::unknown_action_error;
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const FILE_ACTIONS: &[&str] = &[
    "upload",
    "list",
    "download",
    "get_url",
    "update_link",
    "delete",
];
const MAX_FILENAME_CHARS: usize = 255;
const MAX_DESCRIPTION_CHARS: usize = 500;
const URL_LIFETIME: &str = "20 minutes";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadInput {
    pub filename: String,
    pub content: String,
    pub link_table: String,
    pub link_record_id: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListInput {
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub filename_contains: Option<String>,
    #[serde(default)]
    pub top: Option<u64>,
    #[serde(default)]
    pub skip: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadInput {
    pub file_id: String,
    #[serde(default)]
    pub return_content: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileIdInput {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateLinkInput {
    pub file_id: String,
    pub link_table: String,
    pub link_record_id: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Decoded size of a base64 payload, computed from its length so oversize
/// uploads are refused before anything is decoded.
pub fn estimated_decoded_len(encoded: &str) -> usize {
    let trimmed = encoded.trim_end();
    let padding = trimmed.chars().rev().take_while(|c| *c == '=').count().min(2);
    (trimmed.len() / 4 * 3 + (trimmed.len() % 4) * 3 / 4).saturating_sub(padding)
}

fn size_limit_error(size: usize) -> ApiError {
    ApiError::validation(format!(
        "File size ({} bytes) exceeds 50MB limit ({} bytes)",
        size, MAX_UPLOAD_BYTES
    ))
}

/// `42` goes out as a JSON number, anything else as a string.
fn record_id_value(record_id: &str) -> Value {
    record_id
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(record_id.to_string()))
}

fn file_extension(filename: &str) -> Value {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            Value::String(ext.to_lowercase())
        }
        _ => Value::Null,
    }
}

/// Upload, listing, download and linking of file attachments.
#[derive(Clone)]
pub struct FilesManager {
    logger: Logger,
    validation: Validation,
    client: Arc<ApiClient>,
}

impl FilesManager {
    pub fn new(logger: Logger, validation: Validation, client: Arc<ApiClient>) -> Self {
        Self {
            logger: logger.child("files"),
            validation,
            client,
        }
    }

    pub async fn handle_action(&self, action: &str, args: Value) -> Result<String, ApiError> {
        let format = ResponseFormat::from_args(&args);
        match action {
            "upload" => self.upload(self.validation.parse_input(args)?, format).await,
            "list" => self.list(self.validation.parse_input(args)?, format).await,
            "download" => self.download(self.validation.parse_input(args)?, format).await,
            "get_url" => self.get_url(self.validation.parse_input(args)?, format).await,
            "update_link" => self.update_link(self.validation.parse_input(args)?, format).await,
            "delete" => self.delete(self.validation.parse_input(args)?, format).await,
            _ => Err(unknown_action_error("files", action, FILE_ACTIONS)),
        }
    }

    pub async fn upload(&self, input: UploadInput, format: ResponseFormat) -> Result<String, ApiError> {
        let filename = self
            .validation
            .ensure_string(&input.filename, "filename", MAX_FILENAME_CHARS)?;
        let link_table = self.validation.ensure_identifier(&input.link_table, "link_table")?;
        let link_record_id = self
            .validation
            .ensure_identifier(&input.link_record_id, "link_record_id")?;
        let description = self.validation.optional_limited(
            input.description,
            "description",
            MAX_DESCRIPTION_CHARS,
        )?;

        // Line-wrapped (MIME style) base64 is accepted.
        let encoded: String = input
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let estimated = estimated_decoded_len(&encoded);
        if estimated > MAX_UPLOAD_BYTES {
            return Err(size_limit_error(estimated));
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&encoded)
            .map_err(|err| ApiError::validation(format!("Invalid base64 content: {}", err)))?;
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(size_limit_error(bytes.len()));
        }
        let size = bytes.len();

        let mut fields = vec![
            ("table".to_string(), link_table.clone()),
            ("recordId".to_string(), link_record_id.clone()),
        ];
        if let Some(description) = description {
            fields.push(("description".to_string(), description));
        }
        let form = MultipartForm {
            file_field: "file".to_string(),
            file_name: filename.clone(),
            bytes: Bytes::from(bytes),
            fields,
        };

        let uploaded = self.client.upload("files", form).await.map_err(|err| {
            if err.is_status(413) {
                ApiError::validation("File size exceeds 50MB limit or storage quota (10GB) exceeded")
                    .with_status(413)
            } else {
                err
            }
        })?;
        self.logger.info(
            "file uploaded",
            Some(&serde_json::json!({"filename": filename, "size": size, "table": link_table})),
        );

        let data = serde_json::json!({
            "FileId": first_present(&uploaded, &["Id", "FileId", "id"]),
            "Filename": filename,
            "FileExtension": file_extension(&filename),
            "Size": size,
            "LinkedTable": link_table,
            "LinkedRecordId": link_record_id,
            "CreatedBy": first_present(&uploaded, &["CreatedBy"]),
            "UploadedAt": first_present(&uploaded, &["CreatedDate", "UploadedAt"]),
        });
        let message = format!("File '{}' uploaded successfully", filename);
        Ok(match format {
            ResponseFormat::Json => format_json_response(data, true, Some(&message)),
            ResponseFormat::Markdown => format!(
                "{}\n\n{}",
                success_banner("File Uploaded Successfully"),
                markdown::field_lines(&data)
            ),
        })
    }

    pub async fn list(&self, input: ListInput, format: ResponseFormat) -> Result<String, ApiError> {
        let top = self.validation.ensure_top(input.top)?;
        let skip = input.skip.unwrap_or(0);

        let mut clauses: Vec<(&str, Value)> = Vec::new();
        if let Some(table) = self.validation.optional_text(input.table) {
            clauses.push(("LinkTable", Value::String(table)));
        }
        if let Some(record_id) = self.validation.optional_text(input.record_id) {
            clauses.push(("LinkRecordId", Value::String(record_id)));
        }
        if let Some(fragment) = self.validation.optional_text(input.filename_contains) {
            clauses.push(("Filename__contains", Value::String(fragment)));
        }

        let mut params = QueryParams::new();
        if let Some(filter) = build_query_filter(&clauses) {
            params.insert("$filter".to_string(), Value::String(filter));
        }
        params.insert("$top".to_string(), Value::from(top));
        params.insert("$skip".to_string(), Value::from(skip));

        let response = self.client.get("files", params).await?;
        let page = Page::from_response(&response);
        let pagination = page.pagination(skip, top);

        match format {
            ResponseFormat::Json => Ok(format_json_response(
                list_payload(&pagination, "files", page.records),
                true,
                None,
            )),
            ResponseFormat::Markdown => {
                if page.records.is_empty() {
                    return Ok("# Files\n\nNo files found matching the criteria.".to_string());
                }
                let rows: Vec<Value> = page
                    .records
                    .iter()
                    .map(|file| {
                        serde_json::json!({
                            "Filename": first_present(file, &["Filename"]),
                            "Id": first_present(file, &["Id", "FileId"]),
                            "Size": first_present(file, &["Size"]),
                            "LinkedTable": first_present(file, &["LinkTable", "LinkedTable"]),
                            "LinkedRecordId": first_present(file, &["LinkRecordId", "LinkedRecordId"]),
                            "CreatedDate": first_present(file, &["CreatedDate"]),
                        })
                    })
                    .collect();
                Ok(format!(
                    "{}\n\n{}",
                    markdown::list(&counted_title("Files", &pagination, "files"), &rows, Some("Filename")),
                    pagination.footer()
                ))
            }
        }
    }

    pub async fn download(&self, input: DownloadInput, format: ResponseFormat) -> Result<String, ApiError> {
        let file_id = self.validation.ensure_identifier(&input.file_id, "file_id")?;
        let return_content = input.return_content.unwrap_or(true);
        let download = self
            .client
            .download(&format!("files/{}/download", file_id))
            .await?;

        let filename = download.file_name.clone().unwrap_or_else(|| file_id.clone());
        let size = download.bytes.len();
        let content_type = if download.content_type.is_empty() {
            BINARY_CONTENT_TYPE.to_string()
        } else {
            download.content_type.clone()
        };

        let mut data = serde_json::json!({
            "FileId": file_id,
            "Filename": filename,
            "Size": size,
            "ContentType": content_type,
        });
        if let Some(map) = data.as_object_mut() {
            if return_content {
                map.insert(
                    "Content".to_string(),
                    Value::String(base64::engine::general_purpose::STANDARD.encode(&download.bytes)),
                );
            } else {
                map.insert(
                    "Note".to_string(),
                    Value::String(
                        "Content not returned (return_content=false). Use method_files_get_url for a download link."
                            .to_string(),
                    ),
                );
            }
        }

        Ok(match format {
            ResponseFormat::Json => format_json_response(data, true, None),
            ResponseFormat::Markdown => {
                let mut summary = data.clone();
                if let Some(map) = summary.as_object_mut() {
                    if map.remove("Content").is_some() {
                        map.insert(
                            "Content".to_string(),
                            Value::String(format!("base64, {} bytes decoded", size)),
                        );
                    }
                }
                format!(
                    "# File Download: {}\n\n{}",
                    filename,
                    markdown::field_lines(&summary)
                )
            }
        })
    }

    pub async fn get_url(&self, input: FileIdInput, format: ResponseFormat) -> Result<String, ApiError> {
        let file_id = self.validation.ensure_identifier(&input.file_id, "file_id")?;
        let response = self
            .client
            .get(&format!("files/{}/url", file_id), QueryParams::new())
            .await?;
        let url = match &response {
            Value::String(url) => Value::String(url.clone()),
            other => first_present(other, &["Url", "url", "DownloadURL"]),
        };

        let data = serde_json::json!({
            "FileId": file_id,
            "DownloadURL": url,
            "ExpiresIn": URL_LIFETIME,
            "Note": format!("This URL is temporary and expires after {}. Request a new one if it has expired.", URL_LIFETIME),
        });
        Ok(match format {
            ResponseFormat::Json => format_json_response(data, true, None),
            ResponseFormat::Markdown => {
                format!("# File Download URL\n\n{}", markdown::field_lines(&data))
            }
        })
    }

    pub async fn update_link(&self, input: UpdateLinkInput, format: ResponseFormat) -> Result<String, ApiError> {
        let file_id = self.validation.ensure_identifier(&input.file_id, "file_id")?;
        let link_table = self.validation.ensure_identifier(&input.link_table, "link_table")?;
        let link_record_id = self
            .validation
            .ensure_identifier(&input.link_record_id, "link_record_id")?;
        let description = self.validation.optional_limited(
            input.description,
            "description",
            MAX_DESCRIPTION_CHARS,
        )?;

        let mut body = serde_json::json!({
            "tableName": link_table,
            "recordId": record_id_value(&link_record_id),
        });
        if let (Some(map), Some(text)) = (body.as_object_mut(), description.as_ref()) {
            map.insert("description".to_string(), Value::String(text.clone()));
        }
        let updated = self
            .client
            .put(&format!("files/{}/link", file_id), body)
            .await?;

        let data = serde_json::json!({
            "FileId": file_id,
            "Filename": first_present(&updated, &["Filename"]),
            "NewLinkTable": link_table,
            "NewLinkRecordId": link_record_id,
            "Description": description,
        });
        Ok(match format {
            ResponseFormat::Json => {
                format_json_response(data, true, Some("File link updated successfully"))
            }
            ResponseFormat::Markdown => format!(
                "{}\n\n{}",
                success_banner("File Link Updated"),
                markdown::field_lines(&data)
            ),
        })
    }

    pub async fn delete(&self, input: FileIdInput, format: ResponseFormat) -> Result<String, ApiError> {
        let file_id = self.validation.ensure_identifier(&input.file_id, "file_id")?;
        self.client.delete(&format!("files/{}", file_id)).await?;

        let data = serde_json::json!({"FileId": file_id, "DeletedAt": "now"});
        Ok(match format {
            ResponseFormat::Json => {
                format_json_response(data, true, Some("File deleted successfully"))
            }
            ResponseFormat::Markdown => format!(
                "{}\n\n{}",
                success_banner("File Deleted Successfully"),
                markdown::field_lines(&data)
            ),
        })
    }
}

#[async_trait]
impl ToolHandler for FilesManager {
    async fn handle(&self, action: &str, args: Value) -> Result<String, ApiError> {
        self.handle_action(action, args).await
    }
}
