use crate::constants::limits::MAX_RELATED_RECORDS;
use crate::errors::ApiError;
use crate::managers::{counted_title, list_payload, success_banner};
use crate::mcp::envelope::{format_json_response, ResponseFormat};
use crate::services::client::{ApiClient, QueryParams};
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::markdown;
use crate::utils::pagination::Page;
use crate::utils::tool_errors::unknown_action_error;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

const TABLE_ACTIONS: &[&str] = &["query", "get", "create", "update", "delete"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryInput {
    pub table: String,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub select: Option<String>,
    #[serde(default)]
    pub top: Option<u64>,
    #[serde(default)]
    pub skip: Option<u64>,
    #[serde(default)]
    pub orderby: Option<String>,
    #[serde(default)]
    pub expand: Option<String>,
    #[serde(default)]
    pub aggregate: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetInput {
    pub table: String,
    pub record_id: String,
    #[serde(default)]
    pub expand: Option<String>,
    #[serde(default)]
    pub select: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateInput {
    pub table: String,
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub related_records: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateInput {
    pub table: String,
    pub record_id: String,
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub related_records: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteInput {
    pub table: String,
    pub record_id: String,
}

/// CRUD and OData queries over `tables/{table}`.
#[derive(Clone)]
pub struct TablesManager {
    logger: Logger,
    validation: Validation,
    client: Arc<ApiClient>,
}

impl TablesManager {
    pub fn new(logger: Logger, validation: Validation, client: Arc<ApiClient>) -> Self {
        Self {
            logger: logger.child("tables"),
            validation,
            client,
        }
    }

    pub async fn handle_action(&self, action: &str, args: Value) -> Result<String, ApiError> {
        let format = ResponseFormat::from_args(&args);
        match action {
            "query" => self.query(self.validation.parse_input(args)?, format).await,
            "get" => self.get(self.validation.parse_input(args)?, format).await,
            "create" => self.create(self.validation.parse_input(args)?, format).await,
            "update" => self.update(self.validation.parse_input(args)?, format).await,
            "delete" => self.delete(self.validation.parse_input(args)?, format).await,
            _ => Err(unknown_action_error("tables", action, TABLE_ACTIONS)),
        }
    }

    pub async fn query(&self, input: QueryInput, format: ResponseFormat) -> Result<String, ApiError> {
        let table = self.validation.ensure_identifier(&input.table, "table")?;
        let top = self.validation.ensure_top(input.top)?;
        let skip = input.skip.unwrap_or(0);

        let mut params = QueryParams::new();
        let optional = [
            ("$filter", input.filter),
            ("$select", input.select),
            ("$orderby", input.orderby),
            ("$expand", input.expand),
            ("$apply", input.aggregate),
        ];
        for (key, value) in optional {
            if let Some(text) = self.validation.optional_text(value) {
                params.insert(key.to_string(), Value::String(text));
            }
        }
        params.insert("$top".to_string(), Value::from(top));
        if skip > 0 {
            params.insert("$skip".to_string(), Value::from(skip));
        }

        let response = self.client.get(&format!("tables/{}", table), params).await?;
        let page = Page::from_response(&response);
        let pagination = page.pagination(skip, top);
        self.logger.debug(
            "table query",
            Some(&serde_json::json!({
                "table": table,
                "count": pagination.count,
                "has_more": pagination.has_more,
            })),
        );

        match format {
            ResponseFormat::Json => Ok(format_json_response(
                list_payload(&pagination, "records", page.records),
                true,
                None,
            )),
            ResponseFormat::Markdown => {
                if page.records.is_empty() {
                    return Ok(format!(
                        "# Query Results: {}\n\nNo records found matching the query.",
                        table
                    ));
                }
                let title = counted_title(&format!("Query Results: {}", table), &pagination, "records");
                Ok(format!(
                    "{}\n\n{}",
                    markdown::table(&title, &page.records),
                    pagination.footer()
                ))
            }
        }
    }

    pub async fn get(&self, input: GetInput, format: ResponseFormat) -> Result<String, ApiError> {
        let table = self.validation.ensure_identifier(&input.table, "table")?;
        let record_id = self.validation.ensure_identifier(&input.record_id, "record_id")?;

        let mut params = QueryParams::new();
        for (key, value) in [("$expand", input.expand), ("$select", input.select)] {
            if let Some(text) = self.validation.optional_text(value) {
                params.insert(key.to_string(), Value::String(text));
            }
        }
        let record = self
            .client
            .get(&format!("tables/{}/{}", table, record_id), params)
            .await?;

        Ok(match format {
            ResponseFormat::Json => format_json_response(record, true, None),
            ResponseFormat::Markdown => format!(
                "# {} Record: {}\n\n{}",
                table,
                record_id,
                markdown::field_lines(&record)
            ),
        })
    }

    fn record_body(
        &self,
        fields: Map<String, Value>,
        related_records: Option<Vec<Value>>,
    ) -> Result<Value, ApiError> {
        self.validation.ensure_fields(&fields, "fields")?;
        let mut body = fields;
        if let Some(related) = related_records.filter(|items| !items.is_empty()) {
            if related.len() > MAX_RELATED_RECORDS {
                return Err(ApiError::validation(format!(
                    "related_records must contain at most {} items",
                    MAX_RELATED_RECORDS
                )));
            }
            body.insert("RelatedRecords".to_string(), Value::Array(related));
        }
        Ok(Value::Object(body))
    }

    pub async fn create(&self, input: CreateInput, format: ResponseFormat) -> Result<String, ApiError> {
        let table = self.validation.ensure_identifier(&input.table, "table")?;
        let body = self.record_body(input.fields, input.related_records)?;
        let created = self.client.post(&format!("tables/{}", table), body).await?;

        Ok(match format {
            ResponseFormat::Json => {
                format_json_response(created, true, Some("Record created successfully"))
            }
            ResponseFormat::Markdown => format!(
                "{}\n\n{}",
                success_banner("Record Created Successfully"),
                markdown::table(&format!("New {} Record", table), std::slice::from_ref(&created))
            ),
        })
    }

    pub async fn update(&self, input: UpdateInput, format: ResponseFormat) -> Result<String, ApiError> {
        let table = self.validation.ensure_identifier(&input.table, "table")?;
        let record_id = self.validation.ensure_identifier(&input.record_id, "record_id")?;
        let updated_fields: Vec<Value> = input
            .fields
            .keys()
            .map(|key| Value::String(key.clone()))
            .collect();
        let body = self.record_body(input.fields, input.related_records)?;
        let result = self
            .client
            .patch(&format!("tables/{}/{}", table, record_id), body)
            .await?;

        let data = serde_json::json!({
            "RecordId": record_id,
            "Table": table,
            "UpdatedFields": updated_fields,
            "Result": result,
        });
        Ok(match format {
            ResponseFormat::Json => {
                format_json_response(data, true, Some("Record updated successfully"))
            }
            ResponseFormat::Markdown => format!(
                "{}\n\n{}",
                success_banner("Record Updated Successfully"),
                markdown::field_lines(&data)
            ),
        })
    }

    pub async fn delete(&self, input: DeleteInput, format: ResponseFormat) -> Result<String, ApiError> {
        let table = self.validation.ensure_identifier(&input.table, "table")?;
        let record_id = self.validation.ensure_identifier(&input.record_id, "record_id")?;
        self.client
            .delete(&format!("tables/{}/{}", table, record_id))
            .await?;

        let data = serde_json::json!({
            "RecordId": record_id,
            "Table": table,
            "DeletedAt": "now",
        });
        Ok(match format {
            ResponseFormat::Json => {
                format_json_response(data, true, Some("Record deleted successfully"))
            }
            ResponseFormat::Markdown => format!(
                "{}\n\n{}",
                success_banner("Record Deleted Successfully"),
                markdown::field_lines(&data)
            ),
        })
    }
}

#[async_trait]
impl ToolHandler for TablesManager {
    async fn handle(&self, action: &str, args: Value) -> Result<String, ApiError> {
        self.handle_action(action, args).await
    }
}
