use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::constants::protocol::TOOL_PREFIX;
use crate::errors::{translate, ApiError, ClientError};
use crate::mcp::envelope::{format_error_response, ResponseFormat};
use crate::services::logger::Logger;

use serde_json::Value;

/// One tool family (`tables`, `files`, ...). `action` is the rest of the
/// tool name after the family prefix.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, action: &str, args: Value) -> Result<String, ApiError>;
}

/// What a tool call hands back to the protocol layer. Never an `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

#[derive(Clone)]
pub struct ToolExecutor {
    logger: Logger,
    handlers: Arc<HashMap<String, Arc<dyn ToolHandler>>>,
}

/// `method_files_get_url` → `("files", "get_url")`.
pub fn route(tool: &str) -> Option<(&str, &str)> {
    tool.strip_prefix(TOOL_PREFIX)?
        .split_once('_')
        .filter(|(family, action)| !family.is_empty() && !action.is_empty())
}

impl ToolExecutor {
    pub fn new(logger: Logger, handlers: HashMap<String, Arc<dyn ToolHandler>>) -> Self {
        Self {
            logger: logger.child("executor"),
            handlers: Arc::new(handlers),
        }
    }

    pub fn handles(&self, tool: &str) -> bool {
        route(tool)
            .map(|(family, _)| self.handlers.contains_key(family))
            .unwrap_or(false)
    }

    /// Runs a tool and converts every failure into the caller's response
    /// format. Nothing escapes as an error.
    pub async fn execute(&self, tool: &str, args: Value) -> ToolOutput {
        let format = ResponseFormat::from_args(&args);
        let call_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        self.logger.debug(
            "tool call",
            Some(&serde_json::json!({"call_id": call_id, "tool": tool})),
        );

        let handler = route(tool)
            .and_then(|(family, action)| self.handlers.get(family).map(|h| (h.clone(), action)));
        let result = match handler {
            Some((handler, action)) => handler.handle(action, args).await,
            None => Err(ApiError::validation(format!("Unknown tool: {}", tool))),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(text) => {
                self.logger.debug(
                    "tool call finished",
                    Some(&serde_json::json!({
                        "call_id": call_id,
                        "tool": tool,
                        "duration_ms": duration_ms,
                    })),
                );
                ToolOutput {
                    text,
                    is_error: false,
                }
            }
            Err(err) => {
                let normalized = translate(&ClientError::Api(err));
                self.logger.warn(
                    "tool call failed",
                    Some(&serde_json::json!({
                        "call_id": call_id,
                        "tool": tool,
                        "duration_ms": duration_ms,
                        "category": normalized.category,
                    })),
                );
                ToolOutput {
                    text: format_error_response(&normalized, format),
                    is_error: true,
                }
            }
        }
    }
}
