use crate::app::App;
use crate::constants::protocol::{PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION};
use crate::errors::{ErrorCode, McpError};
use crate::mcp::catalog::{list_tools, validate_tool_args};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::services::logger::Logger;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

pub struct McpServer {
    app: Arc<App>,
    logger: Logger,
}

impl McpServer {
    pub fn new(app: Arc<App>) -> Self {
        let logger = app.logger.child("server");
        Self { app, logger }
    }

    fn handle_initialize(&self) -> Value {
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
        })
    }

    fn handle_tools_list(&self) -> Value {
        serde_json::json!({ "tools": list_tools() })
    }

    async fn handle_tools_call(&self, params: &Value) -> Result<Value, McpError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("");
        if name.is_empty() {
            return Err(McpError::invalid_params("Missing tool name"));
        }
        let args = match params.get("arguments") {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(value) => value.clone(),
        };
        validate_tool_args(name, &args)?;

        let output = self.app.tool_executor.execute(name, args).await;
        Ok(serde_json::json!({
            "content": [ { "type": "text", "text": output.text } ],
            "isError": output.is_error,
        }))
    }

    /// Dispatches one parsed request. Notifications never get a reply.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            if !request.method.starts_with("notifications/") {
                self.logger.debug(
                    "ignoring request without id",
                    Some(&serde_json::json!({"method": request.method})),
                );
            }
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        let result = match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => self.handle_tools_call(&request.params).await,
            method if method.starts_with("notifications/") => Ok(serde_json::json!({})),
            method => Err(McpError::new(
                ErrorCode::MethodNotFound,
                format!("Method not found: {}", method),
            )),
        };
        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::from_error(id, err),
        })
    }

    /// Parses and dispatches one raw JSON-RPC message.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let parsed: Value = match serde_json::from_str(raw.trim()) {
            Ok(value) => value,
            Err(_) => {
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    ErrorCode::ParseError.as_i32(),
                    "Parse error",
                ))
            }
        };
        let id = parsed.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(parsed) {
            Ok(request) => self.handle_request(request).await,
            Err(_) => Some(JsonRpcResponse::failure(
                id,
                ErrorCode::InvalidRequest.as_i32(),
                "Invalid request",
            )),
        }
    }

    pub async fn run_stdio(&self) -> Result<(), McpError> {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin).lines();
        let mut writer = BufWriter::new(stdout);
        self.logger.info("listening on stdio", None);

        while let Some(line) = reader.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_message(&line).await {
                writer.write_all(response.to_line().as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        Ok(())
    }

    pub fn router(self: Arc<Self>) -> Router {
        Router::new().route("/mcp", post(handle_http_message)).with_state(self)
    }

    /// Serves `POST /mcp` until the listener fails.
    pub async fn run_http(self: Arc<Self>, port: u16) -> Result<(), McpError> {
        let address = format!("0.0.0.0:{}", port);
        let listener = tokio::net::TcpListener::bind(&address).await?;
        self.logger.info(
            "listening on http",
            Some(&serde_json::json!({"address": address, "path": "/mcp"})),
        );
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn handle_http_message(State(server): State<Arc<McpServer>>, body: String) -> Response {
    match server.handle_message(&body).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn server() -> McpServer {
        let config = Config::with_api_key("http://127.0.0.1:9/api/v1/", "test-key");
        McpServer::new(Arc::new(App::initialize(config).expect("app")))
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let response = server()
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .expect("reply");
        let result = response.result.expect("result");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "method_mcp");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let response = server()
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn garbage_is_a_parse_error() {
        let response = server().handle_message("{not json").await.expect("reply");
        assert_eq!(response.error.expect("error").code, -32700);
    }

    #[tokio::test]
    async fn missing_method_is_an_invalid_request() {
        let response = server()
            .handle_message(r#"{"jsonrpc":"2.0","id":4}"#)
            .await
            .expect("reply");
        assert_eq!(response.id, Value::from(4));
        assert_eq!(response.error.expect("error").code, -32600);
    }

    #[tokio::test]
    async fn tools_call_without_name_is_invalid_params() {
        let response = server()
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{}}"#)
            .await
            .expect("reply");
        let error = response.error.expect("error");
        assert_eq!(error.code, -32602);
        assert_eq!(error.message, "Missing tool name");
    }
}
