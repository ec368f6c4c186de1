use crate::config::Config;
use crate::errors::ApiError;
use crate::managers::apikeys::ApiKeysManager;
use crate::managers::events::EventsManager;
use crate::managers::files::FilesManager;
use crate::managers::tables::TablesManager;
use crate::managers::user::UserManager;
use crate::mcp::catalog::tool_catalog;
use crate::services::client::{ApiClient, ClientOptions};
use crate::services::logger::Logger;
use crate::services::tool_executor::{route, ToolExecutor, ToolHandler};
use crate::services::validation::Validation;
use std::collections::HashMap;
use std::sync::Arc;

pub struct App {
    pub config: Config,
    pub logger: Logger,
    pub client: Arc<ApiClient>,
    pub tool_executor: Arc<ToolExecutor>,
}

impl App {
    fn validate_tool_wiring(handlers: &HashMap<String, Arc<dyn ToolHandler>>) -> Result<(), ApiError> {
        let mut missing: Vec<String> = tool_catalog()
            .iter()
            .filter(|tool| {
                route(&tool.name)
                    .map(|(family, _)| !handlers.contains_key(family))
                    .unwrap_or(true)
            })
            .map(|tool| tool.name.clone())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(ApiError::api(format!(
            "Tool wiring is incomplete, no handler for: {}",
            missing.join(", ")
        )))
    }

    /// Builds the one API client for this process from `config`. Fails when
    /// no usable authentication is configured.
    pub fn initialize(config: Config) -> Result<Self, ApiError> {
        let logger = Logger::new("method-mcp", config.log_level);
        let client = ApiClient::new(&config, ClientOptions::default(), logger.child("client"))?;
        Self::with_client(config, Arc::new(client))
    }

    /// Wires the tool families around an already-built client.
    pub fn with_client(config: Config, client: Arc<ApiClient>) -> Result<Self, ApiError> {
        let logger = Logger::new("method-mcp", config.log_level);
        let validation = Validation::new();

        let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
        handlers.insert(
            "tables".to_string(),
            Arc::new(TablesManager::new(logger.clone(), validation.clone(), client.clone())),
        );
        handlers.insert(
            "files".to_string(),
            Arc::new(FilesManager::new(logger.clone(), validation.clone(), client.clone())),
        );
        handlers.insert(
            "user".to_string(),
            Arc::new(UserManager::new(logger.clone(), validation.clone(), client.clone())),
        );
        handlers.insert(
            "events".to_string(),
            Arc::new(EventsManager::new(logger.clone(), validation.clone(), client.clone())),
        );
        handlers.insert(
            "apikeys".to_string(),
            Arc::new(ApiKeysManager::new(logger.clone(), validation, client.clone())),
        );
        Self::validate_tool_wiring(&handlers)?;

        let tool_executor = Arc::new(ToolExecutor::new(logger.clone(), handlers));
        Ok(Self {
            config,
            logger,
            client,
            tool_executor,
        })
    }
}
