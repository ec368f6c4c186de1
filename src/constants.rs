pub mod api {
    pub const DEFAULT_BASE_URL: &str = "https://rest.method.me/api/v1/";
    pub const DEFAULT_OAUTH_AUTHORIZE_URL: &str = "https://rest.method.me/oauth/authorize";
    pub const DEFAULT_OAUTH_TOKEN_URL: &str = "https://rest.method.me/oauth/token";
    pub const API_KEY_SCHEME: &str = "APIKey";
    pub const JSON_CONTENT_TYPE: &str = "application/json";
    pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";
}

pub mod env_keys {
    pub const API_KEY: &str = "METHOD_API_KEY";
    pub const CLIENT_ID: &str = "METHOD_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "METHOD_CLIENT_SECRET";
    pub const REDIRECT_URI: &str = "METHOD_REDIRECT_URI";
    pub const OAUTH_AUTHORIZE_URL: &str = "METHOD_OAUTH_AUTHORIZE_URL";
    pub const OAUTH_TOKEN_URL: &str = "METHOD_OAUTH_TOKEN_URL";
    pub const API_BASE_URL: &str = "METHOD_API_BASE_URL";
    pub const REQUEST_TIMEOUT: &str = "METHOD_REQUEST_TIMEOUT";
    pub const MAX_RETRIES: &str = "METHOD_MAX_RETRIES";
    pub const TRANSPORT: &str = "METHOD_TRANSPORT";
    pub const HTTP_PORT: &str = "METHOD_HTTP_PORT";
    pub const DEBUG: &str = "METHOD_DEBUG";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
}

pub mod network {
    pub const TIMEOUT_API_REQUEST_MS: u64 = 30_000;
    pub const DEFAULT_HTTP_PORT: u16 = 8000;
    pub const MAX_REDIRECTS: usize = 10;
}

pub mod retry {
    pub const MAX_ATTEMPTS: usize = 3;
    pub const BASE_DELAY_MS: u64 = 2_000;
    pub const MAX_DELAY_MS: u64 = 10_000;
}

pub mod limits {
    pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
    pub const MAX_RELATED_RECORDS: usize = 50;
    pub const MAX_IDENTIFIER_LENGTH: usize = 100;
    pub const MASK_VISIBLE_CHARS: usize = 4;
    pub const LOG_BODY_PREVIEW_BYTES: usize = 512;
}

pub mod pagination {
    pub const DEFAULT_PAGE_SIZE: u64 = 20;
    pub const MAX_PAGE_SIZE: u64 = 100;
}

pub mod protocol {
    pub const PROTOCOL_VERSION: &str = "2025-06-18";
    pub const SERVER_NAME: &str = "method_mcp";
    pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const TOOL_PREFIX: &str = "method_";
}
