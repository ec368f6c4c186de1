mod api_error;
mod client_error;
mod mcp_error;
pub mod translate;

pub use api_error::{ApiError, ApiErrorKind};
pub use client_error::ClientError;
pub use mcp_error::{ErrorCode, McpError};
pub use translate::{translate, ErrorCategory, NormalizedError};
