pub mod markdown;
pub mod odata;
pub mod pagination;
pub mod redact;
pub mod text;
pub mod tool_errors;
