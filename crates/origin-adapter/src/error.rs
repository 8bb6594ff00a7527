//! Error types for origin resolution.

use agentic_openapi_tools::OpenApiToolsError;
use std::time::Duration;
use thiserror::Error;

/// Main error type for origin resolution.
///
/// Resolution is all-or-nothing: every variant aborts it.
#[derive(Error, Debug)]
pub enum OriginAdapterError {
    /// `OpenAPI` pipeline errors (loading, lint, `$ref`, invariant violations).
    #[error(transparent)]
    OpenApi(#[from] OpenApiToolsError),

    /// MCP transport or handshake failures.
    #[error("MCP error for '{url}': {message}")]
    Mcp { url: String, message: String },

    #[error("Unknown origin type '{0}' (expected openapi, mcp or raw)")]
    UnknownOriginType(String),

    /// Configuration errors (missing fields, bad URLs).
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Timed out after {after:?} while {what} ({url})")]
    Timeout {
        what: &'static str,
        url: String,
        after: Duration,
    },

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for origin resolution.
pub type Result<T> = std::result::Result<T, OriginAdapterError>;
