//! Error types for `agentic-openapi-tools`.

use crate::sources::ParameterSource;
use thiserror::Error;

/// Main error type for the `OpenAPI` resolution pipeline.
///
/// Invariant violations carry the `label` of the offending operation or path (for example
/// `GET /pets/{petId}`) so callers can surface the message to the end user verbatim.
#[derive(Error, Debug)]
pub enum OpenApiToolsError {
    /// Document-structure errors (missing sections, malformed schema paths).
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    #[error("OpenAPI error: unsupported document version '{0}' (expected OpenAPI 3.x)")]
    UnsupportedVersion(String),

    /// Lint errors that abort loading (warnings are only logged).
    #[error("OpenAPI lint error: {0}")]
    Lint(String),

    #[error("OpenAPI error: failed to fetch spec from '{url}': {message}")]
    SpecFetch { url: String, message: String },

    #[error("OpenAPI error: failed to read spec file '{path}': {source}")]
    SpecReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OpenAPI error: failed to parse OpenAPI spec from '{location}': {source}")]
    SpecParse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("OpenAPI error: spec hash mismatch. Expected: {expected}, Got: {actual}")]
    SpecHashMismatch { expected: String, actual: String },

    /// `$ref` resolution errors (missing document, missing pointer, bad fragment).
    #[error("OpenAPI $ref error: {0}")]
    Ref(String),

    #[error("Cookie parameters are not supported (parameter '{name}' in \"{label}\")")]
    CookieParameter { label: String, name: String },

    #[error(
        "Parameter collision: '{name}' is declared as both a {existing} and a {incoming} parameter in \"{label}\""
    )]
    ParamCollision {
        label: String,
        name: String,
        existing: ParameterSource,
        incoming: ParameterSource,
    },

    #[error(
        "Unsupported {combinator} in {param_source} schema for \"{label}\" (tool inputs must be flat objects)"
    )]
    UnsupportedCombinator {
        label: String,
        param_source: ParameterSource,
        combinator: &'static str,
    },

    #[error("Expected an object schema for {param_source} parameters in \"{label}\", got {found}")]
    NonObjectSchema {
        label: String,
        param_source: ParameterSource,
        found: String,
    },

    #[error("Duplicate operation name '{name}' in \"{label}\" (conflicts with \"{previous}\")")]
    DuplicateOperation {
        label: String,
        name: String,
        previous: String,
    },

    #[error("Duplicate tool name '{name}' (operation \"{label}\")")]
    DuplicateTool { label: String, name: String },

    #[error("Invalid tool '{name}': {message}")]
    InvalidTool { name: String, message: String },

    /// Tool-call arguments that cannot be planned into a request.
    #[error("Invalid tool arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML errors.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for `OpenAPI` tooling operations.
pub type Result<T> = std::result::Result<T, OpenApiToolsError>;
