//! Operation descriptors: the routing fact behind each tool.

use crate::sources::SourceMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP methods that produce tools. `options` and `head` are never considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Patch,
    Trace,
}

impl HttpMethod {
    /// Methods in the order they are visited on a path item.
    pub const ALL: [HttpMethod; 6] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Trace,
    ];

    /// Lowercase key used on an `OpenAPI` Path Item Object.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Trace => "trace",
        }
    }

    #[must_use]
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Trace => reqwest::Method::TRACE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of how to turn a tool call back into an HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    /// Normalized (camelCase) operation id.
    pub operation_id: String,
    pub http_method: HttpMethod,
    /// Raw path template from the document, e.g. `/pets/{petId}`.
    pub path_template: String,
    pub parameter_sources: SourceMap,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl OperationDescriptor {
    /// `GET /pets/{petId}`-style label used in logs and error messages.
    #[must_use]
    pub fn label(&self) -> String {
        operation_label(self.http_method, &self.path_template)
    }
}

#[must_use]
pub fn operation_label(method: HttpMethod, path: &str) -> String {
    format!("{} {}", method.as_str().to_uppercase(), path)
}
