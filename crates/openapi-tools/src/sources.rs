//! Parameter sources: the part of an HTTP request a tool input field is serialized into.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Where a tool input field lives in the outbound HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterSource {
    Query,
    Header,
    Path,
    Cookie,
    Body,
    FormData,
}

impl ParameterSource {
    /// Every source, in the order fragments are merged.
    pub const ALL: [ParameterSource; 6] = [
        ParameterSource::Query,
        ParameterSource::Header,
        ParameterSource::Path,
        ParameterSource::Cookie,
        ParameterSource::Body,
        ParameterSource::FormData,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterSource::Query => "query",
            ParameterSource::Header => "header",
            ParameterSource::Path => "path",
            ParameterSource::Cookie => "cookie",
            ParameterSource::Body => "body",
            ParameterSource::FormData => "formData",
        }
    }

    /// Parse the `in` field of an `OpenAPI` (or legacy Swagger) Parameter Object.
    #[must_use]
    pub fn from_location(location: &str) -> Option<Self> {
        match location {
            "query" => Some(ParameterSource::Query),
            "header" => Some(ParameterSource::Header),
            "path" => Some(ParameterSource::Path),
            "cookie" => Some(ParameterSource::Cookie),
            "body" => Some(ParameterSource::Body),
            "formData" => Some(ParameterSource::FormData),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field name -> source, one per operation.
///
/// Every key of an operation's merged `properties` has exactly one entry here. Keys are sorted so
/// that serialized routing tables are byte-identical across runs.
pub type SourceMap = BTreeMap<String, ParameterSource>;
