use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where an `OpenAPI` document comes from and how to name its tools.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OpenApiSourceConfig {
    /// Spec location: http(s) URL, `file://` URL, file path, or inline JSON/YAML text.
    pub spec: String,

    /// Origin name. When set, every tool name is prefixed with `snake_case(name)_`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Expected `sha256:<hex>` of the raw spec text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_hash: Option<String>,

    /// Hash policy: warn, fail, or ignore.
    #[serde(default, skip_serializing_if = "HashPolicy::is_default")]
    pub spec_hash_policy: HashPolicy,
}

impl OpenApiSourceConfig {
    #[must_use]
    pub fn new(spec: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            name: None,
            spec_hash: None,
            spec_hash_policy: HashPolicy::default(),
        }
    }
}

/// Hash verification policy.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HashPolicy {
    /// Log warning if hash doesn't match.
    #[default]
    Warn,
    /// Abort resolution if hash doesn't match.
    Fail,
    /// Ignore hash verification.
    Ignore,
}

impl HashPolicy {
    fn is_default(&self) -> bool {
        *self == HashPolicy::Warn
    }
}

/// Limits applied while loading a spec and the documents it references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecLoadOptions {
    /// Per-request timeout for URL sources.
    pub fetch_timeout: Duration,
    /// Maximum size of any single fetched or read document.
    pub max_spec_bytes: usize,
}

impl Default for SpecLoadOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            max_spec_bytes: 10 * 1024 * 1024,
        }
    }
}
