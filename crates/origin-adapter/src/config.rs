//! Origin adapter configuration.

use crate::error::{OriginAdapterError, Result};
use agentic_openapi_tools::{OpenApiSourceConfig, SpecLoadOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// How the gateway talks to an upstream API. Tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OriginAdapterConfig {
    OpenApi(OpenApiOrigin),
    Mcp(McpOrigin),
    Raw(RawOrigin),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenApiOrigin {
    pub url: Url,
    #[serde(flatten)]
    pub source: OpenApiSourceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpOrigin {
    pub url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrigin {
    pub url: Url,
}

impl OriginAdapterConfig {
    pub const TYPES: [&'static str; 3] = ["openapi", "mcp", "raw"];

    /// Parse and validate an origin config from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`OriginAdapterError::UnknownOriginType`] for an unrecognized `type` and
    /// [`OriginAdapterError::InvalidConfig`] for anything else that does not validate.
    pub fn from_value(value: Value) -> Result<Self> {
        let origin_type = value
            .get("type")
            .ok_or_else(|| OriginAdapterError::InvalidConfig("missing 'type'".to_string()))?;
        let Some(origin_type) = origin_type.as_str() else {
            return Err(OriginAdapterError::UnknownOriginType(origin_type.to_string()));
        };
        if !Self::TYPES.contains(&origin_type) {
            return Err(OriginAdapterError::UnknownOriginType(origin_type.to_string()));
        }

        let config: Self = serde_json::from_value(value)
            .map_err(|e| OriginAdapterError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// See [`OriginAdapterConfig::from_value`].
    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            OriginAdapterConfig::OpenApi(_) => "openapi",
            OriginAdapterConfig::Mcp(_) => "mcp",
            OriginAdapterConfig::Raw(_) => "raw",
        }
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        match self {
            OriginAdapterConfig::OpenApi(o) => &o.url,
            OriginAdapterConfig::Mcp(o) => &o.url,
            OriginAdapterConfig::Raw(o) => &o.url,
        }
    }

    /// # Errors
    ///
    /// Returns [`OriginAdapterError::InvalidConfig`] if the URL is not http(s) or an `openapi`
    /// origin has an empty `spec`.
    pub fn validate(&self) -> Result<()> {
        let url = self.url();
        if !matches!(url.scheme(), "http" | "https") {
            return Err(OriginAdapterError::InvalidConfig(format!(
                "origin url must be http or https, got '{url}'"
            )));
        }
        if let OriginAdapterConfig::OpenApi(origin) = self
            && origin.source.spec.trim().is_empty()
        {
            return Err(OriginAdapterError::InvalidConfig(
                "openapi origin requires a non-empty 'spec'".to_string(),
            ));
        }
        Ok(())
    }
}

/// Limits for one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub spec: SpecLoadOptions,
    /// Bound on the whole MCP handshake + `tools/list`.
    pub mcp_timeout: Duration,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            spec: SpecLoadOptions::default(),
            mcp_timeout: Duration::from_secs(30),
        }
    }
}
