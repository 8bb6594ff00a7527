//! Origin-type dispatch.

use crate::config::{McpOrigin, OpenApiOrigin, OriginAdapterConfig, RawOrigin, ResolveOptions};
use crate::error::{OriginAdapterError, Result};
use crate::mcp::{McpConnector, McpServerInfo, StreamableHttpConnector};
use agentic_openapi_tools::{OpenApiSourceConfig, Tool, ToolToOperationMap, resolve_openapi};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use url::Url;

/// A resolved origin: the config enriched with what resolution discovered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResolvedOriginAdapter {
    OpenApi(ResolvedOpenApiOrigin),
    Mcp(ResolvedMcpOrigin),
    Raw(RawOrigin),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOpenApiOrigin {
    pub url: Url,
    /// `spec` holds the normalized spec JSON text.
    #[serde(flatten)]
    pub source: OpenApiSourceConfig,
    pub tool_to_operation_map: ToolToOperationMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMcpOrigin {
    pub url: Url,
    pub server_info: McpServerInfo,
}

/// Output of one resolution. `tools` is absent for raw origins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedOrigin {
    pub origin: ResolvedOriginAdapter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

impl ResolvedOrigin {
    /// Routing table, for `openapi` origins.
    #[must_use]
    pub fn tool_to_operation_map(&self) -> Option<&ToolToOperationMap> {
        match &self.origin {
            ResolvedOriginAdapter::OpenApi(o) => Some(&o.tool_to_operation_map),
            ResolvedOriginAdapter::Mcp(_) | ResolvedOriginAdapter::Raw(_) => None,
        }
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        match &self.origin {
            ResolvedOriginAdapter::OpenApi(o) => &o.url,
            ResolvedOriginAdapter::Mcp(o) => &o.url,
            ResolvedOriginAdapter::Raw(o) => &o.url,
        }
    }
}

/// Resolves origin configs. Generic over the MCP transport.
#[derive(Debug, Clone)]
pub struct OriginResolver<C = StreamableHttpConnector> {
    options: ResolveOptions,
    connector: C,
}

impl OriginResolver<StreamableHttpConnector> {
    #[must_use]
    pub fn new(options: ResolveOptions) -> Self {
        Self::with_connector(options, StreamableHttpConnector)
    }
}

impl<C: McpConnector> OriginResolver<C> {
    #[must_use]
    pub fn with_connector(options: ResolveOptions, connector: C) -> Self {
        Self { options, connector }
    }

    #[must_use]
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Parse, validate and resolve a JSON origin config.
    ///
    /// # Errors
    ///
    /// See [`OriginAdapterConfig::from_value`] and [`OriginResolver::resolve`].
    pub async fn resolve_value(&self, value: Value) -> Result<ResolvedOrigin> {
        self.resolve(OriginAdapterConfig::from_value(value)?).await
    }

    /// Resolve one origin.
    ///
    /// # Errors
    ///
    /// Any pipeline, transport or configuration error aborts resolution.
    pub async fn resolve(&self, origin: OriginAdapterConfig) -> Result<ResolvedOrigin> {
        origin.validate()?;
        info!(origin_type = origin.type_name(), url = %origin.url(), "Resolving origin");

        match origin {
            OriginAdapterConfig::OpenApi(origin) => self.resolve_openapi(origin).await,
            OriginAdapterConfig::Mcp(origin) => self.resolve_mcp(origin).await,
            OriginAdapterConfig::Raw(origin) => Ok(ResolvedOrigin {
                origin: ResolvedOriginAdapter::Raw(origin),
                tools: None,
            }),
        }
    }

    async fn resolve_openapi(&self, origin: OpenApiOrigin) -> Result<ResolvedOrigin> {
        let OpenApiOrigin { url, source } = origin;
        let resolution = resolve_openapi(&source, self.options.spec).await?;

        Ok(ResolvedOrigin {
            origin: ResolvedOriginAdapter::OpenApi(ResolvedOpenApiOrigin {
                url,
                source: OpenApiSourceConfig {
                    spec: resolution.spec,
                    ..source
                },
                tool_to_operation_map: resolution.tool_to_operation_map,
            }),
            tools: Some(resolution.tools),
        })
    }

    async fn resolve_mcp(&self, origin: McpOrigin) -> Result<ResolvedOrigin> {
        let after = self.options.mcp_timeout;
        let discovery = tokio::time::timeout(after, self.connector.discover(&origin.url))
            .await
            .map_err(|_| OriginAdapterError::Timeout {
                what: "discovering MCP server",
                url: origin.url.to_string(),
                after,
            })??;

        Ok(ResolvedOrigin {
            origin: ResolvedOriginAdapter::Mcp(ResolvedMcpOrigin {
                url: origin.url,
                server_info: discovery.server_info,
            }),
            tools: Some(discovery.tools),
        })
    }
}

/// Resolve one origin with the streamable HTTP MCP transport.
///
/// # Errors
///
/// See [`OriginResolver::resolve`].
pub async fn resolve_origin(
    origin: OriginAdapterConfig,
    options: ResolveOptions,
) -> Result<ResolvedOrigin> {
    OriginResolver::new(options).resolve(origin).await
}
