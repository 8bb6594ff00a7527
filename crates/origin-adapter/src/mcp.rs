//! MCP capability discovery.
//!
//! MCP servers describe their own tools, so discovery is just the `initialize` handshake followed
//! by `tools/list`. [`McpConnector`] is the transport seam; [`StreamableHttpConnector`] is the
//! real implementation over the streamable HTTP transport.

use crate::error::{OriginAdapterError, Result};
use agentic_openapi_tools::Tool;
use async_trait::async_trait;
use rmcp::ServiceExt as _;
use rmcp::model::{ClientInfo, Implementation, ServerCapabilities};
use rmcp::transport::StreamableHttpClientTransport;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

/// What an MCP server reported about itself during `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerInfo {
    pub name: String,
    pub version: String,
    pub capabilities: ServerCapabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Result of discovering one MCP server.
#[derive(Debug, Clone)]
pub struct McpDiscovery {
    pub server_info: McpServerInfo,
    pub tools: Vec<Tool>,
}

#[async_trait]
pub trait McpConnector: Send + Sync {
    /// Connect to `url`, perform the handshake and list every tool.
    async fn discover(&self, url: &Url) -> Result<McpDiscovery>;
}

/// [`McpConnector`] over the MCP streamable HTTP transport.
#[derive(Debug, Clone, Default)]
pub struct StreamableHttpConnector;

fn client_info() -> ClientInfo {
    let mut implementation = Implementation::from_build_env();
    implementation.name = env!("CARGO_PKG_NAME").to_string();
    implementation.version = env!("CARGO_PKG_VERSION").to_string();

    let mut info = ClientInfo::default();
    info.client_info = implementation;
    info
}

fn mcp_error(url: &Url, message: String) -> OriginAdapterError {
    OriginAdapterError::Mcp {
        url: url.to_string(),
        message,
    }
}

#[async_trait]
impl McpConnector for StreamableHttpConnector {
    async fn discover(&self, url: &Url) -> Result<McpDiscovery> {
        let transport = StreamableHttpClientTransport::from_uri(url.as_str());
        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| mcp_error(url, format!("initialize failed: {e}")))?;

        let listed = async {
            let peer = client
                .peer_info()
                .cloned()
                .ok_or_else(|| mcp_error(url, "server sent no initialize result".to_string()))?;
            let tools = client
                .list_all_tools()
                .await
                .map_err(|e| mcp_error(url, format!("tools/list failed: {e}")))?;
            Ok::<_, OriginAdapterError>((peer, tools))
        }
        .await;

        if let Err(e) = client.cancel().await {
            debug!(url = %url, error = %e, "MCP session did not shut down cleanly");
        }
        let (peer, tools) = listed?;

        info!(
            url = %url,
            server = %peer.server_info.name,
            tools = tools.len(),
            "Discovered MCP server"
        );

        Ok(McpDiscovery {
            server_info: McpServerInfo {
                name: peer.server_info.name,
                version: peer.server_info.version,
                capabilities: peer.capabilities,
                instructions: peer.instructions,
            },
            tools: tools.into_iter().map(Tool::from).collect(),
        })
    }
}
