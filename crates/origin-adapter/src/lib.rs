//! Origin adapter resolution.
//!
//! An origin adapter describes how a gateway reaches an upstream API:
//!
//! - `openapi`: an `OpenAPI` 3.x document is loaded, dereferenced and turned into MCP tools plus a
//!   routing table (`toolToOperationMap`) that maps every tool back to its HTTP operation.
//! - `mcp`: the upstream already speaks MCP; its tools are discovered over the streamable HTTP
//!   transport.
//! - `raw`: an opaque pass-through with no tools.
//!
//! Resolution is all-or-nothing. Either every tool and routing entry is produced, or an
//! [`OriginAdapterError`] describes why not.

pub mod config;
pub mod error;
pub mod mcp;
pub mod resolve;

pub use config::{McpOrigin, OpenApiOrigin, OriginAdapterConfig, RawOrigin, ResolveOptions};
pub use error::{OriginAdapterError, Result};
pub use mcp::{McpConnector, McpDiscovery, McpServerInfo, StreamableHttpConnector};
pub use resolve::{
    OriginResolver, ResolvedMcpOrigin, ResolvedOpenApiOrigin, ResolvedOrigin,
    ResolvedOriginAdapter, resolve_origin,
};

pub use agentic_openapi_tools as openapi;
