//! `OpenAPI` -> tool resolution.
//!
//! Turns an `OpenAPI` 3.x document into uniquely named tools with flat object input schemas, plus
//! the routing table a gateway needs to turn a tool call back into an HTTP request.
//!
//! Pipeline, leaf first:
//! - [`params`]: parameter list -> per-source schema fragments
//! - [`merge`]: fragments -> one input schema plus a field -> source map
//! - [`walker`]: every `(path, method)` -> [`walker::ParsedOperation`]
//! - [`assembler`]: parsed operations -> [`assembler::Tool`]s and the routing table
//!
//! [`pipeline::resolve_openapi`] runs all of it, including loading and `$ref` resolution.

pub mod assembler;
pub mod config;
pub mod error;
pub mod loader;
pub mod merge;
pub mod naming;
pub mod operation;
pub mod params;
pub mod pipeline;
pub mod plan;
pub mod resolver;
pub mod schema;
pub mod semantics;
pub mod sources;
pub mod walker;

pub use assembler::{AssembledTools, Tool, ToolToOperationMap};
pub use config::{HashPolicy, OpenApiSourceConfig, SpecLoadOptions};
pub use error::{OpenApiToolsError, Result};
pub use operation::{HttpMethod, OperationDescriptor};
pub use pipeline::{OpenApiResolution, resolve_openapi, tools_from_document};
pub use plan::RequestPlan;
pub use sources::{ParameterSource, SourceMap};
