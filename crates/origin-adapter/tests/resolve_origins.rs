use agentic_origin_adapter::openapi::{ParameterSource, Tool};
use agentic_origin_adapter::{
    McpConnector, McpDiscovery, McpServerInfo, OriginAdapterConfig, OriginAdapterError,
    OriginResolver, ResolveOptions, ResolvedOrigin, ResolvedOriginAdapter, Result,
};
use async_trait::async_trait;
use rmcp::model::ServerCapabilities;
use serde_json::{Map, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

const PETSTORE: &str = r"
openapi: 3.0.3
info: { title: Pets, version: '1' }
paths:
  /pets/{petId}:
    parameters:
      - { name: petId, in: path, required: true, schema: { type: string } }
    get:
      operationId: getPet
      parameters:
        - { name: verbose, in: query, schema: { type: boolean } }
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema: { type: object, properties: { id: { type: string } } }
    delete:
      operationId: deletePet
      responses: { '204': { description: gone } }
";

#[derive(Clone, Default)]
struct FakeConnector {
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

#[async_trait]
impl McpConnector for FakeConnector {
    async fn discover(&self, url: &Url) -> Result<McpDiscovery> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if url.path() == "/broken" {
            return Err(OriginAdapterError::Mcp {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        }

        let schema: Map<_, _> = json!({ "type": "object", "properties": { "q": { "type": "string" } } })
            .as_object()
            .cloned()
            .unwrap();
        Ok(McpDiscovery {
            server_info: McpServerInfo {
                name: "fake".to_string(),
                version: "0.0.1".to_string(),
                capabilities: ServerCapabilities::default(),
                instructions: Some("be nice".to_string()),
            },
            tools: vec![Tool {
                name: "search".to_string(),
                title: None,
                description: Some("Search things".to_string()),
                input_schema: schema,
                output_schema: None,
                annotations: None,
            }],
        })
    }
}

fn openapi_origin(spec: String, name: Option<&str>) -> OriginAdapterConfig {
    let mut config = json!({
        "type": "openapi",
        "url": "https://pets.example.com/v1",
        "spec": spec
    });
    if let Some(name) = name {
        config["name"] = json!(name);
    }
    OriginAdapterConfig::from_value(config).unwrap()
}

#[tokio::test]
async fn resolves_openapi_origin_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pets.yaml");
    std::fs::write(&path, PETSTORE).unwrap();

    let resolved = OriginResolver::new(ResolveOptions::default())
        .resolve(openapi_origin(path.display().to_string(), Some("Pets")))
        .await
        .unwrap();

    let tools = resolved.tools.as_ref().unwrap();
    let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["pets_get_pet", "pets_delete_pet"]);

    let map = resolved.tool_to_operation_map().unwrap();
    assert_eq!(map["pets_get_pet"].path_template, "/pets/{petId}");
    assert_eq!(
        map["pets_get_pet"].parameter_sources.get("verbose"),
        Some(&ParameterSource::Query)
    );

    let ResolvedOriginAdapter::OpenApi(origin) = &resolved.origin else {
        panic!("expected openapi origin");
    };
    assert_eq!(origin.source.name.as_deref(), Some("Pets"));
    // The file path is replaced by the normalized document text.
    let spec: serde_json::Value = serde_json::from_str(&origin.source.spec).unwrap();
    assert_eq!(spec["info"]["title"], json!("Pets"));
}

#[tokio::test]
async fn resolved_output_round_trips_through_json() {
    let resolved = OriginResolver::new(ResolveOptions::default())
        .resolve(openapi_origin(PETSTORE.to_string(), None))
        .await
        .unwrap();

    let value = serde_json::to_value(&resolved).unwrap();
    assert_eq!(value["origin"]["type"], json!("openapi"));
    assert_eq!(
        value["origin"]["toolToOperationMap"]["delete_pet"]["httpMethod"],
        json!("delete")
    );
    assert_eq!(value["tools"][1]["annotations"]["destructiveHint"], json!(true));

    let back: ResolvedOrigin = serde_json::from_value(value).unwrap();
    assert_eq!(back.tool_to_operation_map(), resolved.tool_to_operation_map());
}

#[tokio::test]
async fn resolves_mcp_origin_through_connector() {
    let connector = FakeConnector::default();
    let resolver = OriginResolver::with_connector(ResolveOptions::default(), connector.clone());

    let resolved = resolver
        .resolve_value(json!({ "type": "mcp", "url": "http://localhost:9000/mcp" }))
        .await
        .unwrap();

    assert_eq!(connector.calls.load(Ordering::SeqCst), 1);
    assert!(resolved.tool_to_operation_map().is_none());
    assert_eq!(resolved.tools.as_ref().unwrap()[0].name, "search");

    let value = serde_json::to_value(&resolved).unwrap();
    assert_eq!(value["origin"]["serverInfo"]["name"], json!("fake"));
    assert_eq!(value["origin"]["serverInfo"]["instructions"], json!("be nice"));
}

#[tokio::test]
async fn mcp_failures_abort_resolution() {
    let resolver = OriginResolver::with_connector(ResolveOptions::default(), FakeConnector::default());
    let err = resolver
        .resolve_value(json!({ "type": "mcp", "url": "http://localhost:9000/broken" }))
        .await
        .unwrap_err();
    assert!(matches!(err, OriginAdapterError::Mcp { ref message, .. } if message.contains("refused")));
}

#[tokio::test(start_paused = true)]
async fn mcp_discovery_is_bounded_by_timeout() {
    let connector = FakeConnector {
        delay: Some(Duration::from_secs(60)),
        ..FakeConnector::default()
    };
    let options = ResolveOptions {
        mcp_timeout: Duration::from_secs(5),
        ..ResolveOptions::default()
    };
    let err = OriginResolver::with_connector(options, connector)
        .resolve_value(json!({ "type": "mcp", "url": "http://localhost:9000/mcp" }))
        .await
        .unwrap_err();
    assert!(matches!(err, OriginAdapterError::Timeout { after, .. } if after == Duration::from_secs(5)));
}

#[tokio::test]
async fn invalid_configs_never_reach_the_connector() {
    let connector = FakeConnector::default();
    let resolver = OriginResolver::with_connector(ResolveOptions::default(), connector.clone());

    for config in [
        json!({ "type": "graphql", "url": "https://x" }),
        json!({ "type": "mcp" }),
        json!({ "type": "mcp", "url": "ws://localhost/mcp" }),
    ] {
        assert!(resolver.resolve_value(config).await.is_err());
    }
    assert_eq!(connector.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn openapi_pipeline_errors_surface_unchanged() {
    let err = OriginResolver::new(ResolveOptions::default())
        .resolve(openapi_origin("swagger: '2.0'\npaths: {}\n".to_string(), None))
        .await
        .unwrap_err();
    assert!(matches!(err, OriginAdapterError::OpenApi(_)));
}
