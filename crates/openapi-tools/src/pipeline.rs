//! End-to-end `OpenAPI` resolution: load, lint, bundle, dereference, walk, assemble.

use crate::assembler::{AssembledTools, Tool, ToolToOperationMap, assemble_tools};
use crate::config::{OpenApiSourceConfig, SpecLoadOptions};
use crate::error::Result;
use crate::loader::{
    LintReport, SpecFetcher, SpecSource, lint_document, parse_document, strip_servers,
    verify_spec_hash,
};
use crate::resolver::{DocId, RefResolver};
use crate::walker::walk_operations;
use serde_json::Value;
use tracing::info;

/// Result of resolving one `OpenAPI` origin.
#[derive(Debug, Clone)]
pub struct OpenApiResolution {
    /// Bundled spec (external refs inlined, `servers` removed) as compact JSON text.
    pub spec: String,
    pub tools: Vec<Tool>,
    pub tool_to_operation_map: ToolToOperationMap,
    pub lint: LintReport,
}

/// Resolve an `OpenAPI` source into tools and a routing table.
///
/// # Errors
///
/// Fails on the first load, lint, `$ref` or pipeline error; there is no partial result.
pub async fn resolve_openapi(
    config: &OpenApiSourceConfig,
    options: SpecLoadOptions,
) -> Result<OpenApiResolution> {
    let source = SpecSource::parse(&config.spec)?;
    let location = source.to_string();
    let fetcher = SpecFetcher::new(options)?;

    let text = fetcher.read_source(&source).await?;
    verify_spec_hash(
        &text,
        config.spec_hash.as_deref(),
        config.spec_hash_policy,
        &location,
    )?;

    let document = parse_document(&text, &location)?;
    let lint = lint_document(&document)?;

    let resolver = RefResolver::new(DocId::from_source(&source), document, &fetcher);
    resolver.preload().await?;

    let mut bundled = resolver.bundle()?;
    strip_servers(&mut bundled);
    let mut dereferenced = resolver.dereference()?;
    strip_servers(&mut dereferenced);

    let AssembledTools {
        tools,
        tool_to_operation_map,
    } = tools_from_document(&dereferenced, config.name.as_deref())?;

    info!(
        spec = %location,
        documents = resolver.document_count(),
        tools = tools.len(),
        warnings = lint.warnings.len(),
        "Resolved OpenAPI origin"
    );

    Ok(OpenApiResolution {
        spec: serde_json::to_string(&bundled)?,
        tools,
        tool_to_operation_map,
        lint,
    })
}

/// Walk and assemble an already dereferenced document.
///
/// # Errors
///
/// See [`walk_operations`] and [`assemble_tools`].
pub fn tools_from_document(document: &Value, tool_prefix: Option<&str>) -> Result<AssembledTools> {
    assemble_tools(walk_operations(document, tool_prefix)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpenApiToolsError;
    use crate::sources::ParameterSource;
    use serde_json::json;

    const PETSTORE: &str = r#"
openapi: 3.0.3
info:
  title: Petstore
  version: "1.0"
servers:
  - url: https://petstore.example.com
paths:
  /pets:
    get:
      operationId: listPets
      parameters:
        - $ref: '#/components/parameters/Limit'
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: object
                properties:
                  items:
                    type: array
                    items: { $ref: '#/components/schemas/Pet' }
    post:
      operationId: createPet
      requestBody:
        content:
          application/json:
            schema: { $ref: '#/components/schemas/NewPet' }
      responses:
        "201":
          description: created
          content:
            application/json:
              schema: { $ref: '#/components/schemas/Pet' }
  /pets/{petId}:
    get:
      parameters:
        - { name: petId, in: path, required: true, schema: { type: string } }
        - { name: verbose, in: query, schema: { type: boolean } }
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: { $ref: '#/components/schemas/Pet' }
components:
  parameters:
    Limit:
      name: limit
      in: query
      schema: { type: integer, maximum: 100 }
  schemas:
    Pet:
      type: object
      required: [id]
      properties:
        id: { type: string }
        name: { type: string, nullable: true }
    NewPet:
      type: object
      required: [name]
      properties:
        name: { type: string }
"#;

    #[tokio::test]
    async fn resolves_inline_petstore() {
        let config = OpenApiSourceConfig::new(PETSTORE);
        let resolution = resolve_openapi(&config, SpecLoadOptions::default())
            .await
            .unwrap();

        let names: Vec<_> = resolution.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["list_pets", "create_pet", "get_pets_pet_id"]);

        let route = &resolution.tool_to_operation_map["get_pets_pet_id"];
        assert_eq!(route.path_template, "/pets/{petId}");
        assert_eq!(
            serde_json::to_value(&route.parameter_sources).unwrap(),
            json!({ "petId": "path", "verbose": "query" })
        );
        assert_eq!(
            resolution.tool_to_operation_map["create_pet"]
                .parameter_sources
                .get("name"),
            Some(&ParameterSource::Body)
        );

        let get_pet = &resolution.tools[2];
        let output = get_pet.output_schema.as_ref().unwrap();
        assert_eq!(
            output["properties"]["name"],
            json!({ "anyOf": [{ "type": "string" }, { "type": "null" }] })
        );

        let spec: Value = serde_json::from_str(&resolution.spec).unwrap();
        assert!(spec.get("servers").is_none());
        assert_eq!(
            spec["paths"]["/pets"]["get"]["parameters"][0],
            json!({ "$ref": "#/components/parameters/Limit" })
        );
        assert!(resolution.lint.warnings.iter().any(|w| w.contains("servers")));
    }

    #[tokio::test]
    async fn resolution_is_deterministic() {
        let config = OpenApiSourceConfig::new(PETSTORE);
        let a = resolve_openapi(&config, SpecLoadOptions::default()).await.unwrap();
        let b = resolve_openapi(&config, SpecLoadOptions::default()).await.unwrap();
        assert_eq!(
            serde_json::to_string(&a.tools).unwrap(),
            serde_json::to_string(&b.tools).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&a.tool_to_operation_map).unwrap(),
            serde_json::to_string(&b.tool_to_operation_map).unwrap()
        );
        assert_eq!(a.spec, b.spec);
    }

    #[tokio::test]
    async fn name_prefixes_tools() {
        let mut config = OpenApiSourceConfig::new(PETSTORE);
        config.name = Some("Petstore".to_string());
        let resolution = resolve_openapi(&config, SpecLoadOptions::default())
            .await
            .unwrap();
        assert!(resolution.tools.iter().all(|t| t.name.starts_with("petstore_")));
    }

    #[tokio::test]
    async fn rejects_swagger_documents() {
        let config = OpenApiSourceConfig::new("swagger: '2.0'\npaths: {}\n");
        let err = resolve_openapi(&config, SpecLoadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OpenApiToolsError::UnsupportedVersion(_)));
    }

    #[tokio::test]
    async fn hash_mismatch_fails_under_fail_policy() {
        let mut config = OpenApiSourceConfig::new(PETSTORE);
        config.spec_hash = Some("sha256:0000".to_string());
        config.spec_hash_policy = crate::config::HashPolicy::Fail;
        let err = resolve_openapi(&config, SpecLoadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OpenApiToolsError::SpecHashMismatch { .. }));
    }

    #[test]
    fn tool_count_matches_operation_count() {
        let document: Value = serde_yaml::from_str(
            r"
openapi: 3.1.0
info: { title: T, version: '1' }
paths:
  /a: { get: { responses: {} }, post: { responses: {} } }
  /b: { put: { responses: {} }, delete: { responses: {} }, patch: { responses: {} } }
  /c: { trace: { responses: {} } }
",
        )
        .unwrap();
        let assembled = tools_from_document(&document, None).unwrap();
        assert_eq!(assembled.tools.len(), 6);
        assert_eq!(assembled.tool_to_operation_map.len(), 6);
        for tool in &assembled.tools {
            let route = &assembled.tool_to_operation_map[&tool.name];
            assert!(tool.name.starts_with(route.http_method.as_str()));
        }
    }
}
