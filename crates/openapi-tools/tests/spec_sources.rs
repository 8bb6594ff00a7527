use agentic_openapi_tools::{
    OpenApiSourceConfig, OpenApiToolsError, ParameterSource, RequestPlan, SpecLoadOptions,
    resolve_openapi,
};
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use serde_json::{Value, json};
use tokio::net::TcpListener;

const ROOT_SPEC: &str = r"
openapi: 3.0.3
info: { title: Remote, version: '1' }
paths:
  /orders/{orderId}:
    parameters:
      - $ref: 'common.yaml#/parameters/OrderId'
    get:
      operationId: getOrder
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema: { $ref: 'common.yaml#/schemas/Order' }
    patch:
      operationId: updateOrder
      requestBody:
        content:
          application/json:
            schema: { $ref: 'common.yaml#/schemas/OrderPatch' }
      responses: {}
";

const COMMON: &str = r"
parameters:
  OrderId:
    name: orderId
    in: path
    required: true
    schema: { type: string }
schemas:
  Order:
    type: object
    properties:
      id: { type: string }
      status: { $ref: '#/schemas/Status' }
  OrderPatch:
    type: object
    properties:
      status: { $ref: '#/schemas/Status' }
  Status:
    type: string
    enum: [open, closed]
";

struct TestServer {
    base_url: String,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let app = Router::new()
            .route("/specs/openapi.yaml", get(|| async { ROOT_SPEC }))
            .route("/specs/common.yaml", get(|| async { COMMON }))
            .route(
                "/specs/big.yaml",
                get(|| async { format!("openapi: 3.0.3\n# {}\n", "x".repeat(4096)) }),
            )
            .route(
                "/specs/gone.yaml",
                get(|| async { (StatusCode::NOT_FOUND, "gone") }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let handle = tokio::spawn(async move { server.await });

        Self {
            base_url: format!("http://{addr}"),
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

#[tokio::test]
async fn resolves_spec_with_relative_refs_over_http() {
    let server = TestServer::start().await;
    let config = OpenApiSourceConfig::new(format!("{}/specs/openapi.yaml", server.base_url));

    let resolution = resolve_openapi(&config, SpecLoadOptions::default())
        .await
        .expect("resolve");

    let names: Vec<_> = resolution.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["get_order", "update_order"]);

    let update = &resolution.tool_to_operation_map["update_order"];
    assert_eq!(update.parameter_sources.get("orderId"), Some(&ParameterSource::Path));
    assert_eq!(update.parameter_sources.get("status"), Some(&ParameterSource::Body));

    let update_tool = &resolution.tools[1];
    assert_eq!(
        update_tool.input_schema["properties"]["status"],
        json!({ "type": "string", "enum": ["open", "closed"] })
    );

    // External refs are inlined in the normalized spec text.
    let spec: Value = serde_json::from_str(&resolution.spec).expect("spec json");
    assert_eq!(
        spec["paths"]["/orders/{orderId}"]["parameters"][0]["name"],
        json!("orderId")
    );

    let plan = RequestPlan::build(
        "update_order",
        update,
        &json!({ "orderId": "o-1", "status": "closed" }),
    )
    .expect("plan");
    assert_eq!(plan.path, "/orders/o-1");
    assert_eq!(plan.json_body, json!({ "status": "closed" }).as_object().cloned());

    server.stop().await;
}

#[tokio::test]
async fn reports_http_errors_and_size_limits() {
    let server = TestServer::start().await;

    let config = OpenApiSourceConfig::new(format!("{}/specs/gone.yaml", server.base_url));
    let err = resolve_openapi(&config, SpecLoadOptions::default())
        .await
        .expect_err("404 must fail");
    assert!(matches!(err, OpenApiToolsError::SpecFetch { ref message, .. } if message.contains("404")));

    let config = OpenApiSourceConfig::new(format!("{}/specs/big.yaml", server.base_url));
    let options = SpecLoadOptions {
        max_spec_bytes: 1024,
        ..SpecLoadOptions::default()
    };
    let err = resolve_openapi(&config, options)
        .await
        .expect_err("oversized spec must fail");
    assert!(err.to_string().contains("too large"));

    server.stop().await;
}

#[tokio::test]
async fn resolves_multi_file_spec_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("openapi.yaml"), ROOT_SPEC).expect("write root");
    std::fs::write(dir.path().join("common.yaml"), COMMON).expect("write common");

    let file_url = url::Url::from_file_path(dir.path().join("openapi.yaml")).expect("file url");
    for spec in [
        dir.path().join("openapi.yaml").display().to_string(),
        file_url.to_string(),
    ] {
        let resolution = resolve_openapi(&OpenApiSourceConfig::new(spec), SpecLoadOptions::default())
            .await
            .expect("resolve");
        assert_eq!(resolution.tools.len(), 2);
        let output = resolution.tools[0].output_schema.as_ref().expect("output");
        assert_eq!(output["properties"]["status"]["type"], json!("string"));
    }
}

#[tokio::test]
async fn missing_spec_file_is_a_read_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope.yaml").display().to_string();
    let err = resolve_openapi(&OpenApiSourceConfig::new(missing), SpecLoadOptions::default())
        .await
        .expect_err("missing file");
    assert!(matches!(err, OpenApiToolsError::SpecReadFile { .. }));
}
