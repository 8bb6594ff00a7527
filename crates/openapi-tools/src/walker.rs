//! Operation walking.
//!
//! Visits every `(path, method)` pair of a fully dereferenced document, in document order, and
//! produces one [`ParsedOperation`] per operation. Path-level parameters are merged once per path
//! into a baseline that each operation clones and extends.

use crate::error::{OpenApiToolsError, Result};
use crate::merge::{MergeContext, MergedSchema};
use crate::naming::{OperationNames, camel_case, synthesize_operation_id, tool_name};
use crate::operation::{HttpMethod, OperationDescriptor, operation_label};
use crate::params::extract_parameter_schemas;
use crate::schema::{JsonObject, convert_nullable_children};
use crate::sources::ParameterSource;
use serde_json::Value;
use tracing::debug;

/// Request body content types, in precedence order, and the source their fields map to.
const REQUEST_BODY_CONTENT: [(&str, ParameterSource); 2] = [
    ("application/json", ParameterSource::Body),
    ("multipart/form-data", ParameterSource::FormData),
];

/// Response status codes considered for the output schema, in precedence order.
const OUTPUT_STATUS_CODES: [&str; 2] = ["200", "201"];

const OUTPUT_CONTENT_TYPE: &str = "application/json";

/// Everything the tool assembler needs about one operation.
#[derive(Debug, Clone)]
pub struct ParsedOperation {
    pub descriptor: OperationDescriptor,
    pub tool_name: String,
    pub description: Option<String>,
    pub input_schema: MergedSchema,
    pub output_schema: Option<JsonObject>,
}

impl ParsedOperation {
    #[must_use]
    pub fn label(&self) -> String {
        self.descriptor.label()
    }
}

/// Walk every operation of `document`.
///
/// `tool_prefix` is the origin's own name; when set, tool names are prefixed with it.
///
/// # Errors
///
/// Returns the first document-structure error or invariant violation encountered. There is no
/// partial result.
pub fn walk_operations(document: &Value, tool_prefix: Option<&str>) -> Result<Vec<ParsedOperation>> {
    let paths = document
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| OpenApiToolsError::OpenApi("document has no 'paths' object".to_string()))?;

    let mut names = OperationNames::new();
    let mut out = Vec::new();

    for (path, item) in paths {
        let item = item.as_object().ok_or_else(|| {
            OpenApiToolsError::OpenApi(format!("path item \"{path}\" is not an object"))
        })?;

        let baseline = path_baseline(item, path)?;

        for method in HttpMethod::ALL {
            let Some(operation) = item.get(method.as_str()) else {
                continue;
            };
            let operation = operation.as_object().ok_or_else(|| {
                OpenApiToolsError::OpenApi(format!(
                    "operation \"{}\" is not an object",
                    operation_label(method, path)
                ))
            })?;

            let parsed = walk_operation(
                OperationSite {
                    method,
                    path,
                    operation,
                },
                &baseline,
                &mut names,
                tool_prefix,
            )?;
            debug!(
                operation = %parsed.label(),
                tool = %parsed.tool_name,
                fields = parsed.descriptor.parameter_sources.len(),
                has_output = parsed.output_schema.is_some(),
                "Parsed OpenAPI operation"
            );
            out.push(parsed);
        }
    }

    Ok(out)
}

struct OperationSite<'a> {
    method: HttpMethod,
    path: &'a str,
    operation: &'a JsonObject,
}

fn path_baseline(item: &JsonObject, path: &str) -> Result<MergedSchema> {
    let mut baseline = MergedSchema::new();
    let parameters = parameter_list(item, path)?;
    if !parameters.is_empty() {
        let schemas = extract_parameter_schemas(parameters, path)?;
        baseline.merge_all(&schemas, path)?;
    }
    Ok(baseline)
}

fn parameter_list<'a>(object: &'a JsonObject, label: &str) -> Result<&'a [Value]> {
    match object.get("parameters") {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(list)) => Ok(list),
        Some(_) => Err(OpenApiToolsError::OpenApi(format!(
            "'parameters' in \"{label}\" is not an array"
        ))),
    }
}

fn walk_operation(
    site: OperationSite<'_>,
    baseline: &MergedSchema,
    names: &mut OperationNames,
    tool_prefix: Option<&str>,
) -> Result<ParsedOperation> {
    let OperationSite {
        method,
        path,
        operation,
    } = site;
    let label = operation_label(method, path);

    // An operationId with no ASCII word characters falls back to the synthesized id.
    let operation_name = operation
        .get("operationId")
        .and_then(Value::as_str)
        .map(camel_case)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| camel_case(&synthesize_operation_id(method, path)));
    names.claim(&operation_name, &label)?;

    let mut input_schema = baseline.clone();

    if let Some((source, mut schema)) = request_body_schema(operation) {
        convert_nullable_children(&mut schema);
        input_schema.merge(
            &schema,
            MergeContext {
                source,
                label: &label,
            },
        )?;
    }

    let output_schema = output_schema(operation, &label);

    let parameters = parameter_list(operation, &label)?;
    if !parameters.is_empty() {
        let schemas = extract_parameter_schemas(parameters, &label)?;
        input_schema.merge_all(&schemas, &label)?;
    }

    let tags = operation
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let descriptor = OperationDescriptor {
        operation_id: operation_name.clone(),
        http_method: method,
        path_template: path.to_string(),
        parameter_sources: input_schema.sources.clone(),
        tags,
    };

    Ok(ParsedOperation {
        descriptor,
        tool_name: tool_name(&operation_name, tool_prefix),
        description: description(operation),
        input_schema,
        output_schema,
    })
}

/// First of the JSON / multipart request body schemas that is present.
fn request_body_schema(operation: &JsonObject) -> Option<(ParameterSource, Value)> {
    let content = operation.get("requestBody")?.get("content")?;
    REQUEST_BODY_CONTENT
        .into_iter()
        .find_map(|(content_type, source)| {
            content
                .get(content_type)
                .and_then(|media| media.get("schema"))
                .map(|schema| (source, schema.clone()))
        })
}

/// First of the 200 / 201 JSON response schemas, kept only if it is an object schema.
fn output_schema(operation: &JsonObject, label: &str) -> Option<JsonObject> {
    let responses = operation.get("responses")?;
    let schema = OUTPUT_STATUS_CODES.into_iter().find_map(|status| {
        responses
            .get(status)
            .and_then(|response| response.get("content"))
            .and_then(|content| content.get(OUTPUT_CONTENT_TYPE))
            .and_then(|media| media.get("schema"))
    })?;

    if schema.get("type").and_then(Value::as_str) != Some("object") {
        debug!(operation = %label, "Response schema is not an object; omitting output schema");
        return None;
    }

    let mut schema = schema.clone();
    convert_nullable_children(&mut schema);
    match schema {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn description(operation: &JsonObject) -> Option<String> {
    ["description", "summary"].into_iter().find_map(|key| {
        operation
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}
