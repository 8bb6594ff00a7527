//! Parameter source extraction.
//!
//! Converts a dereferenced list of `OpenAPI` Parameter Objects into one JSON Schema fragment per
//! parameter source. Legacy Swagger `in: body` parameters pass their schema through unchanged;
//! every other source becomes a flat object schema built from whitelisted keywords.

use crate::error::{OpenApiToolsError, Result};
use crate::schema::{JsonObject, JsonSchemaObject, SchemaKeyword, convert_nullable, copy_keywords};
use crate::sources::ParameterSource;
use serde_json::{Value, json};

/// Per-source schema fragments for one parameter list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchemas {
    pub query: Option<Value>,
    pub header: Option<Value>,
    pub path: Option<Value>,
    pub cookie: Option<Value>,
    pub body: Option<Value>,
    pub form_data: Option<Value>,
}

impl ParameterSchemas {
    #[must_use]
    pub fn get(&self, source: ParameterSource) -> Option<&Value> {
        match source {
            ParameterSource::Query => self.query.as_ref(),
            ParameterSource::Header => self.header.as_ref(),
            ParameterSource::Path => self.path.as_ref(),
            ParameterSource::Cookie => self.cookie.as_ref(),
            ParameterSource::Body => self.body.as_ref(),
            ParameterSource::FormData => self.form_data.as_ref(),
        }
    }

    fn slot_mut(&mut self, source: ParameterSource) -> &mut Option<Value> {
        match source {
            ParameterSource::Query => &mut self.query,
            ParameterSource::Header => &mut self.header,
            ParameterSource::Path => &mut self.path,
            ParameterSource::Cookie => &mut self.cookie,
            ParameterSource::Body => &mut self.body,
            ParameterSource::FormData => &mut self.form_data,
        }
    }

    /// Present fragments, in merge order.
    pub fn iter(&self) -> impl Iterator<Item = (ParameterSource, &Value)> {
        ParameterSource::ALL
            .into_iter()
            .filter_map(|source| self.get(source).map(|schema| (source, schema)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Build per-source schemas from a parameter list.
///
/// `label` names the path or operation in error messages.
///
/// # Errors
///
/// Returns an error if a parameter is not an object, lacks `name`/`in`, uses an unknown `in`
/// location, or if more than one `in: body` parameter is declared.
pub fn extract_parameter_schemas(parameters: &[Value], label: &str) -> Result<ParameterSchemas> {
    let mut out = ParameterSchemas::default();
    let mut objects: Vec<(ParameterSource, JsonSchemaObject)> = Vec::new();

    for (idx, param) in parameters.iter().enumerate() {
        let Some(param) = param.as_object() else {
            return Err(OpenApiToolsError::OpenApi(format!(
                "parameters[{idx}] in \"{label}\" is not an object"
            )));
        };

        // Legacy file uploads cannot be expressed as JSON tool input.
        if param.get("type").and_then(Value::as_str) == Some("file") {
            continue;
        }

        let name = param.get("name").and_then(Value::as_str).ok_or_else(|| {
            OpenApiToolsError::OpenApi(format!(
                "parameters[{idx}] in \"{label}\" is missing a string 'name'"
            ))
        })?;
        let location = param.get("in").and_then(Value::as_str).ok_or_else(|| {
            OpenApiToolsError::OpenApi(format!(
                "parameter '{name}' in \"{label}\" is missing a string 'in'"
            ))
        })?;
        let source = ParameterSource::from_location(location).ok_or_else(|| {
            OpenApiToolsError::OpenApi(format!(
                "parameter '{name}' in \"{label}\" has unsupported location '{location}'"
            ))
        })?;

        if source == ParameterSource::Body {
            let slot = out.slot_mut(ParameterSource::Body);
            if slot.is_some() {
                return Err(OpenApiToolsError::OpenApi(format!(
                    "\"{label}\" declares more than one 'in: body' parameter"
                )));
            }
            *slot = Some(
                param
                    .get("schema")
                    .cloned()
                    .unwrap_or_else(|| json!({ "type": "object" })),
            );
            continue;
        }

        let property = parameter_property_schema(param);
        let required = param.get("required").and_then(Value::as_bool) == Some(true);

        let idx = match objects.iter().position(|(s, _)| *s == source) {
            Some(idx) => idx,
            None => {
                objects.push((source, JsonSchemaObject::new()));
                objects.len() - 1
            }
        };
        let target = &mut objects[idx].1;
        target.properties.insert(name.to_string(), property);
        if required {
            target.require(name);
        }
    }

    for (source, schema) in objects {
        *out.slot_mut(source) = Some(schema.to_value());
    }

    Ok(out)
}

/// JSON Schema for a single non-body parameter.
fn parameter_property_schema(param: &JsonObject) -> Value {
    let mut property = JsonObject::new();

    // Inline (legacy) keywords on the parameter itself. `required` is a boolean here, and
    // `examples` is a map of Example Objects, so both are handled separately.
    copy_keywords(
        param,
        &mut property,
        &[
            SchemaKeyword::Required,
            SchemaKeyword::Example,
            SchemaKeyword::Examples,
        ],
    );

    if let Some(schema) = parameter_schema(param) {
        copy_keywords(schema, &mut property, &[]);
    }

    let examples = parameter_examples(param);
    if !examples.is_empty() {
        property.insert("examples".to_string(), Value::Array(examples));
    }

    let mut property = Value::Object(property);
    convert_nullable(&mut property);
    property
}

/// `schema`, or the schema of the first `content` entry.
fn parameter_schema(param: &JsonObject) -> Option<&JsonObject> {
    if let Some(schema) = param.get("schema") {
        return schema.as_object();
    }
    param
        .get("content")
        .and_then(Value::as_object)
        .and_then(|content| content.values().next())
        .and_then(|media| media.get("schema"))
        .and_then(Value::as_object)
}

fn parameter_examples(param: &JsonObject) -> Vec<Value> {
    let mut examples = Vec::new();
    if let Some(example) = param.get("example") {
        examples.push(example.clone());
    }
    match param.get("examples") {
        Some(Value::Object(named)) => {
            examples.extend(named.values().filter_map(|e| e.get("value").cloned()));
        }
        Some(Value::Array(list)) => examples.extend(list.iter().cloned()),
        _ => {}
    }
    examples
}
