//! JSON Schema helpers.
//!
//! Schemas are stored as `serde_json::Value` so that fragments pass through untouched, but every
//! decision the pipeline makes about a schema node goes through [`SchemaShape`], a tagged view
//! with one variant per kind of node we care about.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value, json};

pub type JsonObject = Map<String, Value>;

/// Schema combinators. None of them is allowed at the top level of a tool input fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    AllOf,
    AnyOf,
    OneOf,
}

impl Combinator {
    pub const ALL: [Combinator; 3] = [Combinator::AllOf, Combinator::AnyOf, Combinator::OneOf];

    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Combinator::AllOf => "allOf",
            Combinator::AnyOf => "anyOf",
            Combinator::OneOf => "oneOf",
        }
    }
}

/// Classification of a single schema node.
#[derive(Debug, Clone, Copy)]
pub enum SchemaShape<'a> {
    /// `{ "$ref": ... }` left over after dereferencing (circular refs).
    Ref(&'a str),
    Combinator {
        kind: Combinator,
        branches: &'a [Value],
    },
    Object(&'a JsonObject),
    Array(&'a JsonObject),
    /// `string`, `number`, `integer`, `boolean` or `null`.
    Primitive(&'a JsonObject),
    /// An object node with no `type` and no structural hint.
    Untyped(&'a JsonObject),
    /// `true` / `false` schemas.
    Boolean(bool),
    /// Anything that is not a schema at all.
    Invalid(&'a Value),
}

impl<'a> SchemaShape<'a> {
    #[must_use]
    pub fn classify(schema: &'a Value) -> Self {
        let map = match schema {
            Value::Object(map) => map,
            Value::Bool(b) => return SchemaShape::Boolean(*b),
            other => return SchemaShape::Invalid(other),
        };

        if let Some(Value::String(reference)) = map.get("$ref") {
            return SchemaShape::Ref(reference);
        }

        for kind in Combinator::ALL {
            if let Some(Value::Array(branches)) = map.get(kind.keyword()) {
                return SchemaShape::Combinator { kind, branches };
            }
        }

        match map.get("type") {
            Some(Value::String(ty)) => Self::from_type_name(ty, map),
            // OpenAPI 3.1 style `type: ["object", "null"]`.
            Some(Value::Array(types)) => {
                let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
                if names.contains(&"object") {
                    SchemaShape::Object(map)
                } else if names.contains(&"array") {
                    SchemaShape::Array(map)
                } else {
                    SchemaShape::Primitive(map)
                }
            }
            _ if map.contains_key("properties") => SchemaShape::Object(map),
            _ if map.contains_key("items") => SchemaShape::Array(map),
            _ => SchemaShape::Untyped(map),
        }
    }

    fn from_type_name(ty: &str, map: &'a JsonObject) -> Self {
        match ty {
            "object" => SchemaShape::Object(map),
            "array" => SchemaShape::Array(map),
            _ => SchemaShape::Primitive(map),
        }
    }

    /// Short human-readable name of the shape, for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            SchemaShape::Ref(reference) => format!("unresolved $ref '{reference}'"),
            SchemaShape::Combinator { kind, .. } => kind.keyword().to_string(),
            SchemaShape::Object(_) => "object".to_string(),
            SchemaShape::Array(_) => "array".to_string(),
            SchemaShape::Primitive(map) => map
                .get("type")
                .map_or_else(|| "primitive".to_string(), ToString::to_string),
            SchemaShape::Untyped(_) => "untyped schema".to_string(),
            SchemaShape::Boolean(b) => format!("boolean schema '{b}'"),
            SchemaShape::Invalid(v) => format!("non-schema value {v}"),
        }
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, SchemaShape::Object(_))
    }
}

/// JSON Schema keywords copied from `OpenAPI` parameters into tool input properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKeyword {
    Type,
    Format,
    Title,
    Description,
    Default,
    Enum,
    Const,
    MultipleOf,
    Maximum,
    ExclusiveMaximum,
    Minimum,
    ExclusiveMinimum,
    MaxLength,
    MinLength,
    Pattern,
    MaxItems,
    MinItems,
    UniqueItems,
    Items,
    MaxProperties,
    MinProperties,
    Properties,
    AdditionalProperties,
    Required,
    AllOf,
    AnyOf,
    OneOf,
    Not,
    Nullable,
    ReadOnly,
    WriteOnly,
    Deprecated,
    Example,
    Examples,
}

impl SchemaKeyword {
    pub const ALL: [SchemaKeyword; 34] = [
        SchemaKeyword::Type,
        SchemaKeyword::Format,
        SchemaKeyword::Title,
        SchemaKeyword::Description,
        SchemaKeyword::Default,
        SchemaKeyword::Enum,
        SchemaKeyword::Const,
        SchemaKeyword::MultipleOf,
        SchemaKeyword::Maximum,
        SchemaKeyword::ExclusiveMaximum,
        SchemaKeyword::Minimum,
        SchemaKeyword::ExclusiveMinimum,
        SchemaKeyword::MaxLength,
        SchemaKeyword::MinLength,
        SchemaKeyword::Pattern,
        SchemaKeyword::MaxItems,
        SchemaKeyword::MinItems,
        SchemaKeyword::UniqueItems,
        SchemaKeyword::Items,
        SchemaKeyword::MaxProperties,
        SchemaKeyword::MinProperties,
        SchemaKeyword::Properties,
        SchemaKeyword::AdditionalProperties,
        SchemaKeyword::Required,
        SchemaKeyword::AllOf,
        SchemaKeyword::AnyOf,
        SchemaKeyword::OneOf,
        SchemaKeyword::Not,
        SchemaKeyword::Nullable,
        SchemaKeyword::ReadOnly,
        SchemaKeyword::WriteOnly,
        SchemaKeyword::Deprecated,
        SchemaKeyword::Example,
        SchemaKeyword::Examples,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaKeyword::Type => "type",
            SchemaKeyword::Format => "format",
            SchemaKeyword::Title => "title",
            SchemaKeyword::Description => "description",
            SchemaKeyword::Default => "default",
            SchemaKeyword::Enum => "enum",
            SchemaKeyword::Const => "const",
            SchemaKeyword::MultipleOf => "multipleOf",
            SchemaKeyword::Maximum => "maximum",
            SchemaKeyword::ExclusiveMaximum => "exclusiveMaximum",
            SchemaKeyword::Minimum => "minimum",
            SchemaKeyword::ExclusiveMinimum => "exclusiveMinimum",
            SchemaKeyword::MaxLength => "maxLength",
            SchemaKeyword::MinLength => "minLength",
            SchemaKeyword::Pattern => "pattern",
            SchemaKeyword::MaxItems => "maxItems",
            SchemaKeyword::MinItems => "minItems",
            SchemaKeyword::UniqueItems => "uniqueItems",
            SchemaKeyword::Items => "items",
            SchemaKeyword::MaxProperties => "maxProperties",
            SchemaKeyword::MinProperties => "minProperties",
            SchemaKeyword::Properties => "properties",
            SchemaKeyword::AdditionalProperties => "additionalProperties",
            SchemaKeyword::Required => "required",
            SchemaKeyword::AllOf => "allOf",
            SchemaKeyword::AnyOf => "anyOf",
            SchemaKeyword::OneOf => "oneOf",
            SchemaKeyword::Not => "not",
            SchemaKeyword::Nullable => "nullable",
            SchemaKeyword::ReadOnly => "readOnly",
            SchemaKeyword::WriteOnly => "writeOnly",
            SchemaKeyword::Deprecated => "deprecated",
            SchemaKeyword::Example => "example",
            SchemaKeyword::Examples => "examples",
        }
    }

    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

/// Whether a key may be copied into a tool input schema.
#[must_use]
pub fn is_copyable_key(key: &str) -> bool {
    key.starts_with("x-") || SchemaKeyword::parse(key).is_some()
}

/// Copy whitelisted keywords (and `x-` extensions) from `source` into `target`, skipping `skip`.
pub fn copy_keywords(source: &JsonObject, target: &mut JsonObject, skip: &[SchemaKeyword]) {
    for (key, value) in source {
        if !is_copyable_key(key) {
            continue;
        }
        if SchemaKeyword::parse(key).is_some_and(|k| skip.contains(&k)) {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

/// Rewrite `nullable: true` into `{ "anyOf": [schema, { "type": "null" }] }`, recursively.
///
/// Descends through `items`, `properties`, `allOf`/`anyOf`/`oneOf`, `not` and
/// `additionalProperties`. `$ref` keys are removed, never followed.
pub fn convert_nullable(schema: &mut Value) {
    let is_ref = match SchemaShape::classify(schema) {
        SchemaShape::Boolean(_) | SchemaShape::Invalid(_) => return,
        SchemaShape::Ref(_) => true,
        SchemaShape::Combinator { .. }
        | SchemaShape::Object(_)
        | SchemaShape::Array(_)
        | SchemaShape::Primitive(_)
        | SchemaShape::Untyped(_) => false,
    };

    let Some(map) = schema.as_object_mut() else {
        return;
    };
    if is_ref {
        map.remove("$ref");
    }

    match map.get_mut("items") {
        Some(Value::Array(tuple)) => tuple.iter_mut().for_each(convert_nullable),
        Some(items) => convert_nullable(items),
        None => {}
    }
    if let Some(Value::Object(properties)) = map.get_mut("properties") {
        properties.values_mut().for_each(convert_nullable);
    }
    for kind in Combinator::ALL {
        if let Some(Value::Array(branches)) = map.get_mut(kind.keyword()) {
            branches.iter_mut().for_each(convert_nullable);
        }
    }
    for key in ["not", "additionalProperties"] {
        if let Some(child) = map.get_mut(key) {
            convert_nullable(child);
        }
    }

    if matches!(map.remove("nullable"), Some(Value::Bool(true))) {
        let inner = std::mem::take(schema);
        *schema = json!({ "anyOf": [inner, { "type": "null" }] });
    }
}

/// Like [`convert_nullable`], but a top-level `nullable` is dropped instead of wrapped so that an
/// object schema stays an object.
pub fn convert_nullable_children(schema: &mut Value) {
    if let Some(map) = schema.as_object_mut() {
        map.remove("nullable");
    }
    convert_nullable(schema);
}

/// A flat `{ "type": "object", "properties": ..., "required": [...] }` schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonSchemaObject {
    pub properties: JsonObject,
    /// Deduplicated, in first-seen order.
    pub required: Vec<String>,
}

impl JsonSchemaObject {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.required.is_empty()
    }

    pub fn require(&mut self, name: &str) {
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
    }

    #[must_use]
    pub fn to_json_object(&self) -> JsonObject {
        let mut out = JsonObject::new();
        out.insert("type".to_string(), json!("object"));
        out.insert(
            "properties".to_string(),
            Value::Object(self.properties.clone()),
        );
        if !self.required.is_empty() {
            out.insert("required".to_string(), json!(self.required));
        }
        out
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.to_json_object())
    }
}

impl Serialize for JsonSchemaObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.required.is_empty() { 2 } else { 3 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("type", "object")?;
        map.serialize_entry("properties", &self.properties)?;
        if !self.required.is_empty() {
            map.serialize_entry("required", &self.required)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_distinguishes_shapes() {
        assert!(matches!(
            SchemaShape::classify(&json!({"$ref": "#/components/schemas/Pet"})),
            SchemaShape::Ref("#/components/schemas/Pet")
        ));
        assert!(matches!(
            SchemaShape::classify(&json!({"type": "object", "oneOf": [{}, {}]})),
            SchemaShape::Combinator {
                kind: Combinator::OneOf,
                ..
            }
        ));
        assert!(SchemaShape::classify(&json!({"properties": {"a": {}}})).is_object());
        assert!(SchemaShape::classify(&json!({"type": ["object", "null"]})).is_object());
        assert!(matches!(
            SchemaShape::classify(&json!({"type": "array", "items": {}})),
            SchemaShape::Array(_)
        ));
        assert!(matches!(
            SchemaShape::classify(&json!({"type": "integer"})),
            SchemaShape::Primitive(_)
        ));
        assert!(matches!(SchemaShape::classify(&json!({})), SchemaShape::Untyped(_)));
        assert!(matches!(SchemaShape::classify(&json!(true)), SchemaShape::Boolean(true)));
        assert!(matches!(SchemaShape::classify(&json!(3)), SchemaShape::Invalid(_)));
    }

    #[test]
    fn nullable_becomes_any_of_recursively() {
        let mut schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "nullable": true },
                "tags": {
                    "type": "array",
                    "items": { "type": "string", "nullable": true }
                },
                "plain": { "type": "integer", "nullable": false }
            }
        });
        convert_nullable(&mut schema);

        assert_eq!(
            schema["properties"]["name"],
            json!({ "anyOf": [{ "type": "string" }, { "type": "null" }] })
        );
        assert_eq!(
            schema["properties"]["tags"]["items"],
            json!({ "anyOf": [{ "type": "string" }, { "type": "null" }] })
        );
        assert_eq!(schema["properties"]["plain"], json!({ "type": "integer" }));
    }

    #[test]
    fn nullable_strips_refs_without_following_them() {
        let mut schema = json!({
            "$ref": "#/components/schemas/Node",
            "nullable": true
        });
        convert_nullable(&mut schema);
        assert_eq!(schema, json!({ "anyOf": [{}, { "type": "null" }] }));
    }

    #[test]
    fn nullable_children_keeps_top_level_object() {
        let mut schema = json!({
            "type": "object",
            "nullable": true,
            "additionalProperties": { "type": "string", "nullable": true }
        });
        convert_nullable_children(&mut schema);
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(
            schema["additionalProperties"],
            json!({ "anyOf": [{ "type": "string" }, { "type": "null" }] })
        );
    }

    #[test]
    fn copy_keywords_keeps_whitelist_and_extensions() {
        let source = json!({
            "name": "limit",
            "in": "query",
            "type": "integer",
            "maximum": 100,
            "x-internal": true,
            "required": true,
            "discriminator": { "propertyName": "kind" }
        });
        let mut target = JsonObject::new();
        copy_keywords(
            source.as_object().unwrap(),
            &mut target,
            &[SchemaKeyword::Required],
        );
        assert_eq!(
            Value::Object(target),
            json!({ "type": "integer", "maximum": 100, "x-internal": true })
        );
    }

    #[test]
    fn schema_object_serializes_without_empty_required() {
        let mut obj = JsonSchemaObject::new();
        assert_eq!(
            serde_json::to_value(&obj).unwrap(),
            json!({ "type": "object", "properties": {} })
        );
        obj.properties.insert("q".to_string(), json!({ "type": "string" }));
        obj.require("q");
        obj.require("q");
        assert_eq!(
            serde_json::to_value(&obj).unwrap(),
            json!({
                "type": "object",
                "properties": { "q": { "type": "string" } },
                "required": ["q"]
            })
        );
        assert_eq!(serde_json::to_value(&obj).unwrap(), obj.to_value());
    }
}
