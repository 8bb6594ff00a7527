//! Schema merging.
//!
//! Folds per-source schema fragments into one flat tool input schema while recording which
//! parameter source each field came from.

use crate::error::{OpenApiToolsError, Result};
use crate::params::ParameterSchemas;
use crate::schema::{JsonObject, JsonSchemaObject, SchemaShape};
use crate::sources::{ParameterSource, SourceMap};
use serde_json::Value;

/// Where a fragment comes from, for source bookkeeping and error messages.
#[derive(Debug, Clone, Copy)]
pub struct MergeContext<'a> {
    pub source: ParameterSource,
    pub label: &'a str,
}

/// A tool input schema under construction plus its field -> source map.
///
/// Cloning a `MergedSchema` is how an operation inherits its path-level baseline: the clone is
/// extended, the baseline is never touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedSchema {
    pub schema: JsonSchemaObject,
    pub sources: SourceMap,
}

impl MergedSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every fragment of `schemas`, in [`ParameterSource::ALL`] order.
    ///
    /// # Errors
    ///
    /// See [`MergedSchema::merge`].
    pub fn merge_all(&mut self, schemas: &ParameterSchemas, label: &str) -> Result<()> {
        for (source, fragment) in schemas.iter() {
            self.merge(fragment, MergeContext { source, label })?;
        }
        Ok(())
    }

    /// Merge one fragment.
    ///
    /// A field already contributed by the same source is replaced, `required` included (an
    /// operation-level parameter overriding a path-level one); a field already contributed by a
    /// different source is an error.
    ///
    /// # Errors
    ///
    /// - any fragment from the `cookie` source
    /// - top-level `allOf` / `anyOf` / `oneOf`
    /// - a fragment that is not an object schema
    /// - a field name colliding across two sources
    pub fn merge(&mut self, fragment: &Value, ctx: MergeContext<'_>) -> Result<()> {
        if ctx.source == ParameterSource::Cookie {
            let name = fragment
                .get("properties")
                .and_then(Value::as_object)
                .and_then(|p| p.keys().next().cloned())
                .unwrap_or_else(|| "?".to_string());
            return Err(OpenApiToolsError::CookieParameter {
                label: ctx.label.to_string(),
                name,
            });
        }

        let object = match SchemaShape::classify(fragment) {
            SchemaShape::Object(map) => map,
            // `{}` accepts anything; there are no fields to lift into the tool input.
            SchemaShape::Untyped(map) if !map.contains_key("properties") => return Ok(()),
            SchemaShape::Combinator { kind, .. } => {
                return Err(OpenApiToolsError::UnsupportedCombinator {
                    label: ctx.label.to_string(),
                    param_source: ctx.source,
                    combinator: kind.keyword(),
                });
            }
            other @ (SchemaShape::Ref(_)
            | SchemaShape::Array(_)
            | SchemaShape::Primitive(_)
            | SchemaShape::Untyped(_)
            | SchemaShape::Boolean(_)
            | SchemaShape::Invalid(_)) => {
                return Err(OpenApiToolsError::NonObjectSchema {
                    label: ctx.label.to_string(),
                    param_source: ctx.source,
                    found: other.describe(),
                });
            }
        };

        self.merge_object(object, ctx)
    }

    fn merge_object(&mut self, object: &JsonObject, ctx: MergeContext<'_>) -> Result<()> {
        if let Some(properties) = object.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                match self.sources.get(name) {
                    Some(existing) if *existing != ctx.source => {
                        return Err(OpenApiToolsError::ParamCollision {
                            label: ctx.label.to_string(),
                            name: name.clone(),
                            existing: *existing,
                            incoming: ctx.source,
                        });
                    }
                    Some(_) => self.schema.required.retain(|r| r != name),
                    None => {}
                }
                self.schema
                    .properties
                    .insert(name.clone(), property.clone());
                self.sources.insert(name.clone(), ctx.source);
            }
        }

        if let Some(required) = object.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                self.schema.require(name);
            }
        }

        Ok(())
    }
}
