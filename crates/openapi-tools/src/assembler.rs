//! Tool assembly.
//!
//! Turns parsed operations into validated [`Tool`] records plus the tool name -> operation routing
//! table consumed by the gateway dispatcher.

use crate::error::{OpenApiToolsError, Result};
use crate::operation::OperationDescriptor;
use crate::schema::JsonObject;
use crate::semantics::annotations_for_method;
use crate::walker::ParsedOperation;
use rmcp::model::ToolAnnotations;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Tool name -> routing fact. Key-sorted so serialized output is stable.
pub type ToolToOperationMap = BTreeMap<String, OperationDescriptor>;

/// A named, schema-described callable unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: JsonObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<JsonObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

/// Keeps name, title, description, schemas and annotations; `icons` and `_meta` are dropped.
impl From<rmcp::model::Tool> for Tool {
    fn from(tool: rmcp::model::Tool) -> Self {
        Self {
            name: tool.name.into_owned(),
            title: tool.title,
            description: tool.description.map(std::borrow::Cow::into_owned),
            input_schema: (*tool.input_schema).clone(),
            output_schema: tool.output_schema.map(|schema| (*schema).clone()),
            annotations: tool.annotations,
        }
    }
}

/// Tools in document order plus their routing table.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledTools {
    pub tools: Vec<Tool>,
    pub tool_to_operation_map: ToolToOperationMap,
}

fn object_schema_rule() -> Value {
    json!({
        "type": "object",
        "required": ["type"],
        "properties": {
            "type": { "const": "object" },
            "properties": { "type": "object" },
            "required": { "type": "array", "items": { "type": "string" } }
        }
    })
}

fn tool_rule() -> Value {
    json!({
        "type": "object",
        "required": ["name", "inputSchema"],
        "additionalProperties": false,
        "properties": {
            "name": { "type": "string", "minLength": 1, "pattern": "^[a-zA-Z0-9_]+$" },
            "title": { "type": "string" },
            "description": { "type": "string" },
            "inputSchema": object_schema_rule(),
            "outputSchema": object_schema_rule(),
            "annotations": { "type": "object" }
        }
    })
}

/// Accumulates tools for one resolution, rejecting invalid and duplicate ones.
pub struct ToolAssembler {
    validator: jsonschema::Validator,
    assembled: AssembledTools,
}

impl ToolAssembler {
    /// # Errors
    ///
    /// Returns an error if the internal tool schema fails to compile.
    pub fn new() -> Result<Self> {
        let validator = jsonschema::validator_for(&tool_rule())
            .map_err(|e| OpenApiToolsError::OpenApi(format!("invalid tool schema: {e}")))?;
        Ok(Self {
            validator,
            assembled: AssembledTools::default(),
        })
    }

    /// Build, validate and register the tool for one operation.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::InvalidTool`] if the tool fails validation and
    /// [`OpenApiToolsError::DuplicateTool`] if its name is already taken.
    pub fn add(&mut self, operation: ParsedOperation) -> Result<()> {
        let label = operation.label();
        let ParsedOperation {
            descriptor,
            tool_name,
            description,
            input_schema,
            output_schema,
        } = operation;

        let tool = Tool {
            name: tool_name,
            title: None,
            description,
            input_schema: input_schema.schema.to_json_object(),
            output_schema,
            annotations: Some(annotations_for_method(descriptor.http_method)),
        };
        self.validate(&tool)?;

        if self.assembled.tool_to_operation_map.contains_key(&tool.name) {
            return Err(OpenApiToolsError::DuplicateTool {
                label,
                name: tool.name,
            });
        }

        self.assembled
            .tool_to_operation_map
            .insert(tool.name.clone(), descriptor);
        self.assembled.tools.push(tool);
        Ok(())
    }

    fn validate(&self, tool: &Tool) -> Result<()> {
        let instance = serde_json::to_value(tool)?;
        let messages: Vec<String> = self
            .validator
            .iter_errors(&instance)
            .map(|e| {
                let path = e.instance_path().to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();
        if messages.is_empty() {
            return Ok(());
        }
        Err(OpenApiToolsError::InvalidTool {
            name: tool.name.clone(),
            message: messages.join("; "),
        })
    }

    #[must_use]
    pub fn finish(self) -> AssembledTools {
        self.assembled
    }
}

/// Assemble every operation, in order.
///
/// # Errors
///
/// See [`ToolAssembler::add`].
pub fn assemble_tools(operations: Vec<ParsedOperation>) -> Result<AssembledTools> {
    let mut assembler = ToolAssembler::new()?;
    for operation in operations {
        assembler.add(operation)?;
    }
    Ok(assembler.finish())
}
