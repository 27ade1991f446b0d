//! Native function specs inferred from fuzzy argument schemas.
//!
//! A fuzzy schema is an example-shaped JSON value: objects map parameter
//! names to nested fuzzy schemas, strings are descriptions, numbers and
//! booleans stand for their type, and arrays describe their elements.

use serde_json::Value;
use synapse_types::{FunctionSpec, ParamType, ParameterSpec};
use thiserror::Error;

use crate::tool::Tool;

/// Why a fuzzy schema could not be turned into typed parameters.
///
/// Never fatal: the tool stays reachable through the textual protocol.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// Function parameters must be an object of named arguments.
    #[error("function parameters must be an object, got {0}")]
    NotAnObject(String),

    /// `null` carries no type information.
    #[error("cannot infer a parameter type from null")]
    Null,

    /// An empty array carries no element type.
    #[error("cannot infer an element type from an empty array")]
    EmptyArray,

    /// Array elements disagree on their type.
    #[error("array elements have conflicting types")]
    ConflictingItems,
}

/// The native function spec for `tool`.
pub fn function_spec(tool: &dyn Tool) -> Result<FunctionSpec, SchemaError> {
    let schema = tool.args_schema();
    if !schema.is_object() {
        return Err(SchemaError::NotAnObject(kind_name(&schema).to_string()));
    }
    Ok(FunctionSpec {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        parameters: infer_parameters(&schema)?,
    })
}

/// Infer a typed parameter description from a fuzzy schema.
pub fn infer_parameters(schema: &Value) -> Result<ParameterSpec, SchemaError> {
    match schema {
        Value::Object(members) => {
            let mut spec = ParameterSpec::new(ParamType::Object, "");
            for (name, member) in members {
                spec.properties.insert(name.clone(), infer_parameters(member)?);
            }
            Ok(spec)
        }
        Value::Array(elements) => {
            let first = elements.first().ok_or(SchemaError::EmptyArray)?;
            let items = infer_parameters(first)?;
            for other in &elements[1..] {
                if infer_parameters(other)?.kind != items.kind {
                    return Err(SchemaError::ConflictingItems);
                }
            }
            let mut spec = ParameterSpec::new(ParamType::Array, "");
            spec.items = Some(Box::new(items));
            Ok(spec)
        }
        Value::String(description) => Ok(ParameterSpec::new(ParamType::String, description.clone())),
        Value::Number(_) => Ok(ParameterSpec::new(ParamType::Number, "a number")),
        Value::Bool(_) => Ok(ParameterSpec::new(ParamType::Boolean, "a boolean value")),
        Value::Null => Err(SchemaError::Null),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
    }
}
