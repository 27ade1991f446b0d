//! The tool and preprocessor traits.

use async_trait::async_trait;
use serde_json::Value;
use synapse_types::BoxError;
use thiserror::Error;

use crate::repair::RepairError;

/// Errors from tool execution.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    /// The arguments were well-formed JSON but not what the tool expects.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The tool ran and failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(#[source] BoxError),

    /// No tool with this name exists.
    #[error("tool not found: {0}")]
    NotFound(String),
}

/// A capability the model can invoke.
///
/// `args_schema` is a *fuzzy* schema: an example-like JSON value describing
/// the arguments (`{"text": "the text to echo"}`), shown verbatim to the model
/// and used to infer native function specs.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call the tool.
    fn name(&self) -> &str;

    /// What the tool does.
    fn description(&self) -> &str;

    /// Fuzzy description of the arguments.
    fn args_schema(&self) -> Value;

    /// Run the tool.
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;

    /// A shorter form of `args` for conversation memory. Defaults to `args`.
    fn compact_args(&self, args: Value) -> Value {
        args
    }

    /// Tools that also rewrite raw argument text expose it here.
    fn as_preprocessor(&self) -> Option<&dyn Preprocessor> {
        None
    }
}

/// Rewrites raw argument text before a tool sees it.
#[async_trait]
pub trait Preprocessor: Send + Sync {
    /// Return the (possibly rewritten) arguments or a failure.
    async fn process(&self, args: String) -> Result<String, RepairError>;
}

/// Text shown to the model for a tool result. Strings are shown bare,
/// anything else as compact JSON.
pub fn render_output(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
