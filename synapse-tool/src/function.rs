//! Tools built from closures.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::tool::{Tool, ToolError};

type Handler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send>> + Send + Sync>;

/// A tool assembled from a name, a description, a fuzzy argument schema and a
/// handler closure.
///
/// ```ignore
/// let echo = FnTool::new("echo", "Echo the text", json!({"text": "text to echo"}), |args| async move {
///     Ok(args["text"].clone())
/// });
/// ```
#[derive(Clone)]
pub struct FnTool {
    name: String,
    description: String,
    schema: Value,
    handler: Handler,
}

impl FnTool {
    /// A tool backed by an async handler.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// A tool backed by a synchronous handler.
    pub fn sync<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        Self::new(name, description, schema, move |args| {
            let handler = Arc::clone(&handler);
            async move { handler(args) }
        })
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn args_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        (self.handler)(args).await
    }
}
