//! Confirmation-gated tool execution.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use synapse_protocol::Operation;

use crate::tool::{Tool, ToolError, render_output};

/// Error text returned to the model when the confirmation hook vetoes a call.
pub const CANCELLED_BY_USER: &str = "action cancelled by user";

/// Decides whether a tool call may proceed, e.g. by asking a human.
#[async_trait]
pub trait ConfirmAction: Send + Sync {
    /// Return `false` to veto the call.
    async fn confirm(&self, tool: &str, args: &Value) -> bool;
}

/// A [`ConfirmAction`] backed by a synchronous closure.
pub struct ConfirmFn<F> {
    f: F,
}

/// Wrap a closure as a [`ConfirmAction`].
#[must_use]
pub fn confirm_fn<F>(f: F) -> ConfirmFn<F>
where
    F: Fn(&str, &Value) -> bool + Send + Sync,
{
    ConfirmFn { f }
}

#[async_trait]
impl<F> ConfirmAction for ConfirmFn<F>
where
    F: Fn(&str, &Value) -> bool + Send + Sync,
{
    async fn confirm(&self, tool: &str, args: &Value) -> bool {
        (self.f)(tool, args)
    }
}

/// What happened to a dispatched call.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The tool ran and produced output.
    Observed {
        /// Tool name.
        tool: String,
        /// Rendered output.
        output: String,
    },
    /// The tool ran and failed.
    Failed {
        /// Tool name.
        tool: String,
        /// The failure.
        error: ToolError,
    },
    /// The confirmation hook vetoed the call; the tool never ran.
    Cancelled {
        /// Tool name.
        tool: String,
    },
}

impl DispatchOutcome {
    /// The tool the outcome belongs to.
    pub fn tool(&self) -> &str {
        match self {
            DispatchOutcome::Observed { tool, .. }
            | DispatchOutcome::Failed { tool, .. }
            | DispatchOutcome::Cancelled { tool } => tool,
        }
    }

    /// Whether the call was vetoed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DispatchOutcome::Cancelled { .. })
    }

    /// The protocol operation reporting this outcome to the model.
    pub fn into_operation(self) -> Operation {
        match self {
            DispatchOutcome::Observed { tool, output } => Operation::observation(tool, output),
            DispatchOutcome::Failed { tool, error } => {
                let content = format!("{tool}: {error}");
                Operation::tool_error(tool, content)
            }
            DispatchOutcome::Cancelled { tool } => Operation::tool_error(tool, CANCELLED_BY_USER),
        }
    }
}

/// Runs tools behind an optional confirmation hook.
///
/// Dispatch never fails: every tool error or veto becomes a
/// [`DispatchOutcome`] the engine reports back to the model.
#[derive(Clone, Default)]
pub struct Dispatcher {
    confirm: Option<Arc<dyn ConfirmAction>>,
}

impl Dispatcher {
    /// A dispatcher that runs every call without asking.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher that asks `confirm` before every call.
    #[must_use]
    pub fn with_confirm(confirm: Arc<dyn ConfirmAction>) -> Self {
        Self {
            confirm: Some(confirm),
        }
    }

    /// Execute `tool` with `args`.
    pub async fn execute(&self, tool: &dyn Tool, args: Value) -> DispatchOutcome {
        let name = tool.name().to_string();
        if let Some(confirm) = &self.confirm {
            if !confirm.confirm(&name, &args).await {
                tracing::warn!(tool = %name, "synapse.dispatch.vetoed");
                return DispatchOutcome::Cancelled { tool: name };
            }
        }

        match tool.execute(args).await {
            Ok(output) => {
                let output = render_output(&output);
                tracing::debug!(tool = %name, bytes = output.len(), "synapse.dispatch.observed");
                DispatchOutcome::Observed { tool: name, output }
            }
            Err(error) => {
                tracing::debug!(tool = %name, error = %error, "synapse.dispatch.failed");
                DispatchOutcome::Failed { tool: name, error }
            }
        }
    }
}
