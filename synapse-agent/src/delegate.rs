//! Delegating sub-tasks to a nested agent.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use synapse_memory::BufferMemory;
use synapse_tool::{Tool, ToolError};
use synapse_types::Llm;

use crate::agent::Agent;
use crate::config::{AgentConfig, MemoryFactory, memory_factory};
use crate::task::Task;

/// Arguments of [`AgentTool`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// What the nested agent should do.
    pub task: String,
    /// The input to work on.
    pub input: String,
}

/// A tool that hands a sub-task to a fresh agent.
///
/// Every call compiles `task` into a new [`Task`] and solves it for `input`
/// with the configured tools. Nested agents remember the last
/// [`AgentTool::MEMORY_WINDOW`] messages unless [`AgentTool::with_memory`]
/// says otherwise. The answer is returned as text; a JSON string answer is
/// unquoted.
pub struct AgentTool {
    llm: Arc<dyn Llm>,
    config: AgentConfig<String, String>,
    description: String,
}

impl AgentTool {
    /// Tool name seen by the model.
    pub const NAME: &'static str = "smart_agent";

    /// Messages a nested agent keeps after its task prompt.
    pub const MEMORY_WINDOW: usize = 10;

    /// A delegating tool whose nested agents use `llm` and `config`.
    ///
    /// The memory of `config` is replaced by a buffer bounded to
    /// [`Self::MEMORY_WINDOW`] messages.
    pub fn new(llm: Arc<dyn Llm>, mut config: AgentConfig<String, String>) -> Self {
        config.memory = memory_factory(|| BufferMemory::bounded(Self::MEMORY_WINDOW));
        let names: Vec<&str> = config.tools.iter().map(|t| t.name()).collect();
        let description = if names.is_empty() {
            "A smart agent that can solve a self-contained sub-task on its own.".to_string()
        } else {
            format!(
                "A smart agent that can solve a self-contained sub-task on its own, \
using these tools: {}.",
                names.join(", ")
            )
        };
        Self {
            llm,
            config,
            description,
        }
    }

    /// Use `memory` for nested agents instead of the bounded buffer.
    #[must_use]
    pub fn with_memory(mut self, memory: MemoryFactory) -> Self {
        self.config.memory = memory;
        self
    }
}

fn parse_text_answer(payload: &str) -> Result<String, synapse_types::BoxError> {
    let payload = payload.trim();
    Ok(serde_json::from_str::<String>(payload).unwrap_or_else(|_| payload.to_string()))
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn args_schema(&self) -> Value {
        json!({
            "task": "the sub-task to solve, in plain language",
            "input": "the input to solve it for"
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let delegation: Delegation =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        tracing::debug!(task = %delegation.task, "synapse.agent.delegate");

        let task = Task::new(delegation.task, parse_text_answer);
        let agent = Agent::new(Arc::clone(&self.llm), task, self.config.clone());
        let answer = agent
            .run(&delegation.input)
            .await
            .map_err(|e| ToolError::ExecutionFailed(Box::new(e)))?;
        Ok(Value::String(answer))
    }
}
