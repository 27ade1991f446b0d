//! Things that can be evaluated.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use std::sync::Arc;
use synapse_agent::Agent;
use synapse_types::{BoxError, ChatMessage, Llm, Prompt};

/// Produces an output for an input.
#[async_trait]
pub trait Runner<I, O>: Send + Sync {
    /// Run once.
    async fn run(&self, input: &I) -> Result<O, BoxError>;
}

/// Evaluates a backend directly: the input is a prompt, the output the reply.
pub struct LlmRunner {
    llm: Arc<dyn Llm>,
}

impl LlmRunner {
    /// Wrap a backend.
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Runner<Prompt, ChatMessage> for LlmRunner {
    async fn run(&self, input: &Prompt) -> Result<ChatMessage, BoxError> {
        Ok(self.llm.chat(input).await?)
    }
}

#[async_trait]
impl<I, O> Runner<I, O> for Agent<I, O>
where
    I: Serialize + JsonSchema + Send + Sync,
    O: Serialize + JsonSchema + Send + Sync,
{
    async fn run(&self, input: &I) -> Result<O, BoxError> {
        Ok(Agent::run(self, input).await?)
    }
}
