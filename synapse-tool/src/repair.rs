//! Argument repair: the preprocessing pipeline and the LLM-backed JSON fixer.

use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use synapse_types::{BackendError, ChatMessage, Llm, Prompt};
use thiserror::Error;

use crate::registry::ToolRegistry;
use crate::tool::{Preprocessor, Tool};

/// Errors from argument preprocessing.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RepairError {
    /// The arguments were rejected.
    #[error("invalid arguments: {0}")]
    Invalid(String),

    /// Every repair attempt produced invalid output.
    #[error("max retries exceeded after {attempts} attempt(s): {}", .errors.join("; "))]
    MaxRetriesExceeded {
        /// Attempts made.
        attempts: usize,
        /// Why each attempt was rejected, oldest first.
        errors: Vec<String>,
    },

    /// The repair backend itself failed.
    #[error("repair backend failed: {0}")]
    Backend(#[from] BackendError),
}

impl RepairError {
    /// Whether the failure came from the repair backend rather than the
    /// arguments.
    pub fn is_backend(&self) -> bool {
        matches!(self, RepairError::Backend(_))
    }
}

#[derive(Clone)]
enum Stage {
    Standalone(Arc<dyn Preprocessor>),
    Tool(Arc<dyn Tool>),
}

/// An ordered chain of [`Preprocessor`]s applied to raw argument text.
///
/// Stages run in order, each receiving the previous stage's output. The first
/// failure stops the chain.
#[derive(Clone, Default)]
pub struct ArgPipeline {
    stages: Vec<Stage>,
}

impl ArgPipeline {
    /// An empty pipeline that passes arguments through unchanged.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Standalone preprocessors first, then every registered tool that is also
    /// a preprocessor, in registration order.
    pub fn assemble(preprocessors: &[Arc<dyn Preprocessor>], tools: &ToolRegistry) -> Self {
        let mut pipeline = Self::new();
        for p in preprocessors {
            pipeline.push(Arc::clone(p));
        }
        for tool in tools.iter().filter(|t| t.as_preprocessor().is_some()) {
            pipeline.stages.push(Stage::Tool(Arc::clone(tool)));
        }
        pipeline
    }

    /// Append a stage.
    pub fn push(&mut self, preprocessor: Arc<dyn Preprocessor>) {
        self.stages.push(Stage::Standalone(preprocessor));
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage over `args`.
    pub async fn process(&self, mut args: String) -> Result<String, RepairError> {
        for stage in &self.stages {
            args = match stage {
                Stage::Standalone(p) => p.process(args).await?,
                Stage::Tool(tool) => match tool.as_preprocessor() {
                    Some(p) => p.process(args).await?,
                    None => args,
                },
            };
        }
        Ok(args)
    }
}

const FIXER_INSTRUCTIONS: &str = "You are an automated JSON fixer. You will receive a JSON \
payload that might contain errors, and you must fix them and return a valid JSON payload. \
Reply with the fixed payload only, inside a ```json code block.";

/// Repairs malformed JSON arguments by asking a language model.
///
/// Valid JSON passes through untouched without calling the backend. Otherwise
/// the backend is asked up to `max_retries` times; each reply is taken from its
/// first fenced code block (or verbatim when there is none) and validated.
pub struct JsonAutoFixer {
    llm: Arc<dyn Llm>,
    max_retries: usize,
    fence: Regex,
}

impl JsonAutoFixer {
    /// A fixer using `llm`, allowed `max_retries` backend calls per payload.
    pub fn new(llm: Arc<dyn Llm>, max_retries: usize) -> Self {
        Self {
            llm,
            max_retries,
            fence: Regex::new(r"```(?:json)?\s([\s\S]+?)\s*```").expect("valid regex"),
        }
    }

    /// The retry budget.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn extract<'a>(&self, reply: &'a str) -> &'a str {
        self.fence
            .captures(reply)
            .and_then(|c| c.get(1))
            .map_or(reply.trim(), |m| m.as_str().trim())
    }

    fn prompt(malformed: &str) -> Prompt {
        Prompt::new(vec![
            ChatMessage::system(FIXER_INSTRUCTIONS),
            ChatMessage::user(r#"{"name": "John "Doe", "age": 30, "car": null}"#),
            ChatMessage::assistant(
                "```json\n{\"name\": \"John \\\"Doe\", \"age\": 30, \"car\": null}\n```",
            ),
            ChatMessage::user(malformed),
        ])
    }
}

#[async_trait]
impl Preprocessor for JsonAutoFixer {
    async fn process(&self, args: String) -> Result<String, RepairError> {
        if serde_json::from_str::<serde_json::Value>(&args).is_ok() {
            return Ok(args);
        }

        let mut prompt = Self::prompt(&args);
        let mut errors = Vec::new();
        for attempt in 1..=self.max_retries {
            let reply = self.llm.chat(&prompt).await?;
            let candidate = self.extract(&reply.content);
            match serde_json::from_str::<serde_json::Value>(candidate) {
                Ok(_) => {
                    tracing::debug!(attempt, "synapse.repair.fixed");
                    return Ok(candidate.to_string());
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "synapse.repair.still_invalid");
                    errors.push(e.to_string());
                    prompt.history.push(reply.clone());
                    prompt.history.push(ChatMessage::user(format!(
                        "That is still not valid JSON ({e}). Fix it and reply with the payload only."
                    )));
                }
            }
        }

        Err(RepairError::MaxRetriesExceeded {
            attempts: self.max_retries,
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_retries_display_lists_errors() {
        let err = RepairError::MaxRetriesExceeded {
            attempts: 2,
            errors: vec!["eof".into(), "bad key".into()],
        };
        assert_eq!(
            err.to_string(),
            "max retries exceeded after 2 attempt(s): eof; bad key"
        );
        assert!(!err.is_backend());
    }

    #[test]
    fn extract_prefers_fenced_block() {
        let fixer = JsonAutoFixer::new(Arc::new(synapse_types::test_utils::EchoLlm), 1);
        assert_eq!(fixer.extract("here:\n```json\n{\"a\": 1}\n```\nbye"), "{\"a\": 1}");
        assert_eq!(fixer.extract("```\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(fixer.extract("  {\"a\": 1}  "), "{\"a\": 1}");
    }
}
