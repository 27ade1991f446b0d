//! Tasks and worked examples.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use synapse_protocol::Operation;
use synapse_types::BoxError;

/// Turns the payload of an `ANS` operation into the answer type.
pub type AnswerParser<O> = Arc<dyn Fn(&str) -> Result<O, BoxError> + Send + Sync>;

/// A worked example shown to the model: an input, the protocol operations
/// that lead to the answer, and the answer itself.
#[derive(Debug, Clone)]
pub struct Example<I, O> {
    /// Example input.
    pub input: I,
    /// Intermediate operations, e.g. thoughts, actions and their observations.
    pub steps: Vec<Operation>,
    /// Expected answer.
    pub answer: O,
}

impl<I, O> Example<I, O> {
    /// An example that answers directly.
    pub fn new(input: I, answer: O) -> Self {
        Self {
            input,
            steps: Vec::new(),
            answer,
        }
    }

    /// Set the intermediate operations.
    pub fn with_steps(mut self, steps: Vec<Operation>) -> Self {
        self.steps = steps;
        self
    }
}

/// A problem the agent solves for many inputs.
pub struct Task<I, O> {
    /// What to do, in plain language.
    pub description: String,
    /// Worked examples, shown in order.
    pub examples: Vec<Example<I, O>>,
    /// Parser for the final answer payload.
    pub parser: AnswerParser<O>,
}

impl<I, O> Task<I, O> {
    /// A task with a custom answer parser.
    pub fn new<F>(description: impl Into<String>, parser: F) -> Self
    where
        F: Fn(&str) -> Result<O, BoxError> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            examples: Vec::new(),
            parser: Arc::new(parser),
        }
    }

    /// Append a worked example.
    pub fn with_example(mut self, example: Example<I, O>) -> Self {
        self.examples.push(example);
        self
    }

    /// Parse an answer payload.
    pub fn parse_answer(&self, payload: &str) -> Result<O, BoxError> {
        (self.parser)(payload)
    }
}

impl<I, O: DeserializeOwned> Task<I, O> {
    /// A task whose answers are JSON-encoded `O` values.
    pub fn json(description: impl Into<String>) -> Self {
        Self::new(description, |payload| Ok(serde_json::from_str(payload.trim())?))
    }
}

impl<I: Clone, O: Clone> Clone for Task<I, O> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            examples: self.examples.clone(),
            parser: Arc::clone(&self.parser),
        }
    }
}
