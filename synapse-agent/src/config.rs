//! Agent configuration.

use std::sync::Arc;
use synapse_memory::{BufferMemory, Memory};
use synapse_protocol::UnparsedReplyPolicy;
use synapse_tool::{ConfirmAction, Preprocessor, Tool};
use synapse_types::BoxError;

/// Checks a value; an `Err` describes what is wrong.
pub type Validator<T> = Arc<dyn Fn(&T) -> Result<(), BoxError> + Send + Sync>;

/// Creates a fresh [`Memory`] for every attempt of a run.
pub type MemoryFactory = Arc<dyn Fn() -> Box<dyn Memory> + Send + Sync>;

/// Wrap a closure as a [`Validator`].
pub fn validator<T, F>(f: F) -> Validator<T>
where
    F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a constructor as a [`MemoryFactory`].
pub fn memory_factory<M, F>(f: F) -> MemoryFactory
where
    M: Memory + 'static,
    F: Fn() -> M + Send + Sync + 'static,
{
    Arc::new(move || Box::new(f()) as Box<dyn Memory>)
}

/// Configuration for an [`Agent`](crate::Agent).
pub struct AgentConfig<I, O> {
    /// Tools the model may call, in catalog order.
    pub tools: Vec<Arc<dyn Tool>>,
    /// Argument preprocessors, run before any tool-provided ones.
    pub preprocessors: Vec<Arc<dyn Preprocessor>>,
    /// Checked once before the first attempt. Any failure rejects the input.
    pub input_validators: Vec<Validator<I>>,
    /// Checked on every parsed answer. Failures are reported to the model.
    pub output_validators: Vec<Validator<O>>,
    /// Follow-up model calls allowed per attempt beyond the first one.
    /// `0` means unlimited.
    pub max_solution_attempts: usize,
    /// Extra attempts after a failed one. Each starts from scratch.
    pub max_restarts: usize,
    /// Asked before every tool call.
    pub confirm: Option<Arc<dyn ConfirmAction>>,
    /// Memory for each attempt.
    pub memory: MemoryFactory,
    /// What to do with replies that contain no operation.
    pub unparsed_reply: UnparsedReplyPolicy,
}

impl<I, O> Default for AgentConfig<I, O> {
    fn default() -> Self {
        Self {
            tools: Vec::new(),
            preprocessors: Vec::new(),
            input_validators: Vec::new(),
            output_validators: Vec::new(),
            max_solution_attempts: 0,
            max_restarts: 0,
            confirm: None,
            memory: memory_factory(BufferMemory::unbounded),
            unparsed_reply: UnparsedReplyPolicy::default(),
        }
    }
}

impl<I, O> Clone for AgentConfig<I, O> {
    fn clone(&self) -> Self {
        Self {
            tools: self.tools.clone(),
            preprocessors: self.preprocessors.clone(),
            input_validators: self.input_validators.clone(),
            output_validators: self.output_validators.clone(),
            max_solution_attempts: self.max_solution_attempts,
            max_restarts: self.max_restarts,
            confirm: self.confirm.clone(),
            memory: Arc::clone(&self.memory),
            unparsed_reply: self.unparsed_reply,
        }
    }
}
