//! Agent errors.

use synapse_memory::MemoryError;
use synapse_types::BackendError;
use thiserror::Error;

use crate::compile::CompileError;

/// Why a run failed.
///
/// Everything the model gets wrong (bad format, unknown tools, rejected
/// answers) is reported back to it and never surfaces here. These are the
/// failures that end an attempt.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AgentError {
    /// An input validator rejected the input. Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The task could not be compiled into a prompt.
    #[error("compile failed: {0}")]
    Compile(#[from] CompileError),

    /// The language model backend failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// The memory strategy failed.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    /// The model did not answer within the configured number of follow-up calls.
    #[error("max solution attempts reached ({0})")]
    MaxAttemptsExceeded(usize),
}

impl AgentError {
    /// Whether the error came from exhausting the solution budget.
    pub fn is_budget_exceeded(&self) -> bool {
        matches!(self, AgentError::MaxAttemptsExceeded(_))
    }

    /// Whether the caller supplied something unusable; restarting cannot help.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, AgentError::InvalidInput(_))
    }
}
