#![deny(missing_docs)]
//! Conversation memory for synapse agents.
//!
//! The engine never sends raw history to a backend. It hands every exchanged
//! message to a [`Memory`], and asks it for the prompt of the next call.
//! Strategies decide what that prompt contains:
//!
//! - [`BufferMemory`] keeps everything, or a sliding window of recent messages
//!   after the pinned task prompt.
//! - [`SummarizedMemory`] folds every message into an LLM-maintained memory
//!   state and only replays a short window verbatim.

pub mod buffer;
pub mod summarized;

pub use buffer::BufferMemory;
pub use summarized::SummarizedMemory;

use async_trait::async_trait;
use synapse_types::{BackendError, ChatMessage, Prompt};
use thiserror::Error;

/// Errors from memory strategies.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The backend used to maintain the memory failed.
    #[error("memory backend failed: {0}")]
    Backend(#[from] BackendError),

    /// The backend returned an empty memory state.
    #[error("memory backend returned an empty state")]
    EmptyState,
}

/// Conversation state across model calls.
///
/// A memory belongs to exactly one run at a time: every method takes
/// `&mut self`, so sharing one between concurrent runs requires the caller to
/// add its own synchronisation.
#[async_trait]
pub trait Memory: Send {
    /// Record the compiled task prompt.
    async fn add_prompt(&mut self, prompt: Prompt) -> Result<(), MemoryError>;

    /// Record a message produced by the model.
    async fn add(&mut self, message: ChatMessage) -> Result<(), MemoryError>;

    /// Record the engine's follow-up messages and return the prompt for the
    /// next model call.
    async fn prompt_with_context(
        &mut self,
        next: Vec<ChatMessage>,
    ) -> Result<Prompt, MemoryError>;
}

