//! The backend trait.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::BackendError;
use crate::types::{ChatMessage, FunctionSpec, Prompt};

/// A language model backend.
///
/// Implementations turn a [`Prompt`] into the next assistant [`ChatMessage`].
/// Backends that understand native function calls report it through
/// [`Llm::supports_functions`] and override [`Llm::chat_with_functions`];
/// the engine falls back to the textual protocol for everyone else.
#[async_trait]
pub trait Llm: Send + Sync {
    /// Produce the next message for the conversation.
    async fn chat(&self, prompt: &Prompt) -> Result<ChatMessage, BackendError>;

    /// Whether this backend accepts native function specs.
    fn supports_functions(&self) -> bool {
        false
    }

    /// Produce the next message, offering `functions` for native calls.
    ///
    /// The default ignores the functions and delegates to [`Llm::chat`].
    async fn chat_with_functions(
        &self,
        prompt: &Prompt,
        functions: &[FunctionSpec],
    ) -> Result<ChatMessage, BackendError> {
        let _ = functions;
        self.chat(prompt).await
    }
}

#[async_trait]
impl<L: Llm + ?Sized> Llm for Arc<L> {
    async fn chat(&self, prompt: &Prompt) -> Result<ChatMessage, BackendError> {
        (**self).chat(prompt).await
    }

    fn supports_functions(&self) -> bool {
        (**self).supports_functions()
    }

    async fn chat_with_functions(
        &self,
        prompt: &Prompt,
        functions: &[FunctionSpec],
    ) -> Result<ChatMessage, BackendError> {
        (**self).chat_with_functions(prompt, functions).await
    }
}
