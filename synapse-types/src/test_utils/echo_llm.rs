//! EchoLlm replies with the content of the first prompt message.

use crate::error::BackendError;
use crate::llm::Llm;
use crate::types::{ChatMessage, Prompt};
use async_trait::async_trait;

/// A backend that echoes the first message of every prompt as an
/// assistant reply. An empty prompt yields an empty reply.
pub struct EchoLlm;

#[async_trait]
impl Llm for EchoLlm {
    async fn chat(&self, prompt: &Prompt) -> Result<ChatMessage, BackendError> {
        let content = prompt
            .history
            .first()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(ChatMessage::assistant(content))
    }
}
