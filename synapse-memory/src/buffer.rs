//! In-process message buffer.

use async_trait::async_trait;
use std::collections::VecDeque;
use synapse_types::{ChatMessage, Prompt};

use crate::{Memory, MemoryError};

/// Keeps the task prompt and the messages exchanged after it.
///
/// An unbounded buffer replays the whole conversation. A bounded buffer keeps
/// the task prompt pinned and only the most recent `max_history` messages after
/// it, dropping the oldest first.
#[derive(Debug, Clone, Default)]
pub struct BufferMemory {
    prompt: Vec<ChatMessage>,
    messages: VecDeque<ChatMessage>,
    max_history: Option<usize>,
}

impl BufferMemory {
    /// Keep every message.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Keep at most `max_history` messages after the task prompt.
    #[must_use]
    pub fn bounded(max_history: usize) -> Self {
        Self {
            max_history: Some(max_history),
            ..Self::default()
        }
    }

    /// The window size, if any.
    pub fn max_history(&self) -> Option<usize> {
        self.max_history
    }

    /// Everything currently retained, task prompt first.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.prompt.iter().chain(&self.messages).cloned().collect()
    }

    fn push(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        if let Some(max) = self.max_history {
            while self.messages.len() > max {
                self.messages.pop_front();
            }
        }
    }
}

#[async_trait]
impl Memory for BufferMemory {
    async fn add_prompt(&mut self, prompt: Prompt) -> Result<(), MemoryError> {
        self.prompt.extend(prompt.history);
        Ok(())
    }

    async fn add(&mut self, message: ChatMessage) -> Result<(), MemoryError> {
        self.push(message);
        Ok(())
    }

    async fn prompt_with_context(
        &mut self,
        next: Vec<ChatMessage>,
    ) -> Result<Prompt, MemoryError> {
        for message in next {
            self.push(message);
        }
        Ok(Prompt::new(self.history()))
    }
}
