//! ScriptedLlm replays a queue of canned replies.

use crate::error::BackendError;
use crate::llm::Llm;
use crate::types::{ChatMessage, FunctionSpec, Prompt};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A backend that returns queued replies in order and records every prompt
/// it receives.
///
/// When the queue is empty it returns the repeating reply if one was set,
/// otherwise [`BackendError::InvalidResponse`].
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<ChatMessage>>,
    repeat: Option<ChatMessage>,
    native: bool,
    prompts: Mutex<Vec<Prompt>>,
    functions: Mutex<Vec<Vec<FunctionSpec>>>,
}

impl ScriptedLlm {
    /// Replay `replies` in order.
    pub fn new(replies: impl IntoIterator<Item = ChatMessage>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Replay assistant replies with the given texts.
    pub fn texts<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self::new(texts.into_iter().map(ChatMessage::assistant))
    }

    /// Always reply with `reply`.
    pub fn repeating(reply: ChatMessage) -> Self {
        Self {
            repeat: Some(reply),
            ..Self::default()
        }
    }

    /// Report native function support.
    pub fn with_native_functions(mut self) -> Self {
        self.native = true;
        self
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Every prompt received, oldest first.
    pub fn prompts(&self) -> Vec<Prompt> {
        lock(&self.prompts).clone()
    }

    /// Function specs offered on each native call.
    pub fn offered_functions(&self) -> Vec<Vec<FunctionSpec>> {
        lock(&self.functions).clone()
    }

    fn next_reply(&self, prompt: &Prompt) -> Result<ChatMessage, BackendError> {
        lock(&self.prompts).push(prompt.clone());
        lock(&self.replies)
            .pop_front()
            .or_else(|| self.repeat.clone())
            .ok_or_else(|| BackendError::InvalidResponse("script exhausted".into()))
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl Llm for ScriptedLlm {
    async fn chat(&self, prompt: &Prompt) -> Result<ChatMessage, BackendError> {
        self.next_reply(prompt)
    }

    fn supports_functions(&self) -> bool {
        self.native
    }

    async fn chat_with_functions(
        &self,
        prompt: &Prompt,
        functions: &[FunctionSpec],
    ) -> Result<ChatMessage, BackendError> {
        lock(&self.functions).push(functions.to_vec());
        self.next_reply(prompt)
    }
}
