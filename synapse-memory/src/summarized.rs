//! LLM-maintained memory state.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use synapse_types::{ChatMessage, Llm, Prompt};

use crate::{Memory, MemoryError};

const EMPTY_STATE: &str = "<memory state is empty>";

const MANAGER_INSTRUCTIONS: &str = "You are the memory manager of an AI assistant. You keep a \
short, factual memory state of a conversation: what the task is, what has been tried, what was \
learned and what is still open. You will receive the current memory state followed by new \
messages. Reply with the complete updated memory state and nothing else.";

/// Replays a short window of recent messages and summarizes everything else.
///
/// Every message recorded through [`Memory::add`] or
/// [`Memory::prompt_with_context`] is folded into a memory state by asking the
/// backend. The prompt for the next call is the task prompt, the memory state
/// as a system message, then the recent window.
pub struct SummarizedMemory {
    llm: Arc<dyn Llm>,
    prompt: Vec<ChatMessage>,
    recent: VecDeque<ChatMessage>,
    recent_limit: usize,
    state: String,
}

impl SummarizedMemory {
    /// Keep `recent_limit` messages verbatim; summarize with `llm`.
    pub fn new(llm: Arc<dyn Llm>, recent_limit: usize) -> Self {
        Self {
            llm,
            prompt: Vec::new(),
            recent: VecDeque::new(),
            recent_limit,
            state: String::new(),
        }
    }

    /// The current memory state. Empty until the first message is recorded.
    pub fn state(&self) -> &str {
        &self.state
    }

    fn trim(&mut self) {
        while self.recent.len() > self.recent_limit {
            self.recent.pop_front();
        }
    }

    async fn update_state(&mut self, messages: &[ChatMessage]) -> Result<(), MemoryError> {
        let current = if self.state.is_empty() {
            EMPTY_STATE
        } else {
            &self.state
        };

        let mut history = vec![
            ChatMessage::system(MANAGER_INSTRUCTIONS),
            ChatMessage::user(format!("Memory state:\n\n{EMPTY_STATE}")),
            ChatMessage::user(describe(&ChatMessage::user(
                "My name is Ada and I need a train ticket from Porto to Lisbon for Friday.",
            ))),
            ChatMessage::assistant(
                "- The user is Ada.\n- Ada needs a train ticket from Porto to Lisbon for Friday.",
            ),
            ChatMessage::user(format!(
                "These were examples. Now my current memory state is:\n\n{current}"
            )),
        ];
        history.extend(messages.iter().map(|m| ChatMessage::user(describe(m))));

        let reply = self.llm.chat(&Prompt::new(history)).await?;
        let state = reply.content.trim();
        if state.is_empty() {
            return Err(MemoryError::EmptyState);
        }
        self.state = state.to_string();
        tracing::debug!(
            folded = messages.len(),
            state_len = self.state.len(),
            "synapse.memory.state_updated"
        );
        Ok(())
    }
}

fn describe(message: &ChatMessage) -> String {
    let content = match &message.function_call {
        Some(call) => format!("calls {}({})", call.name, call.arguments),
        None => message.content.clone(),
    };
    format!("New message:\n\nRole: {}\nContent: {content}", message.role)
}

#[async_trait]
impl Memory for SummarizedMemory {
    async fn add_prompt(&mut self, prompt: Prompt) -> Result<(), MemoryError> {
        self.prompt.extend(prompt.history);
        Ok(())
    }

    async fn add(&mut self, message: ChatMessage) -> Result<(), MemoryError> {
        self.update_state(std::slice::from_ref(&message)).await?;
        self.recent.push_back(message);
        self.trim();
        Ok(())
    }

    async fn prompt_with_context(
        &mut self,
        next: Vec<ChatMessage>,
    ) -> Result<Prompt, MemoryError> {
        if !next.is_empty() {
            self.update_state(&next).await?;
        }
        self.recent.extend(next);
        self.trim();

        let mut history = self.prompt.clone();
        if !self.state.is_empty() {
            history.push(ChatMessage::system(format!(
                "Memory state:\n\n{}",
                self.state
            )));
        }
        history.extend(self.recent.iter().cloned());
        Ok(Prompt::new(history))
    }
}
