//! FailingLlm: every call fails with a transport error.

use crate::error::BackendError;
use crate::llm::Llm;
use crate::types::{ChatMessage, Prompt};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A backend whose every call fails with [`BackendError::RequestFailed`].
/// Counts how many times it was called.
#[derive(Default)]
pub struct FailingLlm {
    calls: AtomicUsize,
}

impl FailingLlm {
    /// Create a new failing backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Llm for FailingLlm {
    async fn chat(&self, _prompt: &Prompt) -> Result<ChatMessage, BackendError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Err(BackendError::RequestFailed(format!("unreachable backend (call {n})")))
    }
}
