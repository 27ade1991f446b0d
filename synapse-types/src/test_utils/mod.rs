//! In-memory backends for testing.
//!
//! Available behind the `test-utils` feature flag.

mod echo_llm;
mod failing_llm;
mod scripted_llm;

pub use echo_llm::EchoLlm;
pub use failing_llm::FailingLlm;
pub use scripted_llm::ScriptedLlm;
