#![deny(missing_docs)]
//! # synapse: umbrella crate
//!
//! A single import surface for synapse agents. Re-exports the member crates
//! behind feature flags, plus a `prelude` for the happy path.

#[cfg(feature = "core")]
pub use synapse_agent;
#[cfg(feature = "eval")]
pub use synapse_eval;
#[cfg(feature = "core")]
pub use synapse_memory;
#[cfg(feature = "core")]
pub use synapse_protocol;
#[cfg(feature = "core")]
pub use synapse_tool;
#[cfg(feature = "core")]
pub use synapse_types;

/// Happy-path imports for building and running agents.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use synapse_agent::{
        Agent, AgentConfig, AgentError, AgentTool, Example, Task, memory_factory, validator,
    };

    #[cfg(feature = "core")]
    pub use synapse_memory::{BufferMemory, Memory, SummarizedMemory};

    #[cfg(feature = "core")]
    pub use synapse_protocol::{Operation, UnparsedReplyPolicy};

    #[cfg(feature = "core")]
    pub use synapse_tool::{FnTool, JsonAutoFixer, Tool, ToolError, confirm_fn};

    #[cfg(feature = "core")]
    pub use synapse_types::{BackendError, ChatMessage, Llm, Prompt, Role};

    #[cfg(feature = "eval")]
    pub use synapse_eval::{EvalOptions, Evaluator, Runner};
}
