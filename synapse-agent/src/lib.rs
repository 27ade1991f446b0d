#![deny(missing_docs)]
//! The synapse agent engine.
//!
//! A [`Task`] describes what to solve: a description, worked [`Example`]s and
//! a parser for the final answer. [`compile`] turns a task and an input into
//! the opening prompt. An [`Agent`] then drives a language model through the
//! operation protocol, dispatching tool calls and feeding observations back,
//! until the model produces an answer that parses and passes every validator.
//!
//! Everything an agent can be tuned with lives in [`AgentConfig`].

pub mod agent;
pub mod compile;
pub mod config;
pub mod delegate;
pub mod error;
pub mod task;

pub use agent::Agent;
pub use compile::{CompileError, compile};
pub use config::{AgentConfig, MemoryFactory, Validator, memory_factory, validator};
pub use delegate::{AgentTool, Delegation};
pub use error::AgentError;
pub use task::{AnswerParser, Example, Task};
