#![deny(missing_docs)]
//! Shared vocabulary for synapse agents.
//!
//! This crate defines the conversation model exchanged with language model
//! backends ([`ChatMessage`], [`Prompt`]), the optional native function-call
//! description ([`FunctionSpec`], [`ParameterSpec`]) and the object-safe
//! [`Llm`] trait every backend implements.
//!
//! Enable the `test-utils` feature for in-memory backends used in tests.

pub mod error;
pub mod llm;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{BackendError, BoxError};
pub use llm::Llm;
pub use types::{ChatMessage, FunctionCall, FunctionSpec, ParamType, ParameterSpec, Prompt, Role};
