#![deny(missing_docs)]
//! Tools for synapse agents.
//!
//! A [`Tool`] is a named, described, asynchronous function over JSON
//! arguments. Tools live in an ordered [`ToolRegistry`]. Before a tool runs,
//! the raw argument text flows through an [`ArgPipeline`] of
//! [`Preprocessor`]s (for example the LLM-backed [`JsonAutoFixer`]); the
//! [`Dispatcher`] then asks the optional [`ConfirmAction`] hook and executes
//! the tool, turning every outcome into a protocol operation.

pub mod dispatch;
pub mod function;
pub mod registry;
pub mod repair;
pub mod schema;
pub mod tool;

pub use dispatch::{CANCELLED_BY_USER, ConfirmAction, ConfirmFn, DispatchOutcome, Dispatcher, confirm_fn};
pub use function::FnTool;
pub use registry::ToolRegistry;
pub use repair::{ArgPipeline, JsonAutoFixer, RepairError};
pub use schema::{SchemaError, function_spec, infer_parameters};
pub use tool::{Preprocessor, Tool, ToolError, render_output};
