#![deny(missing_docs)]
//! Scoring agents and backends over a set of inputs.
//!
//! An [`Evaluator`] runs a [`Runner`] over every input, repeated a configured
//! number of times concurrently, scores each output with a goodness function
//! and averages the scores per input.

pub mod evaluator;
pub mod runner;

pub use evaluator::{EvalError, EvalOptions, Evaluation, Evaluator, Goodness};
pub use runner::{LlmRunner, Runner};
