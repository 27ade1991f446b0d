//! Repeated, concurrent evaluation.

use std::sync::Arc;
use synapse_types::BoxError;
use thiserror::Error;

use crate::runner::Runner;

/// Scores one run: the input and either the output or the run's error.
pub type Goodness<I, O> = Arc<dyn Fn(&I, Result<&O, &BoxError>) -> f64 + Send + Sync>;

/// Errors from [`Evaluator::evaluate`].
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    /// `repetitions` was zero.
    #[error("at least one repetition is required")]
    NoRepetitions,

    /// No repetition completed, so there is nothing to average.
    #[error("all {0} repetitions failed")]
    AllRepetitionsFailed(usize),
}

/// How to evaluate.
pub struct EvalOptions<I, O> {
    /// Scores each run.
    pub goodness: Goodness<I, O>,
    /// How many times every input is run.
    pub repetitions: usize,
}

impl<I, O> EvalOptions<I, O> {
    /// Options with a goodness closure.
    pub fn new<F>(repetitions: usize, goodness: F) -> Self
    where
        F: Fn(&I, Result<&O, &BoxError>) -> f64 + Send + Sync + 'static,
    {
        Self {
            goodness: Arc::new(goodness),
            repetitions,
        }
    }
}

/// The result of an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Mean score per input, in input order.
    pub scores: Vec<f64>,
    /// Repetitions that ran to completion and were averaged.
    pub completed_repetitions: usize,
    /// Repetitions that failed and were left out of the averages.
    pub failed_repetitions: usize,
}

/// Runs a [`Runner`] over inputs several times and averages the scores.
///
/// Repetitions run concurrently as separate tasks; inputs within one
/// repetition run in order. A run's error is scored by the goodness function
/// like any output. A repetition that fails as a whole (its task panics) is
/// excluded from both the numerator and the denominator of every average.
pub struct Evaluator<R, I, O> {
    runner: Arc<R>,
    options: EvalOptions<I, O>,
}

impl<R, I, O> Evaluator<R, I, O>
where
    R: Runner<I, O> + 'static,
    I: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    /// Evaluate `runner` with `options`.
    pub fn new(runner: R, options: EvalOptions<I, O>) -> Self {
        Self {
            runner: Arc::new(runner),
            options,
        }
    }

    /// The runner under evaluation.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Score every input.
    pub async fn evaluate(&self, inputs: &[I]) -> Result<Evaluation, EvalError> {
        let repetitions = self.options.repetitions;
        if repetitions == 0 {
            return Err(EvalError::NoRepetitions);
        }
        let inputs: Arc<[I]> = Arc::from(inputs.to_vec());

        let handles: Vec<_> = (0..repetitions)
            .map(|_| {
                let runner = Arc::clone(&self.runner);
                let goodness = Arc::clone(&self.options.goodness);
                let inputs = Arc::clone(&inputs);
                tokio::spawn(async move {
                    let mut scores = Vec::with_capacity(inputs.len());
                    for input in inputs.iter() {
                        let result = runner.run(input).await;
                        scores.push(goodness(input, result.as_ref()));
                    }
                    scores
                })
            })
            .collect();

        let mut totals = vec![0.0; inputs.len()];
        let mut completed = 0;
        let mut failed = 0;
        for (repetition, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(scores) => {
                    for (total, score) in totals.iter_mut().zip(scores) {
                        *total += score;
                    }
                    completed += 1;
                }
                Err(e) => {
                    tracing::warn!(repetition, error = %e, "synapse.eval.repetition_failed");
                    failed += 1;
                }
            }
        }

        if completed == 0 {
            return Err(EvalError::AllRepetitionsFailed(failed));
        }
        tracing::debug!(completed, failed, inputs = inputs.len(), "synapse.eval.done");
        Ok(Evaluation {
            scores: totals.into_iter().map(|t| t / completed as f64).collect(),
            completed_repetitions: completed,
            failed_repetitions: failed,
        })
    }
}
