//! Error surface (§7 of the design): every failure mode a caller can hit is
//! a distinct, programmatically distinguishable variant. Textual rendering
//! is for logs only and is not part of the contract.

use thiserror::Error;

/// All errors produced by net construction, compilation, integration,
/// evaluation and fitting.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("malformed net: {0}")]
    MalformedNet(String),

    #[error("malformed problem: {0}")]
    MalformedProblem(String),

    #[error("step underflow: dt fell below dtmin ({dtmin:e}) at t={t}")]
    StepUnderflow { t: f64, dtmin: f64 },

    #[error("step budget exhausted: {taken} steps taken, budget was {budget}")]
    StepBudgetExhausted { taken: usize, budget: usize },

    #[error("non-finite state encountered at t={t}: {detail}")]
    NonFiniteState { t: f64, detail: String },

    /// Not propagated as an `Err` by the evaluator — early termination
    /// resolves to `infeasible_score` — but kept as a typed value so
    /// callers that bypass the evaluator can match on it explicitly.
    #[error("hypothesis rejected by early terminator")]
    InfeasibleHypothesis,
}

pub type SimResult<T> = Result<T, SimError>;
