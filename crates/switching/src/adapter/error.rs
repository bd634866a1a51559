use thiserror::Error;

use crate::{cache::CacheError, simulate::SimulationError};

use super::Phase;

/// Errors that can occur when configuring a problem or starting a solve.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum SetupError {
    #[error("problem is read-only in the {0:?} phase")]
    ReadOnly(Phase),

    #[error("decision vector must have a positive even length, got {0}")]
    DecisionLength(usize),

    #[error("decision variable {index} is not finite")]
    NonFiniteDecision { index: usize },

    #[error("expected {expected} variable bounds, got {lower} lower and {upper} upper")]
    BoundsLength {
        expected: usize,
        lower: usize,
        upper: usize,
    },

    #[error("variable bounds at index {index} leave no interior")]
    CrossedBounds { index: usize },

    #[error("expected an initial state of dimension {expected}, got {found}")]
    InitialDimension { expected: usize, found: usize },

    #[error("initial state entry {index} is not finite")]
    NonFiniteInitial { index: usize },

    #[error("price curve does not cover the horizon [{t0}, {tf}]")]
    PricesDoNotCover { t0: f64, tf: f64 },
}

/// Errors that can occur when the solver evaluates the problem.
#[derive(Debug, Error)]
pub enum ProblemError {
    #[error("objective evaluation failed")]
    Simulation(#[from] SimulationError),

    #[error("gradient evaluation failed")]
    Gradient(#[from] CacheError),

    #[error("expected {expected} {what}, got {found}")]
    Layout {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}
