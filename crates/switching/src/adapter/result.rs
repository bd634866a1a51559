use switchtime_core::ReturnStatus;

use crate::params::split_switches;

/// What the solver delivered when it finalized a [`SwitchingProblem`].
///
/// [`SwitchingProblem`]: super::SwitchingProblem
#[derive(Debug, Clone, PartialEq)]
pub struct SolverResult {
    /// How the solve terminated.
    pub status: ReturnStatus,

    /// Final switch times, on-times followed by off-times.
    pub x: Vec<f64>,

    /// Objective value at `x`.
    pub objective: f64,

    /// Period lengths at `x`.
    pub constraints: Vec<f64>,

    pub iterations: usize,
}

impl SolverResult {
    /// Returns the final on-times and off-times.
    #[must_use]
    pub fn switches(&self) -> (&[f64], &[f64]) {
        split_switches(&self.x)
    }
}
