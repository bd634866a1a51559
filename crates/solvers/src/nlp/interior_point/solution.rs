use switchtime_core::ReturnStatus;

/// The result of an interior-point solve.
#[derive(Debug, Clone)]
pub struct Solution {
    /// How the solve terminated.
    pub status: ReturnStatus,

    /// Final iterate.
    pub x: Vec<f64>,

    /// Objective value at `x`, `NaN` if it was never evaluated.
    pub objective: f64,

    /// Constraint values at `x`.
    pub constraints: Vec<f64>,

    /// Number of iterations performed.
    pub iterations: usize,
}

impl Solution {
    /// Returns `true` if the solve delivered a usable optimum.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the integer status code.
    #[must_use]
    pub fn code(&self) -> i32 {
        self.status.code()
    }
}
