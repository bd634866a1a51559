/// Event emitted by the interior-point solver once per iteration.
///
/// Iteration 0 describes the starting point after it has been moved inside
/// the bounds. Later events describe the iterate accepted by the line search.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    /// Iteration number.
    pub iteration: usize,

    /// Current iterate.
    pub x: &'a [f64],

    /// Objective value at `x`.
    pub objective: f64,

    /// Scaled stationarity error of the barrier problem.
    pub dual_infeasibility: f64,

    /// Current barrier parameter.
    pub barrier: f64,

    /// Infinity norm of the last step.
    pub step_norm: f64,

    /// Step length accepted by the last line search (0 at iteration 0).
    pub step_size: f64,

    /// Number of trial points of the last line search.
    pub line_search_trials: usize,
}
