/// Dimensions of a nonlinear program as reported to a solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NlpInfo {
    /// Number of decision variables.
    pub variables: usize,

    /// Number of general constraints.
    pub constraints: usize,

    /// Number of structural nonzeros in the constraint Jacobian.
    pub jacobian_nonzeros: usize,

    /// Number of structural nonzeros in the Lagrangian Hessian.
    ///
    /// Zero means no Hessian is supplied and the solver must approximate it.
    pub hessian_nonzeros: usize,
}

/// How an NLP solve terminated.
///
/// Codes follow the application return status numbering used by
/// interior-point solvers in the COIN-OR family: non-negative codes are
/// (partial) successes, negative codes are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnStatus {
    /// Converged to the requested tolerance.
    Succeeded,

    /// Converged only to the acceptable tolerance.
    AcceptableLevel,

    /// The line search could no longer make progress.
    SearchDirectionTooSmall,

    /// An observer requested an early stop.
    UserRequestedStop,

    /// Reached the iteration limit without converging.
    MaxIterations,

    /// No acceptable step could be found from the current iterate.
    RestorationFailed,

    /// The step equations could not be solved.
    ErrorInStepComputation,

    /// The problem callbacks reported inconsistent dimensions or bounds.
    InvalidProblemDefinition,

    /// A solver option was invalid or incompatible with the problem.
    InvalidOption,

    /// A callback produced a non-finite number.
    InvalidNumberDetected,
}

impl ReturnStatus {
    /// Returns the integer status code.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Succeeded => 0,
            Self::AcceptableLevel => 1,
            Self::SearchDirectionTooSmall => 3,
            Self::UserRequestedStop => 5,
            Self::MaxIterations => -1,
            Self::RestorationFailed => -2,
            Self::ErrorInStepComputation => -3,
            Self::InvalidProblemDefinition => -11,
            Self::InvalidOption => -12,
            Self::InvalidNumberDetected => -13,
        }
    }

    /// Returns `true` for statuses that deliver a usable optimum.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Succeeded | Self::AcceptableLevel)
    }
}

/// The final iterate handed back to the problem when a solve terminates.
#[derive(Debug, Clone, Copy)]
pub struct FinalSolution<'a> {
    /// How the solve terminated.
    pub status: ReturnStatus,

    /// The final (or best) iterate.
    pub x: &'a [f64],

    /// Objective value at `x`.
    pub objective: f64,

    /// Constraint values at `x`.
    pub constraints: &'a [f64],

    /// Number of iterations performed.
    pub iterations: usize,
}

/// The callback contract a nonlinear-program solver drives.
///
/// The problem is
///
/// ```text
/// minimize    f(x)
/// subject to  x_lower <= x    <= x_upper
///             g_lower <= g(x) <= g_upper
/// ```
///
/// A solver borrows the problem mutably for one solve and may call the
/// evaluation methods any number of times in any order. `new_x` is `true`
/// when `x` differs from the point of the previous evaluation call, which
/// lets implementations reuse cached work. Bounds at or beyond `±1e19` are
/// treated as infinite.
///
/// Buffers passed to each method are sized from [`NlpProblem::info`].
pub trait NlpProblem {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the problem dimensions.
    fn info(&self) -> NlpInfo;

    /// Fills variable and constraint bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the bounds cannot be provided.
    fn bounds(
        &self,
        x_lower: &mut [f64],
        x_upper: &mut [f64],
        g_lower: &mut [f64],
        g_upper: &mut [f64],
    ) -> Result<(), Self::Error>;

    /// Fills the initial iterate.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if no starting point is available.
    fn starting_point(&self, x: &mut [f64]) -> Result<(), Self::Error>;

    /// Evaluates the objective at `x`.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the objective cannot be evaluated.
    fn objective(&mut self, x: &[f64], new_x: bool) -> Result<f64, Self::Error>;

    /// Writes the objective gradient at `x` into `gradient`.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the gradient cannot be evaluated.
    fn gradient(&mut self, x: &[f64], new_x: bool, gradient: &mut [f64])
    -> Result<(), Self::Error>;

    /// Writes the constraint values at `x` into `g`.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the constraints cannot be evaluated.
    fn constraints(&mut self, x: &[f64], new_x: bool, g: &mut [f64]) -> Result<(), Self::Error>;

    /// Writes the constraint Jacobian sparsity pattern as `(row, col)` pairs.
    ///
    /// The pattern must not depend on `x` and must list entries in the order
    /// [`NlpProblem::jacobian_values`] writes them.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the pattern cannot be provided.
    fn jacobian_structure(&self, rows: &mut [usize], cols: &mut [usize])
    -> Result<(), Self::Error>;

    /// Writes the constraint Jacobian nonzeros at `x` into `values`.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the Jacobian cannot be evaluated.
    fn jacobian_values(
        &mut self,
        x: &[f64],
        new_x: bool,
        values: &mut [f64],
    ) -> Result<(), Self::Error>;

    /// Writes the Lagrangian Hessian nonzeros, if the problem supplies them.
    ///
    /// Returns `Ok(false)` when no Hessian is supplied; the solver must then
    /// use a quasi-Newton approximation. This is the default.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if a supplied Hessian cannot be evaluated.
    fn hessian(
        &mut self,
        _x: &[f64],
        _objective_factor: f64,
        _lambda: &[f64],
        _values: &mut [f64],
    ) -> Result<bool, Self::Error> {
        Ok(false)
    }

    /// Receives the final iterate once the solver terminates.
    fn finalize(&mut self, solution: &FinalSolution<'_>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_solver_numbering() {
        assert_eq!(ReturnStatus::Succeeded.code(), 0);
        assert_eq!(ReturnStatus::AcceptableLevel.code(), 1);
        assert_eq!(ReturnStatus::MaxIterations.code(), -1);
        assert_eq!(ReturnStatus::InvalidOption.code(), -12);
        assert!(ReturnStatus::AcceptableLevel.is_success());
        assert!(!ReturnStatus::UserRequestedStop.is_success());
    }
}
