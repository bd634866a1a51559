//! Solve driver: configures the interior-point solver and runs it on a
//! [`SwitchingProblem`].
//!
//! The problem supplies no Hessian, so the solver must use its
//! limited-memory approximation. Requesting
//! [`HessianApproximation::Exact`] is accepted as an option but the solve
//! then ends at initialization with [`ReturnStatus::InvalidOption`], as the
//! problem cannot provide what the option asks for.
//!
//! # Example
//!
//! ```ignore
//! let mut problem = SwitchingProblem::new(initial_guess);
//! let report = driver::solve_unobserved(&mut problem, &SolverOptions::default())?;
//! println!("status {}: {:?}", report.solve_status.code(), report.x);
//! ```

use switchtime_core::{NlpProblem, Observer, ReturnStatus};
use switchtime_observers::{IterationRecord, LogObserver};
use switchtime_solvers::nlp::interior_point::{self, Action, ConfigError, Event};
use thiserror::Error;

use crate::adapter::{ProblemError, SetupError, SwitchingProblem};

/// Highest accepted print level.
const MAX_PRINT_LEVEL: u8 = 12;

/// How the solver treats second-order information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HessianApproximation {
    /// Use a limited-memory quasi-Newton approximation.
    LimitedMemory,

    /// Use the Hessian supplied by the problem.
    Exact,
}

/// Solver options for a switching-time solve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverOptions {
    tol: f64,
    acceptable_tol: f64,
    hessian_approximation: HessianApproximation,
    print_level: u8,
    max_iters: usize,
}

/// Errors that can occur when validating solver options.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OptionsError {
    #[error("tol must be finite and positive")]
    Tol,

    #[error("acceptable_tol must be finite and at least tol")]
    AcceptableTol,

    #[error("print_level must be at most {MAX_PRINT_LEVEL}")]
    PrintLevel,
}

impl Default for SolverOptions {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(1e-4, HessianApproximation::LimitedMemory, 5).unwrap()
    }
}

impl SolverOptions {
    /// Creates validated options.
    ///
    /// The acceptable tolerance defaults to `10 * tol` and the iteration
    /// limit to 3000.
    ///
    /// # Errors
    ///
    /// Returns an error if `tol` is not positive and finite, or if
    /// `print_level` exceeds 12.
    pub fn new(
        tol: f64,
        hessian_approximation: HessianApproximation,
        print_level: u8,
    ) -> Result<Self, OptionsError> {
        if !tol.is_finite() || tol <= 0.0 {
            return Err(OptionsError::Tol);
        }
        if print_level > MAX_PRINT_LEVEL {
            return Err(OptionsError::PrintLevel);
        }

        Ok(Self {
            tol,
            acceptable_tol: 10.0 * tol,
            hessian_approximation,
            print_level,
            max_iters: 3000,
        })
    }

    /// Sets the tolerance at which a stalled solve is still acceptable.
    ///
    /// # Errors
    ///
    /// Returns an error if `acceptable_tol` is not finite or is below `tol`.
    pub fn with_acceptable_tol(self, acceptable_tol: f64) -> Result<Self, OptionsError> {
        if !acceptable_tol.is_finite() || acceptable_tol < self.tol {
            return Err(OptionsError::AcceptableTol);
        }
        Ok(Self {
            acceptable_tol,
            ..self
        })
    }

    /// Sets the iteration limit.
    #[must_use]
    pub fn with_max_iters(self, max_iters: usize) -> Self {
        Self { max_iters, ..self }
    }

    #[must_use]
    pub fn tol(&self) -> f64 {
        self.tol
    }

    #[must_use]
    pub fn acceptable_tol(&self) -> f64 {
        self.acceptable_tol
    }

    #[must_use]
    pub fn hessian_approximation(&self) -> HessianApproximation {
        self.hessian_approximation
    }

    #[must_use]
    pub fn print_level(&self) -> u8 {
        self.print_level
    }

    #[must_use]
    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    fn solver_config(&self) -> Result<interior_point::Config, ConfigError> {
        interior_point::Config::new(self.tol, self.acceptable_tol, self.max_iters)
    }
}

/// Outcome of a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    /// Status of solver initialization.
    pub init_status: ReturnStatus,

    /// Status of the solve.
    pub solve_status: ReturnStatus,

    /// Final switch times, or the starting point if no solve ran.
    pub x: Vec<f64>,

    /// Objective at `x`, if the solver evaluated it.
    pub objective: Option<f64>,

    pub iterations: usize,

    /// Every iteration the solver reported, in order.
    pub history: Vec<IterationRecord>,
}

impl SolveReport {
    /// Returns the initialization and solve status codes.
    #[must_use]
    pub fn codes(&self) -> (i32, i32) {
        (self.init_status.code(), self.solve_status.code())
    }
}

/// Errors that can abort a solve.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("problem is not ready to solve")]
    Setup(#[from] SetupError),

    #[error("solver options are inconsistent")]
    Config(#[from] ConfigError),

    #[error("problem evaluation failed")]
    Problem(#[from] ProblemError),

    #[error("solver aborted")]
    Solver(#[from] interior_point::Error),
}

impl SolveError {
    /// Recovers the problem's own error from a solver abort.
    fn from_solver(error: interior_point::Error) -> Self {
        match error {
            interior_point::Error::Problem(source) => match source.downcast::<ProblemError>() {
                Ok(error) => Self::Problem(*error),
                Err(source) => Self::Solver(interior_point::Error::Problem(source)),
            },
        }
    }
}

/// Solves `problem` with `options`.
///
/// The problem must be in its setup phase; after a solve, call
/// [`SwitchingProblem::reset`] before changing inputs or solving again.
/// Every iteration is logged through `tracing` at the options' print level
/// and then handed to `observer`, which may stop the solve early.
///
/// # Errors
///
/// Returns an error if the problem fails validation or if an evaluation
/// fails during the solve, in which case the problem returns to its setup
/// phase. Non-convergence is not an error; it is reported
/// through [`SolveReport::solve_status`].
pub fn solve<Obs>(
    problem: &mut SwitchingProblem,
    options: &SolverOptions,
    mut observer: Obs,
) -> Result<SolveReport, SolveError>
where
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    let config = options.solver_config()?;
    problem.begin_solve()?;

    if options.print_level() > 0 {
        tracing::info!(
            tol = options.tol(),
            hessian_approximation = ?options.hessian_approximation(),
            switches = problem.switches(),
            "starting switching-time solve"
        );
    }

    if options.hessian_approximation() == HessianApproximation::Exact {
        let supplied = match hessian_supplied(problem) {
            Ok(supplied) => supplied,
            Err(error) => {
                problem.abort_solve();
                return Err(error.into());
            }
        };
        if !supplied {
            tracing::warn!("exact Hessian requested but the problem supplies none");
            let status = ReturnStatus::InvalidOption;
            problem.end_solve(status, status);
            return Ok(SolveReport {
                init_status: status,
                solve_status: status,
                x: problem.decision().to_vec(),
                objective: None,
                iterations: 0,
                history: Vec::new(),
            });
        }
    }

    let mut log = LogObserver::new(options.print_level());
    let outcome = interior_point::solve(problem, &config, |event: &Event<'_>| {
        let _: Option<Action> = log.observe(event);
        observer.observe(event)
    });

    match outcome {
        Ok(solution) => {
            problem.end_solve(ReturnStatus::Succeeded, solution.status);
            Ok(SolveReport {
                init_status: ReturnStatus::Succeeded,
                solve_status: solution.status,
                x: solution.x,
                objective: Some(solution.objective),
                iterations: solution.iterations,
                history: log.into_history(),
            })
        }
        Err(error) => {
            problem.abort_solve();
            Err(SolveError::from_solver(error))
        }
    }
}

/// Solves `problem` with `options` without an observer.
///
/// Iterations are still logged at the options' print level.
///
/// # Errors
///
/// Returns an error if the problem fails validation or if an evaluation
/// fails during the solve.
pub fn solve_unobserved(
    problem: &mut SwitchingProblem,
    options: &SolverOptions,
) -> Result<SolveReport, SolveError> {
    solve(problem, options, ())
}

/// Asks the problem for its Hessian at the starting point.
fn hessian_supplied(problem: &mut SwitchingProblem) -> Result<bool, ProblemError> {
    let info = problem.info();
    let x = problem.decision().to_vec();
    let lambda = vec![0.0; info.constraints];
    let mut values = vec![0.0; info.hessian_nonzeros];
    problem.hessian(&x, 1.0, &lambda, &mut values)
}
