//! Primal barrier interior-point solver with a limited-memory Hessian.
//!
//! # Algorithm
//!
//! The solver minimizes the log-barrier function
//!
//! ```text
//! φ_μ(x) = f(x) - μ Σ ln(x - x_l) - μ Σ ln(x_u - x) - μ Σ ln(g(x) - g_l) - μ Σ ln(g_u - g(x))
//! ```
//!
//! over the strict interior of the bounds for a decreasing sequence of
//! barrier parameters `μ`. Each iteration solves
//!
//! ```text
//! (B + Σ) d = -∇φ_μ(x)
//! ```
//!
//! where `B` is an L-BFGS approximation of the Lagrangian Hessian and `Σ` is
//! the exact Hessian of the barrier terms (with constraint curvature left to
//! `B`). A backtracking Armijo line search then finds a step that decreases
//! `φ_μ` while keeping every bound and constraint a fraction of its distance
//! to the boundary. Once the barrier subproblem is solved to a multiple of
//! `μ`, the parameter is reduced superlinearly.
//!
//! The starting point is moved inside the variable bounds by a relative
//! push. If that violates a constraint, the push is halved until the
//! constraints hold strictly.
//!
//! # Limitations
//!
//! - Fixed variables and equality constraints are rejected, since the
//!   barrier needs a nonempty interior.
//! - The starting point must be strictly feasible for the constraints (after
//!   clamping into the variable bounds); there is no restoration phase.
//! - Supplied Hessians are not used.
//!
//! # Termination
//!
//! The solve ends with a [`ReturnStatus`] numbered like the application
//! return status of COIN-OR interior-point solvers, after handing the final
//! iterate to [`NlpProblem::finalize`]. It succeeds when the scaled
//! stationarity error and the barrier parameter are both below
//! [`Config::tol`]. Failure statuses fall back to
//! [`ReturnStatus::AcceptableLevel`] when the error is within
//! [`Config::acceptable_tol`].
//!
//! # Observer Events
//!
//! The solver emits one [`Event`] per iteration, starting with iteration 0 at
//! the starting point. Observers can return [`Action::StopEarly`] to finish
//! with [`ReturnStatus::UserRequestedStop`].
//!
//! [`ReturnStatus`]: switchtime_core::ReturnStatus
//! [`ReturnStatus::AcceptableLevel`]: switchtime_core::ReturnStatus::AcceptableLevel
//! [`ReturnStatus::UserRequestedStop`]: switchtime_core::ReturnStatus::UserRequestedStop

mod action;
mod config;
mod error;
mod event;
mod lbfgs;
mod linalg;
mod problem;
mod search;
mod solution;

#[cfg(test)]
mod tests;

pub use action::Action;
pub use config::{Config, ConfigError};
pub use error::Error;
pub use event::Event;
pub use solution::Solution;

use switchtime_core::{NlpProblem, Observer};

/// Minimizes `problem` with the interior-point method.
///
/// The observer receives an [`Event`] per iteration.
/// See the [module docs](self) for details on termination and actions.
///
/// # Errors
///
/// Returns an error if a problem callback fails. Numerical failures are
/// reported through [`Solution::status`] instead.
pub fn solve<P, Obs>(problem: &mut P, config: &Config, observer: Obs) -> Result<Solution, Error>
where
    P: NlpProblem,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    search::search(problem, config, observer)
}

/// Minimizes `problem` without observer support.
///
/// This is a convenience wrapper around [`solve`] that uses a no-op observer.
///
/// # Errors
///
/// Returns an error if a problem callback fails.
pub fn solve_unobserved<P: NlpProblem>(problem: &mut P, config: &Config) -> Result<Solution, Error> {
    solve(problem, config, ())
}
