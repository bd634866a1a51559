//! Solvers for nonlinear programs.
//!
//! An [`NlpProblem`] supplies the objective, bounds, constraints, and their
//! first derivatives through callbacks. Solvers in this module drive those
//! callbacks toward a local minimizer.
//!
//! # Solvers
//!
//! - [`interior_point`] — primal barrier method with a limited-memory
//!   quasi-Newton Hessian, for problems with inequality constraints
//!
//! [`NlpProblem`]: switchtime_core::NlpProblem

pub mod interior_point;
