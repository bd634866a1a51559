//! Numerical solvers for switching-time optimization.
//!
//! - [`ode`] — fixed-step integration of [`Dynamics`] over a [`Horizon`],
//!   generic over the [`Scalar`] type so trajectories can be recorded
//! - [`nlp`] — solvers driving an [`NlpProblem`]
//!
//! Solvers follow a common shape: a `solve` function takes an [`Observer`]
//! that receives typed events and may stop the solver early, and a
//! `solve_unobserved` wrapper passes the no-op observer `()`.
//!
//! [`Dynamics`]: switchtime_core::Dynamics
//! [`Horizon`]: switchtime_core::Horizon
//! [`Scalar`]: switchtime_core::Scalar
//! [`NlpProblem`]: switchtime_core::NlpProblem
//! [`Observer`]: switchtime_core::Observer

pub mod nlp;
pub mod ode;
