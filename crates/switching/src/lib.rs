//! Optimal switching times for a hybrid plant.
//!
//! A plant alternates between an on and an off regime. Given `n` on/off
//! pairs, this crate finds switch times that minimize an end-point cost
//! (energy paid at day-ahead prices plus a quality penalty) subject to
//! minimum and maximum period lengths.
//!
//! The pipeline is:
//!
//! - [`plant`] — the four-state dynamics with a smooth regime indicator,
//!   generic over [`Scalar`](switchtime_core::Scalar)
//! - [`simulate`] — integration over a [`Horizon`] and the end-point cost
//! - [`cache`] — a recorded tape of the cost, reused or refreshed across
//!   gradient requests
//! - [`adapter`] — the [`SwitchingProblem`] nonlinear program
//! - [`driver`] — solver options and the [`solve`] entry point
//!
//! # Example
//!
//! ```no_run
//! use switchtime::{SolverOptions, SwitchingProblem, solve_unobserved};
//!
//! // Three on periods: on-times followed by off-times.
//! let mut problem = SwitchingProblem::new(vec![0.0, 28.0, 56.0, 7.0, 35.0, 63.0]);
//! let report = solve_unobserved(&mut problem, &SolverOptions::default()).unwrap();
//!
//! println!("status {:?}, switches {:?}", report.solve_status, report.x);
//! ```
//!
//! [`Horizon`]: switchtime_core::Horizon

pub mod adapter;
pub mod cache;
pub mod driver;
pub mod params;
pub mod plant;
pub mod simulate;
pub mod smooth;

pub use adapter::{Phase, ProblemError, SetupError, SolverResult, SwitchingProblem};
pub use cache::{CacheStats, TapeState};
pub use driver::{
    HessianApproximation, OptionsError, SolveError, SolveReport, SolverOptions, solve,
    solve_unobserved,
};
pub use params::{ConstantParameters, DurationBounds, DynamicParameters, ParameterError};
pub use switchtime_core::{Horizon, ReturnStatus};
