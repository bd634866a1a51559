//! Core traits and types for switching-time optimization.
//!
//! This crate defines the shared abstractions that the tape, the solvers, and
//! the plant model build on:
//!
//! - [`Scalar`] — the numeric capability shared by plain `f64` and
//!   tape-recording variables, so one model implementation serves both
//! - [`Dynamics`] — a right-hand side `dx/dt = f(t, x)` generic over [`Scalar`]
//! - [`Horizon`] — a validated `(t0, tf, dt)` integration horizon
//! - [`Observer`] — receives solver events and optionally returns control actions
//! - [`NlpProblem`] — the callback contract a nonlinear-program solver drives

mod dynamics;
mod horizon;
mod nlp;
mod observer;
mod scalar;

pub use dynamics::Dynamics;
pub use horizon::{Horizon, HorizonError};
pub use nlp::{FinalSolution, NlpInfo, NlpProblem, ReturnStatus};
pub use observer::Observer;
pub use scalar::{Scalar, locate_segment};
