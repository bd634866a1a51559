//! Capability traits for cross-solver observers.
//!
//! These traits abstract over solver-specific event and action types, enabling
//! observers to work generically across different solvers.
//!
//! # Event traits
//!
//! - [`HasIteration`] — events that carry an iteration or step counter
//! - [`HasResidual`] — events that carry a residual value
//! - [`HasObjective`] — events that carry an objective value
//!
//! # Action traits
//!
//! - [`CanStopEarly`] — actions that can signal early termination
//!
//! # Example
//!
//! ```rust
//! use switchtime_core::Observer;
//! use switchtime_observers::traits::{CanStopEarly, HasIteration, HasResidual};
//!
//! struct GoodEnough {
//!     tolerance: f64,
//!     min_iters: usize,
//! }
//!
//! impl<E: HasIteration + HasResidual, A: CanStopEarly> Observer<E, A> for GoodEnough {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         if event.iteration() >= self.min_iters && event.residual().abs() < self.tolerance {
//!             return Some(A::stop_early());
//!         }
//!         None
//!     }
//! }
//! ```

use switchtime_core::Scalar;
use switchtime_solvers::{nlp::interior_point, ode::dopri5};

/// An event that carries an iteration or step counter.
pub trait HasIteration {
    /// Returns the iteration number, starting at 0.
    fn iteration(&self) -> usize;
}

/// An event that carries a residual value.
pub trait HasResidual {
    /// Returns the residual for this event.
    ///
    /// Returns `f64::NAN` when the event represents an error and no residual
    /// is available.
    fn residual(&self) -> f64;
}

/// An event that carries an objective value.
pub trait HasObjective {
    /// Returns the objective for this event.
    ///
    /// Returns `f64::NAN` when the event represents an error and no objective
    /// is available.
    fn objective(&self) -> f64;
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    /// Returns the action that stops the solver early.
    fn stop_early() -> Self;
}

// --- interior_point::Event ---

impl HasIteration for interior_point::Event<'_> {
    fn iteration(&self) -> usize {
        self.iteration
    }
}

/// The residual of an interior-point iterate is its scaled stationarity error.
impl HasResidual for interior_point::Event<'_> {
    fn residual(&self) -> f64 {
        self.dual_infeasibility
    }
}

impl HasObjective for interior_point::Event<'_> {
    fn objective(&self) -> f64 {
        self.objective
    }
}

// --- dopri5::Event ---

impl<S: Scalar> HasIteration for dopri5::Event<S> {
    fn iteration(&self) -> usize {
        self.step
    }
}

// --- CanStopEarly impls ---

impl CanStopEarly for interior_point::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}

impl CanStopEarly for dopri5::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}
