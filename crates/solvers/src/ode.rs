//! Solvers for initial value problems `dx/dt = f(t, x)`.
//!
//! # Solvers
//!
//! - [`dopri5`] — explicit Dormand–Prince 5(4) with a constant step size

pub mod dopri5;
