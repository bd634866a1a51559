//! Reusable observers for switching-time solvers.
//!
//! This crate provides [`Observer`] implementations and capability traits that
//! work across the solvers in `switchtime-solvers`.
//!
//! # Modules
//!
//! - [`traits`] — Capability traits for cross-solver observers
//!   ([`HasIteration`], [`HasResidual`], [`HasObjective`], [`CanStopEarly`])
//! - [`LogObserver`] — Emits one `tracing` event per solver iteration, with
//!   verbosity chosen by a print level
//!
//! [`Observer`]: switchtime_core::Observer
//! [`HasIteration`]: traits::HasIteration
//! [`HasResidual`]: traits::HasResidual
//! [`HasObjective`]: traits::HasObjective
//! [`CanStopEarly`]: traits::CanStopEarly

pub mod traits;

mod log;

pub use log::{IterationRecord, LogObserver};
