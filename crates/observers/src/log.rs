//! Iteration logging through `tracing`.
//!
//! See [`LogObserver`] for usage.

use switchtime_core::Observer;
use tracing::Level;

use crate::traits::{HasIteration, HasObjective, HasResidual};

/// Print level at and above which iterations are logged at `INFO`.
const INFO_LEVEL: u8 = 5;

/// One logged solver iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    pub objective: f64,
    pub residual: f64,
}

/// An observer that logs each solver iteration and keeps a history of them.
///
/// The print level follows the convention of interior-point solver
/// frontends: `0` is silent, levels below 5 log iterations at `DEBUG`, and
/// level 5 and above log them at `INFO`. The history is kept at every level.
///
/// The observer never steers the solver. Install a `tracing` subscriber to
/// see the output.
///
/// # Example
///
/// ```ignore
/// let mut log = LogObserver::new(5);
/// interior_point::solve(&mut problem, &config, &mut log)?;
/// println!("{} iterations", log.history().len());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogObserver {
    print_level: u8,
    history: Vec<IterationRecord>,
}

impl LogObserver {
    /// Creates a new `LogObserver` with the given print level.
    #[must_use]
    pub fn new(print_level: u8) -> Self {
        Self {
            print_level,
            history: Vec::new(),
        }
    }

    /// Returns the print level.
    #[must_use]
    pub fn print_level(&self) -> u8 {
        self.print_level
    }

    /// Returns the `tracing` level iterations are logged at, if any.
    #[must_use]
    pub fn level(&self) -> Option<Level> {
        match self.print_level {
            0 => None,
            level if level < INFO_LEVEL => Some(Level::DEBUG),
            _ => Some(Level::INFO),
        }
    }

    /// Returns every iteration observed so far.
    #[must_use]
    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    /// Consumes the observer and returns its history.
    #[must_use]
    pub fn into_history(self) -> Vec<IterationRecord> {
        self.history
    }

    /// Records an iteration and logs it at the configured level.
    pub fn record(&mut self, record: IterationRecord) {
        let IterationRecord {
            iteration,
            objective,
            residual,
        } = record;

        if let Some(level) = self.level() {
            if level == Level::INFO {
                tracing::info!(iteration, objective, residual, "iteration");
            } else {
                tracing::debug!(iteration, objective, residual, "iteration");
            }
        }

        self.history.push(record);
    }
}

impl<E, A> Observer<E, A> for LogObserver
where
    E: HasIteration + HasObjective + HasResidual,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self.record(IterationRecord {
            iteration: event.iteration(),
            objective: event.objective(),
            residual: event.residual(),
        });
        None
    }
}

/// Allows `&mut LogObserver` to be passed to solvers that take an observer
/// by value, so the history can be read after the solve completes.
impl<E, A> Observer<E, A> for &mut LogObserver
where
    E: HasIteration + HasObjective + HasResidual,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        (*self).observe(event)
    }
}
