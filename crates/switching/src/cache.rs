//! Differentiation cache for the objective gradient.
//!
//! The cache owns a [`Tape`] of the objective with the decision variables as
//! inputs and the price curve followed by the initial state as dynamic
//! parameters. On each gradient request it either reuses the tape, pushes new
//! dynamic parameter values into it, or records a new one, as dictated by
//! its [`TapeState`]:
//!
//! | state | on request | then |
//! |---|---|---|
//! | [`TapeState::Valid`] | reuse | `Valid` |
//! | [`TapeState::NeedsRefresh`] | refresh dynamic parameters | `Valid` |
//! | [`TapeState::NeedsRetape`] | record a new tape | `Valid` |
//!
//! Owners report changes through [`DifferentiationCache::invalidate_values`]
//! (same-size replacement of a dynamic parameter) and
//! [`DifferentiationCache::invalidate_structure`] (anything that changes the
//! recorded operations, including any size change).

use switchtime_core::Horizon;
use switchtime_tape::{RecordError, Tape, TapeError};
use thiserror::Error;

use crate::{params::ConstantParameters, simulate::SimulationError};

/// Validity of the cached tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapeState {
    /// The tape matches the current inputs and can be replayed as is.
    Valid,

    /// The tape structure is current but its dynamic parameters are stale.
    NeedsRefresh,

    /// There is no tape, or its recorded operations are out of date.
    NeedsRetape,
}

/// How often each path of a gradient request was taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub retapes: usize,
    pub refreshes: usize,
    pub reuses: usize,
}

/// Errors that can occur when computing a gradient through the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to record the objective")]
    Record(#[source] RecordError<SimulationError>),

    #[error("failed to replay the objective tape")]
    Tape(#[from] TapeError),
}

/// Inputs of the recorded objective that the tape does not differentiate.
#[derive(Debug, Clone, Copy)]
pub struct TapeContext<'a> {
    pub constants: &'a ConstantParameters,
    pub horizon: &'a Horizon,
    pub dynamic: &'a [f64],
    pub initial: &'a [f64],
}

impl TapeContext<'_> {
    /// Returns the price curve followed by the initial state.
    fn dynamic_parameters(&self) -> Vec<f64> {
        self.dynamic.iter().chain(self.initial).copied().collect()
    }
}

/// Owns the objective tape and decides when to rebuild it.
#[derive(Debug, Clone)]
pub struct DifferentiationCache {
    tape: Option<Tape>,
    state: TapeState,
    stats: CacheStats,
}

impl Default for DifferentiationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DifferentiationCache {
    /// Creates an empty cache; the first gradient request records the tape.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tape: None,
            state: TapeState::NeedsRetape,
            stats: CacheStats::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> TapeState {
        self.state
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Returns the number of operations on the current tape, if any.
    #[must_use]
    pub fn tape_len(&self) -> Option<usize> {
        self.tape.as_ref().map(Tape::node_count)
    }

    /// Marks the tape's dynamic parameters as stale.
    ///
    /// Does not downgrade a pending retape.
    pub fn invalidate_values(&mut self) {
        if self.state == TapeState::Valid {
            self.state = TapeState::NeedsRefresh;
        }
    }

    /// Marks the tape as structurally out of date.
    pub fn invalidate_structure(&mut self) {
        self.state = TapeState::NeedsRetape;
    }

    /// Returns the objective gradient with respect to `decision`.
    ///
    /// # Errors
    ///
    /// Returns an error if recording fails (the simulation fails at the
    /// recording point), or if the replay at `decision` fails.
    pub fn gradient(
        &mut self,
        context: &TapeContext<'_>,
        decision: &[f64],
    ) -> Result<Vec<f64>, CacheError> {
        let tape = match self.tape.take() {
            Some(tape) if self.state == TapeState::Valid => {
                self.stats.reuses += 1;
                tape
            }
            Some(mut tape) if self.state == TapeState::NeedsRefresh => {
                tape.refresh_dynamic(&context.dynamic_parameters())?;
                self.stats.refreshes += 1;
                tracing::debug!(refreshes = self.stats.refreshes, "refreshed tape parameters");
                tape
            }
            _ => {
                let tape = record(context, decision)?;
                self.stats.retapes += 1;
                tracing::debug!(
                    retapes = self.stats.retapes,
                    nodes = tape.node_count(),
                    "recorded objective tape"
                );
                tape
            }
        };
        let tape = self.tape.insert(tape);
        self.state = TapeState::Valid;

        Ok(tape.gradient(decision)?)
    }
}

/// Records the objective at `decision`.
fn record(context: &TapeContext<'_>, decision: &[f64]) -> Result<Tape, CacheError> {
    let constants = context.constants;
    let horizon = context.horizon;
    let split = context.dynamic.len();

    Tape::record(decision, &context.dynamic_parameters(), |x, p| {
        let (dynamic, initial) = p.split_at(split);
        crate::simulate::objective(constants, horizon, dynamic, initial, x).map(|cost| vec![cost])
    })
    .map_err(CacheError::Record)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use finitediff::FiniteDiff;

    use crate::{params::DynamicParameters, simulate::objective};

    const INITIAL: [f64; 4] = [1.12, 0.87, 0.0, 0.0];

    fn horizon() -> Horizon {
        Horizon::new(0.0, 40.0, 0.2).expect("valid horizon")
    }

    #[test]
    fn first_request_records() {
        let constants = ConstantParameters::default();
        let dynamic = DynamicParameters::default();
        let horizon = horizon();
        let context = TapeContext {
            constants: &constants,
            horizon: &horizon,
            dynamic: dynamic.as_slice(),
            initial: &INITIAL,
        };
        let mut cache = DifferentiationCache::new();
        assert_eq!(cache.state(), TapeState::NeedsRetape);
        assert_eq!(cache.tape_len(), None);

        cache
            .gradient(&context, &[5.0, 15.0])
            .expect("should differentiate");

        assert_eq!(cache.state(), TapeState::Valid);
        assert!(cache.tape_len().is_some_and(|len| len > 0));
        assert_eq!(
            cache.stats(),
            CacheStats {
                retapes: 1,
                refreshes: 0,
                reuses: 0
            }
        );
    }

    #[test]
    fn refresh_uses_new_prices() {
        let constants = ConstantParameters::default();
        let cheap = DynamicParameters::default();
        let dear = DynamicParameters::new(&[20.0; 48], cheap.breakpoints()).expect("valid curve");
        let horizon = horizon();
        let decision = [5.0, 15.0];
        let context = TapeContext {
            constants: &constants,
            horizon: &horizon,
            dynamic: cheap.as_slice(),
            initial: &INITIAL,
        };
        let dear_context = TapeContext {
            dynamic: dear.as_slice(),
            ..context
        };

        let mut cache = DifferentiationCache::new();
        let before = cache
            .gradient(&context, &decision)
            .expect("should differentiate");

        cache.invalidate_values();
        assert_eq!(cache.state(), TapeState::NeedsRefresh);
        let refreshed = cache
            .gradient(&dear_context, &decision)
            .expect("should differentiate");

        let recorded = DifferentiationCache::new()
            .gradient(&dear_context, &decision)
            .expect("should differentiate");

        assert_eq!(cache.stats().retapes, 1);
        assert_eq!(cache.stats().refreshes, 1);
        assert!(refreshed[1] > before[1]);
        for (a, b) in refreshed.iter().zip(&recorded) {
            assert_relative_eq!(*a, *b, epsilon = 1e-10, max_relative = 1e-10);
        }
    }

    #[test]
    fn failed_recording_leaves_a_retape_pending() {
        let constants = ConstantParameters::default();
        let dynamic = DynamicParameters::default();
        let horizon = horizon();
        let context = TapeContext {
            constants: &constants,
            horizon: &horizon,
            dynamic: dynamic.as_slice(),
            initial: &INITIAL,
        };
        let short_state = TapeContext {
            initial: &[1.0, 1.0],
            ..context
        };

        let mut cache = DifferentiationCache::new();
        let error = cache
            .gradient(&short_state, &[5.0, 15.0])
            .expect_err("plant has four states");

        assert!(matches!(error, CacheError::Record(_)));
        assert_eq!(cache.state(), TapeState::NeedsRetape);
        assert_eq!(cache.tape_len(), None);
        assert_eq!(cache.stats(), CacheStats::default());

        cache
            .gradient(&context, &[5.0, 15.0])
            .expect("should differentiate");
        assert_eq!(cache.state(), TapeState::Valid);
        assert_eq!(cache.stats().retapes, 1);
    }

    #[test]
    fn structure_invalidation_wins_over_refresh() {
        let mut cache = DifferentiationCache::new();
        cache.state = TapeState::Valid;

        cache.invalidate_structure();
        cache.invalidate_values();

        assert_eq!(cache.state(), TapeState::NeedsRetape);
    }

    #[test]
    fn gradient_is_exact_for_energy_cost() {
        // Shifting an off-time by h adds h of running energy cost, so
        // d(cost)/d(off) is the taxed power rate (plus a small quality term).
        let constants = ConstantParameters::default();
        let dynamic = DynamicParameters::default();
        let horizon = horizon();
        let context = TapeContext {
            constants: &constants,
            horizon: &horizon,
            dynamic: dynamic.as_slice(),
            initial: &INITIAL,
        };
        let decision = [5.0, 15.0];

        let gradient = DifferentiationCache::new()
            .gradient(&context, &decision)
            .expect("should differentiate");

        let cost = |x: &Vec<f64>| {
            objective(&constants, &horizon, dynamic.as_slice(), &INITIAL, x).expect("should evaluate")
        };
        let central = decision.to_vec().central_diff(&cost);
        for (exact, approximate) in gradient.iter().zip(&central) {
            assert_relative_eq!(*exact, *approximate, epsilon = 1e-4, max_relative = 1e-4);
        }
        assert!(gradient[0] < 0.0 && gradient[1] > 0.0);
    }
}
