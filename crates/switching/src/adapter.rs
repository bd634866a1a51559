//! The switching-time problem as a nonlinear program.
//!
//! [`SwitchingProblem`] owns every input of one optimization run and
//! implements [`NlpProblem`] over them. With `n` switches the program is
//!
//! ```text
//! minimize    cost(on, off)
//! subject to  lower <= (on, off) <= upper
//!             on_min  <= off_k - on_k     <= on_max    k = 0..n
//!             off_min <= on_k+1 - off_k   <= off_max   k = 0..n-1
//! ```
//!
//! The duration constraints encode the ordering `on_0 < off_0 < on_1 < …`
//! as long as both minimum durations are positive. Out-of-order points are
//! infeasible, not invalid: they can still be evaluated.
//!
//! # Phases
//!
//! A problem starts in [`Phase::Setup`], where setters are accepted. The
//! solve driver moves it to [`Phase::Solving`] and the solver's final call
//! moves it to [`Phase::Finalized`], after which it is read-only until
//! [`SwitchingProblem::reset`].

mod error;
mod result;


pub use error::{ProblemError, SetupError};
pub use result::SolverResult;

use switchtime_core::{FinalSolution, Horizon, NlpInfo, NlpProblem, ReturnStatus};

use crate::{
    cache::{CacheStats, DifferentiationCache, TapeContext, TapeState},
    params::{ConstantParameters, DurationBounds, DynamicParameters, split_switches},
    plant::STATE_DIMENSION,
    simulate,
};

/// Lifecycle phase of a [`SwitchingProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Solving,
    Finalized,
}

/// The switching-time problem and its differentiation cache.
#[derive(Debug, Clone)]
pub struct SwitchingProblem {
    constants: ConstantParameters,
    dynamic: DynamicParameters,
    decision: Vec<f64>,
    initial: Vec<f64>,
    horizon: Horizon,
    lower: Vec<f64>,
    upper: Vec<f64>,
    on_bound: DurationBounds,
    off_bound: DurationBounds,
    cache: DifferentiationCache,
    phase: Phase,
    result: Option<SolverResult>,
    init_status: Option<ReturnStatus>,
    solve_status: Option<ReturnStatus>,
}

impl Default for SwitchingProblem {
    /// A six-hour day with flat prices and no switches yet.
    ///
    /// The decision vector and variable bounds start empty and must be set
    /// before solving.
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self {
            constants: ConstantParameters::default(),
            dynamic: DynamicParameters::default(),
            decision: Vec::new(),
            initial: vec![1.12, 0.87, 0.0, 0.0],
            horizon: Horizon::new(0.0, 360.0, 0.2).unwrap(),
            lower: Vec::new(),
            upper: Vec::new(),
            on_bound: DurationBounds::new(6.0, 60.0).unwrap(),
            off_bound: DurationBounds::new(20.0, 120.0).unwrap(),
            cache: DifferentiationCache::new(),
            phase: Phase::Setup,
            result: None,
            init_status: None,
            solve_status: None,
        }
    }
}

impl SwitchingProblem {
    /// Creates a problem with default parameters and the given switch times.
    ///
    /// Variable bounds default to `[t0, tf]` for every switch time.
    #[must_use]
    pub fn new(decision: Vec<f64>) -> Self {
        let mut problem = Self::default();
        let (t0, tf) = (problem.horizon.t0(), problem.horizon.tf());
        problem.lower = vec![t0; decision.len()];
        problem.upper = vec![tf; decision.len()];
        problem.decision = decision;
        problem
    }

    // --- Setters ---

    fn ensure_setup(&self) -> Result<(), SetupError> {
        match self.phase {
            Phase::Setup => Ok(()),
            Phase::Solving | Phase::Finalized => Err(SetupError::ReadOnly(self.phase)),
        }
    }

    /// Replaces the model constants.
    ///
    /// The constants are literals on the recorded tape, so any change in
    /// value forces a retape.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ReadOnly`] outside the setup phase.
    pub fn set_constants(&mut self, constants: ConstantParameters) -> Result<(), SetupError> {
        self.ensure_setup()?;
        if constants != self.constants {
            self.cache.invalidate_structure();
        }
        self.constants = constants;
        Ok(())
    }

    /// Replaces the price curve.
    ///
    /// A curve with the same number of segments is refreshed on the tape;
    /// any other forces a retape.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ReadOnly`] outside the setup phase.
    pub fn set_dynamic(&mut self, dynamic: DynamicParameters) -> Result<(), SetupError> {
        self.ensure_setup()?;
        if dynamic.as_slice().len() == self.dynamic.as_slice().len() {
            self.cache.invalidate_values();
        } else {
            self.cache.invalidate_structure();
        }
        self.dynamic = dynamic;
        Ok(())
    }

    /// Replaces the decision vector, which is also the starting point.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ReadOnly`] outside the setup phase.
    pub fn set_decision(&mut self, decision: Vec<f64>) -> Result<(), SetupError> {
        self.ensure_setup()?;
        if decision.len() != self.decision.len() {
            self.cache.invalidate_structure();
        }
        self.decision = decision;
        Ok(())
    }

    /// Replaces the initial state.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ReadOnly`] outside the setup phase.
    pub fn set_initial_state(&mut self, initial: Vec<f64>) -> Result<(), SetupError> {
        self.ensure_setup()?;
        if initial.len() == self.initial.len() {
            self.cache.invalidate_values();
        } else {
            self.cache.invalidate_structure();
        }
        self.initial = initial;
        Ok(())
    }

    /// Replaces the simulation horizon.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ReadOnly`] outside the setup phase.
    pub fn set_horizon(&mut self, horizon: Horizon) -> Result<(), SetupError> {
        self.ensure_setup()?;
        if horizon != self.horizon {
            self.cache.invalidate_structure();
        }
        self.horizon = horizon;
        Ok(())
    }

    /// Replaces the lower bounds of the switch times.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ReadOnly`] outside the setup phase.
    pub fn set_lower_bound(&mut self, lower: Vec<f64>) -> Result<(), SetupError> {
        self.ensure_setup()?;
        self.lower = lower;
        Ok(())
    }

    /// Replaces the upper bounds of the switch times.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ReadOnly`] outside the setup phase.
    pub fn set_upper_bound(&mut self, upper: Vec<f64>) -> Result<(), SetupError> {
        self.ensure_setup()?;
        self.upper = upper;
        Ok(())
    }

    /// Replaces the bounds on the length of each on period.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ReadOnly`] outside the setup phase.
    pub fn set_on_bound(&mut self, bound: DurationBounds) -> Result<(), SetupError> {
        self.ensure_setup()?;
        self.on_bound = bound;
        Ok(())
    }

    /// Replaces the bounds on the length of each off period.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ReadOnly`] outside the setup phase.
    pub fn set_off_bound(&mut self, bound: DurationBounds) -> Result<(), SetupError> {
        self.ensure_setup()?;
        self.off_bound = bound;
        Ok(())
    }

    /// Returns to the setup phase, discarding any solver result.
    ///
    /// The differentiation cache is kept.
    pub fn reset(&mut self) {
        self.phase = Phase::Setup;
        self.result = None;
        self.init_status = None;
        self.solve_status = None;
    }

    // --- Getters ---

    #[must_use]
    pub fn constants(&self) -> &ConstantParameters {
        &self.constants
    }

    #[must_use]
    pub fn dynamic(&self) -> &DynamicParameters {
        &self.dynamic
    }

    #[must_use]
    pub fn decision(&self) -> &[f64] {
        &self.decision
    }

    #[must_use]
    pub fn initial_state(&self) -> &[f64] {
        &self.initial
    }

    #[must_use]
    pub fn horizon(&self) -> &Horizon {
        &self.horizon
    }

    #[must_use]
    pub fn lower_bound(&self) -> &[f64] {
        &self.lower
    }

    #[must_use]
    pub fn upper_bound(&self) -> &[f64] {
        &self.upper
    }

    #[must_use]
    pub fn on_bound(&self) -> DurationBounds {
        self.on_bound
    }

    #[must_use]
    pub fn off_bound(&self) -> DurationBounds {
        self.off_bound
    }

    /// Number of switches `n`; the decision vector has `2n` entries.
    #[must_use]
    pub fn switches(&self) -> usize {
        self.decision.len() / 2
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns what the solver delivered, once finalized.
    #[must_use]
    pub fn result(&self) -> Option<&SolverResult> {
        self.result.as_ref()
    }

    /// Returns the optimized decision vector, once finalized.
    #[must_use]
    pub fn optimized(&self) -> Option<&[f64]> {
        self.result.as_ref().map(|result| result.x.as_slice())
    }

    /// Status of solver initialization, once a solve has been attempted.
    #[must_use]
    pub fn init_status(&self) -> Option<ReturnStatus> {
        self.init_status
    }

    /// Status of the solve itself, once a solve has been attempted.
    #[must_use]
    pub fn solve_status(&self) -> Option<ReturnStatus> {
        self.solve_status
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    #[must_use]
    pub fn tape_state(&self) -> TapeState {
        self.cache.state()
    }

    // --- Evaluation ---

    /// Returns the objective at `x` by plain simulation.
    ///
    /// # Errors
    ///
    /// Returns an error if the simulation fails.
    pub fn objective_value(&self, x: &[f64]) -> Result<f64, ProblemError> {
        let cost = simulate::objective(
            &self.constants,
            &self.horizon,
            self.dynamic.as_slice(),
            &self.initial,
            x,
        )?;
        Ok(cost)
    }

    /// Returns the objective gradient at `x` through the differentiation cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the tape cannot be recorded or replayed at `x`.
    pub fn objective_gradient(&mut self, x: &[f64]) -> Result<Vec<f64>, ProblemError> {
        let context = TapeContext {
            constants: &self.constants,
            horizon: &self.horizon,
            dynamic: self.dynamic.as_slice(),
            initial: &self.initial,
        };
        Ok(self.cache.gradient(&context, x)?)
    }

    /// Returns the on-period lengths followed by the off-period lengths.
    #[must_use]
    pub fn constraint_values(x: &[f64]) -> Vec<f64> {
        let (on, off) = split_switches(x);
        let on_periods = on.iter().zip(off).map(|(on, off)| off - on);
        let off_periods = off.iter().zip(on.iter().skip(1)).map(|(off, next)| next - off);
        on_periods.chain(off_periods).collect()
    }

    // --- Solve lifecycle ---

    /// Checks that all inputs agree in size and are usable for a solve.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), SetupError> {
        let len = self.decision.len();
        if len == 0 || len % 2 != 0 {
            return Err(SetupError::DecisionLength(len));
        }
        if let Some(index) = self.decision.iter().position(|v| !v.is_finite()) {
            return Err(SetupError::NonFiniteDecision { index });
        }
        if self.lower.len() != len || self.upper.len() != len {
            return Err(SetupError::BoundsLength {
                expected: len,
                lower: self.lower.len(),
                upper: self.upper.len(),
            });
        }
        let crossed = self
            .lower
            .iter()
            .zip(&self.upper)
            .position(|(l, u)| l.is_nan() || u.is_nan() || l >= u);
        if let Some(index) = crossed {
            return Err(SetupError::CrossedBounds { index });
        }
        if self.initial.len() != STATE_DIMENSION {
            return Err(SetupError::InitialDimension {
                expected: STATE_DIMENSION,
                found: self.initial.len(),
            });
        }
        if let Some(index) = self.initial.iter().position(|v| !v.is_finite()) {
            return Err(SetupError::NonFiniteInitial { index });
        }
        if !self.dynamic.covers(&self.horizon) {
            return Err(SetupError::PricesDoNotCover {
                t0: self.horizon.t0(),
                tf: self.horizon.tf(),
            });
        }
        Ok(())
    }

    /// Validates the inputs and enters the solving phase.
    pub(crate) fn begin_solve(&mut self) -> Result<(), SetupError> {
        self.ensure_setup()?;
        self.validate()?;
        self.phase = Phase::Solving;
        Ok(())
    }

    /// Records solver statuses and leaves the solving phase.
    ///
    /// A solve that ended without a final iterate returns to setup.
    pub(crate) fn end_solve(&mut self, init: ReturnStatus, solve: ReturnStatus) {
        self.init_status = Some(init);
        self.solve_status = Some(solve);
        if self.phase == Phase::Solving {
            self.phase = Phase::Setup;
        }
    }

    /// Leaves the solving phase after an aborted solve.
    pub(crate) fn abort_solve(&mut self) {
        self.phase = Phase::Setup;
    }
}

impl NlpProblem for SwitchingProblem {
    type Error = ProblemError;

    fn info(&self) -> NlpInfo {
        let constraints = self.decision.len().saturating_sub(1);
        NlpInfo {
            variables: self.decision.len(),
            constraints,
            jacobian_nonzeros: 2 * constraints,
            hessian_nonzeros: 0,
        }
    }

    fn bounds(
        &self,
        x_lower: &mut [f64],
        x_upper: &mut [f64],
        g_lower: &mut [f64],
        g_upper: &mut [f64],
    ) -> Result<(), Self::Error> {
        fill("lower bounds", x_lower, &self.lower)?;
        fill("upper bounds", x_upper, &self.upper)?;
        let constraints = self.info().constraints;
        for found in [g_lower.len(), g_upper.len()] {
            check_len("constraint bounds", constraints, found)?;
        }

        let n = self.switches();
        for (k, (lower, upper)) in g_lower.iter_mut().zip(g_upper.iter_mut()).enumerate() {
            let bound = if k < n { self.on_bound } else { self.off_bound };
            *lower = bound.min();
            *upper = bound.max();
        }
        Ok(())
    }

    fn starting_point(&self, x: &mut [f64]) -> Result<(), Self::Error> {
        fill("starting point", x, &self.decision)
    }

    fn objective(&mut self, x: &[f64], _new_x: bool) -> Result<f64, Self::Error> {
        self.objective_value(x)
    }

    fn gradient(
        &mut self,
        x: &[f64],
        _new_x: bool,
        gradient: &mut [f64],
    ) -> Result<(), Self::Error> {
        fill("gradient", gradient, &self.objective_gradient(x)?)
    }

    fn constraints(&mut self, x: &[f64], _new_x: bool, g: &mut [f64]) -> Result<(), Self::Error> {
        fill("constraints", g, &Self::constraint_values(x))
    }

    /// On-period row `k` touches `(k, n + k)`; off-period row `n + k`
    /// touches `(k + 1, n + k)`.
    fn jacobian_structure(
        &self,
        rows: &mut [usize],
        cols: &mut [usize],
    ) -> Result<(), Self::Error> {
        let nonzeros = self.info().jacobian_nonzeros;
        check_len("Jacobian rows", nonzeros, rows.len())?;
        check_len("Jacobian columns", nonzeros, cols.len())?;

        let n = self.switches();
        let on_periods = (0..n).flat_map(|k| [(k, k), (k, n + k)]);
        let off_periods = (0..n.saturating_sub(1)).flat_map(|k| [(n + k, k + 1), (n + k, n + k)]);

        for ((row, col), (r, c)) in rows
            .iter_mut()
            .zip(cols.iter_mut())
            .zip(on_periods.chain(off_periods))
        {
            *row = r;
            *col = c;
        }
        Ok(())
    }

    /// The constraints are affine, so the values never depend on `x`.
    fn jacobian_values(
        &mut self,
        _x: &[f64],
        _new_x: bool,
        values: &mut [f64],
    ) -> Result<(), Self::Error> {
        check_len("Jacobian values", self.info().jacobian_nonzeros, values.len())?;

        let n = self.switches();
        for (i, value) in values.iter_mut().enumerate() {
            let first = i % 2 == 0;
            let on_period = i < 2 * n;
            *value = if first == on_period { -1.0 } else { 1.0 };
        }
        Ok(())
    }

    fn finalize(&mut self, solution: &FinalSolution<'_>) {
        tracing::info!(
            status = ?solution.status,
            objective = solution.objective,
            iterations = solution.iterations,
            "switching problem finalized"
        );
        self.result = Some(SolverResult {
            status: solution.status,
            x: solution.x.to_vec(),
            objective: solution.objective,
            constraints: solution.constraints.to_vec(),
            iterations: solution.iterations,
        });
        self.phase = Phase::Finalized;
    }
}

/// Checks that a solver buffer has the length the problem layout implies.
fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), ProblemError> {
    if expected == found {
        Ok(())
    } else {
        Err(ProblemError::Layout {
            what,
            expected,
            found,
        })
    }
}

/// Copies `source` into a solver buffer of the same length.
fn fill(what: &'static str, buffer: &mut [f64], source: &[f64]) -> Result<(), ProblemError> {
    check_len(what, buffer.len(), source.len())?;
    buffer.copy_from_slice(source);
    Ok(())
}
