//! Constant-step Dormand–Prince solver for ODE systems.
//!
//! Each step evaluates the six stages of the Dormand–Prince 5(4) pair and
//! advances with the fifth-order weights. No error control is performed: the
//! horizon is covered by exactly [`Horizon::steps`] steps of size `dt`, and
//! when `tf - t0` is not a multiple of `dt` the final partial interval is not
//! integrated.
//!
//! The solver is generic over [`Scalar`], so running it on tape-recording
//! variables records the whole trajectory for differentiation.
//!
//! # Example
//!
//! ```ignore
//! use switchtime_solvers::ode::dopri5;
//!
//! let solution = dopri5::solve_unobserved(&dynamics, &horizon, &initial)?;
//! println!("x({}) = {:?}", solution.time, solution.state);
//! ```

mod action;
mod error;
mod event;
mod solution;
mod stepper;

pub use action::Action;
pub use error::Error;
pub use event::Event;
pub use solution::{Solution, Status};

use switchtime_core::{Dynamics, Horizon, Observer, Scalar};

use stepper::Stepper;

/// Integrates `dynamics` over `horizon` starting from `initial`.
///
/// # Observer
///
/// The observer receives an [`Event`] for the initial state and after each
/// step, and may return [`Action::StopEarly`] to end the integration.
///
/// # Errors
///
/// Returns an error if `initial` does not match the dynamics dimension, if
/// the dynamics fail, or if the state becomes non-finite.
pub fn solve<S, D, Obs>(
    dynamics: &D,
    horizon: &Horizon,
    initial: &[S],
    mut observer: Obs,
) -> Result<Solution<S>, Error>
where
    S: Scalar,
    D: Dynamics<S>,
    Obs: Observer<Event<S>, Action>,
{
    let dimension = dynamics.dimension();
    if initial.len() != dimension {
        return Err(Error::Dimension {
            expected: dimension,
            found: initial.len(),
        });
    }

    let mut state = initial.to_vec();
    let mut stepper = Stepper::new(dimension);
    let steps = horizon.steps();
    let dt = horizon.dt();

    let event = Event {
        step: 0,
        time: horizon.t0(),
        state: state.clone(),
    };
    if let Some(Action::StopEarly) = observer.observe(&event) {
        return Ok(Solution {
            status: Status::StoppedByObserver,
            state,
            time: horizon.t0(),
            steps: 0,
        });
    }

    for step in 1..=steps {
        // Step start times are computed from t0 to avoid accumulating error.
        stepper
            .step(dynamics, horizon.time_at(step - 1), dt, &mut state)
            .map_err(Error::dynamics)?;

        let time = horizon.time_at(step);
        if !state.iter().all(Scalar::is_finite) {
            return Err(Error::NonFinite { step, time });
        }

        let event = Event {
            step,
            time,
            state: state.clone(),
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(Solution {
                status: Status::StoppedByObserver,
                state,
                time,
                steps: step,
            });
        }
    }

    Ok(Solution {
        status: Status::Complete,
        state,
        time: horizon.time_at(steps),
        steps,
    })
}

/// Integrates `dynamics` over `horizon` without observation.
///
/// This is a convenience wrapper around [`solve`] that discards events.
///
/// # Errors
///
/// Returns an error if `initial` does not match the dynamics dimension, if
/// the dynamics fail, or if the state becomes non-finite.
pub fn solve_unobserved<S, D>(
    dynamics: &D,
    horizon: &Horizon,
    initial: &[S],
) -> Result<Solution<S>, Error>
where
    S: Scalar,
    D: Dynamics<S>,
{
    solve(dynamics, horizon, initial, ())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    use approx::assert_relative_eq;
    use switchtime_tape::Tape;

    // --- Test fixtures ---

    /// dx/dt = -rate * x
    struct Decay {
        rate: f64,
    }

    impl<S: Scalar> Dynamics<S> for Decay {
        type Error = Infallible;

        fn dimension(&self) -> usize {
            1
        }

        fn derivative(
            &self,
            _time: f64,
            state: &[S],
            derivative: &mut [S],
        ) -> Result<(), Self::Error> {
            derivative[0] = state[0] * -self.rate;
            Ok(())
        }
    }

    /// x'' = -x written as a first-order system.
    struct Oscillator;

    impl<S: Scalar> Dynamics<S> for Oscillator {
        type Error = Infallible;

        fn dimension(&self) -> usize {
            2
        }

        fn derivative(
            &self,
            _time: f64,
            state: &[S],
            derivative: &mut [S],
        ) -> Result<(), Self::Error> {
            derivative[0] = state[1];
            derivative[1] = -state[0];
            Ok(())
        }
    }

    /// dx/dt = x², which blows up at t = 1 from x(0) = 1.
    struct BlowUp;

    impl Dynamics<f64> for BlowUp {
        type Error = Infallible;

        fn dimension(&self) -> usize {
            1
        }

        fn derivative(
            &self,
            _time: f64,
            state: &[f64],
            derivative: &mut [f64],
        ) -> Result<(), Self::Error> {
            derivative[0] = state[0] * state[0];
            Ok(())
        }
    }

    /// dx/dt = t, exercising the stage times.
    struct Ramp;

    impl Dynamics<f64> for Ramp {
        type Error = Infallible;

        fn dimension(&self) -> usize {
            1
        }

        fn derivative(
            &self,
            time: f64,
            _state: &[f64],
            derivative: &mut [f64],
        ) -> Result<(), Self::Error> {
            derivative[0] = time;
            Ok(())
        }
    }

    fn horizon(t0: f64, tf: f64, dt: f64) -> Horizon {
        Horizon::new(t0, tf, dt).expect("valid horizon")
    }

    // --- Tests ---

    #[test]
    fn exponential_decay() {
        let solution = solve_unobserved(&Decay { rate: 1.0 }, &horizon(0.0, 1.0, 0.1), &[1.0])
            .expect("should integrate");

        assert_eq!(solution.status, Status::Complete);
        assert_eq!(solution.steps, 10);
        assert_relative_eq!(solution.time, 1.0, epsilon = 1e-12);
        assert_relative_eq!(solution.state[0], (-1.0_f64).exp(), epsilon = 1e-7);
    }

    #[test]
    fn oscillator_returns_after_one_period() {
        let dt = 2.0 * std::f64::consts::PI / 200.0;
        let solution = solve_unobserved(&Oscillator, &horizon(0.0, 200.0 * dt, dt), &[1.0, 0.0])
            .expect("should integrate");

        assert_eq!(solution.steps, 200);
        assert_relative_eq!(solution.state[0], 1.0, epsilon = 1e-7);
        assert_relative_eq!(solution.state[1], 0.0, epsilon = 1e-7);
    }

    #[test]
    fn quadratic_in_time_is_exact() {
        let solution =
            solve_unobserved(&Ramp, &horizon(1.0, 3.0, 0.5), &[0.0]).expect("should integrate");

        assert_relative_eq!(solution.state[0], (9.0 - 1.0) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn partial_final_interval_is_skipped() {
        let solution =
            solve_unobserved(&Ramp, &horizon(0.0, 1.0, 0.3), &[0.0]).expect("should integrate");

        assert_eq!(solution.steps, 3);
        assert_relative_eq!(solution.time, 0.9, epsilon = 1e-12);
        assert_relative_eq!(solution.state[0], 0.81 / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn blow_up_is_reported() {
        let error = solve_unobserved(&BlowUp, &horizon(0.0, 5.0, 0.1), &[1.0])
            .expect_err("should diverge");

        assert!(matches!(error, Error::NonFinite { step, .. } if step > 9));
    }

    #[test]
    fn rejects_wrong_dimension() {
        let error = solve_unobserved(&Oscillator, &horizon(0.0, 1.0, 0.1), &[1.0])
            .expect_err("should reject");

        assert!(matches!(error, Error::Dimension { expected: 2, found: 1 }));
    }

    #[test]
    fn observer_can_stop_early() {
        let observer = |event: &Event<f64>| (event.step >= 5).then_some(Action::StopEarly);

        let solution = solve(&Decay { rate: 1.0 }, &horizon(0.0, 10.0, 0.1), &[1.0], observer)
            .expect("should stop early");

        assert_eq!(solution.status, Status::StoppedByObserver);
        assert_eq!(solution.steps, 5);
        assert_relative_eq!(solution.time, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn step_numbers_start_at_zero() {
        let mut steps = Vec::new();
        solve(
            &Decay { rate: 1.0 },
            &horizon(0.0, 1.0, 0.25),
            &[1.0],
            |event: &Event<f64>| {
                steps.push(event.step);
                None
            },
        )
        .expect("should integrate");

        assert_eq!(steps, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn recorded_trajectory_differentiates_initial_state() {
        // x(1) = x0 * exp(-rate), so dx(1)/dx0 = exp(-rate).
        let mut tape = Tape::record(&[2.0], &[], |x, _| {
            let solution = solve_unobserved(&Decay { rate: 0.5 }, &horizon(0.0, 1.0, 0.05), x)?;
            Ok::<_, Error>(solution.state)
        })
        .expect("should record");

        let gradient = tape.gradient(&[3.0]).expect("should differentiate");
        assert_relative_eq!(gradient[0], (-0.5_f64).exp(), epsilon = 1e-9);

        let value = tape.forward(&[3.0]).expect("should evaluate");
        assert_relative_eq!(value[0], 3.0 * (-0.5_f64).exp(), epsilon = 1e-9);
    }
}
