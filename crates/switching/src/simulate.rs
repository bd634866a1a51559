//! Simulation of the plant over a horizon and evaluation of its cost.
//!
//! Both functions are generic over [`Scalar`]: on `f64` they compute values,
//! and on tape variables the same code records the computation.

use switchtime_core::{Horizon, Scalar};
use switchtime_solvers::ode::dopri5;
use thiserror::Error;

use crate::{
    params::ConstantParameters,
    plant::{Plant, PlantError, STATE_DIMENSION, end_point_cost},
};

/// Errors that can occur when simulating the plant.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Plant(#[from] PlantError),

    #[error("integration failed")]
    Integration(#[from] dopri5::Error),
}

/// Integrates the plant from `initial` over `horizon` and returns the
/// terminal state.
///
/// Only full steps of size `dt` are taken, so the terminal time is the last
/// step boundary at or before `tf`.
///
/// # Errors
///
/// Returns an error if the inputs do not match the plant layout, if a price
/// is undefined at a sampled time, or if the state becomes non-finite.
pub fn simulate<S: Scalar>(
    constants: &ConstantParameters,
    horizon: &Horizon,
    dynamic: &[S],
    initial: &[S],
    decision: &[S],
) -> Result<Vec<S>, SimulationError> {
    let plant = Plant::new(constants, dynamic, decision)?;
    let solution = dopri5::solve_unobserved(&plant, horizon, initial)?;
    Ok(solution.state)
}

/// Simulates the plant and returns the end-point cost of the trajectory.
///
/// # Errors
///
/// Returns any error [`simulate`] can return.
pub fn objective<S: Scalar>(
    constants: &ConstantParameters,
    horizon: &Horizon,
    dynamic: &[S],
    initial: &[S],
    decision: &[S],
) -> Result<S, SimulationError> {
    let terminal = simulate(constants, horizon, dynamic, initial, decision)?;
    debug_assert_eq!(terminal.len(), STATE_DIMENSION);
    Ok(end_point_cost(&terminal, constants))
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::params::DynamicParameters;

    const INITIAL: [f64; 4] = [1.12, 0.87, 0.0, 0.0];

    fn horizon(tf: f64) -> Horizon {
        Horizon::new(0.0, tf, 0.2).expect("valid horizon")
    }

    #[test]
    fn energy_cost_accumulates_only_while_on() {
        let constants = ConstantParameters::default();
        let dynamic = DynamicParameters::default();

        // On for roughly [10, 30] inside a 60 minute horizon.
        let state = simulate(
            &constants,
            &horizon(60.0),
            dynamic.as_slice(),
            &INITIAL,
            &[10.0, 30.0],
        )
        .expect("should simulate");

        let rate = 7.84 * (10.0 + 0.5 / (1.0 + (-10.0_f64).exp())) / 60.0;
        assert_relative_eq!(state[2], 20.0 * rate, max_relative = 1e-3);
    }

    #[test]
    fn idle_plant_matches_closed_form() {
        let constants = ConstantParameters::default();
        let dynamic = DynamicParameters::default();

        // Switched on long after the horizon.
        let state = simulate(
            &constants,
            &horizon(100.0),
            dynamic.as_slice(),
            &INITIAL,
            &[1000.0, 1010.0],
        )
        .expect("should simulate");

        let substrate = 36.9 + (1.12 - 36.9) * (-0.00067 * 100.0_f64).exp();
        let product = 0.87 * (-0.073 * 0.1 * 100.0_f64).exp();
        assert_relative_eq!(state[0], substrate, epsilon = 1e-9);
        assert_relative_eq!(state[1], product, epsilon = 1e-9);
        assert_relative_eq!(state[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn objective_is_the_end_point_cost() {
        let constants = ConstantParameters::default();
        let dynamic = DynamicParameters::default();
        let decision = [10.0, 30.0];

        let state = simulate(&constants, &horizon(60.0), dynamic.as_slice(), &INITIAL, &decision)
            .expect("should simulate");
        let cost = objective(&constants, &horizon(60.0), dynamic.as_slice(), &INITIAL, &decision)
            .expect("should evaluate");

        assert_eq!(cost, state[2] + state[3]);
    }

    #[test]
    fn undefined_price_fails_the_simulation() {
        let constants = ConstantParameters::default();
        let dynamic = DynamicParameters::new(&[10.0], &[0.0, 30.0]).expect("valid curve");

        let error = simulate(
            &constants,
            &horizon(60.0),
            dynamic.as_slice(),
            &INITIAL,
            &[10.0, 20.0],
        )
        .expect_err("prices end at 30");

        assert!(matches!(error, SimulationError::Integration(_)));
    }

    #[test]
    fn wrong_initial_dimension_is_reported() {
        let constants = ConstantParameters::default();
        let dynamic = DynamicParameters::default();

        let error = simulate(
            &constants,
            &horizon(10.0),
            dynamic.as_slice(),
            &[1.0, 1.0],
            &[10.0, 20.0],
        )
        .expect_err("plant has four states");

        assert!(matches!(
            error,
            SimulationError::Integration(dopri5::Error::Dimension {
                expected: 4,
                found: 2
            })
        ));
    }
}
