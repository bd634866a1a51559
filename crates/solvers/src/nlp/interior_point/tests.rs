use approx::assert_relative_eq;
use thiserror::Error;

use switchtime_core::{FinalSolution, NlpInfo, NlpProblem, ReturnStatus};

use super::{Action, Config, Error, Event, solve, solve_unobserved};

#[derive(Debug, Error)]
#[error("objective unavailable")]
struct Unavailable;

/// Bound-constrained problem with one linear inequality `a · x <= cap`.
///
/// The objective is `Σ w_i (x_i - target_i)²`, or the Rosenbrock function
/// when `rosenbrock` is set.
struct Fixture {
    target: [f64; 2],
    weights: [f64; 2],
    rosenbrock: bool,
    lower: [f64; 2],
    upper: [f64; 2],
    a: [f64; 2],
    cap: f64,
    start: [f64; 2],
    fail_objective: bool,
    evaluations: Vec<([f64; 2], bool)>,
    finalized: Option<(ReturnStatus, Vec<f64>)>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            target: [1.0, 1.5],
            weights: [1.0, 1.0],
            rosenbrock: false,
            lower: [0.0, 0.0],
            upper: [2.0, 2.0],
            a: [1.0, 1.0],
            cap: 2.0,
            start: [0.0, 0.0],
            fail_objective: false,
            evaluations: Vec::new(),
            finalized: None,
        }
    }
}

impl Fixture {
    fn record(&mut self, x: &[f64], new_x: bool) {
        self.evaluations.push(([x[0], x[1]], new_x));
    }
}

impl NlpProblem for Fixture {
    type Error = Unavailable;

    fn info(&self) -> NlpInfo {
        NlpInfo {
            variables: 2,
            constraints: 1,
            jacobian_nonzeros: 2,
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
        x_lower.copy_from_slice(&self.lower);
        x_upper.copy_from_slice(&self.upper);
        g_lower[0] = -1e20;
        g_upper[0] = self.cap;
        Ok(())
    }

    fn starting_point(&self, x: &mut [f64]) -> Result<(), Self::Error> {
        x.copy_from_slice(&self.start);
        Ok(())
    }

    fn objective(&mut self, x: &[f64], new_x: bool) -> Result<f64, Self::Error> {
        self.record(x, new_x);
        if self.fail_objective {
            return Err(Unavailable);
        }
        if self.rosenbrock {
            return Ok((1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2));
        }
        Ok((0..2)
            .map(|i| self.weights[i] * (x[i] - self.target[i]).powi(2))
            .sum())
    }

    fn gradient(
        &mut self,
        x: &[f64],
        new_x: bool,
        gradient: &mut [f64],
    ) -> Result<(), Self::Error> {
        self.record(x, new_x);
        if self.rosenbrock {
            gradient[0] = -2.0 * (1.0 - x[0]) - 400.0 * x[0] * (x[1] - x[0] * x[0]);
            gradient[1] = 200.0 * (x[1] - x[0] * x[0]);
            return Ok(());
        }
        for i in 0..2 {
            gradient[i] = 2.0 * self.weights[i] * (x[i] - self.target[i]);
        }
        Ok(())
    }

    fn constraints(&mut self, x: &[f64], new_x: bool, g: &mut [f64]) -> Result<(), Self::Error> {
        self.record(x, new_x);
        g[0] = self.a[0] * x[0] + self.a[1] * x[1];
        Ok(())
    }

    fn jacobian_structure(
        &self,
        rows: &mut [usize],
        cols: &mut [usize],
    ) -> Result<(), Self::Error> {
        rows.copy_from_slice(&[0, 0]);
        cols.copy_from_slice(&[0, 1]);
        Ok(())
    }

    fn jacobian_values(
        &mut self,
        x: &[f64],
        new_x: bool,
        values: &mut [f64],
    ) -> Result<(), Self::Error> {
        self.record(x, new_x);
        values.copy_from_slice(&self.a);
        Ok(())
    }

    fn finalize(&mut self, solution: &FinalSolution<'_>) {
        self.finalized = Some((solution.status, solution.x.to_vec()));
    }
}

#[test]
fn active_linear_constraint() {
    // Minimizer of (x0 - 1)² + (x1 - 1.5)² on x0 + x1 = 2.
    let mut problem = Fixture::default();

    let solution = solve_unobserved(&mut problem, &Config::default()).expect("should solve");

    assert!(solution.is_success(), "status {:?}", solution.status);
    assert_relative_eq!(solution.x[0], 0.75, epsilon = 1e-5);
    assert_relative_eq!(solution.x[1], 1.25, epsilon = 1e-5);
    assert_relative_eq!(solution.constraints[0], 2.0, epsilon = 1e-5);
    assert!(solution.constraints[0] < 2.0);

    let (status, x) = problem.finalized.expect("should finalize");
    assert_eq!(status, solution.status);
    assert_eq!(x, solution.x);
}

#[test]
fn active_variable_bound() {
    // Unconstrained minimizer (3, 0.5) lies beyond x0 <= 2.
    let mut problem = Fixture {
        target: [3.0, 0.5],
        cap: 10.0,
        ..Fixture::default()
    };

    let solution = solve_unobserved(&mut problem, &Config::default()).expect("should solve");

    assert!(solution.is_success(), "status {:?}", solution.status);
    assert_relative_eq!(solution.x[0], 2.0, epsilon = 1e-5);
    assert_relative_eq!(solution.x[1], 0.5, epsilon = 1e-5);
    assert!(solution.x[0] < 2.0);
}

#[test]
fn bounded_rosenbrock() {
    let mut problem = Fixture {
        rosenbrock: true,
        lower: [-2.0, -2.0],
        upper: [2.0, 2.0],
        cap: 10.0,
        start: [-1.2, 1.0],
        ..Fixture::default()
    };

    let solution = solve_unobserved(&mut problem, &Config::default()).expect("should solve");

    assert!(solution.is_success(), "status {:?}", solution.status);
    assert_relative_eq!(solution.x[0], 1.0, epsilon = 1e-4);
    assert_relative_eq!(solution.x[1], 1.0, epsilon = 1e-4);
}

#[test]
fn new_x_is_false_only_for_repeated_points() {
    let mut problem = Fixture::default();
    solve_unobserved(&mut problem, &Config::default()).expect("should solve");

    let mut previous: Option<[f64; 2]> = None;
    for &(x, new_x) in &problem.evaluations {
        assert_eq!(new_x, previous != Some(x), "at {x:?}");
        previous = Some(x);
    }
}

#[test]
fn starting_point_is_moved_inside_constraints() {
    // Clamping puts x at the corner (2, 2), which violates x0 + x1 < 2 by
    // far more than the bound push can fix.
    let mut problem = Fixture {
        start: [5.0, 5.0],
        ..Fixture::default()
    };
    let solution = solve_unobserved(&mut problem, &Config::default()).expect("should finish");
    assert_eq!(solution.status, ReturnStatus::RestorationFailed);
    assert_eq!(solution.code(), -2);

    // Pushing x0 off its bound by 0.01 violates x0 + x1 < 1.504, and so
    // does half that push; a quarter is strictly feasible.
    let mut problem = Fixture {
        start: [0.0, 1.5],
        cap: 1.504,
        ..Fixture::default()
    };
    let solution = solve_unobserved(&mut problem, &Config::default()).expect("should solve");
    assert!(solution.is_success(), "status {:?}", solution.status);

    let tried: Vec<f64> = problem.evaluations[..3].iter().map(|(x, _)| x[0]).collect();
    for (found, expected) in tried.iter().zip([0.01, 0.005, 0.0025]) {
        assert_relative_eq!(*found, expected, epsilon = 1e-12);
    }
}

#[test]
fn rejects_crossed_bounds() {
    let mut problem = Fixture {
        lower: [1.0, 0.0],
        upper: [0.0, 1.0],
        ..Fixture::default()
    };

    let solution = solve_unobserved(&mut problem, &Config::default()).expect("should finish");

    assert_eq!(solution.status, ReturnStatus::InvalidProblemDefinition);
    assert_eq!(solution.iterations, 0);
    assert!(problem.evaluations.is_empty());
    assert!(problem.finalized.is_some());
}

#[test]
fn iteration_limit() {
    let mut problem = Fixture {
        rosenbrock: true,
        lower: [-2.0, -2.0],
        cap: 10.0,
        start: [-1.2, 1.0],
        ..Fixture::default()
    };
    let config = Config::new(1e-6, 1e-4, 3).expect("valid config");

    let solution = solve_unobserved(&mut problem, &config).expect("should finish");

    assert_eq!(solution.status, ReturnStatus::MaxIterations);
    assert_eq!(solution.iterations, 3);
    assert_eq!(solution.code(), -1);
}

#[test]
fn observer_can_stop_early() {
    let mut problem = Fixture::default();
    let mut seen = Vec::new();

    let solution = solve(&mut problem, &Config::default(), |event: &Event<'_>| {
        seen.push(event.iteration);
        (event.iteration == 2).then_some(Action::StopEarly)
    })
    .expect("should stop");

    assert_eq!(solution.status, ReturnStatus::UserRequestedStop);
    assert_eq!(solution.iterations, 2);
    assert_eq!(seen, vec![0, 1, 2]);
    assert_eq!(
        problem.finalized.map(|(status, _)| status),
        Some(ReturnStatus::UserRequestedStop)
    );
}

#[test]
fn objective_decreases_along_iterations() {
    let mut problem = Fixture {
        weights: [1.0, 50.0],
        cap: 10.0,
        ..Fixture::default()
    };
    let mut objectives = Vec::new();

    solve(&mut problem, &Config::default(), |event: &Event<'_>| {
        objectives.push(event.objective);
        None
    })
    .expect("should solve");

    assert!(objectives.len() > 1);
    assert!(objectives.last() < objectives.first());
}

#[test]
fn callback_errors_abort() {
    let mut problem = Fixture {
        fail_objective: true,
        ..Fixture::default()
    };

    let error = solve_unobserved(&mut problem, &Config::default()).expect_err("should fail");

    assert!(matches!(error, Error::Problem(_)));
    assert!(problem.finalized.is_none());
}
