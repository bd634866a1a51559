use approx::assert_relative_eq;
use finitediff::FiniteDiff;
use switchtime::{DynamicParameters, SwitchingProblem, TapeState};

fn assert_matches_central_differences(problem: &SwitchingProblem, x: &[f64], gradient: &[f64]) {
    let cost = |x: &Vec<f64>| problem.objective_value(x).expect("should evaluate");
    let central = x.to_vec().central_diff(&cost);

    assert_eq!(central.len(), gradient.len());
    for (exact, approximate) in gradient.iter().zip(&central) {
        assert_relative_eq!(*exact, *approximate, epsilon = 1e-3, max_relative = 1e-4);
    }
}

/// A price curve that changes every hour, so switch times see price steps.
fn hourly_prices() -> DynamicParameters {
    let prices: Vec<f64> = (0..8).map(|k| [12.0, 30.0, -5.0, 18.0][k % 4]).collect();
    let breakpoints: Vec<f64> = (0..=8).map(|k| -60.0 + 60.0 * k as f64).collect();
    DynamicParameters::new(&prices, &breakpoints).expect("valid curve")
}

#[test]
fn tape_gradient_matches_finite_differences() {
    let points = [
        vec![0.0, 28.0, 56.0, 7.0, 35.0, 63.0],
        vec![10.0, 100.0, 250.0, 40.0, 150.0, 300.0],
        vec![55.5, 130.2, 299.9, 61.7, 170.0, 310.4],
    ];

    let mut problem = SwitchingProblem::new(points[0].clone());
    problem
        .set_dynamic(hourly_prices())
        .expect("should accept prices");

    for x in &points {
        let gradient = problem.objective_gradient(x).expect("should differentiate");
        assert_matches_central_differences(&problem, x, &gradient);
    }

    // One tape serves every point.
    assert_eq!(problem.cache_stats().retapes, 1);
    assert_eq!(problem.cache_stats().reuses, 2);
}

#[test]
fn repeated_requests_are_bit_identical() {
    let x = vec![20.0, 90.0, 45.0, 130.0];
    let mut problem = SwitchingProblem::new(x.clone());

    let first = problem.objective_gradient(&x).expect("should differentiate");
    for _ in 0..3 {
        let again = problem.objective_gradient(&x).expect("should differentiate");
        assert_eq!(
            first.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            again.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }
    assert_eq!(problem.cache_stats().reuses, 3);
}

#[test]
fn price_updates_refresh_instead_of_retaping() {
    let x = vec![20.0, 90.0, 45.0, 130.0];
    let mut problem = SwitchingProblem::new(x.clone());
    let flat = problem.objective_gradient(&x).expect("should differentiate");

    let curve = problem.dynamic();
    let doubled: Vec<f64> = curve.prices().iter().map(|p| 2.0 * p).collect();
    let dynamic = DynamicParameters::new(&doubled, curve.breakpoints()).expect("valid curve");
    problem.set_dynamic(dynamic).expect("should accept prices");
    assert_eq!(problem.tape_state(), TapeState::NeedsRefresh);

    let dear = problem.objective_gradient(&x).expect("should differentiate");
    let stats = problem.cache_stats();
    assert_eq!((stats.retapes, stats.refreshes), (1, 1));

    // Later off-times run longer at a higher price.
    assert!(dear[2] > flat[2] && dear[3] > flat[3]);
    assert_matches_central_differences(&problem, &x, &dear);

    problem
        .set_initial_state(vec![1.0, 1.0, 0.0, 0.0, 0.0])
        .expect("should accept state");
    assert_eq!(problem.tape_state(), TapeState::NeedsRetape);
}
