use switchtime_core::{FinalSolution, NlpProblem, Observer, ReturnStatus};

use super::{
    Action, Config, Error, Event, Solution,
    lbfgs::Lbfgs,
    linalg::{cholesky_solve, dot, norm_inf},
    problem::{Evaluator, Layout, finite},
};

/// Barrier reduction factor and superlinear exponent.
const MU_LINEAR_DECREASE: f64 = 0.2;
const MU_SUPERLINEAR_POWER: f64 = 1.5;

/// The barrier problem counts as solved once its error is below this
/// multiple of the barrier parameter.
const BARRIER_TOL_FACTOR: f64 = 10.0;

/// Multiplier magnitude above which the stationarity error is scaled down.
const MAX_SCALING: f64 = 100.0;

/// Armijo sufficient-decrease constant.
const ARMIJO: f64 = 1e-4;

/// Smallest step length tried before the line search gives up.
const MIN_STEP_SIZE: f64 = 1e-14;

/// Halvings allowed when moving the starting point inside the constraints.
const MAX_PUSH_HALVINGS: usize = 40;

/// Consecutive acceptable iterates after which the solve stops.
const ACCEPTABLE_ITERS: usize = 15;

/// Current iterate with the problem data evaluated at it.
struct Iterate {
    x: Vec<f64>,
    objective: f64,
    gradient: Vec<f64>,
    g: Vec<f64>,
    jacobian: Vec<f64>,
}

/// Barrier function data at an iterate for a fixed barrier parameter.
struct Barrier {
    /// Objective plus log-barrier terms.
    value: f64,

    /// Gradient of `value`.
    gradient: Vec<f64>,

    /// Constraint multiplier estimates `μ / (g - g_l) - μ / (g_u - g)`.
    lambda: Vec<f64>,

    /// Scaled infinity norm of `gradient`.
    error: f64,
}

/// How one attempt to take a step ended.
enum Step {
    Accepted {
        iterate: Iterate,
        step_size: f64,
        step_norm: f64,
        trials: usize,
    },
    LineSearchFailed {
        step_norm: f64,
    },
    Singular,
}

/// Core primal barrier implementation.
#[allow(clippy::too_many_lines)]
pub(super) fn search<P, Obs>(
    problem: &mut P,
    config: &Config,
    mut observer: Obs,
) -> Result<Solution, Error>
where
    P: NlpProblem,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    let info = problem.info();
    let mut x = vec![0.0; info.variables];
    problem.starting_point(&mut x).map_err(Error::problem)?;

    let Some(layout) = Layout::load(problem, info)? else {
        let g = vec![f64::NAN; info.constraints];
        let status = ReturnStatus::InvalidProblemDefinition;
        return Ok(finish(problem, status, x, f64::NAN, g, 0));
    };

    let mut eval = Evaluator::new(problem);

    let Some(mut current) = start(&mut eval, &layout, config, &x)? else {
        let g = vec![f64::NAN; layout.constraints()];
        let status = ReturnStatus::RestorationFailed;
        return Ok(finish(eval.problem(), status, x, f64::NAN, g, 0));
    };

    if !current.objective.is_finite() || !all_finite(&current.gradient) {
        let status = ReturnStatus::InvalidNumberDetected;
        return Ok(conclude(&mut eval, status, current, 0));
    }

    let mu_min = config.tol() / 10.0;
    let mut mu = config.mu_init().max(mu_min);
    let mut lbfgs = Lbfgs::new(config.lbfgs_memory());
    let mut acceptable_streak = 0;

    let mut iteration = 0;
    let mut last = (0.0, 0.0, 0);

    loop {
        let mut barrier = Barrier::at(&layout, &current, mu);

        // Shrink the barrier parameter while its subproblem is solved.
        while barrier.error <= BARRIER_TOL_FACTOR * mu && mu > mu_min {
            mu = (MU_LINEAR_DECREASE * mu)
                .min(mu.powf(MU_SUPERLINEAR_POWER))
                .max(mu_min);
            barrier = Barrier::at(&layout, &current, mu);
        }

        let (step_norm, step_size, trials) = last;
        let event = Event {
            iteration,
            x: &current.x,
            objective: current.objective,
            dual_infeasibility: barrier.error,
            barrier: mu,
            step_norm,
            step_size,
            line_search_trials: trials,
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            let status = ReturnStatus::UserRequestedStop;
            return Ok(conclude(&mut eval, status, current, iteration));
        }

        let error = barrier.error.max(mu);
        if error <= config.tol() {
            return Ok(conclude(&mut eval, ReturnStatus::Succeeded, current, iteration));
        }

        acceptable_streak = if error <= config.acceptable_tol() {
            acceptable_streak + 1
        } else {
            0
        };
        if acceptable_streak >= ACCEPTABLE_ITERS {
            let status = ReturnStatus::AcceptableLevel;
            return Ok(conclude(&mut eval, status, current, iteration));
        }

        if iteration >= config.max_iters() {
            let status = stalled(error, config, ReturnStatus::MaxIterations);
            return Ok(conclude(&mut eval, status, current, iteration));
        }

        let mut outcome = step(&mut eval, &layout, config, &current, &barrier, &lbfgs, mu)?;
        if matches!(outcome, Step::LineSearchFailed { .. }) && !lbfgs.is_empty() {
            // Retry once along the scaled gradient direction.
            lbfgs.clear();
            outcome = step(&mut eval, &layout, config, &current, &barrier, &lbfgs, mu)?;
        }

        match outcome {
            Step::Accepted {
                iterate,
                step_size,
                step_norm,
                trials,
            } => {
                if !iterate.objective.is_finite() || !all_finite(&iterate.gradient) {
                    let status = ReturnStatus::InvalidNumberDetected;
                    return Ok(conclude(&mut eval, status, iterate, iteration + 1));
                }
                let (s, y) = correction(&layout, &current, &iterate, mu);
                lbfgs.update(s, y);
                current = iterate;
                iteration += 1;
                last = (step_norm, step_size, trials);
            }
            Step::LineSearchFailed { step_norm } => {
                let status = if step_norm <= 10.0 * f64::EPSILON * (1.0 + norm_inf(&current.x)) {
                    ReturnStatus::SearchDirectionTooSmall
                } else {
                    stalled(error, config, ReturnStatus::RestorationFailed)
                };
                return Ok(conclude(&mut eval, status, current, iteration));
            }
            Step::Singular => {
                let status = stalled(error, config, ReturnStatus::ErrorInStepComputation);
                return Ok(conclude(&mut eval, status, current, iteration));
            }
        }
    }
}

/// Reports an acceptable iterate instead of `failure` when possible.
fn stalled(error: f64, config: &Config, failure: ReturnStatus) -> ReturnStatus {
    if error <= config.acceptable_tol() {
        ReturnStatus::AcceptableLevel
    } else {
        failure
    }
}

/// Finishes the solve at `iterate`.
fn conclude<P: NlpProblem>(
    eval: &mut Evaluator<'_, P>,
    status: ReturnStatus,
    iterate: Iterate,
    iterations: usize,
) -> Solution {
    finish(
        eval.problem(),
        status,
        iterate.x,
        iterate.objective,
        iterate.g,
        iterations,
    )
}

/// Hands the final iterate to the problem and builds the solution.
fn finish<P: NlpProblem>(
    problem: &mut P,
    status: ReturnStatus,
    x: Vec<f64>,
    objective: f64,
    constraints: Vec<f64>,
    iterations: usize,
) -> Solution {
    problem.finalize(&FinalSolution {
        status,
        x: &x,
        objective,
        constraints: &constraints,
        iterations,
    });
    Solution {
        status,
        x,
        objective,
        constraints,
        iterations,
    }
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Moves the starting point strictly inside all bounds and evaluates it.
///
/// The point is first clamped into the variable bounds and pushed a relative
/// distance inside them. If the pushed point violates a constraint bound,
/// the push is halved until the constraints hold strictly. Returns `None` if
/// no such point is found.
fn start<P: NlpProblem>(
    eval: &mut Evaluator<'_, P>,
    layout: &Layout,
    config: &Config,
    x0: &[f64],
) -> Result<Option<Iterate>, Error> {
    let push = config.bound_push();

    let clamped: Vec<f64> = x0
        .iter()
        .zip(layout.x_lower.iter().zip(&layout.x_upper))
        .map(|(&x, (&l, &u))| {
            let x = finite(l).map_or(x, |l| x.max(l));
            finite(u).map_or(x, |u| x.min(u))
        })
        .collect();

    let pushed: Vec<f64> = clamped
        .iter()
        .zip(layout.x_lower.iter().zip(&layout.x_upper))
        .map(|(&x, (&l, &u))| {
            let (l, u) = (finite(l), finite(u));
            let span = match (l, u) {
                (Some(l), Some(u)) => u - l,
                _ => f64::INFINITY,
            };
            let gap = |bound: f64| (push * bound.abs().max(1.0)).min(push * span);
            let x = l.map_or(x, |l| x.max(l + gap(l)));
            u.map_or(x, |u| x.min(u - gap(u)))
        })
        .collect();

    let mut g = vec![0.0; layout.constraints()];
    let mut fraction = 1.0;
    for _ in 0..MAX_PUSH_HALVINGS {
        let x: Vec<f64> = clamped
            .iter()
            .zip(&pushed)
            .map(|(&c, &p)| c + fraction * (p - c))
            .collect();

        if layout.inside_variable_bounds(&x) {
            eval.constraints(&x, &mut g)?;
            if layout.inside_constraint_bounds(&g) {
                return evaluate(eval, layout, x, g).map(Some);
            }
        }
        fraction /= 2.0;
    }
    Ok(None)
}

/// Evaluates objective, gradient, and Jacobian at `x` with known constraints `g`.
fn evaluate<P: NlpProblem>(
    eval: &mut Evaluator<'_, P>,
    layout: &Layout,
    x: Vec<f64>,
    g: Vec<f64>,
) -> Result<Iterate, Error> {
    let objective = eval.objective(&x)?;
    complete(eval, layout, x, objective, g)
}

/// Evaluates the derivatives at `x` with known objective and constraints.
fn complete<P: NlpProblem>(
    eval: &mut Evaluator<'_, P>,
    layout: &Layout,
    x: Vec<f64>,
    objective: f64,
    g: Vec<f64>,
) -> Result<Iterate, Error> {
    let mut gradient = vec![0.0; x.len()];
    eval.gradient(&x, &mut gradient)?;
    let mut jacobian = vec![0.0; layout.rows.len()];
    eval.jacobian(&x, &mut jacobian)?;

    Ok(Iterate {
        x,
        objective,
        gradient,
        g,
        jacobian,
    })
}

impl Barrier {
    fn at(layout: &Layout, iterate: &Iterate, mu: f64) -> Self {
        let mut value = iterate.objective;
        let mut gradient = iterate.gradient.clone();
        let mut multipliers = 0.0;
        let mut bounds = 0_u32;

        let mut term = |slack: f64| {
            value -= mu * slack.ln();
            multipliers += mu / slack;
            bounds += 1;
            mu / slack
        };

        for (i, &x) in iterate.x.iter().enumerate() {
            if let Some(l) = finite(layout.x_lower[i]) {
                gradient[i] -= term(x - l);
            }
            if let Some(u) = finite(layout.x_upper[i]) {
                gradient[i] += term(u - x);
            }
        }

        let lambda: Vec<f64> = iterate
            .g
            .iter()
            .enumerate()
            .map(|(j, &g)| {
                let lower = finite(layout.g_lower[j]).map_or(0.0, |l| term(g - l));
                let upper = finite(layout.g_upper[j]).map_or(0.0, |u| term(u - g));
                lower - upper
            })
            .collect();

        let mut jt_lambda = vec![0.0; gradient.len()];
        layout.jacobian_transpose(&iterate.jacobian, &lambda, &mut jt_lambda);
        for (gi, jl) in gradient.iter_mut().zip(&jt_lambda) {
            *gi -= jl;
        }

        let scaling = if bounds == 0 {
            1.0
        } else {
            (multipliers / f64::from(bounds)).max(MAX_SCALING) / MAX_SCALING
        };
        let error = norm_inf(&gradient) / scaling;

        Self {
            value,
            gradient,
            lambda,
            error,
        }
    }
}

/// Computes a search direction and runs the backtracking line search.
fn step<P: NlpProblem>(
    eval: &mut Evaluator<'_, P>,
    layout: &Layout,
    config: &Config,
    current: &Iterate,
    barrier: &Barrier,
    lbfgs: &Lbfgs,
    mu: f64,
) -> Result<Step, Error> {
    let Some(direction) = direction(layout, current, barrier, lbfgs, mu) else {
        return Ok(Step::Singular);
    };
    let step_norm = norm_inf(&direction);
    let slope = dot(&barrier.gradient, &direction);
    if slope.is_nan() || slope >= 0.0 {
        return Ok(Step::LineSearchFailed { step_norm });
    }

    let tau = config.fraction_to_boundary().max(1.0 - mu);
    let mut alpha = max_step(layout, &current.x, &direction, tau);

    let mut trial_g = vec![0.0; layout.constraints()];
    let mut trials = 0;
    while alpha >= MIN_STEP_SIZE {
        trials += 1;
        let x: Vec<f64> = current
            .x
            .iter()
            .zip(&direction)
            .map(|(x, d)| x + alpha * d)
            .collect();

        eval.constraints(&x, &mut trial_g)?;
        if keeps_constraint_slack(layout, &current.g, &trial_g, tau) {
            let objective = eval.objective(&x)?;
            if objective.is_finite() {
                let trial = Iterate {
                    x,
                    objective,
                    gradient: Vec::new(),
                    g: trial_g.clone(),
                    jacobian: Vec::new(),
                };
                let value = Barrier::value_at(layout, &trial, mu);
                let noise = 10.0 * f64::EPSILON * barrier.value.abs();
                if value <= barrier.value + ARMIJO * alpha * slope + noise {
                    let iterate = complete(eval, layout, trial.x, objective, trial.g)?;
                    return Ok(Step::Accepted {
                        iterate,
                        step_size: alpha,
                        step_norm,
                        trials,
                    });
                }
            }
        }
        alpha /= 2.0;
    }

    Ok(Step::LineSearchFailed { step_norm })
}

impl Barrier {
    /// Barrier function value only, for line search trials.
    fn value_at(layout: &Layout, iterate: &Iterate, mu: f64) -> f64 {
        let log_slacks = |values: &[f64], lower: &[f64], upper: &[f64]| -> f64 {
            values
                .iter()
                .zip(lower.iter().zip(upper))
                .map(|(&v, (&l, &u))| {
                    let lower = finite(l).map_or(0.0, |l| (v - l).ln());
                    let upper = finite(u).map_or(0.0, |u| (u - v).ln());
                    lower + upper
                })
                .sum()
        };

        iterate.objective
            - mu * log_slacks(&iterate.x, &layout.x_lower, &layout.x_upper)
            - mu * log_slacks(&iterate.g, &layout.g_lower, &layout.g_upper)
    }
}

/// Solves `(B + Σ) d = -∇φ` with `B` the L-BFGS matrix and `Σ` the exact
/// barrier Hessian, regularizing if the system is not positive definite.
fn direction(
    layout: &Layout,
    current: &Iterate,
    barrier: &Barrier,
    lbfgs: &Lbfgs,
    mu: f64,
) -> Option<Vec<f64>> {
    let n = layout.variables();
    let mut hessian = lbfgs.dense(n);

    for (i, &x) in current.x.iter().enumerate() {
        let lower = finite(layout.x_lower[i]).map_or(0.0, |l| mu / (x - l).powi(2));
        let upper = finite(layout.x_upper[i]).map_or(0.0, |u| mu / (u - x).powi(2));
        hessian[i * n + i] += lower + upper;
    }

    for (j, row) in layout.dense_jacobian(&current.jacobian).iter().enumerate() {
        let g = current.g[j];
        let weight = finite(layout.g_lower[j]).map_or(0.0, |l| mu / (g - l).powi(2))
            + finite(layout.g_upper[j]).map_or(0.0, |u| mu / (u - g).powi(2));
        let nonzeros: Vec<(usize, f64)> = row
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, v)| v != 0.0)
            .collect();
        for &(a, va) in &nonzeros {
            for &(b, vb) in &nonzeros {
                hessian[a * n + b] += weight * va * vb;
            }
        }
    }

    let largest_diagonal = (0..n).fold(0.0_f64, |max, i| max.max(hessian[i * n + i].abs()));
    let mut delta = 0.0;
    while delta <= 1e20 * (1.0 + largest_diagonal) {
        let mut factor = hessian.clone();
        for i in 0..n {
            factor[i * n + i] += delta;
        }
        let mut d: Vec<f64> = barrier.gradient.iter().map(|g| -g).collect();
        if cholesky_solve(&mut factor, &mut d) {
            return Some(d);
        }
        delta = if delta == 0.0 {
            1e-8 * (1.0 + largest_diagonal)
        } else {
            delta * 10.0
        };
    }
    None
}

/// Largest step in `(0, 1]` keeping each variable a fraction `1 - tau` of
/// its distance to the bounds.
fn max_step(layout: &Layout, x: &[f64], d: &[f64], tau: f64) -> f64 {
    let mut alpha: f64 = 1.0;
    for (i, (&xi, &di)) in x.iter().zip(d).enumerate() {
        if di < 0.0 {
            if let Some(l) = finite(layout.x_lower[i]) {
                alpha = alpha.min(tau * (xi - l) / -di);
            }
        } else if di > 0.0 {
            if let Some(u) = finite(layout.x_upper[i]) {
                alpha = alpha.min(tau * (u - xi) / di);
            }
        }
    }
    alpha
}

/// Returns `true` if every constraint keeps at least `1 - tau` of its slack.
fn keeps_constraint_slack(layout: &Layout, current: &[f64], trial: &[f64], tau: f64) -> bool {
    current.iter().zip(trial).enumerate().all(|(j, (&g, &t))| {
        let lower = finite(layout.g_lower[j]).is_none_or(|l| t - l >= (1.0 - tau) * (g - l));
        let upper = finite(layout.g_upper[j]).is_none_or(|u| u - t >= (1.0 - tau) * (u - g));
        t.is_finite() && lower && upper
    })
}

/// Returns the L-BFGS correction pair for the step from `old` to `new`.
///
/// `y` is the change in the Lagrangian gradient `∇f - Jᵀλ` with the
/// multipliers of the new iterate, so the approximation also captures
/// constraint curvature.
fn correction(layout: &Layout, old: &Iterate, new: &Iterate, mu: f64) -> (Vec<f64>, Vec<f64>) {
    let lambda = Barrier::at(layout, new, mu).lambda;

    let mut jt_new = vec![0.0; new.x.len()];
    layout.jacobian_transpose(&new.jacobian, &lambda, &mut jt_new);
    let mut jt_old = vec![0.0; old.x.len()];
    layout.jacobian_transpose(&old.jacobian, &lambda, &mut jt_old);

    let s = new.x.iter().zip(&old.x).map(|(a, b)| a - b).collect();
    let y = (0..new.x.len())
        .map(|i| (new.gradient[i] - jt_new[i]) - (old.gradient[i] - jt_old[i]))
        .collect();
    (s, y)
}
