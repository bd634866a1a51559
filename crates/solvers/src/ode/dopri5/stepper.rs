use switchtime_core::{Dynamics, Scalar};

/// Stage times as fractions of the step.
const C: [f64; 6] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0];

/// Stage coefficients, row `i` weighting the derivatives of stages `0..i`.
const A: [&[f64]; 6] = [
    &[],
    &[1.0 / 5.0],
    &[3.0 / 40.0, 9.0 / 40.0],
    &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
    &[
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
    ],
    &[
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
    ],
];

/// Fifth-order solution weights.
const B: [f64; 6] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];

/// Stage buffers for one system dimension, reused across steps.
pub(super) struct Stepper<S> {
    stages: [Vec<S>; 6],
    scratch: Vec<S>,
}

impl<S: Scalar> Stepper<S> {
    pub(super) fn new(dimension: usize) -> Self {
        let zeros = vec![S::constant(0.0); dimension];
        Self {
            stages: std::array::from_fn(|_| zeros.clone()),
            scratch: zeros,
        }
    }

    /// Advances `state` from `time` to `time + dt` in place.
    pub(super) fn step<D>(
        &mut self,
        dynamics: &D,
        time: f64,
        dt: f64,
        state: &mut [S],
    ) -> Result<(), D::Error>
    where
        D: Dynamics<S>,
    {
        for stage in 0..6 {
            let (done, rest) = self.stages.split_at_mut(stage);
            let derivative = &mut rest[0];

            if stage == 0 {
                dynamics.derivative(time, state, derivative)?;
                continue;
            }

            for (i, slot) in self.scratch.iter_mut().enumerate() {
                *slot = weighted_sum(state[i], dt, A[stage], |j| done[j][i]);
            }
            dynamics.derivative(time + C[stage] * dt, &self.scratch, derivative)?;
        }

        for (i, x) in state.iter_mut().enumerate() {
            *x = weighted_sum(*x, dt, &B, |j| self.stages[j][i]);
        }
        Ok(())
    }
}

/// Returns `base + dt * Σ weights[j] * stage(j)`, skipping zero weights.
fn weighted_sum<S, F>(base: S, dt: f64, weights: &[f64], stage: F) -> S
where
    S: Scalar,
    F: Fn(usize) -> S,
{
    weights
        .iter()
        .enumerate()
        .filter(|&(_, &w)| w != 0.0)
        .fold(base, |acc, (j, &w)| acc + stage(j) * (w * dt))
}
