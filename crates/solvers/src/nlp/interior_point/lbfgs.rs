use std::collections::VecDeque;

use super::linalg::dot;

/// Relative curvature below which a correction pair is skipped.
const MIN_CURVATURE: f64 = 1e-12;

/// Limited-memory BFGS approximation of the objective Hessian.
pub(super) struct Lbfgs {
    memory: usize,
    pairs: VecDeque<Pair>,
}

struct Pair {
    s: Vec<f64>,
    y: Vec<f64>,
}

impl Lbfgs {
    pub(super) fn new(memory: usize) -> Self {
        Self {
            memory,
            pairs: VecDeque::with_capacity(memory),
        }
    }

    /// Stores the step `s` and gradient change `y`, skipping pairs without
    /// positive curvature. Returns `true` if the pair was kept.
    pub(super) fn update(&mut self, s: Vec<f64>, y: Vec<f64>) -> bool {
        let sy = dot(&s, &y);
        let floor = MIN_CURVATURE * dot(&s, &s).sqrt() * dot(&y, &y).sqrt();
        if !sy.is_finite() || sy <= floor || sy <= 0.0 {
            return false;
        }

        if self.pairs.len() == self.memory {
            self.pairs.pop_front();
        }
        self.pairs.push_back(Pair { s, y });
        true
    }

    pub(super) fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub(super) fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Returns the dense `n × n` approximation, row-major.
    ///
    /// Starts from `σ I` with `σ = yᵀy / sᵀy` of the newest pair (1 without
    /// pairs) and applies the stored BFGS updates oldest first.
    pub(super) fn dense(&self, n: usize) -> Vec<f64> {
        let sigma = self
            .pairs
            .back()
            .map_or(1.0, |pair| dot(&pair.y, &pair.y) / dot(&pair.s, &pair.y));

        let mut b = vec![0.0; n * n];
        for i in 0..n {
            b[i * n + i] = sigma;
        }

        let mut bs = vec![0.0; n];
        for Pair { s, y } in &self.pairs {
            for (i, out) in bs.iter_mut().enumerate() {
                *out = dot(&b[i * n..(i + 1) * n], s);
            }
            let sbs = dot(s, &bs);
            let sy = dot(s, y);
            if sbs <= 0.0 {
                continue;
            }
            for i in 0..n {
                for j in 0..n {
                    b[i * n + j] += y[i] * y[j] / sy - bs[i] * bs[j] / sbs;
                }
            }
        }
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn recovers_quadratic_curvature() {
        // f = x0² + 5 x1², so y = diag(2, 10) s.
        let mut lbfgs = Lbfgs::new(4);
        assert!(lbfgs.update(vec![1.0, 0.0], vec![2.0, 0.0]));
        assert!(lbfgs.update(vec![0.0, 1.0], vec![0.0, 10.0]));

        let b = lbfgs.dense(2);
        assert_relative_eq!(b[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(b[3], 10.0, epsilon = 1e-12);
        assert_relative_eq!(b[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn skips_negative_curvature_and_forgets_old_pairs() {
        let mut lbfgs = Lbfgs::new(1);
        assert!(!lbfgs.update(vec![1.0], vec![-1.0]));
        assert_eq!(lbfgs.dense(1), vec![1.0]);

        assert!(lbfgs.update(vec![1.0], vec![3.0]));
        assert!(lbfgs.update(vec![1.0], vec![4.0]));
        assert_relative_eq!(lbfgs.dense(1)[0], 4.0);

        lbfgs.clear();
        assert_eq!(lbfgs.dense(1), vec![1.0]);
    }
}
