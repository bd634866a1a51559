//! Overflow-free smooth gates.

use switchtime_core::Scalar;

/// Exponent cap of every gate.
///
/// Large enough that `2 σ(z) - 1` rounds to exactly `±1` in `f64` once the
/// cap is reached, small enough that `exp(CAP)` is far from overflow.
pub const CAP: f64 = 50.0;

/// Capped exponential, `exp(min(x, cap))`.
#[inline]
pub fn cexp<S: Scalar>(x: S, cap: f64) -> S {
    x.capped_exp(cap)
}

/// Logistic gate `1 / (1 + cexp(-z, CAP))`.
///
/// Finite for every finite `z`, and never exactly zero.
#[inline]
pub fn sigmoid<S: Scalar>(z: S) -> S {
    S::constant(1.0) / (cexp(-z, CAP) + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn sigmoid_is_centered() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        assert_relative_eq!(sigmoid(2.0) + sigmoid(-2.0), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn extreme_arguments_saturate_exactly() {
        for z in [60.0, 1e6, f64::MAX] {
            assert_eq!(2.0 * sigmoid(z) - 1.0, 1.0);
            assert_eq!(2.0 * sigmoid(-z) - 1.0, -1.0);
            assert!(sigmoid(-z) > 0.0);
        }
    }

    #[test]
    fn cexp_caps_the_exponent() {
        assert_relative_eq!(cexp(1.0, CAP), 1.0_f64.exp());
        assert_eq!(cexp(1e300, CAP), CAP.exp());
        assert!(cexp(f64::MAX, CAP).is_finite());
    }
}
