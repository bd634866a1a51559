use std::{
    fmt::Debug,
    ops::{Add, Div, Mul, Neg, Sub},
};

/// Threshold below which [`locate_segment`] uses a linear scan.
///
/// Shorter breakpoint tables are scanned front to back; longer ones use
/// binary search.
const LINEAR_SEARCH_THRESHOLD: usize = 32;

/// Numeric capability shared by plain values and tape-recording variables.
///
/// Model code written against `Scalar` runs unchanged on `f64` (for value
/// queries) and on a recording variable (to build a differentiation tape).
/// Mixed arithmetic with `f64` literals is supported on the right-hand side;
/// use [`Scalar::constant`] to place a literal on the left.
///
/// Implementations must not branch on values in a way that a replay of the
/// recorded computation could not reproduce. The two value-dependent
/// operations, [`Scalar::capped_exp`] and [`Scalar::step_lookup`], are
/// therefore primitives rather than compositions of comparisons.
pub trait Scalar:
    Copy
    + Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
{
    /// Lifts a plain value into this scalar type.
    fn constant(value: f64) -> Self;

    /// Returns the current numeric value.
    fn value(&self) -> f64;

    /// Returns `exp(min(self, cap))`.
    ///
    /// The result is finite for every finite argument. Beyond `cap` the
    /// derivative is zero.
    #[must_use]
    fn capped_exp(self, cap: f64) -> Self;

    /// Returns the value of the segment that contains `time`.
    ///
    /// `breakpoints` must hold one more entry than `values`; segment `j`
    /// covers the half-open interval `[breakpoints[j], breakpoints[j + 1])`.
    /// Returns `None` if `time` lies outside every segment or the table
    /// lengths do not match.
    fn step_lookup(time: f64, breakpoints: &[Self], values: &[Self]) -> Option<Self>;

    /// Returns `true` if the current value is neither infinite nor `NaN`.
    fn is_finite(&self) -> bool {
        self.value().is_finite()
    }
}

impl Scalar for f64 {
    #[inline]
    fn constant(value: f64) -> Self {
        value
    }

    #[inline]
    fn value(&self) -> f64 {
        *self
    }

    #[inline]
    fn capped_exp(self, cap: f64) -> Self {
        // `f64::min` would absorb NaN into the cap.
        if self > cap { cap.exp() } else { self.exp() }
    }

    fn step_lookup(time: f64, breakpoints: &[Self], values: &[Self]) -> Option<Self> {
        if breakpoints.len() != values.len() + 1 {
            return None;
        }
        locate_segment(time, breakpoints.len(), |i| breakpoints[i]).map(|j| values[j])
    }
}

/// Returns the index `j` such that `breakpoint(j) <= time < breakpoint(j + 1)`.
///
/// `len` is the number of breakpoints, which must be sorted in increasing
/// order. Returns `None` when `time` precedes the first breakpoint, is at or
/// past the last one, or is `NaN`.
///
/// # Examples
///
/// ```
/// use switchtime_core::locate_segment;
///
/// let breakpoints = [-60.0, 60.0, 120.0];
/// let at = |t| locate_segment(t, breakpoints.len(), |i| breakpoints[i]);
///
/// assert_eq!(at(-61.0), None);
/// assert_eq!(at(0.0), Some(0));
/// assert_eq!(at(60.0), Some(1));
/// assert_eq!(at(120.0), None);
/// ```
pub fn locate_segment<F>(time: f64, len: usize, breakpoint: F) -> Option<usize>
where
    F: Fn(usize) -> f64,
{
    if len < 2 || time.is_nan() {
        return None;
    }

    // Number of breakpoints at or before `time`.
    let count = if len < LINEAR_SEARCH_THRESHOLD {
        (0..len).take_while(|&i| breakpoint(i) <= time).count()
    } else {
        let (mut lo, mut hi) = (0, len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if breakpoint(mid) <= time {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    };

    (1..len).contains(&count).then(|| count - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn capped_exp_saturates() {
        assert_relative_eq!(1.0_f64.capped_exp(50.0), 1.0_f64.exp());
        assert_relative_eq!(1e6_f64.capped_exp(50.0), 50.0_f64.exp());
        assert!(f64::MAX.capped_exp(50.0).is_finite());
        assert_eq!(f64::NEG_INFINITY.capped_exp(50.0), 0.0);
        assert!(f64::NAN.capped_exp(50.0).is_nan());
    }

    #[test]
    fn step_lookup_selects_segment() {
        let breakpoints = [0.0, 10.0, 20.0, 30.0];
        let values = [1.0, 2.0, 3.0];

        assert_eq!(f64::step_lookup(-0.1, &breakpoints, &values), None);
        assert_eq!(f64::step_lookup(0.0, &breakpoints, &values), Some(1.0));
        assert_eq!(f64::step_lookup(19.9, &breakpoints, &values), Some(2.0));
        assert_eq!(f64::step_lookup(20.0, &breakpoints, &values), Some(3.0));
        assert_eq!(f64::step_lookup(30.0, &breakpoints, &values), None);
    }

    #[test]
    fn step_lookup_rejects_mismatched_tables() {
        assert_eq!(f64::step_lookup(1.0, &[0.0, 10.0], &[1.0, 2.0]), None);
    }

    #[test]
    fn locate_segment_agrees_across_search_strategies() {
        let short: Vec<f64> = (0..10).map(f64::from).collect();
        let long: Vec<f64> = (0..100).map(f64::from).collect();

        for t in [0.0, 0.5, 3.0, 8.99] {
            let a = locate_segment(t, short.len(), |i| short[i]);
            let b = locate_segment(t, long.len(), |i| long[i]);
            assert_eq!(a, b);
        }
        assert_eq!(locate_segment(98.5, long.len(), |i| long[i]), Some(98));
        assert_eq!(locate_segment(99.0, long.len(), |i| long[i]), None);
        assert_eq!(locate_segment(f64::NAN, long.len(), |i| long[i]), None);
    }
}
