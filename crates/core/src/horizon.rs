use thiserror::Error;

/// A fixed integration horizon `[t0, tf]` with constant step size `dt`.
///
/// The horizon is stepped the way a constant-step integration loop does:
/// only full steps are taken, and step `k` starts at `t0 + k * dt`. If
/// `tf - t0` is not a multiple of `dt`, the last step ends before `tf`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Horizon {
    t0: f64,
    tf: f64,
    dt: f64,
}

/// Errors that can occur when validating a [`Horizon`].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum HorizonError {
    #[error("horizon times must be finite: t0 = {t0}, tf = {tf}")]
    NonFinite { t0: f64, tf: f64 },

    #[error("end time {tf} must be after start time {t0}")]
    Empty { t0: f64, tf: f64 },

    #[error("step size must be finite and positive, got {0}")]
    Step(f64),
}

/// Slack allowed when deciding whether a final step still fits.
const STEP_FIT_EPSILON: f64 = f64::EPSILON;

impl Horizon {
    /// Creates a validated horizon.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is non-finite, if `tf <= t0`, or if
    /// `dt <= 0`.
    pub fn new(t0: f64, tf: f64, dt: f64) -> Result<Self, HorizonError> {
        if !t0.is_finite() || !tf.is_finite() {
            return Err(HorizonError::NonFinite { t0, tf });
        }
        if tf <= t0 {
            return Err(HorizonError::Empty { t0, tf });
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Err(HorizonError::Step(dt));
        }

        Ok(Self { t0, tf, dt })
    }

    /// Returns the start time.
    #[must_use]
    pub fn t0(&self) -> f64 {
        self.t0
    }

    /// Returns the end time.
    #[must_use]
    pub fn tf(&self) -> f64 {
        self.tf
    }

    /// Returns the step size.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Returns the number of full steps that fit in the horizon.
    ///
    /// A step fits if it ends no later than `tf` (up to machine epsilon).
    /// The count saturates at `usize::MAX`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn steps(&self) -> usize {
        let fits = |k: usize| self.time_at(k) - self.tf <= STEP_FIT_EPSILON;

        let mut steps = ((self.tf - self.t0) / self.dt).floor() as usize;
        while steps > 0 && !fits(steps) {
            steps -= 1;
        }
        while steps.checked_add(1).is_some_and(fits) {
            steps += 1;
        }
        steps
    }

    /// Returns the time at the start of step `step`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn time_at(&self, step: usize) -> f64 {
        self.t0 + step as f64 * self.dt
    }
}
