//! Parameter sets of the switching problem.
//!
//! - [`ConstantParameters`] — model, tax, and sigmoid constants baked into the
//!   recorded tape as literals
//! - [`DynamicParameters`] — a piecewise-constant price curve, stored as
//!   prices followed by their breakpoints
//! - [`DurationBounds`] — minimum and maximum length of an on or off period

use switchtime_core::Horizon;
use thiserror::Error;

/// Errors that can occur when validating problem parameters.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ParameterError {
    #[error("expected {expected} constant parameters, got {found}")]
    ConstantCount { expected: usize, found: usize },

    #[error("constant parameter {index} is not finite")]
    NonFiniteConstant { index: usize },

    #[error("{breakpoints} breakpoints cannot delimit {prices} price segments")]
    SegmentCount { prices: usize, breakpoints: usize },

    #[error("dynamic parameter {index} is not finite")]
    NonFiniteDynamic { index: usize },

    #[error("breakpoints must be strictly increasing (at index {index})")]
    Unordered { index: usize },

    #[error("duration bounds must be finite with min < max, got [{min}, {max}]")]
    Duration { min: f64, max: f64 },
}

/// Model, tax, and sigmoid constants of the plant.
///
/// | index | constant | default |
/// |---|---|---|
/// | 0 | inflow rate | 0.00067 |
/// | 1 | inflow concentration | 36.9 |
/// | 2 | rate scale | 0.073 |
/// | 3 | decay rate | 0.1 |
/// | 4 | maximum uptake | 2.0 |
/// | 5 | half-saturation level | 0.3 |
/// | 6 | power draw | 7.84 |
/// | 7 | energy tax | 0.5 |
/// | 8 | value-added tax | 0.0 |
/// | 9 | price sigmoid sharpness | 1.0 |
/// | 10 | switch-on sigmoid sharpness | 1.0 |
/// | 11 | switch-off sigmoid sharpness | 1.0 |
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstantParameters {
    values: [f64; ConstantParameters::LEN],
}

impl Default for ConstantParameters {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new([
            0.00067, 36.9, 0.073, 0.1, 2.00, 0.300, 7.84, 0.5, 0.0, 1.0, 1.0, 1.0,
        ])
        .unwrap()
    }
}

impl ConstantParameters {
    /// Number of constants.
    pub const LEN: usize = 12;

    /// Creates a validated constant set.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is not finite.
    pub fn new(values: [f64; Self::LEN]) -> Result<Self, ParameterError> {
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ParameterError::NonFiniteConstant { index });
        }
        Ok(Self { values })
    }

    /// Creates a validated constant set from a slice.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` does not hold exactly [`Self::LEN`]
    /// entries or any value is not finite.
    pub fn from_slice(values: &[f64]) -> Result<Self, ParameterError> {
        let values = values
            .try_into()
            .map_err(|_| ParameterError::ConstantCount {
                expected: Self::LEN,
                found: values.len(),
            })?;
        Self::new(values)
    }

    /// Returns the constants in index order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn inflow_rate(&self) -> f64 {
        self.values[0]
    }

    #[must_use]
    pub fn inflow_concentration(&self) -> f64 {
        self.values[1]
    }

    #[must_use]
    pub fn rate_scale(&self) -> f64 {
        self.values[2]
    }

    #[must_use]
    pub fn decay_rate(&self) -> f64 {
        self.values[3]
    }

    #[must_use]
    pub fn max_uptake(&self) -> f64 {
        self.values[4]
    }

    #[must_use]
    pub fn half_saturation(&self) -> f64 {
        self.values[5]
    }

    #[must_use]
    pub fn power(&self) -> f64 {
        self.values[6]
    }

    #[must_use]
    pub fn energy_tax(&self) -> f64 {
        self.values[7]
    }

    #[must_use]
    pub fn value_added_tax(&self) -> f64 {
        self.values[8]
    }

    #[must_use]
    pub fn price_sharpness(&self) -> f64 {
        self.values[9]
    }

    #[must_use]
    pub fn on_sharpness(&self) -> f64 {
        self.values[10]
    }

    #[must_use]
    pub fn off_sharpness(&self) -> f64 {
        self.values[11]
    }
}

/// A piecewise-constant price curve.
///
/// Stored as one vector: `m` prices followed by `m + 1` strictly increasing
/// breakpoints. Price `j` applies on `[breakpoints[j], breakpoints[j + 1])`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DynamicParameters {
    values: Vec<f64>,
}

impl Default for DynamicParameters {
    /// 48 hourly prices of 10, with the outer breakpoints padded by an hour.
    fn default() -> Self {
        let prices = vec![10.0; 48];
        let mut breakpoints: Vec<f64> = (0..49u32).map(|k| f64::from(k) * 60.0).collect();
        breakpoints[0] -= 60.0;
        breakpoints[48] += 60.0;

        // Known-good values, unwrap is safe
        Self::new(&prices, &breakpoints).unwrap()
    }
}

impl DynamicParameters {
    /// Creates a validated price curve from prices and their breakpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if there is not exactly one more breakpoint than
    /// there are prices, if any value is not finite, or if the breakpoints
    /// are not strictly increasing.
    pub fn new(prices: &[f64], breakpoints: &[f64]) -> Result<Self, ParameterError> {
        if prices.is_empty() || breakpoints.len() != prices.len() + 1 {
            return Err(ParameterError::SegmentCount {
                prices: prices.len(),
                breakpoints: breakpoints.len(),
            });
        }

        let values: Vec<f64> = prices.iter().chain(breakpoints).copied().collect();
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ParameterError::NonFiniteDynamic { index });
        }
        if let Some(index) = breakpoints.windows(2).position(|w| w[0] >= w[1]) {
            return Err(ParameterError::Unordered { index: index + 1 });
        }

        Ok(Self { values })
    }

    /// Creates a validated price curve from the concatenated layout.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` has even length (so it cannot split into
    /// `m` prices and `m + 1` breakpoints) or fails the checks of [`Self::new`].
    pub fn from_concatenated(values: &[f64]) -> Result<Self, ParameterError> {
        if values.len() % 2 == 0 {
            return Err(ParameterError::SegmentCount {
                prices: values.len() / 2,
                breakpoints: values.len() / 2,
            });
        }
        let (prices, breakpoints) = values.split_at(values.len() / 2);
        Self::new(prices, breakpoints)
    }

    /// Number of price segments.
    #[must_use]
    pub fn segments(&self) -> usize {
        self.values.len() / 2
    }

    #[must_use]
    pub fn prices(&self) -> &[f64] {
        &self.values[..self.segments()]
    }

    #[must_use]
    pub fn breakpoints(&self) -> &[f64] {
        &self.values[self.segments()..]
    }

    /// Returns prices followed by breakpoints.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Returns `true` if the curve defines a price at every time the
    /// integrator samples on `horizon`.
    #[must_use]
    pub fn covers(&self, horizon: &Horizon) -> bool {
        let breakpoints = self.breakpoints();
        let end = horizon.time_at(horizon.steps());
        breakpoints[0] <= horizon.t0() && end < breakpoints[breakpoints.len() - 1]
    }
}

/// Minimum and maximum length of an on or off period.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DurationBounds {
    min: f64,
    max: f64,
}

impl DurationBounds {
    /// Creates validated duration bounds.
    ///
    /// # Errors
    ///
    /// Returns an error unless both values are finite and `min < max`.
    pub fn new(min: f64, max: f64) -> Result<Self, ParameterError> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(ParameterError::Duration { min, max });
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Splits a decision vector into its on-time and off-time halves.
///
/// Callers check that `decision` has even length.
pub(crate) fn split_switches<T>(decision: &[T]) -> (&[T], &[T]) {
    decision.split_at(decision.len() / 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_constants_are_named() {
        let constants = ConstantParameters::default();
        assert_eq!(constants.inflow_rate(), 0.00067);
        assert_eq!(constants.power(), 7.84);
        assert_eq!(constants.value_added_tax(), 0.0);
        assert_eq!(constants.off_sharpness(), 1.0);
    }

    #[test]
    fn constants_require_exact_count() {
        assert_eq!(
            ConstantParameters::from_slice(&[1.0; 11]),
            Err(ParameterError::ConstantCount {
                expected: 12,
                found: 11
            })
        );
        let mut values = [1.0; 12];
        values[4] = f64::NAN;
        assert_eq!(
            ConstantParameters::new(values),
            Err(ParameterError::NonFiniteConstant { index: 4 })
        );
    }

    #[test]
    fn default_prices_cover_the_day() {
        let dynamic = DynamicParameters::default();
        assert_eq!(dynamic.segments(), 48);
        assert_eq!(dynamic.as_slice().len(), 97);
        assert_eq!(dynamic.breakpoints()[0], -60.0);
        assert_eq!(dynamic.breakpoints()[1], 60.0);
        assert_eq!(dynamic.breakpoints()[48], 48.0 * 60.0 + 60.0);

        let horizon = Horizon::new(0.0, 360.0, 0.2).expect("valid horizon");
        assert!(dynamic.covers(&horizon));
    }

    #[test]
    fn rejects_malformed_curves() {
        assert_eq!(
            DynamicParameters::new(&[1.0, 2.0], &[0.0, 1.0]),
            Err(ParameterError::SegmentCount {
                prices: 2,
                breakpoints: 2
            })
        );
        assert_eq!(
            DynamicParameters::new(&[1.0, 2.0], &[0.0, 1.0, 1.0]),
            Err(ParameterError::Unordered { index: 2 })
        );
        assert!(DynamicParameters::from_concatenated(&[1.0, 0.0, 1.0, 2.0]).is_err());

        let curve = DynamicParameters::from_concatenated(&[5.0, 0.0, 10.0]).expect("valid curve");
        assert_eq!(curve.prices(), &[5.0]);
        assert_eq!(curve.breakpoints(), &[0.0, 10.0]);
    }

    #[test]
    fn coverage_includes_final_step() {
        let curve = DynamicParameters::new(&[1.0], &[0.0, 10.0]).expect("valid curve");

        let inside = Horizon::new(0.0, 9.0, 1.0).expect("valid horizon");
        let touching = Horizon::new(0.0, 10.0, 1.0).expect("valid horizon");
        let early = Horizon::new(-1.0, 5.0, 1.0).expect("valid horizon");

        assert!(curve.covers(&inside));
        assert!(!curve.covers(&touching));
        assert!(!curve.covers(&early));
    }

    #[test]
    fn duration_bounds_are_ordered() {
        assert!(DurationBounds::new(6.0, 60.0).is_ok());
        assert!(DurationBounds::new(60.0, 6.0).is_err());
        assert!(DurationBounds::new(f64::NAN, 6.0).is_err());
    }
}
