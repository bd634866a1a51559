//! The switched plant: its dynamics and its end-point cost.
//!
//! The state is
//!
//! | index | quantity |
//! |---|---|
//! | 0 | substrate level |
//! | 1 | product level |
//! | 2 | accumulated energy cost |
//! | 3 | accumulated quality penalty |
//!
//! The plant is on while the smooth regime indicator
//!
//! ```text
//! u(t) = Σ_k σ(a_on (t - on_k)) σ(a_off (off_k - t))
//! ```
//!
//! is close to one. While on, it converts substrate to product and pays the
//! day-ahead price (plus energy tax on positive prices) for its power draw.
//! While off, product decays. Both levels are penalized throughout.

use switchtime_core::{Dynamics, Scalar};
use thiserror::Error;

use crate::{
    params::{ConstantParameters, split_switches},
    smooth::sigmoid,
};

/// Number of state variables.
pub const STATE_DIMENSION: usize = 4;

/// Errors that can occur when evaluating the plant.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum PlantError {
    #[error("no price is defined at time {time}")]
    PriceUndefined { time: f64 },

    #[error("dynamic parameters of length {0} do not split into prices and breakpoints")]
    DynamicLayout(usize),

    #[error("decision vector of length {0} does not split into on and off times")]
    DecisionLayout(usize),
}

/// The plant's right-hand side for one set of switch times and prices.
///
/// Generic over the scalar type so the same model runs on plain values and
/// on tape-recording variables.
#[derive(Debug, Clone, Copy)]
pub struct Plant<'a, S> {
    constants: &'a ConstantParameters,
    prices: &'a [S],
    breakpoints: &'a [S],
    on: &'a [S],
    off: &'a [S],
}

impl<'a, S: Scalar> Plant<'a, S> {
    /// Creates the plant from concatenated price data and a decision vector.
    ///
    /// `dynamic` holds `m` prices followed by `m + 1` breakpoints, and
    /// `decision` holds `n` on-times followed by `n` off-times.
    ///
    /// # Errors
    ///
    /// Returns an error if either slice has a length that does not split
    /// into its two segments.
    pub fn new(
        constants: &'a ConstantParameters,
        dynamic: &'a [S],
        decision: &'a [S],
    ) -> Result<Self, PlantError> {
        if dynamic.len() % 2 == 0 {
            return Err(PlantError::DynamicLayout(dynamic.len()));
        }
        if decision.is_empty() || decision.len() % 2 != 0 {
            return Err(PlantError::DecisionLayout(decision.len()));
        }

        let (prices, breakpoints) = dynamic.split_at(dynamic.len() / 2);
        let (on, off) = split_switches(decision);
        Ok(Self {
            constants,
            prices,
            breakpoints,
            on,
            off,
        })
    }

    /// Returns the smooth regime indicator at `time`.
    pub fn regime(&self, time: f64) -> S {
        let a_on = self.constants.on_sharpness();
        let a_off = self.constants.off_sharpness();

        self.on
            .iter()
            .zip(self.off)
            .fold(S::constant(0.0), |u, (&on, &off)| {
                u + sigmoid((on - time) * -a_on) * sigmoid((off - time) * a_off)
            })
    }

    /// Returns the day-ahead price at `time`.
    ///
    /// # Errors
    ///
    /// Returns an error if `time` lies outside the breakpoints.
    pub fn price(&self, time: f64) -> Result<S, PlantError> {
        S::step_lookup(time, self.breakpoints, self.prices)
            .ok_or(PlantError::PriceUndefined { time })
    }
}

impl<S: Scalar> Dynamics<S> for Plant<'_, S> {
    type Error = PlantError;

    fn dimension(&self) -> usize {
        STATE_DIMENSION
    }

    fn derivative(&self, time: f64, state: &[S], derivative: &mut [S]) -> Result<(), Self::Error> {
        let p = self.constants;
        let u = self.regime(time);
        let off = S::constant(1.0) - u;

        // Energy tax applies to positive prices only.
        let price = self.price(time)?;
        let price = price + sigmoid(price * p.price_sharpness()) * p.energy_tax();

        let (substrate, product) = (state[0], state[1]);
        let uptake =
            substrate * (p.rate_scale() * p.max_uptake()) / (substrate + p.half_saturation());

        derivative[0] =
            (S::constant(p.inflow_concentration()) - substrate) * p.inflow_rate() - u * uptake;
        derivative[1] = u * uptake - off * product * (p.rate_scale() * p.decay_rate());
        derivative[2] = u * price * (p.power() / 60.0);
        derivative[3] = (substrate * substrate + product * product) * p.rate_scale();
        Ok(())
    }
}

/// Mayer cost of a terminal state: energy cost with value-added tax, plus
/// the quality penalty.
pub fn end_point_cost<S: Scalar>(terminal: &[S], constants: &ConstantParameters) -> S {
    terminal[2] * (1.0 + constants.value_added_tax()) + terminal[3]
}
