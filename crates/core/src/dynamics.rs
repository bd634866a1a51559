use crate::Scalar;

/// The right-hand side of an ODE system `dx/dt = f(t, x)`.
///
/// A single implementation is generic over the [`Scalar`] type `S`, so the
/// same dynamics can be integrated with plain values or recorded onto a tape.
/// Time is always a plain `f64`; it is never differentiated.
pub trait Dynamics<S: Scalar> {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Number of state variables.
    fn dimension(&self) -> usize;

    /// Writes the state derivative at `time` into `derivative`.
    ///
    /// Both `state` and `derivative` have length [`Dynamics::dimension`].
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the derivative cannot be computed at this
    /// time and state.
    fn derivative(&self, time: f64, state: &[S], derivative: &mut [S]) -> Result<(), Self::Error>;
}
