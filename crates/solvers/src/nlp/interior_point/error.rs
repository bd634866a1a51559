use std::error::Error as StdError;

/// Errors that abort an interior-point solve.
///
/// Numerical failures end the solve with a non-success
/// [`ReturnStatus`](switchtime_core::ReturnStatus) instead; an `Error` means
/// a problem callback itself failed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("problem error: {0}")]
    Problem(#[source] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn problem<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::Problem(Box::new(err))
    }
}
