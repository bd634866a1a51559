use std::error::Error as StdError;

/// Errors that can occur during Dormand–Prince integration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("dynamics error: {0}")]
    Dynamics(#[source] Box<dyn StdError + Send + Sync>),

    #[error("initial state has {found} entries, dynamics expect {expected}")]
    Dimension { expected: usize, found: usize },

    #[error("state became non-finite at step {step} (t = {time})")]
    NonFinite { step: usize, time: f64 },
}

impl Error {
    pub(crate) fn dynamics<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::Dynamics(Box::new(err))
    }
}
