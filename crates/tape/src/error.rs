use thiserror::Error;

/// Errors that can occur when replaying a [`Tape`](crate::Tape).
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum TapeError {
    #[error("expected {expected} inputs, got {found}")]
    InputSize { expected: usize, found: usize },

    #[error("expected {expected} dynamic parameters, got {found}")]
    DynamicSize { expected: usize, found: usize },

    #[error("time {time} is outside the lookup table")]
    LookupOutOfRange { time: f64 },

    #[error("gradient requires a single output, tape has {0}")]
    NotScalar(usize),

    #[error("tape evaluation produced a non-finite value")]
    NonFinite,
}

/// Errors that can occur when recording a [`Tape`](crate::Tape).
#[derive(Debug, Error)]
pub enum RecordError<E> {
    /// The recorded computation failed.
    #[error("recorded computation failed")]
    Model(#[source] E),

    /// The recorded computation returned no outputs.
    #[error("recorded computation returned no outputs")]
    NoOutputs,
}
