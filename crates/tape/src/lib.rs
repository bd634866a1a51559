//! Operation tapes for reverse-mode differentiation.
//!
//! A [`Tape`] is recorded once by running a computation on [`Var`] values and
//! can then be replayed at new input points to obtain values and exact
//! derivatives, without running the original code again.
//!
//! Recording distinguishes two kinds of tape arguments:
//!
//! - **inputs** — the independent variables derivatives are taken with
//!   respect to
//! - **dynamic parameters** — constants stored on the tape that can be
//!   replaced in place with [`Tape::refresh_dynamic`] without re-recording
//!
//! Plain `f64` values that enter the computation by other means are baked
//! into the tape as literals.
//!
//! # Example
//!
//! ```
//! use switchtime_tape::Tape;
//!
//! // f(x) = p * x0 * x1, with p a dynamic parameter.
//! let mut tape = Tape::record(&[2.0, 3.0], &[10.0], |x, p| {
//!     Ok::<_, std::convert::Infallible>(vec![p[0] * x[0] * x[1]])
//! })
//! .unwrap();
//!
//! assert_eq!(tape.gradient(&[2.0, 3.0]).unwrap(), vec![30.0, 20.0]);
//!
//! tape.refresh_dynamic(&[1.0]).unwrap();
//! assert_eq!(tape.gradient(&[2.0, 3.0]).unwrap(), vec![3.0, 2.0]);
//! ```

mod error;
mod op;
mod recorder;
mod tape;
mod var;

pub use error::{RecordError, TapeError};
pub use tape::Tape;
pub use var::Var;
