/// Indicates how the solver terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Completed every step of the horizon.
    Complete,

    /// Stopped early due to an observer action.
    StoppedByObserver,
}

/// The result of a Dormand–Prince integration.
#[derive(Debug, Clone)]
pub struct Solution<S> {
    /// How the solver terminated.
    pub status: Status,

    /// State at the end of the last completed step.
    pub state: Vec<S>,

    /// Time at the end of the last completed step.
    pub time: f64,

    /// Number of integration steps completed.
    pub steps: usize,
}
