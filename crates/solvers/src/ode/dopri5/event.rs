/// Event emitted by the Dormand–Prince solver after each step.
///
/// Step 0 is the initial state before any integration.
#[derive(Debug, Clone)]
pub struct Event<S> {
    /// The step number (0 for initial, 1..N for integration steps).
    pub step: usize,

    /// Time at the end of the step.
    pub time: f64,

    /// State at `time`.
    pub state: Vec<S>,
}
