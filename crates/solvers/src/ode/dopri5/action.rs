/// Control actions supported by the Dormand–Prince solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the integration and return the state reached so far.
    StopEarly,
}
