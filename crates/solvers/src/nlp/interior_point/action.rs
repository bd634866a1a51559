/// Control actions supported by the interior-point solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the solver and finalize with the current iterate.
    StopEarly,
}
