/// Index of a node on the tape.
pub(crate) type NodeId = usize;

/// A recorded elementary operation.
///
/// Each node produces one value. Operand ids always refer to earlier nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Op {
    /// Independent variable `k`.
    Input(usize),

    /// Refreshable constant `k`.
    Dynamic(usize),

    /// Literal baked in at recording time.
    Const(f64),

    Add(NodeId, NodeId),
    Sub(NodeId, NodeId),
    Mul(NodeId, NodeId),
    Div(NodeId, NodeId),
    Neg(NodeId),

    /// `a + c` (also records `c + a` and `a - (-c)`).
    AddConst(NodeId, f64),

    /// `c - a`.
    ConstSub(f64, NodeId),

    /// `a * c` (also records `c * a`).
    MulConst(NodeId, f64),

    /// `a / c`.
    DivConst(NodeId, f64),

    /// `c / a`.
    ConstDiv(f64, NodeId),

    /// `exp(min(a, cap))`.
    CappedExp(NodeId, f64),

    /// Value of the lookup-table segment containing `time`.
    Lookup { table: usize, time: f64 },
}

/// Breakpoint and value nodes of a recorded step lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LookupTable {
    pub(crate) breakpoints: Vec<NodeId>,
    pub(crate) values: Vec<NodeId>,
}
