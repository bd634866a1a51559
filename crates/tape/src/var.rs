use std::{
    fmt,
    ops::{Add, Div, Mul, Neg, Sub},
};

use switchtime_core::{Scalar, locate_segment};

use crate::{
    op::{LookupTable, NodeId, Op},
    recorder::Recorder,
};

/// A scalar that records the operations applied to it.
///
/// Variables handed out by [`Tape::record`](crate::Tape::record) are
/// *active*: every operation involving them appends a node to the recording.
/// Variables built with [`Scalar::constant`] are *passive* plain values;
/// operations between passive variables are computed directly and leave no
/// trace, and a passive operand of an active operation is baked into the
/// recorded node as a literal.
#[derive(Clone, Copy)]
pub struct Var<'r> {
    value: f64,
    slot: Option<(&'r Recorder, NodeId)>,
}

impl<'r> Var<'r> {
    pub(crate) fn active(value: f64, recorder: &'r Recorder, node: NodeId) -> Self {
        Self {
            value,
            slot: Some((recorder, node)),
        }
    }

    fn passive(value: f64) -> Self {
        Self { value, slot: None }
    }

    pub(crate) fn node(&self) -> Option<NodeId> {
        self.slot.map(|(_, node)| node)
    }

    pub(crate) fn value_f64(&self) -> f64 {
        self.value
    }

    /// Returns `true` if operations on this variable are recorded.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slot.is_some()
    }

    fn recorder(&self) -> Option<&'r Recorder> {
        self.slot.map(|(recorder, _)| recorder)
    }

    fn binary(
        self,
        rhs: Self,
        value: f64,
        both: fn(NodeId, NodeId) -> Op,
        left: fn(NodeId, f64) -> Op,
        right: fn(f64, NodeId) -> Op,
    ) -> Self {
        match (self.slot, rhs.slot) {
            (None, None) => Self::passive(value),
            (Some((recorder, a)), None) => recorder.record(value, left(a, rhs.value)),
            (None, Some((recorder, b))) => recorder.record(value, right(self.value, b)),
            (Some((recorder, a)), Some((other, b))) => {
                debug_assert!(
                    std::ptr::eq(recorder, other),
                    "variables from different recordings"
                );
                recorder.record(value, both(a, b))
            }
        }
    }
}

impl fmt::Debug for Var<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Var")
            .field("value", &self.value)
            .field("node", &self.node())
            .finish()
    }
}

impl Add for Var<'_> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.binary(
            rhs,
            self.value + rhs.value,
            Op::Add,
            Op::AddConst,
            |c, b| Op::AddConst(b, c),
        )
    }
}

impl Sub for Var<'_> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        // `a - c` and `a + (-c)` round identically.
        self.binary(
            rhs,
            self.value - rhs.value,
            Op::Sub,
            |a, c| Op::AddConst(a, -c),
            Op::ConstSub,
        )
    }
}

impl Mul for Var<'_> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.binary(
            rhs,
            self.value * rhs.value,
            Op::Mul,
            Op::MulConst,
            |c, b| Op::MulConst(b, c),
        )
    }
}

impl Div for Var<'_> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        self.binary(
            rhs,
            self.value / rhs.value,
            Op::Div,
            Op::DivConst,
            Op::ConstDiv,
        )
    }
}

impl Neg for Var<'_> {
    type Output = Self;

    fn neg(self) -> Self {
        match self.slot {
            None => Self::passive(-self.value),
            Some((recorder, a)) => recorder.record(-self.value, Op::Neg(a)),
        }
    }
}

impl Add<f64> for Var<'_> {
    type Output = Self;

    fn add(self, rhs: f64) -> Self {
        self + Self::passive(rhs)
    }
}

impl Sub<f64> for Var<'_> {
    type Output = Self;

    fn sub(self, rhs: f64) -> Self {
        self - Self::passive(rhs)
    }
}

impl Mul<f64> for Var<'_> {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        self * Self::passive(rhs)
    }
}

impl Div<f64> for Var<'_> {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        self / Self::passive(rhs)
    }
}

impl Scalar for Var<'_> {
    fn constant(value: f64) -> Self {
        Self::passive(value)
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn capped_exp(self, cap: f64) -> Self {
        let value = self.value.capped_exp(cap);
        match self.slot {
            None => Self::passive(value),
            Some((recorder, a)) => recorder.record(value, Op::CappedExp(a, cap)),
        }
    }

    fn step_lookup(time: f64, breakpoints: &[Self], values: &[Self]) -> Option<Self> {
        if breakpoints.len() != values.len() + 1 {
            return None;
        }
        let segment = locate_segment(time, breakpoints.len(), |i| breakpoints[i].value)?;
        let value = values[segment].value;

        let Some(recorder) = breakpoints.iter().chain(values).find_map(Var::recorder) else {
            return Some(Self::passive(value));
        };

        // The segment is chosen again on every replay, so the table keeps
        // all breakpoints rather than the one selected now.
        let table = recorder.table(LookupTable {
            breakpoints: breakpoints.iter().map(|v| recorder.node_of(*v)).collect(),
            values: values.iter().map(|v| recorder.node_of(*v)).collect(),
        });
        Some(recorder.record(value, Op::Lookup { table, time }))
    }
}
