use std::cell::RefCell;

use crate::{
    op::{LookupTable, NodeId, Op},
    var::Var,
};

/// Append-only operation log shared by all [`Var`]s of one recording.
#[derive(Default)]
pub(crate) struct Recorder {
    ops: RefCell<Vec<Op>>,
    tables: RefCell<Vec<LookupTable>>,
}

impl Recorder {
    /// Appends `op` and returns an active variable holding `value`.
    pub(crate) fn record(&self, value: f64, op: Op) -> Var<'_> {
        let mut ops = self.ops.borrow_mut();
        let id = ops.len();
        ops.push(op);
        Var::active(value, self, id)
    }

    /// Returns the node of `var`, recording a literal for passive values.
    pub(crate) fn node_of(&self, var: Var<'_>) -> NodeId {
        match var.node() {
            Some(id) => id,
            None => {
                let mut ops = self.ops.borrow_mut();
                ops.push(Op::Const(var.value_f64()));
                ops.len() - 1
            }
        }
    }

    /// Stores a lookup table, reusing the previous one when identical.
    ///
    /// Consecutive lookups against the same parameter segments are the
    /// common case, so only the most recent table is compared.
    pub(crate) fn table(&self, table: LookupTable) -> usize {
        let mut tables = self.tables.borrow_mut();
        if tables.last() == Some(&table) {
            return tables.len() - 1;
        }
        tables.push(table);
        tables.len() - 1
    }

    /// Consumes the recorder, returning its operations and lookup tables.
    pub(crate) fn into_parts(self) -> (Vec<Op>, Vec<LookupTable>) {
        (self.ops.into_inner(), self.tables.into_inner())
    }
}
