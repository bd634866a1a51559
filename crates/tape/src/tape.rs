use switchtime_core::{Scalar, locate_segment};

use crate::{
    error::{RecordError, TapeError},
    op::{LookupTable, NodeId, Op},
    recorder::Recorder,
    var::Var,
};

/// A recorded computation that can be replayed and differentiated.
///
/// Created with [`Tape::record`]. Replaying evaluates the recorded
/// operations at a new input point using the tape's current dynamic
/// parameters; literals baked in during recording never change.
#[derive(Debug, Clone)]
pub struct Tape {
    ops: Vec<Op>,
    tables: Vec<LookupTable>,
    outputs: Vec<NodeId>,
    inputs: usize,
    dynamic: Vec<f64>,
    values: Vec<f64>,
    adjoints: Vec<f64>,
}

impl Tape {
    /// Records `f` evaluated at `inputs` with the given dynamic parameters.
    ///
    /// The closure receives one active [`Var`] per input and per dynamic
    /// parameter and returns the outputs of the computation.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Model`] if the closure fails, or
    /// [`RecordError::NoOutputs`] if it returns an empty vector.
    pub fn record<F, E>(inputs: &[f64], dynamic: &[f64], f: F) -> Result<Self, RecordError<E>>
    where
        F: for<'r> FnOnce(&[Var<'r>], &[Var<'r>]) -> Result<Vec<Var<'r>>, E>,
    {
        let recorder = Recorder::default();

        let outputs = {
            let x: Vec<_> = inputs
                .iter()
                .enumerate()
                .map(|(k, &value)| recorder.record(value, Op::Input(k)))
                .collect();
            let p: Vec<_> = dynamic
                .iter()
                .enumerate()
                .map(|(k, &value)| recorder.record(value, Op::Dynamic(k)))
                .collect();

            let outputs = f(&x, &p).map_err(RecordError::Model)?;
            if outputs.is_empty() {
                return Err(RecordError::NoOutputs);
            }
            outputs
                .into_iter()
                .map(|v| recorder.node_of(v))
                .collect::<Vec<_>>()
        };

        let (ops, tables) = recorder.into_parts();
        Ok(Self {
            ops,
            tables,
            outputs,
            inputs: inputs.len(),
            dynamic: dynamic.to_vec(),
            values: Vec::new(),
            adjoints: Vec::new(),
        })
    }

    /// Number of independent variables.
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.inputs
    }

    /// Number of dynamic parameters.
    #[must_use]
    pub fn dynamic_count(&self) -> usize {
        self.dynamic.len()
    }

    /// Number of outputs.
    #[must_use]
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Number of recorded operations.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.ops.len()
    }

    /// Current dynamic parameter values.
    #[must_use]
    pub fn dynamic(&self) -> &[f64] {
        &self.dynamic
    }

    /// Replaces the dynamic parameters in place.
    ///
    /// # Errors
    ///
    /// Returns [`TapeError::DynamicSize`] if `dynamic` has a different length
    /// than the parameters the tape was recorded with.
    pub fn refresh_dynamic(&mut self, dynamic: &[f64]) -> Result<(), TapeError> {
        if dynamic.len() != self.dynamic.len() {
            return Err(TapeError::DynamicSize {
                expected: self.dynamic.len(),
                found: dynamic.len(),
            });
        }
        self.dynamic.copy_from_slice(dynamic);
        Ok(())
    }

    /// Evaluates the outputs at `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has the wrong length, a recorded lookup falls
    /// outside its table, or an output is not finite.
    pub fn forward(&mut self, x: &[f64]) -> Result<Vec<f64>, TapeError> {
        self.sweep_forward(x)?;
        Ok(self.outputs.iter().map(|&id| self.values[id]).collect())
    }

    /// Returns the Jacobian of the outputs at `x`, row-major by output.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has the wrong length, a recorded lookup falls
    /// outside its table, or a value or derivative is not finite.
    pub fn jacobian(&mut self, x: &[f64]) -> Result<Vec<f64>, TapeError> {
        self.sweep_forward(x)?;

        let mut jacobian = vec![0.0; self.outputs.len() * self.inputs];
        for (i, row) in jacobian.chunks_mut(self.inputs.max(1)).enumerate() {
            let output = self.outputs[i];
            self.sweep_reverse(output, row);
        }

        if jacobian.iter().all(|d| d.is_finite()) {
            Ok(jacobian)
        } else {
            Err(TapeError::NonFinite)
        }
    }

    /// Returns the gradient of a single-output tape at `x`.
    ///
    /// # Errors
    ///
    /// Returns [`TapeError::NotScalar`] if the tape has more than one output,
    /// or any error [`Tape::jacobian`] can return.
    pub fn gradient(&mut self, x: &[f64]) -> Result<Vec<f64>, TapeError> {
        if self.outputs.len() != 1 {
            return Err(TapeError::NotScalar(self.outputs.len()));
        }
        self.jacobian(x)
    }

    fn sweep_forward(&mut self, x: &[f64]) -> Result<(), TapeError> {
        if x.len() != self.inputs {
            return Err(TapeError::InputSize {
                expected: self.inputs,
                found: x.len(),
            });
        }

        let Self {
            ops,
            tables,
            dynamic,
            values,
            ..
        } = self;

        values.clear();
        values.reserve(ops.len());

        for op in ops.iter() {
            let value = match *op {
                Op::Input(k) => x[k],
                Op::Dynamic(k) => dynamic[k],
                Op::Const(c) => c,
                Op::Add(a, b) => values[a] + values[b],
                Op::Sub(a, b) => values[a] - values[b],
                Op::Mul(a, b) => values[a] * values[b],
                Op::Div(a, b) => values[a] / values[b],
                Op::Neg(a) => -values[a],
                Op::AddConst(a, c) => values[a] + c,
                Op::ConstSub(c, a) => c - values[a],
                Op::MulConst(a, c) => values[a] * c,
                Op::DivConst(a, c) => values[a] / c,
                Op::ConstDiv(c, a) => c / values[a],
                Op::CappedExp(a, cap) => values[a].capped_exp(cap),
                Op::Lookup { table, time } => {
                    let source = select(&tables[table], time, values)?;
                    values[source]
                }
            };
            values.push(value);
        }

        if self.outputs.iter().all(|&id| self.values[id].is_finite()) {
            Ok(())
        } else {
            Err(TapeError::NonFinite)
        }
    }

    /// Accumulates `d output / d input` into `row`.
    ///
    /// Expects `values` to hold the results of a forward sweep.
    fn sweep_reverse(&mut self, output: NodeId, row: &mut [f64]) {
        let Self {
            ops,
            tables,
            values,
            adjoints,
            ..
        } = self;

        adjoints.clear();
        adjoints.resize(output + 1, 0.0);
        adjoints[output] = 1.0;

        for id in (0..=output).rev() {
            let w = adjoints[id];
            if w == 0.0 {
                continue;
            }
            match ops[id] {
                Op::Input(k) => row[k] += w,
                Op::Dynamic(_) | Op::Const(_) => {}
                Op::Add(a, b) => {
                    adjoints[a] += w;
                    adjoints[b] += w;
                }
                Op::Sub(a, b) => {
                    adjoints[a] += w;
                    adjoints[b] -= w;
                }
                Op::Mul(a, b) => {
                    adjoints[a] += w * values[b];
                    adjoints[b] += w * values[a];
                }
                Op::Div(a, b) => {
                    adjoints[a] += w / values[b];
                    adjoints[b] -= w * values[id] / values[b];
                }
                Op::Neg(a) | Op::ConstSub(_, a) => adjoints[a] -= w,
                Op::AddConst(a, _) => adjoints[a] += w,
                Op::MulConst(a, c) => adjoints[a] += w * c,
                Op::DivConst(a, c) => adjoints[a] += w / c,
                Op::ConstDiv(_, a) => adjoints[a] -= w * values[id] / values[a],
                Op::CappedExp(a, cap) => {
                    // Flat beyond the cap.
                    if values[a] <= cap {
                        adjoints[a] += w * values[id];
                    }
                }
                Op::Lookup { table, time } => {
                    let table = &tables[table];
                    // The forward sweep already validated every lookup.
                    if let Ok(source) = select(table, time, values) {
                        adjoints[source] += w;
                    }
                }
            }
        }
    }
}

/// Returns the value node of the segment of `table` that contains `time`.
fn select(table: &LookupTable, time: f64, values: &[f64]) -> Result<NodeId, TapeError> {
    locate_segment(time, table.breakpoints.len(), |i| values[table.breakpoints[i]])
        .map(|segment| table.values[segment])
        .ok_or(TapeError::LookupOutOfRange { time })
}
