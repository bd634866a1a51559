use switchtime_core::{NlpInfo, NlpProblem};

use super::Error;

/// Bounds at or beyond this magnitude are treated as infinite.
const INFINITE_BOUND: f64 = 1e19;

/// Validated bounds and Jacobian structure of a problem.
pub(super) struct Layout {
    pub(super) x_lower: Vec<f64>,
    pub(super) x_upper: Vec<f64>,
    pub(super) g_lower: Vec<f64>,
    pub(super) g_upper: Vec<f64>,
    pub(super) rows: Vec<usize>,
    pub(super) cols: Vec<usize>,
}

impl Layout {
    /// Queries bounds and structure, returning `None` if they are unusable.
    ///
    /// The barrier method needs a nonempty interior, so fixed variables and
    /// equality constraints are rejected along with crossed bounds and
    /// out-of-range structure indices.
    pub(super) fn load<P: NlpProblem>(problem: &P, info: NlpInfo) -> Result<Option<Self>, Error> {
        let NlpInfo {
            variables: n,
            constraints: m,
            jacobian_nonzeros: nnz,
            ..
        } = info;

        let mut layout = Self {
            x_lower: vec![0.0; n],
            x_upper: vec![0.0; n],
            g_lower: vec![0.0; m],
            g_upper: vec![0.0; m],
            rows: vec![0; nnz],
            cols: vec![0; nnz],
        };

        problem
            .bounds(
                &mut layout.x_lower,
                &mut layout.x_upper,
                &mut layout.g_lower,
                &mut layout.g_upper,
            )
            .map_err(Error::problem)?;
        problem
            .jacobian_structure(&mut layout.rows, &mut layout.cols)
            .map_err(Error::problem)?;

        let open = |lower: &[f64], upper: &[f64]| {
            lower
                .iter()
                .zip(upper)
                .all(|(&l, &u)| !l.is_nan() && !u.is_nan() && l < u)
        };
        let valid = n > 0
            && open(&layout.x_lower, &layout.x_upper)
            && open(&layout.g_lower, &layout.g_upper)
            && layout.rows.iter().all(|&row| row < m)
            && layout.cols.iter().all(|&col| col < n);

        Ok(valid.then_some(layout))
    }

    pub(super) fn variables(&self) -> usize {
        self.x_lower.len()
    }

    pub(super) fn constraints(&self) -> usize {
        self.g_lower.len()
    }

    /// Returns `true` if `x` lies strictly inside every finite variable bound.
    pub(super) fn inside_variable_bounds(&self, x: &[f64]) -> bool {
        strictly_inside(x, &self.x_lower, &self.x_upper)
    }

    /// Returns `true` if `g` lies strictly inside every finite constraint bound.
    pub(super) fn inside_constraint_bounds(&self, g: &[f64]) -> bool {
        strictly_inside(g, &self.g_lower, &self.g_upper)
    }

    /// Accumulates `Jᵀ v` into `out` from the Jacobian nonzeros `values`.
    pub(super) fn jacobian_transpose(&self, values: &[f64], v: &[f64], out: &mut [f64]) {
        for ((&row, &col), &value) in self.rows.iter().zip(&self.cols).zip(values) {
            out[col] += value * v[row];
        }
    }

    /// Expands the Jacobian nonzeros into dense rows, summing duplicates.
    pub(super) fn dense_jacobian(&self, values: &[f64]) -> Vec<Vec<f64>> {
        let mut dense = vec![vec![0.0; self.variables()]; self.constraints()];
        for ((&row, &col), &value) in self.rows.iter().zip(&self.cols).zip(values) {
            dense[row][col] += value;
        }
        dense
    }
}

/// Returns `Some(bound)` if `bound` is finite in the solver's sense.
pub(super) fn finite(bound: f64) -> Option<f64> {
    (bound.abs() < INFINITE_BOUND).then_some(bound)
}

fn strictly_inside(values: &[f64], lower: &[f64], upper: &[f64]) -> bool {
    values.iter().zip(lower.iter().zip(upper)).all(|(&v, (&l, &u))| {
        v.is_finite() && finite(l).is_none_or(|l| v > l) && finite(u).is_none_or(|u| v < u)
    })
}

/// Problem callbacks with `new_x` bookkeeping.
///
/// `new_x` is passed as `true` exactly when `x` differs from the point of
/// the previous evaluation call.
pub(super) struct Evaluator<'p, P> {
    problem: &'p mut P,
    last: Option<Vec<f64>>,
}

impl<'p, P: NlpProblem> Evaluator<'p, P> {
    pub(super) fn new(problem: &'p mut P) -> Self {
        Self {
            problem,
            last: None,
        }
    }

    fn new_x(&mut self, x: &[f64]) -> bool {
        if self.last.as_deref() == Some(x) {
            return false;
        }
        self.last = Some(x.to_vec());
        true
    }

    pub(super) fn objective(&mut self, x: &[f64]) -> Result<f64, Error> {
        let new_x = self.new_x(x);
        self.problem.objective(x, new_x).map_err(Error::problem)
    }

    pub(super) fn gradient(&mut self, x: &[f64], gradient: &mut [f64]) -> Result<(), Error> {
        let new_x = self.new_x(x);
        self.problem
            .gradient(x, new_x, gradient)
            .map_err(Error::problem)
    }

    pub(super) fn constraints(&mut self, x: &[f64], g: &mut [f64]) -> Result<(), Error> {
        let new_x = self.new_x(x);
        self.problem.constraints(x, new_x, g).map_err(Error::problem)
    }

    pub(super) fn jacobian(&mut self, x: &[f64], values: &mut [f64]) -> Result<(), Error> {
        let new_x = self.new_x(x);
        self.problem
            .jacobian_values(x, new_x, values)
            .map_err(Error::problem)
    }

    pub(super) fn problem(&mut self) -> &mut P {
        self.problem
    }
}
