//! Dense kernels for the small step systems.

pub(super) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(super) fn norm_inf(a: &[f64]) -> f64 {
    a.iter().fold(0.0, |max, v| max.max(v.abs()))
}

/// Solves `A x = b` for symmetric positive definite `A` (row-major, `n × n`).
///
/// Factorizes `A` in place into its lower Cholesky factor and overwrites `b`
/// with the solution. Returns `false` if `A` is not numerically positive
/// definite, leaving both buffers in an unspecified state.
pub(super) fn cholesky_solve(a: &mut [f64], b: &mut [f64]) -> bool {
    let n = b.len();
    debug_assert_eq!(a.len(), n * n);

    for j in 0..n {
        let diagonal = a[j * n + j] - dot(&a[j * n..j * n + j], &a[j * n..j * n + j]);
        if !diagonal.is_finite() || diagonal <= 0.0 {
            return false;
        }
        let pivot = diagonal.sqrt();
        a[j * n + j] = pivot;
        for i in j + 1..n {
            let sum = dot(&a[i * n..i * n + j], &a[j * n..j * n + j]);
            a[i * n + j] = (a[i * n + j] - sum) / pivot;
        }
    }

    // Forward substitution with L, then back substitution with Lᵀ.
    for i in 0..n {
        let sum = dot(&a[i * n..i * n + i], &b[..i]);
        b[i] = (b[i] - sum) / a[i * n + i];
    }
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|k| a[k * n + i] * b[k]).sum();
        b[i] = (b[i] - sum) / a[i * n + i];
    }
    true
}
