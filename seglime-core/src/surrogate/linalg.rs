//! Cholesky solver for the small `N × N` normal equations.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Relative pivot size below which a matrix is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Solve `a · x = b` for symmetric positive-definite `a` by Cholesky
/// factorisation. Returns `None` when a pivot collapses, i.e. `a` is
/// singular or indefinite to working precision.
pub(crate) fn cholesky_solve(a: ArrayView2<'_, f64>, b: ArrayView1<'_, f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let scale = (0..n).map(|i| a[[i, i]].abs()).fold(0.0, f64::max).max(f64::MIN_POSITIVE);
    let mut l = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if !(diag > PIVOT_TOLERANCE * scale) {
            return None;
        }
        let pivot = diag.sqrt();
        l[[j, j]] = pivot;
        for i in (j + 1)..n {
            let mut value = a[[i, j]];
            for k in 0..j {
                value -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = value / pivot;
        }
    }

    // Forward substitution: L y = b.
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut value = b[i];
        for k in 0..i {
            value -= l[[i, k]] * y[k];
        }
        y[i] = value / l[[i, i]];
    }
    // Back substitution: Lᵀ x = y.
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut value = y[i];
        for k in (i + 1)..n {
            value -= l[[k, i]] * x[k];
        }
        x[i] = value / l[[i, i]];
    }
    Some(x)
}
