//! Lasso: L1-regularized least squares by cyclic coordinate descent.
//!
//! Minimises `(1 / 2Σw) · Σ wᵢ (yᵢ - xᵢ·β)² + alpha · Σ|βⱼ|` on the
//! weighted, centred problem, working from the Gram matrix
//! `Xcᵀ W Xc` and `rhs = Xcᵀ W yc` so each sweep costs `O(N²)`.

use ndarray::{Array1, ArrayView1, ArrayView2};
use tracing::debug;

/// Columns with less weighted variance than this are left at zero.
const MIN_COLUMN_NORM: f64 = 1e-12;

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

pub(super) fn fit(
    gram: ArrayView2<'_, f64>,
    rhs: ArrayView1<'_, f64>,
    total_weight: f64,
    alpha: f64,
    max_iterations: usize,
    tolerance: f64,
) -> Array1<f64> {
    let n = rhs.len();
    let threshold = alpha * total_weight;
    let mut beta = Array1::<f64>::zeros(n);

    let mut iterations = 0;
    for iteration in 0..max_iterations {
        iterations = iteration + 1;
        let mut max_change = 0.0f64;

        for j in 0..n {
            let norm = gram[[j, j]];
            if norm < MIN_COLUMN_NORM * total_weight {
                continue;
            }
            // Correlation of column j with the residual that excludes it.
            let rho = rhs[j] - gram.row(j).dot(&beta) + norm * beta[j];
            let updated = soft_threshold(rho, threshold) / norm;
            max_change = max_change.max((updated - beta[j]).abs());
            beta[j] = updated;
        }

        if max_change < tolerance {
            break;
        }
    }

    debug!(iterations, alpha, active = beta.iter().filter(|b| **b != 0.0).count(), "Lasso converged");
    beta
}
