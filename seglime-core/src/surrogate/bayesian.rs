//! Bayesian ridge: ridge regression with the noise precision `alpha` and
//! weight precision `lambda` re-estimated by evidence maximisation.
//!
//! Works on the weighted, centred problem: `scaled_x = √w · Xc`,
//! `scaled_y = √w · yc`, `gram = scaled_xᵀ scaled_x`, `rhs = scaled_xᵀ scaled_y`.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use tracing::debug;

/// Gamma hyper-prior parameters on both precisions.
const HYPER_PRIOR: f64 = 1e-6;

pub(super) fn fit(
    gram: ArrayView2<'_, f64>,
    rhs: ArrayView1<'_, f64>,
    scaled_x: ArrayView2<'_, f64>,
    scaled_y: ArrayView1<'_, f64>,
    num_samples: usize,
    max_iterations: usize,
    tolerance: f64,
) -> Array1<f64> {
    let (eigenvalues, eigenvectors) = eigen_decomposition(gram);
    let eigenvalues = eigenvalues.mapv(|v| v.max(0.0));
    // Project the right-hand side into the eigenbasis once.
    let projected = eigenvectors.t().dot(&rhs);
    let k = num_samples as f64;

    let y_mean = scaled_y.mean().unwrap_or(0.0);
    let y_var = scaled_y.iter().map(|y| (y - y_mean).powi(2)).sum::<f64>() / k;
    let mut alpha = 1.0 / (y_var + f64::EPSILON);
    let mut lambda = 1.0;

    let solve = |alpha: f64, lambda: f64| -> (Array1<f64>, f64) {
        let ratio = lambda / alpha;
        let shrunk = Array1::from_shape_fn(projected.len(), |i| projected[i] / (eigenvalues[i] + ratio));
        let coef = eigenvectors.dot(&shrunk);
        let residual = &scaled_y - &scaled_x.dot(&coef);
        let rss = residual.mapv(|r| r * r).sum();
        (coef, rss)
    };

    let mut previous: Option<Array1<f64>> = None;
    let mut iterations = 0;
    for iteration in 0..max_iterations {
        iterations = iteration + 1;
        let (coef, rss) = solve(alpha, lambda);
        let gamma: f64 = eigenvalues
            .iter()
            .map(|&ev| alpha * ev / (lambda + alpha * ev))
            .sum();
        lambda = (gamma + 2.0 * HYPER_PRIOR) / (coef.mapv(|c| c * c).sum() + 2.0 * HYPER_PRIOR);
        alpha = (k - gamma + 2.0 * HYPER_PRIOR) / (rss + 2.0 * HYPER_PRIOR);

        if let Some(prev) = &previous {
            let change: f64 = prev.iter().zip(coef.iter()).map(|(a, b)| (a - b).abs()).sum();
            if change < tolerance {
                break;
            }
        }
        previous = Some(coef);
    }

    debug!(iterations, alpha, lambda, "Bayesian ridge converged");
    solve(alpha, lambda).0
}

/// Eigenvalues and column eigenvectors of the symmetric `gram`.
fn eigen_decomposition(gram: ArrayView2<'_, f64>) -> (Array1<f64>, Array2<f64>) {
    let n = gram.nrows();
    let eigen = SymmetricEigen::new(DMatrix::from_fn(n, n, |i, j| gram[[i, j]]));
    let values = Array1::from_shape_fn(n, |i| eigen.eigenvalues[i]);
    let vectors = Array2::from_shape_fn((n, n), |(i, j)| eigen.eigenvectors[(i, j)]);
    (values, vectors)
}
