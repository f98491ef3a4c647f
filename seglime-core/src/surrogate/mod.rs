//! Surrogate fitting: a weighted linear model from inclusion vectors to the
//! target class score.
//!
//! All models fit an intercept on weighted-centred data and report one
//! coefficient per segment. The intercept and the weighted R² are kept on
//! [`SurrogateFit`] for diagnostics but never reach the explanation.

mod bayesian;
mod lasso;
mod linalg;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, FitError, Result};

/// Weighted variance below which (relative to total weight) a segment is
/// considered constant across the samples.
const VARIANCE_TOLERANCE: f64 = 1e-12;

/// Which linear model to fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum SurrogateModel {
    /// Ordinary weighted least squares, no regularization.
    Linear,
    /// L2-regularized least squares with fixed strength `alpha`.
    Ridge {
        #[serde(default = "default_ridge_alpha")]
        alpha: f64,
    },
    /// Ridge regression whose strength is estimated from the data by
    /// evidence maximisation.
    BayesianRidge {
        #[serde(default = "default_bayes_iterations")]
        max_iterations: usize,
        #[serde(default = "default_bayes_tolerance")]
        tolerance: f64,
    },
    /// L1-regularized least squares; drives weak segments to exactly zero.
    Lasso {
        #[serde(default = "default_lasso_alpha")]
        alpha: f64,
        #[serde(default = "default_lasso_iterations")]
        max_iterations: usize,
        #[serde(default = "default_lasso_tolerance")]
        tolerance: f64,
    },
}

impl Default for SurrogateModel {
    fn default() -> Self {
        Self::Ridge {
            alpha: default_ridge_alpha(),
        }
    }
}

fn default_ridge_alpha() -> f64 {
    1.0
}

fn default_bayes_iterations() -> usize {
    300
}

fn default_bayes_tolerance() -> f64 {
    1e-3
}

fn default_lasso_alpha() -> f64 {
    0.01
}

fn default_lasso_iterations() -> usize {
    1000
}

fn default_lasso_tolerance() -> f64 {
    1e-4
}

impl SurrogateModel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Ridge { .. } => "ridge",
            Self::BayesianRidge { .. } => "bayesian_ridge",
            Self::Lasso { .. } => "lasso",
        }
    }

    pub fn is_regularized(&self) -> bool {
        !matches!(self, Self::Linear)
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Linear => {}
            Self::Ridge { alpha } => {
                if !alpha.is_finite() || alpha <= 0.0 {
                    return Err(ConfigurationError::invalid(
                        "surrogate.alpha",
                        format!("must be a positive finite number, got {alpha}; use the linear model for no regularization"),
                    )
                    .into());
                }
            }
            Self::BayesianRidge {
                max_iterations,
                tolerance,
            } => validate_iterations(max_iterations, tolerance)?,
            Self::Lasso {
                alpha,
                max_iterations,
                tolerance,
            } => {
                if !alpha.is_finite() || alpha <= 0.0 {
                    return Err(ConfigurationError::invalid(
                        "surrogate.alpha",
                        format!("must be a positive finite number, got {alpha}; use the linear model for no regularization"),
                    )
                    .into());
                }
                validate_iterations(max_iterations, tolerance)?;
            }
        }
        Ok(())
    }
}

fn validate_iterations(max_iterations: usize, tolerance: f64) -> Result<()> {
    if max_iterations == 0 {
        return Err(ConfigurationError::invalid(
            "surrogate.max_iterations",
            "must be at least 1",
        )
        .into());
    }
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(ConfigurationError::invalid(
            "surrogate.tolerance",
            format!("must be a positive finite number, got {tolerance}"),
        )
        .into());
    }
    Ok(())
}

/// Result of a surrogate fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurrogateFit {
    /// One coefficient per segment.
    pub coefficients: Array1<f64>,
    pub intercept: f64,
    /// Weighted coefficient of determination on the training samples.
    pub score: f64,
}

/// Fit `targets ≈ intercept + design · coefficients` under sample `weights`.
///
/// `design` is `K × N` (one row per sample), `targets` and `weights` have
/// length `K`. Weights need not be normalised but must be non-negative and
/// not all zero.
pub fn fit_surrogate(
    design: ArrayView2<'_, f64>,
    targets: ArrayView1<'_, f64>,
    weights: ArrayView1<'_, f64>,
    model: &SurrogateModel,
) -> Result<SurrogateFit> {
    model.validate()?;
    let (num_samples, num_segments) = design.dim();
    check_inputs(design, targets, weights)?;

    let total_weight: f64 = weights.sum();
    if !(total_weight > 0.0) {
        return Err(FitError::DegenerateWeights { sum: total_weight }.into());
    }

    let x_mean = weights.dot(&design) / total_weight;
    let y_mean = weights.dot(&targets) / total_weight;
    let centered_x = &design - &x_mean.view().insert_axis(Axis(0));
    let centered_y = &targets - y_mean;

    let weighted_x = &centered_x * &weights.insert_axis(Axis(1));
    let gram = centered_x.t().dot(&weighted_x);
    let rhs = weighted_x.t().dot(&centered_y);

    let coefficients = match *model {
        SurrogateModel::Linear => {
            let effective = weights.iter().filter(|&&w| w > 0.0).count();
            if effective < num_segments + 1 {
                return Err(FitError::Underdetermined {
                    samples: effective,
                    segments: num_segments,
                }
                .into());
            }
            if let Some(segment) =
                (0..num_segments).find(|&j| gram[[j, j]] <= VARIANCE_TOLERANCE * total_weight)
            {
                return Err(FitError::ConstantSegment { segment }.into());
            }
            linalg::cholesky_solve(gram.view(), rhs.view()).ok_or_else(|| FitError::Singular {
                reason: "segment inclusions are collinear across the samples".to_string(),
            })?
        }
        SurrogateModel::Ridge { alpha } => {
            let regularized = gram + Array2::<f64>::eye(num_segments) * alpha;
            linalg::cholesky_solve(regularized.view(), rhs.view()).ok_or_else(|| {
                FitError::Singular {
                    reason: format!("ridge system with alpha {alpha} is not positive definite"),
                }
            })?
        }
        SurrogateModel::BayesianRidge {
            max_iterations,
            tolerance,
        } => {
            let root_w = weights.mapv(f64::sqrt);
            let scaled_x = &centered_x * &root_w.view().insert_axis(Axis(1));
            let scaled_y = &centered_y * &root_w;
            bayesian::fit(
                gram.view(),
                rhs.view(),
                scaled_x.view(),
                scaled_y.view(),
                num_samples,
                max_iterations,
                tolerance,
            )
        }
        SurrogateModel::Lasso {
            alpha,
            max_iterations,
            tolerance,
        } => lasso::fit(gram.view(), rhs.view(), total_weight, alpha, max_iterations, tolerance),
    };

    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(FitError::Singular {
            reason: "solution contains non-finite coefficients".to_string(),
        }
        .into());
    }

    let intercept = y_mean - x_mean.dot(&coefficients);
    let score = weighted_r2(design, targets, weights, &coefficients, intercept, y_mean);
    Ok(SurrogateFit {
        coefficients,
        intercept,
        score,
    })
}

fn check_inputs(
    design: ArrayView2<'_, f64>,
    targets: ArrayView1<'_, f64>,
    weights: ArrayView1<'_, f64>,
) -> Result<()> {
    let (num_samples, num_segments) = design.dim();
    if num_samples == 0 || num_segments == 0 {
        return Err(FitError::InvalidInput {
            reason: format!("design matrix is empty ({num_samples} × {num_segments})"),
        }
        .into());
    }
    if targets.len() != num_samples || weights.len() != num_samples {
        return Err(FitError::InvalidInput {
            reason: format!(
                "{num_samples} samples but {} targets and {} weights",
                targets.len(),
                weights.len()
            ),
        }
        .into());
    }
    if let Some(i) = weights.iter().position(|w| !w.is_finite() || *w < 0.0) {
        return Err(FitError::InvalidInput {
            reason: format!("weight {i} is {} (must be finite and non-negative)", weights[i]),
        }
        .into());
    }
    if let Some(i) = targets.iter().position(|y| !y.is_finite()) {
        return Err(FitError::InvalidInput {
            reason: format!("target {i} is not finite"),
        }
        .into());
    }
    Ok(())
}

fn weighted_r2(
    design: ArrayView2<'_, f64>,
    targets: ArrayView1<'_, f64>,
    weights: ArrayView1<'_, f64>,
    coefficients: &Array1<f64>,
    intercept: f64,
    y_mean: f64,
) -> f64 {
    let predicted = design.dot(coefficients) + intercept;
    let residual: f64 = weights
        .iter()
        .zip(targets.iter().zip(predicted.iter()))
        .map(|(w, (y, p))| w * (y - p).powi(2))
        .sum();
    let total: f64 = weights
        .iter()
        .zip(targets.iter())
        .map(|(w, y)| w * (y - y_mean).powi(2))
        .sum();
    if total > 0.0 {
        1.0 - residual / total
    } else if residual > 0.0 {
        0.0
    } else {
        1.0
    }
}
