//! Similarity weighting: how close each perturbation is to the original.
//!
//! Distances are measured from each inclusion vector to the all-visible
//! vector and turned into weights with an exponential kernel,
//! `exp(-d² / σ²)`. Weights are in `(0, 1]` (underflowing to 0 for very
//! distant samples), equal 1 at distance 0, and are not normalised.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};
use crate::sampling::SampleSet;

/// Distance between an inclusion vector and the all-visible vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `sqrt(hidden segments)`.
    #[default]
    Euclidean,
    /// `1 - sqrt(visible / N)`; the all-hidden vector is at distance 1.
    Cosine,
}

impl DistanceMetric {
    /// Distance of a sample with `visible` of `num_segments` segments shown.
    pub fn distance(self, visible: usize, num_segments: usize) -> f64 {
        match self {
            Self::Euclidean => ((num_segments - visible) as f64).sqrt(),
            Self::Cosine => {
                if visible == 0 {
                    1.0
                } else {
                    1.0 - (visible as f64 / num_segments as f64).sqrt()
                }
            }
        }
    }

    /// Kernel width used when none is configured.
    pub fn default_width(self, num_segments: usize) -> f64 {
        match self {
            Self::Euclidean => 0.75 * (num_segments as f64).sqrt(),
            Self::Cosine => 0.25,
        }
    }
}

/// Distance metric and kernel width `σ`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    #[serde(default)]
    pub metric: DistanceMetric,
    /// Kernel width; derived from the segment count when unset.
    #[serde(default)]
    pub width: Option<f64>,
}

impl KernelConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(width) = self.width {
            if !width.is_finite() || width <= 0.0 {
                return Err(ConfigurationError::invalid(
                    "kernel.width",
                    format!("must be a positive finite number, got {width}"),
                )
                .into());
            }
        }
        Ok(())
    }

    /// The configured width, or the metric's default for `num_segments`.
    pub fn resolve_width(&self, num_segments: usize) -> f64 {
        self.width
            .unwrap_or_else(|| self.metric.default_width(num_segments))
    }
}

/// Weight every sample by its similarity to the unperturbed image.
pub fn similarity_weights(samples: &SampleSet, metric: DistanceMetric, width: f64) -> Result<Array1<f64>> {
    if !width.is_finite() || width <= 0.0 {
        return Err(ConfigurationError::invalid(
            "kernel.width",
            format!("must be a positive finite number, got {width}"),
        )
        .into());
    }
    let n = samples.num_segments();
    let weights = samples
        .visible_counts()
        .into_iter()
        .map(|visible| {
            let d = metric.distance(visible, n);
            (-(d * d) / (width * width)).exp()
        })
        .collect();
    Ok(weights)
}
