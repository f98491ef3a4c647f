//! Perturbation sampling: random on/off settings over the segments.

use ndarray::{Array2, ArrayView1};
use rand::Rng;
use rand::distributions::{Bernoulli, Distribution};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigurationError, Result};

/// How many perturbations to draw and how aggressively to hide segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Sample budget `K`: number of perturbed images sent to the classifier.
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,
    /// Probability that any one segment is hidden in a given sample.
    #[serde(default = "default_hide_probability")]
    pub hide_probability: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            num_samples: default_num_samples(),
            hide_probability: default_hide_probability(),
        }
    }
}

fn default_num_samples() -> usize {
    128
}

fn default_hide_probability() -> f64 {
    0.5
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_samples == 0 {
            return Err(ConfigurationError::invalid("sampling.num_samples", "must be at least 1").into());
        }
        if !(0.0..=1.0).contains(&self.hide_probability) {
            return Err(ConfigurationError::invalid(
                "sampling.hide_probability",
                format!("must be within [0, 1], got {}", self.hide_probability),
            )
            .into());
        }
        Ok(())
    }
}

/// `K` inclusion vectors over `N` segments; `true` means the segment is
/// visible in that perturbation.
///
/// Row order is the alignment key for rendered images, predictions and
/// weights downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSet {
    inclusions: Array2<bool>,
}

impl SampleSet {
    /// Wrap explicit inclusion vectors, one row per sample.
    pub fn from_inclusions(inclusions: Array2<bool>) -> Result<Self> {
        if inclusions.nrows() == 0 || inclusions.ncols() == 0 {
            return Err(ConfigurationError::shape(
                "sample set",
                "(K > 0, N > 0)",
                format!("{:?}", inclusions.dim()),
            )
            .into());
        }
        Ok(Self { inclusions })
    }

    pub fn num_samples(&self) -> usize {
        self.inclusions.nrows()
    }

    pub fn num_segments(&self) -> usize {
        self.inclusions.ncols()
    }

    pub fn inclusions(&self) -> &Array2<bool> {
        &self.inclusions
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, bool> {
        self.inclusions.row(index)
    }

    /// Number of visible segments in each sample.
    pub fn visible_counts(&self) -> Vec<usize> {
        self.inclusions
            .rows()
            .into_iter()
            .map(|row| row.iter().filter(|&&v| v).count())
            .collect()
    }

    /// The samples as a `K × N` matrix of 0.0 / 1.0 for regression.
    pub fn design_matrix(&self) -> Array2<f64> {
        self.inclusions.mapv(|v| if v { 1.0 } else { 0.0 })
    }
}

/// Draw `config.num_samples` inclusion vectors over `num_segments` segments.
///
/// Each entry is an independent Bernoulli draw, visible with probability
/// `1 - hide_probability`, taken from `rng` in row-major order. The
/// all-visible vector is not added implicitly, and rows with everything
/// hidden or everything visible are kept as drawn.
pub fn sample_inclusions<R: Rng + ?Sized>(
    num_segments: usize,
    config: &SamplingConfig,
    rng: &mut R,
) -> Result<SampleSet> {
    config.validate()?;
    if num_segments == 0 {
        return Err(ConfigurationError::invalid("num_segments", "must be at least 1").into());
    }

    let visible = Bernoulli::new(1.0 - config.hide_probability)
        .map_err(|e| ConfigurationError::invalid("sampling.hide_probability", e.to_string()))?;

    let mut inclusions = Array2::from_elem((config.num_samples, num_segments), false);
    for value in inclusions.iter_mut() {
        *value = visible.sample(rng);
    }
    let samples = SampleSet::from_inclusions(inclusions)?;

    let counts = samples.visible_counts();
    let all_hidden = counts.iter().filter(|&&c| c == 0).count();
    let all_visible = counts.iter().filter(|&&c| c == num_segments).count();
    if all_hidden + all_visible > 0 {
        warn!(
            all_hidden,
            all_visible,
            samples = config.num_samples,
            "Sample set contains unperturbed or fully hidden samples"
        );
    }
    debug!(
        samples = config.num_samples,
        segments = num_segments,
        hide_probability = config.hide_probability,
        "Drew inclusion vectors"
    );

    Ok(samples)
}
