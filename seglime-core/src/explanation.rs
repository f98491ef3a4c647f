//! Explanation assembly and the traced run record.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};
use crate::query::PredictionMatrix;
use crate::sampling::SampleSet;
use crate::segmentation::SegmentMap;

/// Per-segment importances for one target class.
///
/// `segment_weights[i]` is the surrogate coefficient of segment `i` in
/// `segment_map`: positive values pushed the classifier towards
/// `target_class`, negative values away from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub segment_map: SegmentMap,
    pub segment_weights: Array1<f64>,
    pub target_class: usize,
}

impl Explanation {
    /// Bundle a segmentation with its weights, checking they agree on `N`.
    pub fn assemble(segment_map: SegmentMap, segment_weights: Array1<f64>, target_class: usize) -> Result<Self> {
        if segment_weights.len() != segment_map.num_segments() {
            return Err(ConfigurationError::shape(
                "segment weights",
                format!("length {}", segment_map.num_segments()),
                format!("length {}", segment_weights.len()),
            )
            .into());
        }
        Ok(Self {
            segment_map,
            segment_weights,
            target_class,
        })
    }

    pub fn num_segments(&self) -> usize {
        self.segment_weights.len()
    }

    /// Weight of one segment, if it exists.
    pub fn weight(&self, segment: usize) -> Option<f64> {
        self.segment_weights.get(segment).copied()
    }

    /// Segment ids ordered by descending absolute weight; ties keep id order.
    pub fn ranked_segments(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = (0..self.num_segments()).collect();
        ids.sort_by(|&a, &b| {
            self.segment_weights[b]
                .abs()
                .total_cmp(&self.segment_weights[a].abs())
        });
        ids
    }

    /// Segments that support the target class, strongest first.
    pub fn positive_segments(&self) -> Vec<usize> {
        self.signed_segments(|w| w > 0.0)
    }

    /// Segments that argue against the target class, strongest first.
    pub fn negative_segments(&self) -> Vec<usize> {
        self.signed_segments(|w| w < 0.0)
    }

    fn signed_segments(&self, keep: impl Fn(f64) -> bool) -> Vec<usize> {
        self.ranked_segments()
            .into_iter()
            .filter(|&id| keep(self.segment_weights[id]))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let explanation: Self = serde_json::from_str(json)?;
        Self::assemble(
            explanation.segment_map,
            explanation.segment_weights,
            explanation.target_class,
        )
    }
}

/// An explanation together with the intermediate products of its run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationTrace {
    pub explanation: Explanation,
    pub samples: SampleSet,
    pub predictions: PredictionMatrix,
    /// Similarity weight of every sample.
    pub weights: Array1<f64>,
    pub kernel_width: f64,
    /// Surrogate intercept; not part of the explanation.
    pub intercept: f64,
    /// Weighted R² of the surrogate on the samples.
    pub score: f64,
}
