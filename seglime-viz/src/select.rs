//! Choosing which segments to highlight.

use ndarray::ArrayView1;
use seglime_core::SegmentMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RenderError, Result};

/// How many segments to pick, highest weight first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Pick segments until they cover this fraction of the image.
    Coverage(f64),
    /// Pick exactly this many segments.
    Count(usize),
}

/// Bounds applied on top of a [`Selection`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionLimits {
    #[serde(default)]
    pub min_coverage: f64,
    #[serde(default = "default_max_coverage")]
    pub max_coverage: f64,
    #[serde(default)]
    pub min_segments: usize,
    /// Defaults to the number of segments in the map.
    #[serde(default)]
    pub max_segments: Option<usize>,
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            min_coverage: 0.0,
            max_coverage: default_max_coverage(),
            min_segments: 0,
            max_segments: None,
        }
    }
}

fn default_max_coverage() -> f64 {
    1.0
}

/// Select segments in order of descending weight.
///
/// A coverage target stops at the first prefix whose area reaches it; a
/// count is clamped to `[min_segments, max_segments]`. If the chosen
/// segments then cover more than `max_coverage` (or less than
/// `min_coverage`) of the image, the selection is redone by coverage
/// against that bound. Pass negated weights to select the lowest ones.
pub fn select_segments(
    weights: ArrayView1<'_, f64>,
    segment_map: &SegmentMap,
    selection: Selection,
    limits: &SelectionLimits,
) -> Result<Vec<usize>> {
    if limits.min_coverage >= limits.max_coverage {
        return Err(RenderError::invalid(
            "min_coverage",
            format!(
                "must be strictly smaller than max_coverage ({} >= {})",
                limits.min_coverage, limits.max_coverage
            ),
        ));
    }
    let total = segment_map.num_segments();
    if weights.len() != total {
        return Err(RenderError::shape(
            "segment weights",
            format!("one weight per segment ({total})"),
            format!("{} weights", weights.len()),
        ));
    }
    let max_segments = limits.max_segments.filter(|&m| m > 0).unwrap_or(total);
    if limits.min_segments >= max_segments {
        return Err(RenderError::invalid(
            "min_segments",
            format!(
                "must be strictly smaller than max_segments ({} >= {max_segments})",
                limits.min_segments
            ),
        ));
    }

    let mut ordered: Vec<usize> = (0..total).collect();
    ordered.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]));

    let sizes = segment_map.segment_sizes();
    let pixels = segment_map.num_pixels() as f64;
    let coverage_of = |ids: &[usize]| ids.iter().map(|&id| sizes[id]).sum::<usize>() as f64 / pixels;

    let count = match selection {
        Selection::Count(count) => count,
        Selection::Coverage(target) => {
            let target = target
                .min(limits.max_coverage)
                .min(1.0)
                .max(limits.min_coverage)
                .max(0.0);
            // The full set is never tried here; needing it is reported.
            let mut covered = 0;
            let reached = ordered[..total - 1].iter().position(|&id| {
                covered += sizes[id];
                covered as f64 / pixels >= target
            });
            match reached {
                Some(last) => last + 1,
                None => {
                    warn!(
                        segments = max_segments,
                        coverage = target,
                        "Need to select all segments to reach the coverage threshold"
                    );
                    max_segments
                }
            }
        }
    };

    let count = count.min(max_segments).max(limits.min_segments).min(total);
    let selected = &ordered[..count];
    let covered = coverage_of(selected);

    if covered > limits.max_coverage {
        let reselected = select_segments(
            weights,
            segment_map,
            Selection::Coverage(limits.max_coverage),
            &SelectionLimits::default(),
        )?;
        if coverage_of(&reselected) > limits.max_coverage {
            warn!(
                segments = reselected.len(),
                max_coverage = limits.max_coverage,
                "Coverage still exceeds the maximum despite the reduced selection"
            );
        }
        Ok(reselected)
    } else if covered < limits.min_coverage {
        select_segments(
            weights,
            segment_map,
            Selection::Coverage(limits.min_coverage),
            &SelectionLimits::default(),
        )
    } else {
        Ok(selected.to_vec())
    }
}
