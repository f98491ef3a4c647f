//! The segment map: a per-pixel partition of an image into labelled regions.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ConfigurationError, ExplainError, Result};

/// A partition of an `(H, W)` pixel grid into `N` segments.
///
/// Every pixel holds an id in `0..N` and every id labels at least one pixel.
/// The only ways to build one are [`SegmentMap::from_labels`], which checks
/// the invariant, and [`SegmentMap::relabel`], which establishes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Array2<usize>", into = "Array2<usize>")]
pub struct SegmentMap {
    labels: Array2<usize>,
    num_segments: usize,
}

impl SegmentMap {
    /// Wrap an existing label array whose ids are already contiguous from 0.
    pub fn from_labels(labels: Array2<usize>) -> Result<Self> {
        if labels.is_empty() {
            return Err(ConfigurationError::shape(
                "segment map",
                "(H > 0, W > 0)",
                format!("{:?}", labels.dim()),
            )
            .into());
        }

        let max_id = labels.iter().copied().max().unwrap_or(0);
        if max_id >= labels.len() {
            return Err(ConfigurationError::invalid(
                "segment_map",
                format!(
                    "segment id {max_id} exceeds the {} pixels of the map; ids must be contiguous from 0",
                    labels.len()
                ),
            )
            .into());
        }
        let mut sizes = vec![0usize; max_id + 1];
        for &id in labels.iter() {
            sizes[id] += 1;
        }
        if let Some(empty) = sizes.iter().position(|&count| count == 0) {
            return Err(ConfigurationError::invalid(
                "segment_map",
                format!("segment id {empty} labels no pixels; ids must be contiguous from 0"),
            )
            .into());
        }

        Ok(Self {
            labels,
            num_segments: max_id + 1,
        })
    }

    /// Compact arbitrary label ids into `0..N`, numbering segments in the
    /// raster order in which they first appear.
    pub fn relabel(labels: Array2<usize>) -> Result<Self> {
        let mut mapping: HashMap<usize, usize> = HashMap::new();
        let mut compact = Array2::zeros(labels.raw_dim());
        for ((y, x), &id) in labels.indexed_iter() {
            let next = mapping.len();
            compact[[y, x]] = *mapping.entry(id).or_insert(next);
        }
        Self::from_labels(compact)
    }

    /// Fail unless there is more than one segment to compare.
    pub fn ensure_explainable(&self) -> Result<()> {
        if self.num_segments < 2 {
            return Err(ConfigurationError::TooFewSegments {
                found: self.num_segments,
            }
            .into());
        }
        Ok(())
    }

    pub fn labels(&self) -> &Array2<usize> {
        &self.labels
    }

    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    pub fn height(&self) -> usize {
        self.labels.nrows()
    }

    pub fn width(&self) -> usize {
        self.labels.ncols()
    }

    pub fn num_pixels(&self) -> usize {
        self.labels.len()
    }

    /// Segment id at pixel `(y, x)`.
    pub fn id_at(&self, y: usize, x: usize) -> usize {
        self.labels[[y, x]]
    }

    /// Whether pixel `(y, x)` belongs to segment `id`.
    pub fn contains(&self, id: usize, y: usize, x: usize) -> bool {
        self.labels.get([y, x]) == Some(&id)
    }

    /// Pixel count of every segment, indexed by segment id.
    pub fn segment_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.num_segments];
        for &id in self.labels.iter() {
            sizes[id] += 1;
        }
        sizes
    }

    /// Fraction of the image covered by the given segments.
    pub fn coverage(&self, segments: &[usize]) -> f64 {
        let sizes = self.segment_sizes();
        let covered: usize = segments
            .iter()
            .filter_map(|&id| sizes.get(id))
            .sum();
        covered as f64 / self.num_pixels() as f64
    }
}

impl TryFrom<Array2<usize>> for SegmentMap {
    type Error = ExplainError;

    fn try_from(labels: Array2<usize>) -> Result<Self> {
        Self::from_labels(labels)
    }
}

impl From<SegmentMap> for Array2<usize> {
    fn from(map: SegmentMap) -> Self {
        map.labels
    }
}
