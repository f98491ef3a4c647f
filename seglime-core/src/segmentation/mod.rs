//! Segmentation: partition an image into the regions an explanation talks
//! about.
//!
//! Every method is deterministic and its raw output is compacted through
//! [`SegmentMap::relabel`], so callers always get ids contiguous from 0.

mod felzenszwalb;
mod grid;
mod map;
pub(crate) mod regions;
mod slic;

pub use map::SegmentMap;

use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigurationError, Result};
use crate::image::validate_image;

/// Segmentation algorithm and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SegmentationMethod {
    /// Regular `rows × cols` blocks.
    Grid { rows: usize, cols: usize },
    /// SLIC superpixels.
    Slic {
        /// Approximate number of superpixels.
        #[serde(default = "default_slic_segments")]
        n_segments: usize,
        /// Balance between colour similarity and spatial proximity; higher
        /// values give more compact, grid-like superpixels.
        #[serde(default = "default_compactness")]
        compactness: f64,
        #[serde(default = "default_slic_iterations")]
        max_iterations: usize,
        /// Gaussian pre-smoothing width in pixels (0 disables).
        #[serde(default = "default_slic_sigma")]
        sigma: f64,
    },
    /// Felzenszwalb–Huttenlocher graph segmentation.
    Felzenszwalb {
        /// Higher values give larger segments.
        #[serde(default = "default_fz_scale")]
        scale: f64,
        #[serde(default = "default_fz_sigma")]
        sigma: f64,
        /// Minimum segment size in pixels, enforced after merging.
        #[serde(default = "default_fz_min_size")]
        min_size: usize,
    },
}

impl Default for SegmentationMethod {
    fn default() -> Self {
        Self::Slic {
            n_segments: default_slic_segments(),
            compactness: default_compactness(),
            max_iterations: default_slic_iterations(),
            sigma: default_slic_sigma(),
        }
    }
}

fn default_slic_segments() -> usize {
    250
}

fn default_compactness() -> f64 {
    2.0
}

fn default_slic_iterations() -> usize {
    10
}

fn default_slic_sigma() -> f64 {
    1.0
}

fn default_fz_scale() -> f64 {
    250.0
}

fn default_fz_sigma() -> f64 {
    0.6
}

fn default_fz_min_size() -> usize {
    45
}

impl SegmentationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Grid { .. } => "grid",
            Self::Slic { .. } => "slic",
            Self::Felzenszwalb { .. } => "felzenszwalb",
        }
    }

    /// Check the image-independent parameters.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Grid { rows, cols } => {
                if rows == 0 {
                    return Err(ConfigurationError::invalid("segmentation.rows", "must be at least 1").into());
                }
                if cols == 0 {
                    return Err(ConfigurationError::invalid("segmentation.cols", "must be at least 1").into());
                }
            }
            Self::Slic {
                n_segments,
                compactness,
                max_iterations,
                sigma,
            } => {
                if n_segments < 2 {
                    return Err(ConfigurationError::invalid(
                        "segmentation.n_segments",
                        format!("must be at least 2, got {n_segments}"),
                    )
                    .into());
                }
                ensure_positive("segmentation.compactness", compactness)?;
                if max_iterations == 0 {
                    return Err(ConfigurationError::invalid(
                        "segmentation.max_iterations",
                        "must be at least 1",
                    )
                    .into());
                }
                ensure_non_negative("segmentation.sigma", sigma)?;
            }
            Self::Felzenszwalb { scale, sigma, .. } => {
                ensure_positive("segmentation.scale", scale)?;
                ensure_non_negative("segmentation.sigma", sigma)?;
            }
        }
        Ok(())
    }
}

fn ensure_positive(parameter: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigurationError::invalid(
            parameter,
            format!("must be a positive finite number, got {value}"),
        )
        .into());
    }
    Ok(())
}

fn ensure_non_negative(parameter: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigurationError::invalid(
            parameter,
            format!("must be a non-negative finite number, got {value}"),
        )
        .into());
    }
    Ok(())
}

/// Partition `image` into segments with the configured method.
///
/// Fails if the image is not `(H, W, 3)`, a parameter is invalid, or fewer
/// than two segments result.
pub fn segment(image: ArrayView3<'_, f32>, method: &SegmentationMethod) -> Result<SegmentMap> {
    validate_image(image)?;
    method.validate()?;
    let (height, width, _) = image.dim();

    let labels = match *method {
        SegmentationMethod::Grid { rows, cols } => grid::grid_labels(height, width, rows, cols)?,
        SegmentationMethod::Slic {
            n_segments,
            compactness,
            max_iterations,
            sigma,
        } => slic::slic_labels(image, n_segments, compactness, max_iterations, sigma)?,
        SegmentationMethod::Felzenszwalb {
            scale,
            sigma,
            min_size,
        } => felzenszwalb::felzenszwalb_labels(image, scale, sigma, min_size)?,
    };

    let map = SegmentMap::relabel(labels)?;
    debug!(
        method = method.name(),
        height,
        width,
        segments = map.num_segments(),
        "Segmented image"
    );
    map.ensure_explainable()?;
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExplainError;
    use crate::image::Image;

    fn gradient(height: usize, width: usize) -> Image {
        Image::from_shape_fn((height, width, 3), |(y, x, c)| {
            ((y * 13 + x * 29 + c * 71) % 256) as f32
        })
    }

    #[test]
    fn test_default_method_is_slic() {
        let method = SegmentationMethod::default();
        assert_eq!(method.name(), "slic");
        assert_eq!(
            method,
            SegmentationMethod::Slic {
                n_segments: 250,
                compactness: 2.0,
                max_iterations: 10,
                sigma: 1.0,
            }
        );
    }

    #[test]
    fn test_segment_grid_quadrants() {
        let image = Image::zeros((4, 4, 3));
        let map = segment(image.view(), &SegmentationMethod::Grid { rows: 2, cols: 2 }).unwrap();
        assert_eq!(map.num_segments(), 4);
        assert_eq!(map.segment_sizes(), vec![4, 4, 4, 4]);
    }

    #[test]
    fn test_every_method_yields_partition() {
        let image = gradient(24, 24);
        let methods = [
            SegmentationMethod::Grid { rows: 3, cols: 4 },
            SegmentationMethod::default(),
            SegmentationMethod::Felzenszwalb {
                scale: 50.0,
                sigma: 0.6,
                min_size: 10,
            },
        ];
        for method in &methods {
            let map = segment(image.view(), method).unwrap();
            assert!(map.segment_sizes().iter().all(|&s| s > 0), "{}", method.name());
            assert_eq!(map.labels().dim(), (24, 24));
        }
    }

    #[test]
    fn test_single_segment_is_rejected() {
        let image = Image::zeros((4, 4, 3));
        let err = segment(image.view(), &SegmentationMethod::Grid { rows: 1, cols: 1 }).unwrap_err();
        assert!(matches!(
            err,
            ExplainError::Configuration(ConfigurationError::TooFewSegments { found: 1 })
        ));
    }

    #[test]
    fn test_non_rgb_image_is_rejected() {
        let image = Image::zeros((4, 4, 4));
        assert!(segment(image.view(), &SegmentationMethod::default()).is_err());
    }

    #[test]
    fn test_invalid_parameter_is_named() {
        let method = SegmentationMethod::Slic {
            n_segments: 10,
            compactness: -1.0,
            max_iterations: 10,
            sigma: 1.0,
        };
        let err = method.validate().unwrap_err();
        assert!(err.to_string().contains("segmentation.compactness"));
    }

    #[test]
    fn test_serde_tagged_with_defaults() {
        let method: SegmentationMethod =
            serde_json::from_str(r#"{"method": "felzenszwalb", "scale": 100.0}"#).unwrap();
        assert_eq!(
            method,
            SegmentationMethod::Felzenszwalb {
                scale: 100.0,
                sigma: 0.6,
                min_size: 45
            }
        );
    }
}
