//! # seglime core
//!
//! LIME for images: explains a black-box classifier's decision on one image
//! by hiding random subsets of image segments, querying the classifier on
//! the perturbed copies, and fitting a locally weighted linear surrogate whose
//! coefficients rank the segments by influence.
//!
//! ```no_run
//! use ndarray::{Array2, ArrayView4, Axis};
//! use seglime_core::{ExplainConfig, Image, explain_classification};
//!
//! let classifier = |batch: ArrayView4<'_, f32>| -> anyhow::Result<Array2<f64>> {
//!     Ok(Array2::from_elem((batch.len_of(Axis(0)), 2), 0.5))
//! };
//! let image = Image::zeros((32, 32, 3));
//! let explanation = explain_classification(image.view(), &classifier, &ExplainConfig::default(), None)?;
//! println!("most influential segment: {:?}", explanation.ranked_segments().first());
//! # Ok::<(), seglime_core::ExplainError>(())
//! ```

pub mod config;
pub mod error;
pub mod explanation;
pub mod image;
pub mod kernel;
pub mod perturb;
pub mod pipeline;
pub mod query;
pub mod sampling;
pub mod segmentation;
pub mod surrogate;

// Re-export commonly used types at the crate root.
pub use config::{ExplainConfig, load_config};
pub use error::{ConfigurationError, ExplainError, FitError, QueryError, Result};
pub use explanation::{Explanation, ExplanationTrace};
pub use image::{Image, ImageBatch, image_from_rgb8};
pub use kernel::{DistanceMetric, KernelConfig, similarity_weights};
pub use perturb::{FillPolicy, PerturbationRenderer};
pub use pipeline::{LimeExplainer, explain_classification};
pub use query::{Classifier, PredictionMatrix, query_batch};
pub use sampling::{SampleSet, SamplingConfig, sample_inclusions};
pub use segmentation::{SegmentMap, SegmentationMethod, segment};
pub use surrogate::{SurrogateFit, SurrogateModel, fit_surrogate};
