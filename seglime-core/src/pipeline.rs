//! The explanation pipeline: segment → sample → render → query → weight →
//! fit → assemble, one forward pass per call.

use ndarray::ArrayView3;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use tracing::{debug, info};

use crate::config::ExplainConfig;
use crate::error::{ConfigurationError, Result};
use crate::explanation::{Explanation, ExplanationTrace};
use crate::image::validate_image;
use crate::kernel::similarity_weights;
use crate::perturb::PerturbationRenderer;
use crate::query::{Classifier, predict_target_class, query_batch};
use crate::sampling::sample_inclusions;
use crate::segmentation::{SegmentMap, segment};
use crate::surrogate::fit_surrogate;

/// Explains classifier decisions on single images under a fixed
/// configuration.
///
/// Holds no state between calls; with a configured seed, repeated calls on
/// the same inputs draw the same samples and produce identical results.
#[derive(Debug, Clone)]
pub struct LimeExplainer {
    config: ExplainConfig,
}

impl LimeExplainer {
    pub fn new(config: ExplainConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExplainConfig {
        &self.config
    }

    /// Explain why `classifier` assigns `target_class` (or, when `None`, its
    /// top class for the unperturbed image) to `image`.
    pub fn explain<C: Classifier + ?Sized>(
        &self,
        image: ArrayView3<'_, f32>,
        classifier: &C,
        target_class: Option<usize>,
    ) -> Result<Explanation> {
        Ok(self.explain_traced(image, classifier, target_class)?.explanation)
    }

    /// Like [`explain`](Self::explain), but over a caller-supplied
    /// segmentation instead of the configured method.
    pub fn explain_with_segments<C: Classifier + ?Sized>(
        &self,
        image: ArrayView3<'_, f32>,
        segment_map: SegmentMap,
        classifier: &C,
        target_class: Option<usize>,
    ) -> Result<Explanation> {
        segment_map.ensure_explainable()?;
        Ok(self.run(image, segment_map, classifier, target_class)?.explanation)
    }

    /// Run the pipeline and keep its intermediate products.
    pub fn explain_traced<C: Classifier + ?Sized>(
        &self,
        image: ArrayView3<'_, f32>,
        classifier: &C,
        target_class: Option<usize>,
    ) -> Result<ExplanationTrace> {
        let segment_map = segment(image, &self.config.segmentation)?;
        self.run(image, segment_map, classifier, target_class)
    }

    fn run<C: Classifier + ?Sized>(
        &self,
        image: ArrayView3<'_, f32>,
        segment_map: SegmentMap,
        classifier: &C,
        target_class: Option<usize>,
    ) -> Result<ExplanationTrace> {
        validate_image(image)?;
        let config = &self.config;
        let num_segments = segment_map.num_segments();

        let target_class = match target_class {
            Some(class) => class,
            None => predict_target_class(classifier, image)?,
        };

        let mut rng = seeded_rng(config.seed);
        let samples = sample_inclusions(num_segments, &config.sampling, &mut rng)?;

        let renderer = PerturbationRenderer::new(image, &segment_map, &config.fill)?;
        let batch = renderer.render_batch(&samples)?;
        let predictions = query_batch(classifier, batch.view())?;
        if target_class >= predictions.num_classes() {
            return Err(ConfigurationError::invalid(
                "target_class",
                format!(
                    "class {target_class} is out of range for a classifier with {} classes",
                    predictions.num_classes()
                ),
            )
            .into());
        }

        let kernel_width = config.kernel.resolve_width(num_segments);
        let weights = similarity_weights(&samples, config.kernel.metric, kernel_width)?;
        debug!(kernel_width, total_weight = weights.sum(), "Weighted samples");

        let design = samples.design_matrix();
        let fit = fit_surrogate(
            design.view(),
            predictions.column(target_class),
            weights.view(),
            &config.surrogate,
        )?;
        debug!(
            model = config.surrogate.name(),
            intercept = fit.intercept,
            score = fit.score,
            "Fitted surrogate"
        );

        info!(
            segments = num_segments,
            samples = samples.num_samples(),
            target_class,
            "Explanation complete"
        );

        let explanation = Explanation::assemble(segment_map, fit.coefficients, target_class)?;
        Ok(ExplanationTrace {
            explanation,
            samples,
            predictions,
            weights,
            kernel_width,
            intercept: fit.intercept,
            score: fit.score,
        })
    }
}

/// Validate `config`, then explain `image` with it.
pub fn explain_classification<C: Classifier + ?Sized>(
    image: ArrayView3<'_, f32>,
    classifier: &C,
    config: &ExplainConfig,
    target_class: Option<usize>,
) -> Result<Explanation> {
    LimeExplainer::new(config.clone())?.explain(image, classifier, target_class)
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    let seed = seed.unwrap_or_else(|| {
        let drawn = OsRng.next_u64();
        debug!(seed = drawn, "No seed configured; drew one from OS entropy");
        drawn
    });
    StdRng::seed_from_u64(seed)
}
