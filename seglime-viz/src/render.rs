//! One-call rendering of an explanation onto its image.

use ndarray::{ArrayView3, Axis, Zip};
use seglime_core::image::Image;
use seglime_core::Explanation;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::Color;
use crate::error::{RenderError, Result};
use crate::overlay::{ReferenceWeight, composite, generate_overlay, mark_boundaries, scale_opacity};
use crate::select::{Selection, SelectionLimits, select_segments};

/// How [`render_explanation`] highlights segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Colour of segments that support the target class.
    #[serde(default = "default_positive_color")]
    pub positive_color: Color,
    /// Colour of segments that argue against it.
    #[serde(default = "default_negative_color")]
    pub negative_color: Color,
    /// Fraction of the image to highlight, strongest segments first.
    #[serde(default = "default_coverage")]
    pub coverage: f64,
    /// Opacity of the strongest segment.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Opacity curve; below 1 emphasises weak segments.
    #[serde(default = "default_exponent")]
    pub exponent: f64,
    #[serde(default)]
    pub limits: SelectionLimits,
    /// Outline every segment in this colour before compositing.
    #[serde(default)]
    pub boundary_color: Option<Color>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            positive_color: default_positive_color(),
            negative_color: default_negative_color(),
            coverage: default_coverage(),
            opacity: default_opacity(),
            exponent: default_exponent(),
            limits: SelectionLimits::default(),
            boundary_color: None,
        }
    }
}

fn default_positive_color() -> Color {
    Color::new(0, 128, 0)
}

fn default_negative_color() -> Color {
    Color::new(255, 0, 0)
}

fn default_coverage() -> f64 {
    0.2
}

fn default_opacity() -> f64 {
    0.7
}

fn default_exponent() -> f64 {
    1.0
}

impl RenderOptions {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.coverage) {
            return Err(RenderError::invalid(
                "coverage",
                format!("must be within [0, 1], got {}", self.coverage),
            ));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(RenderError::invalid(
                "opacity",
                format!("must be within [0, 1], got {}", self.opacity),
            ));
        }
        if !self.exponent.is_finite() || self.exponent <= 0.0 {
            return Err(RenderError::invalid(
                "exponent",
                format!("must be a positive finite number, got {}", self.exponent),
            ));
        }
        Ok(())
    }
}

/// Highlight the most influential segments of `explanation` on a copy of
/// `image`.
///
/// Segments are ranked by absolute weight and chosen until `coverage` of the
/// image is reached. Positive segments are painted in `positive_color`,
/// negative ones in `negative_color`, each with opacity proportional to its
/// absolute weight relative to the strongest segment.
pub fn render_explanation(image: ArrayView3<'_, f32>, explanation: &Explanation, options: &RenderOptions) -> Result<Image> {
    options.validate()?;
    let map = &explanation.segment_map;
    let weights = explanation.segment_weights.view();

    let magnitudes = weights.mapv(f64::abs);
    let selected = select_segments(magnitudes.view(), map, Selection::Coverage(options.coverage), &options.limits)?;
    let (positive, negative): (Vec<usize>, Vec<usize>) = selected
        .iter()
        .copied()
        .filter(|&id| weights[id] != 0.0)
        .partition(|&id| weights[id] > 0.0);

    let mut overlay = generate_overlay(map, &positive, options.positive_color, options.opacity)?;
    let against = generate_overlay(map, &negative, options.negative_color, options.opacity)?;
    Zip::from(overlay.lanes_mut(Axis(2)))
        .and(against.lanes(Axis(2)))
        .for_each(|mut pixel, other| {
            if other[3] > 0 {
                pixel.assign(&other);
            }
        });

    let painted: Vec<usize> = positive.iter().chain(negative.iter()).copied().collect();
    let mut overlay = scale_opacity(
        overlay.view(),
        map,
        weights,
        &painted,
        ReferenceWeight::Max,
        options.exponent,
        1.0,
    )?;
    // Strongest segment at `opacity`, the rest proportionally fainter.
    overlay
        .index_axis_mut(Axis(2), 3)
        .mapv_inplace(|alpha| (f64::from(alpha) * options.opacity) as u8);

    let base = match options.boundary_color {
        Some(color) => mark_boundaries(image, map, color, 1.0)?,
        None => image.to_owned(),
    };
    debug!(
        target_class = explanation.target_class,
        positive = positive.len(),
        negative = negative.len(),
        coverage = map.coverage(&painted),
        "Rendered explanation overlay"
    );
    composite(base.view(), overlay.view())
}
