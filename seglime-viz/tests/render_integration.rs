//! Explain a synthetic image end to end and render the result.

use ndarray::{Array2, ArrayView4, Axis, s};
use pretty_assertions::assert_eq;

use seglime_core::{ExplainConfig, Image, SegmentationMethod, SurrogateModel, explain_classification};
use seglime_viz::{
    Color, RenderOptions, Selection, SelectionLimits, generate_overlay, render_explanation,
    scale_overlay, select_segments,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Likes a bright top-left quadrant, dislikes a bright bottom-right one.
fn quadrant_preference(batch: ArrayView4<'_, f32>) -> anyhow::Result<Array2<f64>> {
    let k = batch.len_of(Axis(0));
    Ok(Array2::from_shape_fn((k, 2), |(i, class)| {
        let good = f64::from(batch[[i, 0, 0, 0]]);
        let bad = f64::from(batch[[i, 7, 7, 0]]);
        let score = 0.5 + 0.4 * good - 0.3 * bad;
        if class == 0 { score } else { 1.0 - score }
    }))
}

fn explained() -> (Image, seglime_core::Explanation) {
    let image = Image::from_elem((8, 8, 3), 1.0);
    let mut config = ExplainConfig::default().with_seed(5);
    config.segmentation = SegmentationMethod::Grid { rows: 2, cols: 2 };
    config.sampling.num_samples = 64;
    config.surrogate = SurrogateModel::Linear;
    let explanation = explain_classification(image.view(), &quadrant_preference, &config, Some(0)).unwrap();
    (image, explanation)
}

#[test]
fn test_render_highlights_both_signs() {
    init_tracing();
    let (image, explanation) = explained();
    assert!((explanation.segment_weights[0] - 0.4).abs() < 1e-9);
    assert!((explanation.segment_weights[3] + 0.3).abs() < 1e-9);

    let options = RenderOptions {
        coverage: 0.5,
        ..RenderOptions::default()
    };
    let rendered = render_explanation(image.view(), &explanation, &options).unwrap();
    assert_eq!(rendered.dim(), image.dim());

    // Top-left tinted green, bottom-right tinted red, the others untouched.
    let top_left = rendered.slice(s![0, 0, ..]).to_vec();
    assert!(top_left[1] > top_left[0] && top_left[1] > top_left[2]);
    let bottom_right = rendered.slice(s![7, 7, ..]).to_vec();
    assert!(bottom_right[0] > bottom_right[1] && bottom_right[0] > bottom_right[2]);
    assert_eq!(rendered.slice(s![0, 7, ..]).to_vec(), vec![1.0, 1.0, 1.0]);

    // The weaker segment is painted less opaquely, so stays brighter.
    assert!(bottom_right[1] > top_left[0]);
}

#[test]
fn test_render_with_boundaries() {
    init_tracing();
    let (image, explanation) = explained();
    let options = RenderOptions {
        coverage: 0.0,
        boundary_color: Some(Color::new(0, 0, 255)),
        ..RenderOptions::default()
    };
    let rendered = render_explanation(image.view(), &explanation, &options).unwrap();
    // Pixel (4, 1) sits below the horizontal boundary between quadrants.
    let pixel = rendered.slice(s![4, 1, ..]).to_vec();
    assert!(pixel[0].abs() < 1e-6 && pixel[1].abs() < 1e-6);
    assert!((pixel[2] - 1.0).abs() < 1e-6);
    // Pixel (1, 1) is inside the first quadrant and off every boundary.
    assert!(rendered[[1, 1, 1]] > rendered[[1, 1, 0]]);
}

#[test]
fn test_select_and_upscale_for_display() {
    init_tracing();
    let (_, explanation) = explained();
    let negated = explanation.segment_weights.mapv(|w| -w);
    let worst = select_segments(negated.view(), &explanation.segment_map, Selection::Count(1), &SelectionLimits::default()).unwrap();
    assert_eq!(worst, vec![3]);

    let overlay = generate_overlay(&explanation.segment_map, &worst, "purple".parse().unwrap(), 0.5).unwrap();
    let large = scale_overlay(overlay.view(), (16, 16)).unwrap();
    assert_eq!(large.slice(s![15, 15, ..]).to_vec(), vec![128, 0, 128, 127]);
    assert_eq!(large.slice(s![0, 0, ..]).to_vec(), vec![0, 0, 0, 0]);
}
