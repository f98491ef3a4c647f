//! Property-based tests for the pipeline stages using proptest.

use ndarray::{Array1, Array2};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use seglime_core::{
    DistanceMetric, Image, SampleSet, SamplingConfig, SegmentMap, SegmentationMethod,
    SurrogateModel, fit_surrogate, sample_inclusions, segment, similarity_weights,
};

fn assert_partition(map: &SegmentMap) -> Result<(), TestCaseError> {
    let n = map.num_segments();
    prop_assert!(map.labels().iter().all(|&id| id < n));
    let sizes = map.segment_sizes();
    prop_assert!(sizes.iter().all(|&s| s > 0));
    prop_assert_eq!(sizes.iter().sum::<usize>(), map.num_pixels());
    Ok(())
}

// --- Segment map properties ---

proptest! {
    #[test]
    fn relabel_always_yields_partition(
        height in 1usize..8,
        width in 1usize..8,
        raw in proptest::collection::vec(0usize..1000, 64),
    ) {
        let labels = Array2::from_shape_fn((height, width), |(y, x)| raw[y * 8 + x]);
        let map = SegmentMap::relabel(labels.clone()).unwrap();
        assert_partition(&map)?;

        // Pixels share an id exactly when they shared one before.
        for ((y, x), &a) in labels.indexed_iter() {
            prop_assert_eq!(map.id_at(y, x) == map.id_at(0, 0), a == labels[[0, 0]]);
        }
    }

    #[test]
    fn grid_segmentation_is_partition(
        height in 1usize..12,
        width in 1usize..12,
        row_seed in 0usize..12,
        col_seed in 0usize..12,
    ) {
        let rows = 1 + row_seed % height;
        let cols = 1 + col_seed % width;
        if rows * cols < 2 {
            return Ok(());
        }
        let image = Image::zeros((height, width, 3));
        let map = segment(image.view(), &SegmentationMethod::Grid { rows, cols }).unwrap();
        assert_partition(&map)?;
        prop_assert_eq!(map.num_segments(), rows * cols);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn slic_segmentation_is_partition(
        pixels in proptest::collection::vec(0.0f32..1.0, 10 * 12 * 3),
        n_segments in 2usize..12,
    ) {
        let image = Image::from_shape_vec((10, 12, 3), pixels).unwrap();
        let method = SegmentationMethod::Slic { n_segments, compactness: 10.0, max_iterations: 5, sigma: 1.0 };
        // Near-uniform images may legitimately collapse into one segment.
        if let Ok(map) = segment(image.view(), &method) {
            assert_partition(&map)?;
        }
    }

    #[test]
    fn felzenszwalb_segmentation_is_partition(
        pixels in proptest::collection::vec(0u8..=255, 9 * 9 * 3),
        min_size in 1usize..10,
    ) {
        let image = seglime_core::image_from_rgb8(9, 9, &pixels).unwrap();
        let method = SegmentationMethod::Felzenszwalb { scale: 100.0, sigma: 0.5, min_size };
        if let Ok(map) = segment(image.view(), &method) {
            assert_partition(&map)?;
        }
    }
}

// --- Sampling and weighting properties ---

proptest! {
    #[test]
    fn inclusion_vectors_have_one_entry_per_segment(
        num_segments in 1usize..40,
        num_samples in 1usize..64,
        hide_probability in 0.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        let config = SamplingConfig { num_samples, hide_probability };
        let mut rng = StdRng::seed_from_u64(seed);
        let samples = sample_inclusions(num_segments, &config, &mut rng).unwrap();
        prop_assert_eq!(samples.num_samples(), num_samples);
        prop_assert_eq!(samples.num_segments(), num_segments);
        prop_assert!(samples.design_matrix().iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn kernel_weights_decrease_with_hidden_segments(
        num_segments in 1usize..20,
        width in 0.5f64..10.0,
        cosine in any::<bool>(),
    ) {
        // Row r hides the first r segments.
        let inclusions = Array2::from_shape_fn((num_segments + 1, num_segments), |(r, j)| j >= r);
        let samples = SampleSet::from_inclusions(inclusions).unwrap();
        let metric = if cosine { DistanceMetric::Cosine } else { DistanceMetric::Euclidean };
        let weights = similarity_weights(&samples, metric, width).unwrap();

        prop_assert_eq!(weights[0], 1.0);
        prop_assert!(weights.iter().all(|&w| w > 0.0 && w <= 1.0));
        for pair in weights.windows(2) {
            prop_assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn ridge_returns_one_finite_weight_per_segment(
        num_segments in 1usize..16,
        num_samples in 1usize..32,
        seed in any::<u64>(),
    ) {
        let config = SamplingConfig { num_samples, hide_probability: 0.5 };
        let mut rng = StdRng::seed_from_u64(seed);
        let samples = sample_inclusions(num_segments, &config, &mut rng).unwrap();
        let design = samples.design_matrix();
        let targets = design.sum_axis(ndarray::Axis(1)) / num_segments as f64;
        let weights = Array1::from_elem(num_samples, 1.0);

        let fit = fit_surrogate(design.view(), targets.view(), weights.view(), &SurrogateModel::default()).unwrap();
        prop_assert_eq!(fit.coefficients.len(), num_segments);
        prop_assert!(fit.coefficients.iter().all(|c| c.is_finite()));
    }
}
