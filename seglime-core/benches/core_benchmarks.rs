use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ndarray::{Array1, Array2, ArrayView4, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;

use seglime_core::{
    DistanceMetric, ExplainConfig, FillPolicy, Image, PerturbationRenderer, SamplingConfig,
    SegmentationMethod, SurrogateModel, explain_classification, fit_surrogate, sample_inclusions,
    segment, similarity_weights,
};

fn textured_image(size: usize) -> Image {
    Image::from_shape_fn((size, size, 3), |(y, x, c)| {
        let band = ((y / 8) + (x / 8) + c) % 4;
        band as f32 / 3.0
    })
}

fn bench_segmentation(c: &mut Criterion) {
    let image = textured_image(64);

    c.bench_function("segment_grid_8x8", |b| {
        let method = SegmentationMethod::Grid { rows: 8, cols: 8 };
        b.iter(|| segment(black_box(image.view()), &method))
    });

    c.bench_function("segment_slic_64px", |b| {
        let method = SegmentationMethod::default();
        b.iter(|| segment(black_box(image.view()), &method))
    });

    c.bench_function("segment_felzenszwalb_64px", |b| {
        let method = SegmentationMethod::Felzenszwalb {
            scale: 250.0,
            sigma: 0.6,
            min_size: 45,
        };
        b.iter(|| segment(black_box(image.view()), &method))
    });
}

fn bench_sampling_and_rendering(c: &mut Criterion) {
    let image = textured_image(64);
    let map = segment(image.view(), &SegmentationMethod::Grid { rows: 8, cols: 8 }).unwrap();
    let config = SamplingConfig::default();

    c.bench_function("sample_inclusions_128x64", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        b.iter(|| sample_inclusions(black_box(64), &config, &mut rng))
    });

    let mut rng = StdRng::seed_from_u64(1);
    let samples = sample_inclusions(64, &config, &mut rng).unwrap();
    let renderer = PerturbationRenderer::new(image.view(), &map, &FillPolicy::SegmentMean).unwrap();
    c.bench_function("render_batch_128x64px", |b| {
        b.iter(|| renderer.render_batch(black_box(&samples)))
    });

    c.bench_function("similarity_weights_128", |b| {
        b.iter(|| similarity_weights(black_box(&samples), DistanceMetric::Euclidean, 6.0))
    });
}

fn bench_surrogate(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let samples = sample_inclusions(50, &SamplingConfig::default(), &mut rng).unwrap();
    let design = samples.design_matrix();
    let coefficients = Array1::linspace(-1.0, 1.0, 50);
    let targets = design.dot(&coefficients);
    let weights = similarity_weights(&samples, DistanceMetric::Euclidean, 5.3).unwrap();

    for model in [
        SurrogateModel::Linear,
        SurrogateModel::default(),
        SurrogateModel::BayesianRidge {
            max_iterations: 300,
            tolerance: 1e-3,
        },
        SurrogateModel::Lasso {
            alpha: 0.01,
            max_iterations: 1000,
            tolerance: 1e-4,
        },
    ] {
        c.bench_function(&format!("fit_{}_128x50", model.name()), |b| {
            b.iter(|| fit_surrogate(black_box(design.view()), targets.view(), weights.view(), &model))
        });
    }
}

fn bench_end_to_end(c: &mut Criterion) {
    let image = textured_image(48);
    let classifier = |batch: ArrayView4<'_, f32>| -> anyhow::Result<Array2<f64>> {
        let k = batch.len_of(Axis(0));
        Ok(Array2::from_shape_fn((k, 2), |(i, class)| {
            let score = f64::from(batch[[i, 10, 10, 0]] + batch[[i, 30, 30, 1]]) / 2.0;
            if class == 0 { score } else { 1.0 - score }
        }))
    };
    let config = ExplainConfig::default().with_seed(7);

    c.bench_function("explain_classification_48px", |b| {
        b.iter(|| explain_classification(black_box(image.view()), &classifier, &config, Some(0)))
    });
}

criterion_group!(
    benches,
    bench_segmentation,
    bench_sampling_and_rendering,
    bench_surrogate,
    bench_end_to_end,
);
criterion_main!(benches);
