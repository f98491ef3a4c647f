//! Perturbation rendering: materialise inclusion vectors as images.

use ndarray::{Array3, ArrayView1, ArrayView3, ArrayViewMut3, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};
use crate::image::{CHANNELS, Image, ImageBatch, validate_image};
use crate::sampling::SampleSet;
use crate::segmentation::SegmentMap;

/// What hidden segments are painted with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FillPolicy {
    /// A fixed colour in the image's own value range.
    Constant { color: [f32; 3] },
    /// The mean colour of the whole image.
    ImageMean,
    /// Each hidden segment takes its own mean colour.
    SegmentMean,
}

impl Default for FillPolicy {
    fn default() -> Self {
        Self::Constant { color: [0.0; 3] }
    }
}

impl FillPolicy {
    pub fn validate(&self) -> Result<()> {
        if let Self::Constant { color } = self {
            if color.iter().any(|c| !c.is_finite()) {
                return Err(ConfigurationError::invalid(
                    "fill.color",
                    format!("channels must be finite, got {color:?}"),
                )
                .into());
            }
        }
        Ok(())
    }
}

/// Renders perturbed copies of one image under one segmentation.
///
/// The fill image is computed once at construction so every perturbation of
/// a run uses the same fill.
#[derive(Debug)]
pub struct PerturbationRenderer<'a, 'm> {
    image: ArrayView3<'a, f32>,
    segment_map: &'m SegmentMap,
    fill: Image,
}

impl<'a, 'm> PerturbationRenderer<'a, 'm> {
    pub fn new(
        image: ArrayView3<'a, f32>,
        segment_map: &'m SegmentMap,
        policy: &FillPolicy,
    ) -> Result<Self> {
        validate_image(image)?;
        policy.validate()?;
        let (height, width, _) = image.dim();
        if (height, width) != (segment_map.height(), segment_map.width()) {
            return Err(ConfigurationError::shape(
                "segment map",
                format!("({height}, {width}) to match the image"),
                format!("({}, {})", segment_map.height(), segment_map.width()),
            )
            .into());
        }

        let fill = match policy {
            FillPolicy::Constant { color } => {
                Array3::from_shape_fn((height, width, CHANNELS), |(_, _, c)| color[c])
            }
            FillPolicy::ImageMean => {
                let mean = image
                    .mean_axis(Axis(0))
                    .and_then(|rows| rows.mean_axis(Axis(0)))
                    .ok_or_else(|| ConfigurationError::invalid("image", "cannot average an empty image"))?;
                Array3::from_shape_fn((height, width, CHANNELS), |(_, _, c)| mean[c])
            }
            FillPolicy::SegmentMean => segment_means(image, segment_map),
        };

        Ok(Self {
            image,
            segment_map,
            fill,
        })
    }

    /// The image every hidden pixel is copied from.
    pub fn fill(&self) -> &Image {
        &self.fill
    }

    /// Render one perturbation into a fresh buffer.
    pub fn render(&self, inclusion: ArrayView1<'_, bool>) -> Result<Image> {
        self.check_inclusion(inclusion)?;
        let mut out = Image::zeros(self.image.raw_dim());
        self.render_into(inclusion, out.view_mut());
        Ok(out)
    }

    /// Render every sample, row `i` of the batch from row `i` of `samples`.
    pub fn render_batch(&self, samples: &SampleSet) -> Result<ImageBatch> {
        let (height, width, _) = self.image.dim();
        let mut batch = ImageBatch::zeros((samples.num_samples(), height, width, CHANNELS));
        for (i, mut slot) in batch.axis_iter_mut(Axis(0)).enumerate() {
            let inclusion = samples.row(i);
            self.check_inclusion(inclusion)?;
            self.render_into(inclusion, slot.view_mut());
        }
        Ok(batch)
    }

    fn check_inclusion(&self, inclusion: ArrayView1<'_, bool>) -> Result<()> {
        if inclusion.len() != self.segment_map.num_segments() {
            return Err(ConfigurationError::shape(
                "inclusion vector",
                format!("length {}", self.segment_map.num_segments()),
                format!("length {}", inclusion.len()),
            )
            .into());
        }
        Ok(())
    }

    fn render_into(&self, inclusion: ArrayView1<'_, bool>, mut out: ArrayViewMut3<'_, f32>) {
        Zip::from(out.lanes_mut(Axis(2)))
            .and(self.image.lanes(Axis(2)))
            .and(self.fill.lanes(Axis(2)))
            .and(self.segment_map.labels())
            .for_each(|mut pixel, original, fill, &id| {
                let source = if inclusion[id] { original } else { fill };
                pixel.assign(&source);
            });
    }
}

fn segment_means(image: ArrayView3<'_, f32>, segment_map: &SegmentMap) -> Image {
    let n = segment_map.num_segments();
    let mut sums = vec![[0.0f64; CHANNELS]; n];
    let sizes = segment_map.segment_sizes();
    for ((y, x), &id) in segment_map.labels().indexed_iter() {
        for c in 0..CHANNELS {
            sums[id][c] += f64::from(image[[y, x, c]]);
        }
    }
    let (height, width, _) = image.dim();
    Image::from_shape_fn((height, width, CHANNELS), |(y, x, c)| {
        let id = segment_map.id_at(y, x);
        (sums[id][c] / sizes[id] as f64) as f32
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn quadrant_map() -> SegmentMap {
        SegmentMap::from_labels(array![[0, 1], [2, 3]]).unwrap()
    }

    fn image() -> Image {
        Image::from_shape_fn((2, 2, 3), |(y, x, c)| (10 * (y * 2 + x) + c + 1) as f32)
    }

    #[test]
    fn test_render_constant_fill() {
        let map = quadrant_map();
        let img = image();
        let renderer = PerturbationRenderer::new(
            img.view(),
            &map,
            &FillPolicy::Constant {
                color: [7.0, 8.0, 9.0],
            },
        )
        .unwrap();
        let out = renderer.render(array![true, false, false, true].view()).unwrap();
        assert_eq!(out.slice(ndarray::s![0, 0, ..]), img.slice(ndarray::s![0, 0, ..]));
        assert_eq!(out.slice(ndarray::s![0, 1, ..]), array![7.0f32, 8.0, 9.0]);
        assert_eq!(out.slice(ndarray::s![1, 0, ..]), array![7.0f32, 8.0, 9.0]);
        assert_eq!(out.slice(ndarray::s![1, 1, ..]), img.slice(ndarray::s![1, 1, ..]));
    }

    #[test]
    fn test_render_does_not_alias_input() {
        let map = quadrant_map();
        let img = image();
        let before = img.clone();
        let renderer = PerturbationRenderer::new(img.view(), &map, &FillPolicy::default()).unwrap();
        let out = renderer.render(array![false, false, false, false].view()).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
        assert_eq!(img, before);
    }

    #[test]
    fn test_image_mean_fill() {
        let map = quadrant_map();
        let img = image();
        let renderer = PerturbationRenderer::new(img.view(), &map, &FillPolicy::ImageMean).unwrap();
        // Red channel values are 1, 11, 21, 31.
        assert!((renderer.fill()[[0, 0, 0]] - 16.0).abs() < 1e-5);
    }

    #[test]
    fn test_segment_mean_fill() {
        let map = SegmentMap::from_labels(array![[0, 0], [1, 1]]).unwrap();
        let img = image();
        let renderer = PerturbationRenderer::new(img.view(), &map, &FillPolicy::SegmentMean).unwrap();
        let out = renderer.render(array![false, true].view()).unwrap();
        assert!((out[[0, 0, 0]] - 6.0).abs() < 1e-5);
        assert!((out[[0, 1, 0]] - 6.0).abs() < 1e-5);
        assert_eq!(out[[1, 0, 0]], 21.0);
    }

    #[test]
    fn test_batch_rows_follow_samples() {
        let map = quadrant_map();
        let img = image();
        let renderer = PerturbationRenderer::new(img.view(), &map, &FillPolicy::default()).unwrap();
        let samples = SampleSet::from_inclusions(array![
            [true, false, false, false],
            [false, false, false, true]
        ])
        .unwrap();
        let batch = renderer.render_batch(&samples).unwrap();
        assert_eq!(batch.dim(), (2, 2, 2, 3));
        assert_eq!(batch[[0, 0, 0, 0]], 1.0);
        assert_eq!(batch[[0, 1, 1, 0]], 0.0);
        assert_eq!(batch[[1, 0, 0, 0]], 0.0);
        assert_eq!(batch[[1, 1, 1, 0]], 31.0);
    }

    #[test]
    fn test_shape_mismatches_are_rejected() {
        let map = quadrant_map();
        let wide = Image::zeros((2, 3, 3));
        assert!(PerturbationRenderer::new(wide.view(), &map, &FillPolicy::default()).is_err());

        let img = image();
        let renderer = PerturbationRenderer::new(img.view(), &map, &FillPolicy::default()).unwrap();
        assert!(renderer.render(array![true, false].view()).is_err());
    }

    /// Renders under a map that lives shorter than the image, then hands
    /// the map on.
    fn render_then_keep_map<'a>(image: ArrayView3<'a, f32>) -> (ImageBatch, SegmentMap) {
        let map = SegmentMap::from_labels(array![[0, 0], [1, 1]]).unwrap();
        let renderer = PerturbationRenderer::new(image, &map, &FillPolicy::default()).unwrap();
        let samples = SampleSet::from_inclusions(array![[true, false]]).unwrap();
        let batch = renderer.render_batch(&samples).unwrap();
        (batch, map)
    }

    #[test]
    fn test_map_borrow_is_independent_of_image() {
        let img = image();
        let (batch, map) = render_then_keep_map(img.view());
        assert_eq!(map.num_segments(), 2);
        assert_eq!(batch[[0, 0, 1, 0]], img[[0, 1, 0]]);
        assert_eq!(batch[[0, 1, 0, 0]], 0.0);
    }

    #[test]
    fn test_non_finite_fill_is_rejected() {
        let policy = FillPolicy::Constant {
            color: [f32::NAN, 0.0, 0.0],
        };
        assert!(policy.validate().is_err());
    }
}
