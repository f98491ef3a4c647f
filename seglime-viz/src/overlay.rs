//! RGBA overlays over segment maps, and compositing them onto images.
//!
//! Overlays are `(H, W, 4)` arrays of `u8`. Images follow `seglime-core`:
//! `(H, W, 3)` `f32` in either 0–1 or 0–255 range, and colours are mapped
//! into whichever range the image uses.

use ndarray::{Array1, Array3, ArrayView1, ArrayView3, Axis, Zip};
use seglime_core::image::{Image, unit_scale, validate_image};
use seglime_core::SegmentMap;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{RenderError, Result};

/// An RGBA image of shape `(height, width, 4)`.
pub type Overlay = Array3<u8>;

/// Which weight counts as fully opaque when scaling opacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceWeight {
    /// The largest normalised absolute weight of any segment.
    #[default]
    Max,
    /// A fixed normalised weight in `(0, 1]`.
    Fixed(f64),
}

/// Paint `segments` in `color` at `opacity`; every other pixel is fully
/// transparent.
pub fn generate_overlay(segment_map: &SegmentMap, segments: &[usize], color: Color, opacity: f64) -> Result<Overlay> {
    let rgba = color.to_rgba(opacity)?;
    let selected = membership(segment_map, segments);
    let mut overlay = Overlay::zeros((segment_map.height(), segment_map.width(), 4));
    Zip::from(overlay.lanes_mut(Axis(2)))
        .and(segment_map.labels())
        .for_each(|mut pixel, &id| {
            if selected[id] {
                pixel.assign(&ArrayView1::from(&rgba));
            }
        });
    Ok(overlay)
}

/// Set each listed segment's alpha from its weight.
///
/// Weights are normalised by their L2 norm, taken in absolute value and
/// divided by `reference`; the result is raised to `exponent`, clipped to
/// `[0, 1]`, scaled to 0–255 and capped at `255 · max_opacity`. Segments not
/// listed keep the alpha they have in `overlay`. Returns a new overlay.
pub fn scale_opacity(
    overlay: ArrayView3<'_, u8>,
    segment_map: &SegmentMap,
    weights: ArrayView1<'_, f64>,
    segments: &[usize],
    reference: ReferenceWeight,
    exponent: f64,
    max_opacity: f64,
) -> Result<Overlay> {
    check_overlay(overlay, segment_map)?;
    if weights.len() != segment_map.num_segments() {
        return Err(RenderError::shape(
            "segment weights",
            format!("length {}", segment_map.num_segments()),
            format!("length {}", weights.len()),
        ));
    }
    if !(0.0..=1.0).contains(&max_opacity) {
        return Err(RenderError::invalid(
            "max_opacity",
            format!("must be between 0.0 and 1.0, got {max_opacity}"),
        ));
    }

    let norm = weights.dot(&weights).sqrt();
    let rescaled = if norm > 0.0 {
        weights.mapv(|w| (w / norm).abs())
    } else {
        Array1::zeros(weights.len())
    };
    let reference = match reference {
        ReferenceWeight::Max => rescaled.iter().copied().fold(0.0, f64::max),
        ReferenceWeight::Fixed(value) => {
            if !value.is_finite() {
                return Err(RenderError::invalid("reference", format!("must be finite, got {value}")));
            }
            value.clamp(1e-6, 1.0)
        }
    };
    let cap = max_opacity * 255.0;
    let alphas: Vec<u8> = rescaled
        .iter()
        .map(|&w| {
            let ratio = if reference > 0.0 { w / reference } else { 0.0 };
            (255.0 * ratio.powf(exponent).clamp(0.0, 1.0)).min(cap) as u8
        })
        .collect();

    let selected = membership(segment_map, segments);
    let mut scaled = overlay.to_owned();
    Zip::from(scaled.lanes_mut(Axis(2)))
        .and(segment_map.labels())
        .for_each(|mut pixel, &id| {
            if selected[id] {
                pixel[3] = alphas[id];
            }
        });
    Ok(scaled)
}

/// Resize an overlay to `(height, width)` by nearest-neighbour sampling.
pub fn scale_overlay(overlay: ArrayView3<'_, u8>, (height, width): (usize, usize)) -> Result<Overlay> {
    let (src_h, src_w, channels) = overlay.dim();
    if channels != 4 || src_h == 0 || src_w == 0 {
        return Err(RenderError::shape("overlay", "(H > 0, W > 0, 4)", format!("{:?}", overlay.dim())));
    }
    if height == 0 || width == 0 {
        return Err(RenderError::invalid("shape", format!("must be non-empty, got ({height}, {width})")));
    }
    let nearest = |dst: usize, dst_len: usize, src_len: usize| ((dst * 2 + 1) * src_len / (dst_len * 2)).min(src_len - 1);
    Ok(Overlay::from_shape_fn((height, width, 4), |(y, x, c)| {
        overlay[[nearest(y, height, src_h), nearest(x, width, src_w), c]]
    }))
}

/// Draw segment boundaries onto a copy of `image`.
///
/// A pixel is a boundary pixel if its segment differs from the one above or
/// the one to its left; each differing neighbour blends the colour in once.
pub fn mark_boundaries(image: ArrayView3<'_, f32>, segment_map: &SegmentMap, color: Color, opacity: f64) -> Result<Image> {
    color.to_rgba(opacity)?;
    check_image(image, segment_map)?;
    let paint = image_color(image, color);
    let alpha = opacity as f32;
    let labels = segment_map.labels();

    let mut marked = image.to_owned();
    for y in 1..segment_map.height() {
        for x in 1..segment_map.width() {
            let edges = usize::from(labels[[y, x]] != labels[[y - 1, x]]) + usize::from(labels[[y, x]] != labels[[y, x - 1]]);
            for _ in 0..edges {
                for c in 0..3 {
                    marked[[y, x, c]] = marked[[y, x, c]] * (1.0 - alpha) + paint[c] * alpha;
                }
            }
        }
    }
    Ok(marked)
}

/// Logistic squashing of segment weights into `(0, 1)`.
pub fn smooth_weights(weights: ArrayView1<'_, f64>) -> Array1<f64> {
    weights.mapv(|w| 1.0 / (1.0 + (-w).exp()))
}

/// Alpha-composite `overlay` onto a copy of `image`.
pub fn composite(image: ArrayView3<'_, f32>, overlay: ArrayView3<'_, u8>) -> Result<Image> {
    validate_image(image)?;
    let (height, width, _) = image.dim();
    if overlay.dim() != (height, width, 4) {
        return Err(RenderError::shape(
            "overlay",
            format!("({height}, {width}, 4)"),
            format!("{:?}", overlay.dim()),
        ));
    }
    let to_image_range = (1.0 / (255.0 * unit_scale(image))) as f32;
    let mut out = image.to_owned();
    Zip::from(out.lanes_mut(Axis(2)))
        .and(overlay.lanes(Axis(2)))
        .for_each(|mut pixel, rgba| {
            let alpha = f32::from(rgba[3]) / 255.0;
            if alpha > 0.0 {
                for c in 0..3 {
                    pixel[c] = pixel[c] * (1.0 - alpha) + f32::from(rgba[c]) * to_image_range * alpha;
                }
            }
        });
    Ok(out)
}

fn membership(segment_map: &SegmentMap, segments: &[usize]) -> Vec<bool> {
    let mut selected = vec![false; segment_map.num_segments()];
    for &id in segments {
        if let Some(slot) = selected.get_mut(id) {
            *slot = true;
        }
    }
    selected
}

fn image_color(image: ArrayView3<'_, f32>, color: Color) -> [f32; 3] {
    let to_image_range = (1.0 / (255.0 * unit_scale(image))) as f32;
    color.rgb().map(|c| f32::from(c) * to_image_range)
}

fn check_overlay(overlay: ArrayView3<'_, u8>, segment_map: &SegmentMap) -> Result<()> {
    let expected = (segment_map.height(), segment_map.width(), 4);
    if overlay.dim() != expected {
        return Err(RenderError::shape("overlay", format!("{expected:?}"), format!("{:?}", overlay.dim())));
    }
    Ok(())
}

fn check_image(image: ArrayView3<'_, f32>, segment_map: &SegmentMap) -> Result<()> {
    validate_image(image)?;
    let (height, width, _) = image.dim();
    if (height, width) != (segment_map.height(), segment_map.width()) {
        return Err(RenderError::shape(
            "segment map",
            format!("({height}, {width}) to match the image"),
            format!("({}, {})", segment_map.height(), segment_map.width()),
        ));
    }
    Ok(())
}
