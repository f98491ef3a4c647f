//! Image and image-batch representations shared across the pipeline.
//!
//! An [`Image`] is an `(H, W, 3)` array of channel values. Both 0–1 and 0–255
//! ranges are accepted; code that needs normalised colours calls
//! [`unit_range`] instead of assuming either.

use ndarray::{Array3, Array4, ArrayView3};

use crate::error::{ConfigurationError, Result};

/// An RGB image of shape `(height, width, 3)`.
pub type Image = Array3<f32>;

/// A batch of images of shape `(batch, height, width, 3)`.
pub type ImageBatch = Array4<f32>;

/// Number of colour channels every image must carry.
pub const CHANNELS: usize = 3;

/// Check that `image` is a non-empty `(H, W, 3)` array.
pub fn validate_image(image: ArrayView3<'_, f32>) -> Result<()> {
    let (height, width, channels) = image.dim();
    if channels != CHANNELS || height == 0 || width == 0 {
        return Err(ConfigurationError::shape(
            "image",
            "(H > 0, W > 0, 3)",
            format!("({height}, {width}, {channels})"),
        )
        .into());
    }
    Ok(())
}

/// Build an [`Image`] from packed 8-bit RGB bytes in row-major order.
pub fn image_from_rgb8(width: usize, height: usize, pixels: &[u8]) -> Result<Image> {
    let expected = width * height * CHANNELS;
    if pixels.len() != expected {
        return Err(ConfigurationError::shape(
            "rgb8 buffer",
            format!("{expected} bytes"),
            format!("{} bytes", pixels.len()),
        )
        .into());
    }
    let data = pixels.iter().map(|&v| f32::from(v)).collect();
    let image = Array3::from_shape_vec((height, width, CHANNELS), data).map_err(|e| {
        ConfigurationError::shape("rgb8 buffer", "row-major (H, W, 3)", e.to_string())
    })?;
    validate_image(image.view())?;
    Ok(image)
}

/// Scale factor that maps the image's channel values into `[0, 1]`.
///
/// Images with any channel above 1.0 are assumed to be 8-bit range.
pub fn unit_scale(image: ArrayView3<'_, f32>) -> f64 {
    let max = image.iter().fold(0.0_f32, |acc, &v| acc.max(v));
    if max > 1.0 { 1.0 / 255.0 } else { 1.0 }
}

/// Return a copy of `image` with channel values in `[0, 1]`.
pub fn unit_range(image: ArrayView3<'_, f32>) -> Array3<f64> {
    let scale = unit_scale(image);
    image.mapv(|v| f64::from(v) * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_image_accepts_rgb() {
        let image = Image::zeros((4, 5, 3));
        assert!(validate_image(image.view()).is_ok());
    }

    #[test]
    fn test_validate_image_rejects_grayscale() {
        let image = Image::zeros((4, 5, 1));
        let err = validate_image(image.view()).unwrap_err();
        assert!(err.to_string().contains("(4, 5, 1)"));
    }

    #[test]
    fn test_validate_image_rejects_empty() {
        let image = Image::zeros((0, 5, 3));
        assert!(validate_image(image.view()).is_err());
    }

    #[test]
    fn test_image_from_rgb8_layout() {
        let pixels = [255u8, 0, 0, 0, 255, 0];
        let image = image_from_rgb8(2, 1, &pixels).unwrap();
        assert_eq!(image.dim(), (1, 2, 3));
        assert_eq!(image[[0, 0, 0]], 255.0);
        assert_eq!(image[[0, 1, 1]], 255.0);
        assert_eq!(image[[0, 1, 0]], 0.0);
    }

    #[test]
    fn test_image_from_rgb8_length_mismatch() {
        assert!(image_from_rgb8(2, 2, &[0u8; 5]).is_err());
    }

    #[test]
    fn test_unit_range_detects_8bit() {
        let mut image = Image::zeros((1, 1, 3));
        image[[0, 0, 0]] = 255.0;
        let unit = unit_range(image.view());
        assert!((unit[[0, 0, 0]] - 1.0).abs() < 1e-9);

        let mut small = Image::zeros((1, 1, 3));
        small[[0, 0, 1]] = 0.5;
        assert!((unit_range(small.view())[[0, 0, 1]] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_unit_range_keeps_8bit_precision() {
        let image = Image::from_shape_fn((1, 3, 3), |(_, x, _)| [255.0, 200.0, 51.0][x]);
        let unit = unit_range(image.view());
        assert!((unit[[0, 0, 0]] - 1.0).abs() < 1e-12);
        assert!((unit[[0, 1, 0]] - 200.0 / 255.0).abs() < 1e-12);
        assert!((unit[[0, 2, 0]] - 0.2).abs() < 1e-12);
    }
}
