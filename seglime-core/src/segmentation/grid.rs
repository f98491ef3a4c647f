//! Regular rectangular grid segmentation.

use ndarray::Array2;

use crate::error::{ConfigurationError, Result};

/// Split an `(height, width)` grid into `rows × cols` near-equal blocks,
/// numbered row-major.
pub(crate) fn grid_labels(
    height: usize,
    width: usize,
    rows: usize,
    cols: usize,
) -> Result<Array2<usize>> {
    if rows == 0 || rows > height {
        return Err(ConfigurationError::invalid(
            "segmentation.rows",
            format!("must be within 1..={height} for this image, got {rows}"),
        )
        .into());
    }
    if cols == 0 || cols > width {
        return Err(ConfigurationError::invalid(
            "segmentation.cols",
            format!("must be within 1..={width} for this image, got {cols}"),
        )
        .into());
    }

    Ok(Array2::from_shape_fn((height, width), |(y, x)| {
        (y * rows / height) * cols + x * cols / width
    }))
}
