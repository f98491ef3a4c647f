//! SLIC superpixels: k-means over colour and position with a local search
//! window, followed by a connectivity pass.

use ndarray::{Array2, ArrayView3};

use super::regions::{connected_components, gaussian_blur, merge_small_components};
use crate::error::Result;
use crate::image::unit_range;

/// Colours are scaled to `[0, 100]` so `compactness` has the same meaning as
/// for Lab-space SLIC.
const COLOR_RANGE: f64 = 100.0;

#[derive(Debug, Clone, Copy)]
struct Center {
    y: f64,
    x: f64,
    color: [f64; 3],
}

pub(crate) fn slic_labels(
    image: ArrayView3<'_, f32>,
    n_segments: usize,
    compactness: f64,
    max_iterations: usize,
    sigma: f64,
) -> Result<Array2<usize>> {
    let (height, width, _) = image.dim();
    let colors = gaussian_blur(&(unit_range(image) * COLOR_RANGE), sigma)?;

    let step = ((height * width) as f64 / n_segments as f64).sqrt().max(1.0);
    let grid_rows = ((height as f64 / step).round() as usize).clamp(1, height);
    let grid_cols = ((width as f64 / step).round() as usize).clamp(1, width);

    let mut centers: Vec<Center> = Vec::with_capacity(grid_rows * grid_cols);
    for row in 0..grid_rows {
        for col in 0..grid_cols {
            let y = (row as f64 + 0.5) * height as f64 / grid_rows as f64;
            let x = (col as f64 + 0.5) * width as f64 / grid_cols as f64;
            let (py, px) = (y as usize, x as usize);
            centers.push(Center {
                y,
                x,
                color: [colors[[py, px, 0]], colors[[py, px, 1]], colors[[py, px, 2]]],
            });
        }
    }

    // Seed every pixel with its grid cell so pixels outside all search
    // windows still carry a valid label.
    let mut labels = Array2::from_shape_fn((height, width), |(y, x)| {
        (y * grid_rows / height) * grid_cols + x * grid_cols / width
    });
    let mut distances = Array2::from_elem((height, width), f64::INFINITY);
    let spatial_weight = (compactness / step).powi(2);
    let radius = (2.0 * step).ceil() as isize;

    for iteration in 0..max_iterations {
        distances.fill(f64::INFINITY);
        let mut changed = false;

        for (k, center) in centers.iter().enumerate() {
            let cy = center.y as isize;
            let cx = center.x as isize;
            let y0 = (cy - radius).max(0) as usize;
            let y1 = ((cy + radius + 1) as usize).min(height);
            let x0 = (cx - radius).max(0) as usize;
            let x1 = ((cx + radius + 1) as usize).min(width);

            for y in y0..y1 {
                for x in x0..x1 {
                    let color_dist: f64 = (0..3)
                        .map(|c| (colors[[y, x, c]] - center.color[c]).powi(2))
                        .sum();
                    let dy = y as f64 - center.y;
                    let dx = x as f64 - center.x;
                    let dist = color_dist + spatial_weight * (dy * dy + dx * dx);
                    if dist < distances[[y, x]] {
                        distances[[y, x]] = dist;
                        if labels[[y, x]] != k {
                            labels[[y, x]] = k;
                            changed = true;
                        }
                    }
                }
            }
        }

        let mut sums = vec![[0.0f64; 5]; centers.len()];
        let mut counts = vec![0usize; centers.len()];
        for ((y, x), &k) in labels.indexed_iter() {
            let acc = &mut sums[k];
            acc[0] += y as f64;
            acc[1] += x as f64;
            for c in 0..3 {
                acc[2 + c] += colors[[y, x, c]];
            }
            counts[k] += 1;
        }
        for (center, (acc, &count)) in centers.iter_mut().zip(sums.iter().zip(&counts)) {
            if count == 0 {
                continue;
            }
            let n = count as f64;
            center.y = acc[0] / n;
            center.x = acc[1] / n;
            center.color = [acc[2] / n, acc[3] / n, acc[4] / n];
        }

        if !changed && iteration > 0 {
            break;
        }
    }

    let (components, count) = connected_components(&labels);
    let min_size = ((step * step) / 4.0) as usize;
    Ok(merge_small_components(&components, count, min_size.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;
    use crate::segmentation::SegmentMap;

    fn two_tone(height: usize, width: usize) -> Image {
        Image::from_shape_fn((height, width, 3), |(_, x, c)| {
            if x < width / 2 {
                if c == 0 { 255.0 } else { 0.0 }
            } else if c == 2 {
                255.0
            } else {
                0.0
            }
        })
    }

    #[test]
    fn test_slic_respects_colour_edge() {
        let image = two_tone(16, 16);
        let labels = slic_labels(image.view(), 4, 10.0, 10, 0.0).unwrap();
        for y in 0..16 {
            assert_ne!(labels[[y, 7]], labels[[y, 8]], "row {y} straddles the edge");
        }
    }

    #[test]
    fn test_slic_produces_connected_partition() {
        let image = Image::from_shape_fn((20, 24, 3), |(y, x, c)| ((y * 7 + x * 3 + c * 11) % 256) as f32);
        let labels = slic_labels(image.view(), 12, 10.0, 10, 1.0).unwrap();
        let map = SegmentMap::relabel(labels).unwrap();
        let (_, components) = connected_components(map.labels());
        assert_eq!(components, map.num_segments());
    }

    #[test]
    fn test_slic_is_deterministic() {
        let image = two_tone(12, 12);
        let a = slic_labels(image.view(), 9, 5.0, 5, 1.0).unwrap();
        let b = slic_labels(image.view(), 9, 5.0, 5, 1.0).unwrap();
        assert_eq!(a, b);
    }
}
