//! Pixel-grid helpers shared by the segmentation algorithms.

use image::{ImageBuffer, Rgb};
use imageproc::filter::gaussian_blur_f32;
use ndarray::{Array2, Array3};
use petgraph::unionfind::UnionFind;

use crate::error::{ConfigurationError, Result};

type RgbF32 = ImageBuffer<Rgb<f32>, Vec<f32>>;

/// Gaussian blur over the two spatial axes of an `(H, W, 3)` array.
///
/// A non-positive `sigma` returns an unchanged copy.
pub(crate) fn gaussian_blur(image: &Array3<f64>, sigma: f64) -> Result<Array3<f64>> {
    if sigma <= 0.0 {
        return Ok(image.clone());
    }
    let (height, width, channels) = image.dim();
    let mismatch = || ConfigurationError::shape("image", format!("({height}, {width}, 3)"), format!("({height}, {width}, {channels})"));

    let raw: Vec<f32> = image.iter().map(|&v| v as f32).collect();
    let buffer = RgbF32::from_raw(width as u32, height as u32, raw).ok_or_else(mismatch)?;
    let blurred = gaussian_blur_f32(&buffer, sigma as f32);
    let values = Array3::from_shape_vec((height, width, channels), blurred.into_raw()).map_err(|_| mismatch())?;
    Ok(values.mapv(f64::from))
}

/// Split every label into its 4-connected components.
///
/// Returns the component map (ids `0..count`, raster order of discovery)
/// and the number of components.
pub(crate) fn connected_components(labels: &Array2<usize>) -> (Array2<usize>, usize) {
    let (height, width) = labels.dim();
    let index = |y: usize, x: usize| y * width + x;

    let mut sets = UnionFind::<usize>::new(height * width);
    for ((y, x), &label) in labels.indexed_iter() {
        if y + 1 < height && labels[[y + 1, x]] == label {
            sets.union(index(y, x), index(y + 1, x));
        }
        if x + 1 < width && labels[[y, x + 1]] == label {
            sets.union(index(y, x), index(y, x + 1));
        }
    }

    let roots = sets.into_labeling();
    let mut compact = vec![usize::MAX; roots.len()];
    let mut count = 0;
    let components = Array2::from_shape_fn((height, width), |(y, x)| {
        let root = roots[index(y, x)];
        if compact[root] == usize::MAX {
            compact[root] = count;
            count += 1;
        }
        compact[root]
    });
    (components, count)
}

/// Merge components smaller than `min_size` pixels into their largest
/// adjacent component. Smallest fragments are absorbed first.
///
/// The returned ids are union-find roots, not compacted.
pub(crate) fn merge_small_components(
    components: &Array2<usize>,
    count: usize,
    min_size: usize,
) -> Array2<usize> {
    let (height, width) = components.dim();
    let mut sizes = vec![0usize; count];
    for &id in components.iter() {
        sizes[id] += 1;
    }

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); count];
    for ((y, x), &a) in components.indexed_iter() {
        for (ny, nx) in [(y + 1, x), (y, x + 1)] {
            if ny < height && nx < width {
                let b = components[[ny, nx]];
                if a != b {
                    adjacency[a].push(b);
                    adjacency[b].push(a);
                }
            }
        }
    }
    for neighbours in &mut adjacency {
        neighbours.sort_unstable();
        neighbours.dedup();
    }

    // Sizes and adjacency live at each set's current root.
    let mut sets = UnionFind::<usize>::new(count);
    let mut order: Vec<usize> = (0..count).filter(|&id| sizes[id] < min_size).collect();
    order.sort_by_key(|&id| (sizes[id], id));

    for id in order {
        let root = sets.find_mut(id);
        if sizes[root] >= min_size {
            continue;
        }
        let mut best: Option<usize> = None;
        for &neighbour in &adjacency[root] {
            let other = sets.find_mut(neighbour);
            if other == root {
                continue;
            }
            if best.is_none_or(|b| sizes[other] > sizes[b]) {
                best = Some(other);
            }
        }
        if let Some(target) = best {
            let total = sizes[root] + sizes[target];
            sets.union(root, target);
            let kept = sets.find_mut(root);
            let absorbed = if kept == root { target } else { root };
            sizes[kept] = total;
            let moved = std::mem::take(&mut adjacency[absorbed]);
            adjacency[kept].extend(moved);
        }
    }

    let roots = sets.into_labeling();
    components.mapv(|id| roots[id])
}
