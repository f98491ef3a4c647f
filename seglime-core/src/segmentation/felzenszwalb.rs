//! Felzenszwalb–Huttenlocher graph-based segmentation.
//!
//! Pixels are nodes of an 8-connected graph weighted by colour distance.
//! Edges are processed in ascending weight order and two components merge
//! when the edge is no heavier than either component's internal difference
//! plus `k / |C|`. A final pass absorbs components below `min_size`.

use ndarray::{Array2, ArrayView3};
use petgraph::unionfind::UnionFind;

use super::regions::gaussian_blur;
use crate::error::Result;
use crate::image::unit_range;

/// Union-find over pixels, with each component's size and internal
/// difference stored at its root.
struct Components {
    sets: UnionFind<usize>,
    size: Vec<usize>,
    internal: Vec<f64>,
}

impl Components {
    fn new(len: usize) -> Self {
        Self {
            sets: UnionFind::new(len),
            size: vec![1; len],
            internal: vec![0.0; len],
        }
    }

    fn find(&mut self, node: usize) -> usize {
        self.sets.find_mut(node)
    }

    /// Join the sets rooted at `a` and `b`.
    fn merge(&mut self, a: usize, b: usize, weight: f64) {
        let total = self.size[a] + self.size[b];
        self.sets.union(a, b);
        let root = self.sets.find_mut(a);
        self.size[root] = total;
        self.internal[root] = weight;
    }
}

pub(crate) fn felzenszwalb_labels(
    image: ArrayView3<'_, f32>,
    scale: f64,
    sigma: f64,
    min_size: usize,
) -> Result<Array2<usize>> {
    let (height, width, _) = image.dim();
    let colors = gaussian_blur(&unit_range(image), sigma)?;
    let k = scale / 255.0;
    let index = |y: usize, x: usize| y * width + x;

    let mut edges: Vec<(f64, usize, usize)> = Vec::with_capacity(height * width * 4);
    for y in 0..height {
        for x in 0..width {
            let mut push = |ny: usize, nx: usize| {
                let weight = (0..3)
                    .map(|c| (colors[[y, x, c]] - colors[[ny, nx, c]]).powi(2))
                    .sum::<f64>()
                    .sqrt();
                edges.push((weight, index(y, x), index(ny, nx)));
            };
            if x + 1 < width {
                push(y, x + 1);
            }
            if y + 1 < height {
                push(y + 1, x);
                if x + 1 < width {
                    push(y + 1, x + 1);
                }
                if x > 0 {
                    push(y + 1, x - 1);
                }
            }
        }
    }
    edges.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut sets = Components::new(height * width);
    for &(weight, a, b) in &edges {
        let ra = sets.find(a);
        let rb = sets.find(b);
        if ra == rb {
            continue;
        }
        let threshold_a = sets.internal[ra] + k / sets.size[ra] as f64;
        let threshold_b = sets.internal[rb] + k / sets.size[rb] as f64;
        if weight <= threshold_a.min(threshold_b) {
            sets.merge(ra, rb, weight);
        }
    }

    for &(weight, a, b) in &edges {
        let ra = sets.find(a);
        let rb = sets.find(b);
        if ra != rb && (sets.size[ra] < min_size || sets.size[rb] < min_size) {
            sets.merge(ra, rb, weight);
        }
    }

    let roots = sets.sets.into_labeling();
    Ok(Array2::from_shape_fn((height, width), |(y, x)| roots[index(y, x)]))
}
