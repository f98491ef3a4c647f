//! Query adapter: the single seam between the pipeline and the black-box
//! classifier.

use ndarray::{Array2, ArrayView1, ArrayView3, ArrayView4, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QueryError, Result};

/// Anything that maps a batch of images `(K, H, W, 3)` to class scores
/// `(K, C)`.
///
/// Implementations must not depend on call order or mutate shared state;
/// the pipeline calls `predict` once for the unperturbed image (when no
/// target class is given) and once for the whole perturbation batch.
pub trait Classifier {
    fn predict(&self, batch: ArrayView4<'_, f32>) -> anyhow::Result<Array2<f64>>;
}

impl<F> Classifier for F
where
    F: Fn(ArrayView4<'_, f32>) -> anyhow::Result<Array2<f64>>,
{
    fn predict(&self, batch: ArrayView4<'_, f32>) -> anyhow::Result<Array2<f64>> {
        self(batch)
    }
}

/// Classifier output for a batch, row `i` belonging to batch image `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionMatrix {
    values: Array2<f64>,
}

impl PredictionMatrix {
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn num_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn num_classes(&self) -> usize {
        self.values.ncols()
    }

    /// Scores of one class across every row.
    pub fn column(&self, class: usize) -> ArrayView1<'_, f64> {
        self.values.column(class)
    }

    /// Highest-scoring class of row `row`; ties go to the lowest index.
    pub fn argmax_row(&self, row: usize) -> usize {
        argmax(self.values.row(row))
    }
}

fn argmax(scores: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate() {
        if score > scores[best] {
            best = i;
        }
    }
    best
}

/// Call `classifier` once with the full batch and validate the result.
pub fn query_batch<C: Classifier + ?Sized>(
    classifier: &C,
    batch: ArrayView4<'_, f32>,
) -> Result<PredictionMatrix> {
    let expected = batch.len_of(Axis(0));
    let values = classifier
        .predict(batch)
        .map_err(|e| QueryError::Failed {
            message: format!("{e:#}"),
        })?;

    if values.nrows() != expected {
        return Err(QueryError::RowCountMismatch {
            expected,
            actual: values.nrows(),
        }
        .into());
    }
    if values.ncols() == 0 {
        return Err(QueryError::NoClasses.into());
    }
    if let Some(((row, column), _)) = values.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(QueryError::NonFinite { row, column }.into());
    }

    debug!(rows = values.nrows(), classes = values.ncols(), "Classifier batch answered");
    Ok(PredictionMatrix { values })
}

/// Query the unperturbed image alone and return its top class.
pub fn predict_target_class<C: Classifier + ?Sized>(
    classifier: &C,
    image: ArrayView3<'_, f32>,
) -> Result<usize> {
    let predictions = query_batch(classifier, image.insert_axis(Axis(0)))?;
    Ok(predictions.argmax_row(0))
}
