//! Error types for the seglime pipeline.
//!
//! Uses `thiserror` for structured error variants covering the three failure
//! domains of an explanation run: invalid configuration, a misbehaving
//! classifier query function, and a numerically degenerate surrogate fit.
//! Nothing in the pipeline retries; every error surfaces to the caller.

/// Top-level error type for the seglime core library.
#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("External query error: {0}")]
    Query(#[from] QueryError),

    #[error("Fit error: {0}")]
    Fit(#[from] FitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Invalid segmentation, sampling, kernel or fitting parameters, or a
/// malformed input image.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("Invalid shape for {what}: expected {expected}, got {actual}")]
    InvalidShape {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("Segmentation produced {found} segment(s); at least 2 are needed to explain anything")]
    TooFewSegments { found: usize },
}

impl ConfigurationError {
    pub fn invalid(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub fn shape(
        what: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidShape {
            what: what.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// The caller-supplied classifier failed or returned a malformed result.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Classifier query failed: {message}")]
    Failed { message: String },

    #[error("Classifier returned {actual} prediction rows for a batch of {expected} images")]
    RowCountMismatch { expected: usize, actual: usize },

    #[error("Classifier returned predictions with zero classes")]
    NoClasses,

    #[error("Classifier returned a non-finite value at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },
}

/// The weighted regression behind the surrogate model is degenerate.
#[derive(Debug, thiserror::Error)]
pub enum FitError {
    #[error(
        "Sample weights sum to {sum}; the kernel width is too small for these samples, increase it"
    )]
    DegenerateWeights { sum: f64 },

    #[error(
        "Segment {segment} has no variance across the samples; increase sample budget or enable regularization"
    )]
    ConstantSegment { segment: usize },

    #[error(
        "Only {samples} weighted samples for {segments} segments; increase sample budget or enable regularization"
    )]
    Underdetermined { samples: usize, segments: usize },

    #[error("Normal equations are singular ({reason}); increase sample budget or enable regularization")]
    Singular { reason: String },

    #[error("Invalid fit input: {reason}")]
    InvalidInput { reason: String },
}

/// A type alias for results using the top-level `ExplainError`.
pub type Result<T> = std::result::Result<T, ExplainError>;
