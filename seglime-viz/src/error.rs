//! Error types for explanation rendering.

use seglime_core::ExplainError;

/// Errors raised while turning an explanation into pixels.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Unknown color '{input}': {reason}")]
    InvalidColor { input: String, reason: String },

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Explain(#[from] ExplainError),
}

impl RenderError {
    pub(crate) fn invalid(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn shape(
        what: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// A type alias for results using `RenderError`.
pub type Result<T> = std::result::Result<T, RenderError>;
