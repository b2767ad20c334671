//! Error types for the strata engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::layers::dense::LayerId;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Tensors participating in one operation have incompatible shapes.
    #[error("shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// `backward` was called on a layer with no cached forward pass.
    #[error("backward called on layer {layer} without a preceding forward pass")]
    UninitializedPass { layer: LayerId },

    /// A loss, gradient or parameter became NaN or infinite.
    #[error("non-finite value in {0}")]
    NonFiniteValue(String),

    /// Saving or loading a model failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Invalid sizes, hyperparameters or call ordering.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

/// Failures of the model file format. A load that fails with any of these
/// produces no network.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model file: {0}")]
    Format(#[from] serde_json::Error),

    #[error("unsupported model format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("corrupt layer {layer}: {reason}")]
    Corrupt { layer: usize, reason: String },
}

impl Error {
    pub(crate) fn shape(context: impl Into<String>, expected: &[usize], actual: &[usize]) -> Self {
        Error::ShapeMismatch {
            context: context.into(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// True for errors detected by eager validation (never retried by callers).
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::ShapeMismatch { .. } | Error::Configuration(_))
    }
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PersistenceError::Io { path: path.into(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_classified() {
        assert!(Error::shape("input", &[2], &[3]).is_validation());
        assert!(Error::config("epochs must be at least 1").is_validation());
        assert!(!Error::NonFiniteValue("batch loss".into()).is_validation());
        assert!(!Error::from(PersistenceError::UnsupportedVersion { found: 2, expected: 1 }).is_validation());
    }

    #[test]
    fn messages_name_the_context() {
        let err = Error::shape("layer #3 input", &[1, 4], &[1, 5]);
        assert_eq!(err.to_string(), "shape mismatch in layer #3 input: expected [1, 4], got [1, 5]");
        let err = Error::from(PersistenceError::Corrupt { layer: 1, reason: "3 biases".into() });
        assert_eq!(err.to_string(), "corrupt layer 1: 3 biases");
    }
}
