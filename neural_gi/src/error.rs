//! Error types for neural_gi.

use thiserror::Error;

/// Errors that can occur while building, training or exporting the network.
#[derive(Error, Debug)]
pub enum NeuralGiError {
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// An input shape the network cannot process.
    #[error("shape error: {message}")]
    Shape {
        /// Description of the shape problem.
        message: String,
    },

    /// Tensor shape mismatch.
    #[error("tensor shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        got: Vec<usize>,
    },

    /// Masked loss requested for a batch without masks.
    #[error("masked loss requested but the batch has no mask")]
    MissingMask,

    /// Collected batch statistics do not line up with the normalization layers.
    #[error("batch statistics mismatch: {message}")]
    StatisticsMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// A batch with no samples.
    #[error("empty batch")]
    EmptyBatch,

    /// Checkpoint or export failure.
    #[error("checkpoint error: {message}")]
    Checkpoint {
        /// Description of the error.
        message: String,
    },

    /// Dataset error from gi_io.
    #[error("data error: {0}")]
    Data(#[from] gi_io::GiIoError),

    /// Mesh error from gi_core.
    #[error("mesh error: {0}")]
    Mesh(#[from] gi_core::GiCoreError),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NeuralGiError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        NeuralGiError::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn shape(message: impl Into<String>) -> Self {
        NeuralGiError::Shape {
            message: message.into(),
        }
    }

    pub(crate) fn checkpoint(message: impl std::fmt::Display) -> Self {
        NeuralGiError::Checkpoint {
            message: message.to_string(),
        }
    }
}

/// Result type for neural_gi operations.
///
/// The error parameter stays overridable: burn's `Config` derive expands to
/// two-parameter `Result`s in modules that import this alias.
pub type Result<T, E = NeuralGiError> = std::result::Result<T, E>;
