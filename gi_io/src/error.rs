//! Error types for gi_io.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while listing or decoding a dataset.
#[derive(Error, Debug)]
pub enum GiIoError {
    /// A required dataset directory does not exist.
    #[error("missing directory: {}", path.display())]
    MissingDirectory {
        /// The directory that was expected.
        path: PathBuf,
    },

    /// Paired file lists ended up with different lengths.
    #[error("list size mismatch: {rgb} rgb files but {other} {kind} files")]
    ListLengthMismatch {
        /// What the second list holds.
        kind: &'static str,
        /// Number of RGB files.
        rgb: usize,
        /// Number of files in the second list.
        other: usize,
    },

    /// An image could not be opened or decoded.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        /// File that failed.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: image::ImageError,
    },

    /// Invalid dataset configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Worker pool could not be created.
    #[error("failed to build decode pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Geometry image or mesh error.
    #[error(transparent)]
    Core(#[from] gi_core::GiCoreError),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GiIoError {
    pub(crate) fn decode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        GiIoError::Decode {
            path: path.into(),
            source,
        }
    }
}

/// Result type for gi_io operations.
pub type Result<T> = std::result::Result<T, GiIoError>;
