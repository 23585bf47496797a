//! Error types for gi_core operations.

use thiserror::Error;

/// Errors that can occur while building or writing meshes.
#[derive(Error, Debug)]
pub enum GiCoreError {
    /// Pixel buffer does not match the declared image size.
    #[error("geometry image buffer has {got} values, expected {expected} for {height}x{width}x3")]
    InvalidImageSize {
        /// Declared height.
        height: usize,
        /// Declared width.
        width: usize,
        /// Expected number of values (height * width * 3).
        expected: usize,
        /// Actual number of values.
        got: usize,
    },

    /// Two geometry images that must share a size do not.
    #[error("geometry image size mismatch: expected {expected:?}, got {got:?}")]
    ImageShapeMismatch {
        /// Expected (height, width).
        expected: (usize, usize),
        /// Actual (height, width).
        got: (usize, usize),
    },

    /// Averaging was requested over no images.
    #[error("cannot average an empty set of geometry images")]
    EmptyImageSet,

    /// Grid is too small to carry any cell.
    #[error("grid {rows}x{cols} cannot be triangulated: both dimensions must be at least 2")]
    DegenerateGrid {
        /// Grid rows.
        rows: usize,
        /// Grid columns.
        cols: usize,
    },

    /// Vertex list length matches neither one nor two grid slices.
    #[error("vertex count {got} matches neither one slice ({slice}) nor two slices ({double}) of the grid")]
    VertexCountMismatch {
        /// Number of vertices supplied.
        got: usize,
        /// Vertices in one slice (rows * cols).
        slice: usize,
        /// Vertices in two slices.
        double: usize,
    },

    /// A face references a vertex that does not exist.
    #[error("face {face} references vertex {index} but the mesh has {vertex_count} vertices")]
    FaceIndexOutOfRange {
        /// Index of the offending face.
        face: usize,
        /// Offending vertex index.
        index: usize,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// OFF text could not be parsed.
    #[error("malformed OFF data at line {line}: {message}")]
    MalformedOff {
        /// 1-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for gi_core operations.
pub type Result<T> = std::result::Result<T, GiCoreError>;
