//! Deterministic triangulation of gridded vertex lists.
//!
//! Vertices of one slice are laid out row-major: vertex `(i, j)` of an
//! `rows × cols` grid has index `i * cols + j`. A mirrored construction
//! stores a second slice back-to-back, offset by `rows * cols`.
//!
//! Each cell `(i, j)` with corners
//!
//! ```text
//! a = (i, j)     b = (i, j + 1)
//! c = (i + 1, j) d = (i + 1, j + 1)
//! ```
//!
//! is split along the `b–c` diagonal. The front slice uses triangles
//! `(a, c, b)` and `(b, c, d)`; the back slice uses the reversed winding.
//! Stitching adds two triangles per boundary edge joining the front slice to
//! the back slice, which closes the two halves into a single shell.

use crate::error::{GiCoreError, Result};

/// Triangle as three vertex indices.
pub type Face = [usize; 3];

/// Dimensions of a vertex grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridShape {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl GridShape {
    /// Create a grid shape.
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Vertices in one slice.
    #[inline]
    pub const fn vertex_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Quad cells in one slice.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.rows.saturating_sub(1) * self.cols.saturating_sub(1)
    }

    /// Boundary edges of one slice.
    #[inline]
    pub fn boundary_edge_count(&self) -> usize {
        2 * (self.rows.saturating_sub(1) + self.cols.saturating_sub(1))
    }

    /// Index of vertex `(row, col)` within a slice.
    #[inline]
    pub const fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Whether the grid has at least one cell.
    pub fn is_triangulable(&self) -> bool {
        self.rows >= 2 && self.cols >= 2
    }

    /// Number of faces [`grid_faces`] produces.
    pub fn face_count(&self, mirrored: bool) -> usize {
        if mirrored {
            4 * self.cell_count() + 2 * self.boundary_edge_count()
        } else {
            2 * self.cell_count()
        }
    }

    fn ensure_triangulable(&self) -> Result<()> {
        if self.is_triangulable() {
            Ok(())
        } else {
            Err(GiCoreError::DegenerateGrid {
                rows: self.rows,
                cols: self.cols,
            })
        }
    }
}

/// Triangle orientation of a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    /// Front slice: `(a, c, b)`, `(b, c, d)`.
    Front,
    /// Mirrored slice: `(a, b, c)`, `(b, d, c)`.
    Back,
}

/// Triangulate one slice whose first vertex has index `offset`.
pub fn slice_faces(shape: GridShape, offset: usize, winding: Winding) -> Result<Vec<Face>> {
    shape.ensure_triangulable()?;

    let mut faces = Vec::with_capacity(2 * shape.cell_count());
    for i in 0..shape.rows - 1 {
        for j in 0..shape.cols - 1 {
            let a = offset + shape.index(i, j);
            let b = a + 1;
            let c = a + shape.cols;
            let d = c + 1;
            match winding {
                Winding::Front => {
                    faces.push([a, c, b]);
                    faces.push([b, c, d]);
                }
                Winding::Back => {
                    faces.push([a, b, c]);
                    faces.push([b, d, c]);
                }
            }
        }
    }
    Ok(faces)
}

/// Directed boundary edges `(p, q)` of a front slice, in the direction they
/// are traversed by its triangles. Together they form one closed loop.
pub fn boundary_edges(shape: GridShape) -> Result<Vec<(usize, usize)>> {
    shape.ensure_triangulable()?;

    let (rows, cols) = (shape.rows, shape.cols);
    let mut edges = Vec::with_capacity(shape.boundary_edge_count());

    for j in 0..cols - 1 {
        edges.push((shape.index(0, j + 1), shape.index(0, j)));
    }
    for j in 0..cols - 1 {
        edges.push((shape.index(rows - 1, j), shape.index(rows - 1, j + 1)));
    }
    for i in 0..rows - 1 {
        edges.push((shape.index(i, 0), shape.index(i + 1, 0)));
    }
    for i in 0..rows - 1 {
        edges.push((shape.index(i + 1, cols - 1), shape.index(i, cols - 1)));
    }

    Ok(edges)
}

/// Triangles joining every boundary edge of the front slice to the matching
/// edge of the back slice.
pub fn stitch_faces(shape: GridShape) -> Result<Vec<Face>> {
    let back = shape.vertex_count();
    let edges = boundary_edges(shape)?;

    let mut faces = Vec::with_capacity(2 * edges.len());
    for (p, q) in edges {
        faces.push([q, p, p + back]);
        faces.push([q, p + back, q + back]);
    }
    Ok(faces)
}

/// Faces for one slice, or for two mirrored slices plus stitching.
///
/// # Example
///
/// ```
/// use gi_core::{grid_faces, GridShape};
///
/// let shape = GridShape::new(3, 4);
/// let faces = grid_faces(shape, true).unwrap();
/// assert_eq!(faces.len(), 4 * 2 * 3 + 4 * (2 + 3));
/// ```
pub fn grid_faces(shape: GridShape, mirrored: bool) -> Result<Vec<Face>> {
    let mut faces = Vec::with_capacity(shape.face_count(mirrored));
    faces.extend(slice_faces(shape, 0, Winding::Front)?);

    if mirrored {
        faces.extend(slice_faces(shape, shape.vertex_count(), Winding::Back)?);
        faces.extend(stitch_faces(shape)?);
    }

    log::debug!(
        "Triangulated {}x{} grid ({} slice(s)): {} faces",
        shape.rows,
        shape.cols,
        if mirrored { 2 } else { 1 },
        faces.len()
    );
    Ok(faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn directed_edges(faces: &[Face]) -> HashMap<(usize, usize), usize> {
        let mut edges = HashMap::new();
        for f in faces {
            for k in 0..3 {
                *edges.entry((f[k], f[(k + 1) % 3])).or_insert(0) += 1;
            }
        }
        edges
    }

    #[test]
    fn test_single_cell_front() {
        let faces = slice_faces(GridShape::new(2, 2), 0, Winding::Front).unwrap();
        assert_eq!(faces, vec![[0, 2, 1], [1, 2, 3]]);
    }

    #[test]
    fn test_single_cell_back_is_reversed() {
        let faces = slice_faces(GridShape::new(2, 2), 4, Winding::Back).unwrap();
        assert_eq!(faces, vec![[4, 5, 6], [5, 7, 6]]);
    }

    #[test]
    fn test_face_counts() {
        let shape = GridShape::new(4, 6);
        assert_eq!(grid_faces(shape, false).unwrap().len(), 2 * 3 * 5);
        assert_eq!(
            grid_faces(shape, true).unwrap().len(),
            4 * 3 * 5 + 4 * (3 + 5)
        );
        assert_eq!(shape.face_count(true), 4 * 3 * 5 + 4 * (3 + 5));
    }

    #[test]
    fn test_degenerate_grid() {
        assert!(matches!(
            grid_faces(GridShape::new(1, 8), false),
            Err(GiCoreError::DegenerateGrid { rows: 1, cols: 8 })
        ));
        assert!(grid_faces(GridShape::new(8, 0), true).is_err());
    }

    #[test]
    fn test_boundary_is_closed_loop() {
        let shape = GridShape::new(3, 5);
        let edges = boundary_edges(shape).unwrap();
        assert_eq!(edges.len(), shape.boundary_edge_count());

        let mut out_degree = HashMap::new();
        let mut in_degree = HashMap::new();
        for (p, q) in &edges {
            *out_degree.entry(*p).or_insert(0) += 1;
            *in_degree.entry(*q).or_insert(0) += 1;
        }
        assert!(out_degree.values().all(|&n| n == 1));
        assert_eq!(out_degree.keys().len(), in_degree.keys().len());
    }

    #[test]
    fn test_boundary_edges_match_front_slice() {
        let shape = GridShape::new(3, 4);
        let front = directed_edges(&slice_faces(shape, 0, Winding::Front).unwrap());
        for (p, q) in boundary_edges(shape).unwrap() {
            assert_eq!(front.get(&(p, q)), Some(&1));
            assert_eq!(front.get(&(q, p)), None, "({p}, {q}) is not a border edge");
        }
    }

    #[test]
    fn test_mirrored_shell_is_closed() {
        let shape = GridShape::new(3, 3);
        let edges = directed_edges(&grid_faces(shape, true).unwrap());
        for (&(u, v), &count) in &edges {
            assert_eq!(count, 1, "edge ({u}, {v}) used {count} times");
            assert!(edges.contains_key(&(v, u)), "edge ({u}, {v}) has no twin");
        }
    }

    #[test]
    fn test_indices_in_range() {
        let shape = GridShape::new(5, 7);
        let limit = 2 * shape.vertex_count();
        for f in grid_faces(shape, true).unwrap() {
            assert!(f.iter().all(|&i| i < limit));
        }
    }
}
