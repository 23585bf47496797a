//! Triangle meshes built from geometry images and vertex lists.

use std::collections::HashMap;

use crate::error::{GiCoreError, Result};
use crate::image::GeometryImage;
use crate::topology::{grid_faces, Face, GridShape};

/// Where mesh vertices come from.
#[derive(Debug, Clone)]
pub enum MeshSource {
    /// A geometry image, emitted column by column with reversed channels.
    Image(GeometryImage),
    /// A vertex list holding one or two slices of a grid.
    Grid {
        /// Vertices, emitted as stored.
        vertices: Vec<[f32; 3]>,
        /// Grid of one slice.
        shape: GridShape,
    },
    /// A vertex list with no known connectivity.
    Points(Vec<[f32; 3]>),
}

impl From<GeometryImage> for MeshSource {
    fn from(image: GeometryImage) -> Self {
        MeshSource::Image(image)
    }
}

/// An indexed triangle mesh.
///
/// Every face index is guaranteed to be below the vertex count.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    vertices: Vec<[f32; 3]>,
    faces: Vec<Face>,
}

impl TriangleMesh {
    /// Create a mesh, checking that every face references an existing vertex.
    pub fn new(vertices: Vec<[f32; 3]>, faces: Vec<Face>) -> Result<Self> {
        let vertex_count = vertices.len();
        for (face, indices) in faces.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i >= vertex_count) {
                return Err(GiCoreError::FaceIndexOutOfRange {
                    face,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(Self { vertices, faces })
    }

    /// Create a mesh without faces.
    pub fn point_cloud(vertices: Vec<[f32; 3]>) -> Self {
        Self {
            vertices,
            faces: Vec::new(),
        }
    }

    /// Build a mesh from a vertex source.
    ///
    /// Faces are generated only when `write_faces` is set and the source
    /// carries a grid. A gridded list must hold exactly one slice
    /// (`rows * cols` vertices) or two mirrored slices.
    pub fn from_source(source: MeshSource, write_faces: bool) -> Result<Self> {
        match source {
            MeshSource::Image(image) => {
                let grid = image.mesh_grid();
                let vertices = image.mesh_vertices();
                let faces = if write_faces {
                    grid_faces(grid, false)?
                } else {
                    Vec::new()
                };
                Self::new(vertices, faces)
            }
            MeshSource::Grid { vertices, shape } => {
                let slice = shape.vertex_count();
                let mirrored = match vertices.len() {
                    n if n == slice => false,
                    n if n == 2 * slice => true,
                    got => {
                        return Err(GiCoreError::VertexCountMismatch {
                            got,
                            slice,
                            double: 2 * slice,
                        })
                    }
                };
                let faces = if write_faces {
                    grid_faces(shape, mirrored)?
                } else {
                    Vec::new()
                };
                Self::new(vertices, faces)
            }
            MeshSource::Points(vertices) => {
                if write_faces {
                    log::warn!(
                        "Faces requested for {} ungridded vertices; writing vertices only",
                        vertices.len()
                    );
                }
                Ok(Self::point_cloud(vertices))
            }
        }
    }

    /// Vertex positions.
    pub fn vertices(&self) -> &[[f32; 3]] {
        &self.vertices
    }

    /// Triangles.
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Axis-aligned bounding box, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.vertices.first()?;
        let mut min = first;
        let mut max = first;
        for v in &self.vertices[1..] {
            for k in 0..3 {
                min[k] = min[k].min(v[k]);
                max[k] = max[k].max(v[k]);
            }
        }
        Some((min, max))
    }

    /// Whether the faces form a closed, consistently oriented 2-manifold.
    ///
    /// Holds when every directed edge is used by exactly one face and its
    /// reverse is used by another. A mesh without faces is not closed.
    pub fn is_closed_manifold(&self) -> bool {
        if self.faces.is_empty() {
            return false;
        }

        let mut edges: HashMap<(usize, usize), u32> = HashMap::with_capacity(self.faces.len() * 3);
        for f in &self.faces {
            for k in 0..3 {
                let edge = (f[k], f[(k + 1) % 3]);
                if edge.0 == edge.1 {
                    return false;
                }
                *edges.entry(edge).or_insert(0) += 1;
            }
        }

        edges
            .iter()
            .all(|(&(u, v), &count)| count == 1 && edges.get(&(v, u)) == Some(&1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::DEFAULT_REFLECTOR;

    #[test]
    fn test_new_rejects_out_of_range() {
        let err = TriangleMesh::new(vec![[0.0; 3]; 3], vec![[0, 1, 3]]).unwrap_err();
        assert!(matches!(
            err,
            GiCoreError::FaceIndexOutOfRange {
                face: 0,
                index: 3,
                vertex_count: 3
            }
        ));
    }

    #[test]
    fn test_image_source_without_faces() {
        let image = GeometryImage::from_fn(4, 3, |h, w| [h as f32, w as f32, 1.0]);
        let mesh = TriangleMesh::from_source(image.into(), false).unwrap();
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.face_count(), 0);
        // First vertex column walks down the image rows.
        assert_eq!(mesh.vertices()[1], [1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_image_source_with_faces() {
        let image = GeometryImage::zeros(4, 3);
        let mesh = TriangleMesh::from_source(image.into(), true).unwrap();
        assert_eq!(mesh.face_count(), 2 * 3 * 2);
    }

    #[test]
    fn test_mirrored_source_is_closed() {
        let image = GeometryImage::from_fn(5, 4, |h, w| [h as f32, w as f32, 1.0]);
        let mesh = TriangleMesh::from_source(image.mirrored(DEFAULT_REFLECTOR), true).unwrap();

        assert_eq!(mesh.vertex_count(), 40);
        assert_eq!(mesh.face_count(), 4 * 4 * 3 + 4 * (4 + 3));
        assert!(mesh.is_closed_manifold());
    }

    #[test]
    fn test_single_slice_is_open() {
        let source = MeshSource::Grid {
            vertices: vec![[0.0; 3]; 9],
            shape: GridShape::new(3, 3),
        };
        let mesh = TriangleMesh::from_source(source, true).unwrap();
        assert_eq!(mesh.face_count(), 8);
        assert!(!mesh.is_closed_manifold());
    }

    #[test]
    fn test_grid_vertex_count_mismatch() {
        let source = MeshSource::Grid {
            vertices: vec![[0.0; 3]; 10],
            shape: GridShape::new(3, 3),
        };
        assert!(matches!(
            TriangleMesh::from_source(source, false),
            Err(GiCoreError::VertexCountMismatch {
                got: 10,
                slice: 9,
                double: 18
            })
        ));
    }

    #[test]
    fn test_points_never_get_faces() {
        let mesh =
            TriangleMesh::from_source(MeshSource::Points(vec![[1.0, 2.0, 3.0]; 4]), true).unwrap();
        assert_eq!(mesh.face_count(), 0);
        assert_eq!(mesh.vertices()[3], [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_bounds() {
        let mesh = TriangleMesh::point_cloud(vec![[0.0, 2.0, -1.0], [1.0, -2.0, 0.5]]);
        assert_eq!(mesh.bounds(), Some(([0.0, -2.0, -1.0], [1.0, 2.0, 0.5])));
        assert_eq!(TriangleMesh::point_cloud(Vec::new()).bounds(), None);
    }
}
