//! # gi_core
//!
//! Geometry images and their conversion to triangle meshes.
//!
//! A geometry image is a fixed-resolution 2D grid whose pixels store 3D
//! surface coordinates. This crate owns everything that happens after a
//! network has produced such a grid:
//!
//! - **Geometry images**: [`GeometryImage`] with mirroring for symmetric shapes
//! - **Grid topology**: deterministic triangulation of one or two grid slices,
//!   including the border stitching that closes two mirrored halves
//! - **Meshes**: [`TriangleMesh`] built from an image, a gridded vertex list
//!   or a bare point list
//! - **OFF output**: writer and parser for the plain-text OFF format
//!
//! ## Usage
//!
//! ```ignore
//! use gi_core::prelude::*;
//!
//! let image = GeometryImage::from_fn(128, 128, |h, w| [h as f32, w as f32, 0.0]);
//!
//! // Reconstruct the unseen half and close the shell
//! let mesh = TriangleMesh::from_source(image.mirrored(DEFAULT_REFLECTOR), true)?;
//! write_off_file(&mesh, "chair.off")?;
//! ```
//!
//! ## Vertex Order
//!
//! Meshes built directly from a [`GeometryImage`] emit vertices column by
//! column (`image[c][r]` for each output row `r` over the image width) and
//! reverse the channel order, so pixel `(ch0, ch1, ch2)` becomes vertex
//! `(ch2, ch1, ch0)`. Gridded vertex lists are emitted exactly as stored.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod image;
pub mod mesh;
pub mod off;
pub mod topology;

pub use error::{GiCoreError, Result};
pub use image::{GeometryImage, DEFAULT_REFLECTOR};
pub use mesh::{MeshSource, TriangleMesh};
pub use off::{parse_off, read_off_file, write_off, write_off_file, OffStats};
pub use topology::{grid_faces, Face, GridShape, Winding};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{GiCoreError, Result};
    pub use crate::image::{GeometryImage, DEFAULT_REFLECTOR};
    pub use crate::mesh::{MeshSource, TriangleMesh};
    pub use crate::off::{parse_off, read_off_file, write_off, write_off_file, OffStats};
    pub use crate::topology::{grid_faces, Face, GridShape, Winding};
}
