//! Geometry image storage.

use crate::error::{GiCoreError, Result};
use crate::mesh::MeshSource;
use crate::topology::GridShape;

/// Reflector used to reconstruct the unseen half of a shape that is
/// symmetric about the z = 0 plane.
pub const DEFAULT_REFLECTOR: [f32; 3] = [1.0, 1.0, -1.0];

/// A geometry image: an H×W grid of 3D coordinates.
///
/// Values are stored row-major, channel-interleaved (HWC). Channels are kept
/// in the order the network emits them; reordering to mesh axes happens when
/// a mesh is built from the image.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryImage {
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl GeometryImage {
    /// Number of channels per pixel.
    pub const CHANNELS: usize = 3;

    /// Create a geometry image from an interleaved HWC buffer.
    pub fn new(height: usize, width: usize, data: Vec<f32>) -> Result<Self> {
        let expected = height * width * Self::CHANNELS;
        if data.len() != expected {
            return Err(GiCoreError::InvalidImageSize {
                height,
                width,
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            height,
            width,
            data,
        })
    }

    /// Create an all-zero geometry image.
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            data: vec![0.0; height * width * Self::CHANNELS],
        }
    }

    /// Create a geometry image by evaluating `f(row, col)` for every pixel.
    pub fn from_fn<F>(height: usize, width: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> [f32; 3],
    {
        let mut data = Vec::with_capacity(height * width * Self::CHANNELS);
        for h in 0..height {
            for w in 0..width {
                data.extend_from_slice(&f(h, w));
            }
        }
        Self {
            height,
            width,
            data,
        }
    }

    /// Create a geometry image from a planar CHW buffer (tensor layout).
    pub fn from_planar(height: usize, width: usize, planar: &[f32]) -> Result<Self> {
        let plane = height * width;
        let expected = plane * Self::CHANNELS;
        if planar.len() != expected {
            return Err(GiCoreError::InvalidImageSize {
                height,
                width,
                expected,
                got: planar.len(),
            });
        }

        let mut data = Vec::with_capacity(expected);
        for i in 0..plane {
            data.push(planar[i]);
            data.push(planar[plane + i]);
            data.push(planar[2 * plane + i]);
        }
        Ok(Self {
            height,
            width,
            data,
        })
    }

    /// Convert to a planar CHW buffer (tensor layout).
    pub fn to_planar(&self) -> Vec<f32> {
        let plane = self.height * self.width;
        let mut planar = vec![0.0; plane * Self::CHANNELS];
        for (i, px) in self.data.chunks_exact(Self::CHANNELS).enumerate() {
            planar[i] = px[0];
            planar[plane + i] = px[1];
            planar[2 * plane + i] = px[2];
        }
        planar
    }

    /// Image height (rows).
    pub fn height(&self) -> usize {
        self.height
    }

    /// Image width (columns).
    pub fn width(&self) -> usize {
        self.width
    }

    /// (height, width).
    pub fn dims(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Raw interleaved HWC values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Pixel at (row, col).
    ///
    /// # Panics
    /// Panics if the coordinate is outside the image.
    #[inline]
    pub fn pixel(&self, row: usize, col: usize) -> [f32; 3] {
        assert!(
            row < self.height && col < self.width,
            "pixel ({row}, {col}) outside {}x{} image",
            self.height,
            self.width
        );
        let i = (row * self.width + col) * Self::CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Iterate pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.data
            .chunks_exact(Self::CHANNELS)
            .map(|px| [px[0], px[1], px[2]])
    }

    /// Vertices in mesh emission order.
    ///
    /// The outer loop runs over image columns and the inner loop over image
    /// rows, so vertex `r * height + c` is pixel `(c, r)`. Each coordinate is
    /// reordered from `(ch0, ch1, ch2)` to `(ch2, ch1, ch0)`.
    pub fn mesh_vertices(&self) -> Vec<[f32; 3]> {
        let mut vertices = Vec::with_capacity(self.height * self.width);
        for r in 0..self.width {
            for c in 0..self.height {
                let [x, y, z] = self.pixel(c, r);
                vertices.push([z, y, x]);
            }
        }
        vertices
    }

    /// Grid seen by the face generator for [`Self::mesh_vertices`].
    pub fn mesh_grid(&self) -> GridShape {
        GridShape::new(self.width, self.height)
    }

    /// Build the two-slice vertex list for a mirror-symmetric shape.
    ///
    /// Slice one is the image flattened row-major, slice two is slice one
    /// multiplied component-wise by `reflector`. The result carries an
    /// `height × width` grid so faces can be generated for both slices.
    pub fn mirrored(&self, reflector: [f32; 3]) -> MeshSource {
        let slice: Vec<[f32; 3]> = self.pixels().collect();
        let mut vertices = Vec::with_capacity(slice.len() * 2);
        vertices.extend_from_slice(&slice);
        vertices.extend(slice.iter().map(|p| {
            [
                p[0] * reflector[0],
                p[1] * reflector[1],
                p[2] * reflector[2],
            ]
        }));

        MeshSource::Grid {
            vertices,
            shape: GridShape::new(self.height, self.width),
        }
    }

    /// Per-pixel mean of a set of equally sized geometry images.
    pub fn mean(images: &[GeometryImage]) -> Result<GeometryImage> {
        let first = images.first().ok_or(GiCoreError::EmptyImageSet)?;
        let mut sum = vec![0.0f64; first.data.len()];

        for image in images {
            if image.dims() != first.dims() {
                return Err(GiCoreError::ImageShapeMismatch {
                    expected: first.dims(),
                    got: image.dims(),
                });
            }
            for (acc, v) in sum.iter_mut().zip(&image.data) {
                *acc += *v as f64;
            }
        }

        let n = images.len() as f64;
        let data = sum.into_iter().map(|v| (v / n) as f32).collect();
        GeometryImage::new(first.height, first.width, data)
    }
}
