//! PNG decoding into planar `f32` buffers.
//!
//! Pixel values are scaled to `[0, 1]` and resized with a bilinear filter
//! when the file does not already have the requested size. Output is planar
//! CHW, the layout the network consumes.

use std::path::Path;

use gi_core::GeometryImage;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel, Rgb, Rgb32FImage};

use crate::error::{GiIoError, Result};
use crate::pairs::GeometryPaths;

fn open(path: &Path) -> Result<image::DynamicImage> {
    image::open(path).map_err(|e| GiIoError::decode(path, e))
}

fn resized<P>(image: ImageBuffer<P, Vec<f32>>, size: usize) -> ImageBuffer<P, Vec<f32>>
where
    P: Pixel<Subpixel = f32> + 'static,
{
    let size = size as u32;
    if image.width() == size && image.height() == size {
        image
    } else {
        imageops::resize(&image, size, size, FilterType::Triangle)
    }
}

fn planar_rgb(image: &Rgb32FImage) -> Vec<f32> {
    let plane = (image.width() * image.height()) as usize;
    let mut out = vec![0.0; 3 * plane];
    for (i, px) in image.pixels().enumerate() {
        out[i] = px[0];
        out[plane + i] = px[1];
        out[2 * plane + i] = px[2];
    }
    out
}

/// Decode an RGB image as `3 × size × size`. Gray images are expanded to
/// three channels, alpha is dropped.
pub fn decode_rgb(path: &Path, size: usize) -> Result<Vec<f32>> {
    let image = resized(open(path)?.to_rgb32f(), size);
    Ok(planar_rgb(&image))
}

/// Decode the positions of a geometry image as `3 × size × size`.
///
/// The secondary image carries normals and is only used for pairing.
pub fn decode_geometry(paths: &GeometryPaths, size: usize) -> Result<Vec<f32>> {
    decode_rgb(&paths.primary, size)
}

/// Decode a mask as `1 × size × size`.
pub fn decode_mask(path: &Path, size: usize) -> Result<Vec<f32>> {
    let image = resized(open(path)?.to_luma32f(), size);
    Ok(image.into_raw())
}

/// Load a geometry image PNG at its stored resolution.
pub fn load_geometry_image(path: &Path) -> Result<GeometryImage> {
    let image = open(path)?.to_rgb32f();
    let (width, height) = (image.width() as usize, image.height() as usize);
    Ok(GeometryImage::new(height, width, image.into_raw())?)
}

/// Save a geometry image as an 8-bit RGB PNG.
pub fn save_geometry_png(image: &GeometryImage, path: &Path) -> Result<()> {
    let (height, width) = image.dims();
    let buffer: Rgb32FImage = ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
        Rgb(image.pixel(y as usize, x as usize))
    });
    image::DynamicImage::ImageRgb32F(buffer)
        .to_rgb8()
        .save(path)
        .map_err(|e| GiIoError::decode(path, e))
}
