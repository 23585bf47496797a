//! Mean shape of a training set.

use std::fs;
use std::path::{Path, PathBuf};

use gi_core::{write_off_file, GeometryImage, TriangleMesh};
use rayon::prelude::*;

use crate::config::{DatasetConfig, Split};
use crate::decode::{decode_geometry, save_geometry_png};
use crate::error::{GiIoError, Result};
use crate::pairs::SamplePaths;

/// OFF file holding the mean shape inside the model directory.
pub const MEAN_SHAPE_OFF: &str = "meanShape.off";
/// PNG preview of the mean geometry image.
pub const MEAN_SHAPE_PNG: &str = "meanShape.png";

/// Per-pixel mean over the unique geometry images of a split.
pub fn mean_geometry_image(paths: &SamplePaths, size: usize) -> Result<GeometryImage> {
    let unique = paths.unique_geometry();
    log::info!("Loading {} unique gi files", unique.len());

    let images = unique
        .par_iter()
        .map(|g| -> Result<GeometryImage> {
            let planar = decode_geometry(g, size)?;
            Ok(GeometryImage::from_planar(size, size, &planar)?)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(GeometryImage::mean(&images)?)
}

/// Write the mean shape of the training split to `model_dir`.
///
/// Does nothing unless mean shapes are enabled, the split is the training
/// split, and no mean shape has been written before. Returns the OFF path
/// when a file was written.
pub fn ensure_mean_shape(
    config: &DatasetConfig,
    split: Split,
    paths: &SamplePaths,
    model_dir: &Path,
) -> Result<Option<PathBuf>> {
    let off_path = model_dir.join(MEAN_SHAPE_OFF);
    if !config.generate_mean_shape || split != Split::Train || off_path.exists() {
        return Ok(None);
    }
    if paths.geometry.is_empty() {
        return Err(GiIoError::InvalidConfig {
            message: "mean shape requested but no geometry images were listed".to_string(),
        });
    }

    let mean = mean_geometry_image(paths, config.gi_size)?;
    fs::create_dir_all(model_dir)?;

    let mesh = TriangleMesh::from_source(mean.clone().into(), false)?;
    write_off_file(&mesh, &off_path)?;
    save_geometry_png(&mean, &model_dir.join(MEAN_SHAPE_PNG))?;

    log::info!("Mean shape saved {}", off_path.display());
    Ok(Some(off_path))
}
