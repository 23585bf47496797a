//! # gi_io
//!
//! Dataset plumbing for geometry-image training.
//!
//! - **Pairing**: [`list_pairs`] matches RGB renders with geometry images and
//!   masks following the `<split>`, `<split>_rgb`, `<split>_msk` layout
//! - **Decoding**: PNG → planar `f32` in `[0, 1]`, resized to the configured
//!   resolution, on a bounded [`DecodePool`]
//! - **Parameter log**: [`write_parameter_log`] for the model directory
//! - **Mean shape**: [`ensure_mean_shape`] writes the training set average
//!   as an OFF mesh
//!
//! ## Usage
//!
//! ```ignore
//! use gi_io::prelude::*;
//!
//! let config = DatasetConfig::new("/data/LSS_airplane");
//! let paths = list_pairs(&config, Split::Train)?;
//! let pool = DecodePool::new(config.num_workers)?;
//! let samples = pool.decode_samples(&paths, &config)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod decode;
pub mod error;
pub mod mean;
pub mod pairs;
pub mod params;
pub mod pool;

pub use config::{default_views, DatasetConfig, Split};
pub use decode::{decode_geometry, decode_mask, decode_rgb, load_geometry_image, save_geometry_png};
pub use error::{GiIoError, Result};
pub use mean::{ensure_mean_shape, mean_geometry_image, MEAN_SHAPE_OFF};
pub use pairs::{list_images, list_pairs, GeometryPaths, SamplePaths};
pub use params::{write_parameter_log, ParamValue, PARAMETER_FILE};
pub use pool::{shuffle_samples, DecodePool, ImageSample, Sample};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{DatasetConfig, Split};
    pub use crate::decode::{load_geometry_image, save_geometry_png};
    pub use crate::error::{GiIoError, Result};
    pub use crate::mean::ensure_mean_shape;
    pub use crate::pairs::{list_images, list_pairs, GeometryPaths, SamplePaths};
    pub use crate::params::{write_parameter_log, ParamValue};
    pub use crate::pool::{shuffle_samples, DecodePool, ImageSample, Sample};
}
