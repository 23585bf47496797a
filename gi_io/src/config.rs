//! Dataset configuration.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::params::ParamValue;

/// Dataset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Split {
    /// Training data (`trn`).
    Train,
    /// Validation data (`val`).
    Validation,
    /// Test data (`tst`).
    Test,
}

impl Split {
    /// Directory name of the split.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Split::Train => "trn",
            Split::Validation => "val",
            Split::Test => "tst",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Views rendered for every object in the standard datasets.
pub fn default_views() -> Vec<String> {
    let mut views = Vec::with_capacity(96);
    for elevation in [0, 2, 3, 4] {
        for azimuth in 0..8 {
            for roll in 0..3 {
                views.push(format!("view{elevation}{azimuth}{roll}"));
            }
        }
    }
    views
}

/// Where the dataset lives and how its images are shaped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Root holding `<split>`, `<split>_rgb` and `<split>_msk`.
    pub data_dir: PathBuf,
    /// Parameterization tag embedded in geometry image file names.
    pub parameterization_suffix: String,
    /// RGB input resolution.
    pub rgb_size: usize,
    /// RGB input channels.
    pub rgb_channels: usize,
    /// Geometry image resolution.
    pub gi_size: usize,
    /// Geometry image channels: 3 (positions) or 6 (positions + normals).
    pub gi_channels: usize,
    /// Views to keep. Empty keeps every view.
    pub selected_views: Vec<String>,
    /// Pair every sample with a loss mask.
    pub use_mask: bool,
    /// Write the training set's mean shape next to the model.
    pub generate_mean_shape: bool,
    /// Inputs are real photographs with no geometry images.
    pub test_on_real: bool,
    /// Decode worker threads.
    pub num_workers: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            parameterization_suffix: "arcSmi".to_string(),
            rgb_size: 128,
            rgb_channels: 3,
            gi_size: 128,
            gi_channels: 3,
            selected_views: default_views(),
            use_mask: true,
            generate_mean_shape: true,
            test_on_real: false,
            num_workers: 4,
        }
    }
}

impl DatasetConfig {
    /// Create a configuration rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Directory of geometry images for a split.
    pub fn geometry_dir(&self, split: Split) -> PathBuf {
        self.data_dir.join(split.dir_name())
    }

    /// Directory of RGB renders for a split.
    pub fn rgb_dir(&self, split: Split) -> PathBuf {
        self.data_dir.join(format!("{}_rgb", split.dir_name()))
    }

    /// Directory of masks for a split.
    pub fn mask_dir(&self, split: Split) -> PathBuf {
        self.data_dir.join(format!("{}_msk", split.dir_name()))
    }

    /// Whether `view` passes the view filter.
    pub fn accepts_view(&self, view: &str) -> bool {
        self.selected_views.is_empty() || self.selected_views.iter().any(|v| v == view)
    }

    /// File name stem shared by all geometry files of object `object`.
    fn geometry_stem(&self, object: &str) -> String {
        format!("{}_{}_{}", object, self.parameterization_suffix, self.gi_size)
    }

    /// Primary geometry image name (`_flatGI.png`).
    pub fn geometry_file(&self, object: &str) -> String {
        format!("{}_flatGI.png", self.geometry_stem(object))
    }

    /// Secondary geometry image name (`_nflatGI.png`).
    pub fn normal_file(&self, object: &str) -> String {
        format!("{}_nflatGI.png", self.geometry_stem(object))
    }

    /// Mask name (`_mflatGI.png`).
    pub fn mask_file(&self, object: &str) -> String {
        format!("{}_mflatGI.png", self.geometry_stem(object))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.rgb_size == 0 || self.gi_size == 0 {
            return Err("rgb_size and gi_size must be positive".to_string());
        }
        if self.rgb_channels != 3 {
            return Err(format!("rgb_channels must be 3, got {}", self.rgb_channels));
        }
        if self.gi_channels != 3 && self.gi_channels != 6 {
            return Err(format!("gi_channels must be 3 or 6, got {}", self.gi_channels));
        }
        if self.parameterization_suffix.is_empty() {
            return Err("parameterization_suffix must not be empty".to_string());
        }
        if self.num_workers == 0 {
            return Err("num_workers must be positive".to_string());
        }
        Ok(())
    }

    /// Check that the directories of a split exist.
    pub fn check_split_dirs(&self, split: Split) -> Result<(), PathBuf> {
        let mut required = vec![self.rgb_dir(split)];
        if !self.test_on_real {
            required.push(self.geometry_dir(split));
            if self.use_mask {
                required.push(self.mask_dir(split));
            }
        }
        match required.into_iter().find(|p| !p.is_dir()) {
            Some(missing) => Err(missing),
            None => Ok(()),
        }
    }

    /// Entries for the parameter log, in a fixed order.
    pub fn parameter_entries(&self) -> Vec<(String, ParamValue)> {
        vec![
            (
                "data_dir".to_string(),
                ParamValue::scalar(self.data_dir.display()),
            ),
            (
                "parameterization_suffix".to_string(),
                ParamValue::scalar(&self.parameterization_suffix),
            ),
            ("rgb_size".to_string(), ParamValue::scalar(self.rgb_size)),
            (
                "rgb_channels".to_string(),
                ParamValue::scalar(self.rgb_channels),
            ),
            ("gi_size".to_string(), ParamValue::scalar(self.gi_size)),
            (
                "gi_channels".to_string(),
                ParamValue::scalar(self.gi_channels),
            ),
            ("use_mask".to_string(), ParamValue::scalar(self.use_mask)),
            (
                "generate_mean_shape".to_string(),
                ParamValue::scalar(self.generate_mean_shape),
            ),
            (
                "test_on_real".to_string(),
                ParamValue::scalar(self.test_on_real),
            ),
            (
                "num_workers".to_string(),
                ParamValue::scalar(self.num_workers),
            ),
            (
                "selected_views".to_string(),
                ParamValue::List(self.selected_views.clone()),
            ),
        ]
    }
}
