//! Pairing RGB renders with their geometry images and masks.
//!
//! An RGB render `<a>_<b>_..._<view>.png` belongs to object `<a>_<b>`. Its
//! geometry image, secondary geometry image and mask live in the split's
//! geometry and mask directories under names derived from the object, the
//! parameterization suffix and the geometry image size.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{DatasetConfig, Split};
use crate::error::{GiIoError, Result};

/// Geometry files of one sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeometryPaths {
    /// Positions (`_flatGI.png`).
    pub primary: PathBuf,
    /// Normals (`_nflatGI.png`), present in 6-channel mode.
    pub secondary: Option<PathBuf>,
}

/// Index-aligned file lists for one split.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplePaths {
    /// RGB renders.
    pub rgb: Vec<PathBuf>,
    /// Geometry images, empty for real photographs.
    pub geometry: Vec<GeometryPaths>,
    /// Masks, empty unless masks are in use.
    pub masks: Vec<PathBuf>,
}

impl SamplePaths {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.rgb.len()
    }

    /// Whether there are no samples.
    pub fn is_empty(&self) -> bool {
        self.rgb.is_empty()
    }

    /// Geometry images referenced at least once, in first-seen order.
    pub fn unique_geometry(&self) -> Vec<&GeometryPaths> {
        let mut seen = HashSet::new();
        self.geometry.iter().filter(|g| seen.insert(*g)).collect()
    }

    fn check_lengths(&self, masks: bool) -> Result<()> {
        if self.geometry.len() != self.rgb.len() {
            return Err(GiIoError::ListLengthMismatch {
                kind: "geometry",
                rgb: self.rgb.len(),
                other: self.geometry.len(),
            });
        }
        if masks && self.masks.len() != self.rgb.len() {
            return Err(GiIoError::ListLengthMismatch {
                kind: "mask",
                rgb: self.rgb.len(),
                other: self.masks.len(),
            });
        }
        Ok(())
    }
}

/// Split an RGB file name into its object name and view.
///
/// `1a2b_3c4d_view012.png` → `("1a2b_3c4d", "view012")`.
pub fn parse_rgb_name(file_name: &str) -> Option<(String, &str)> {
    let stem = file_name.strip_suffix(".png")?;
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 2 {
        return None;
    }
    let view = parts[parts.len() - 1];
    Some((format!("{}_{}", parts[0], parts[1]), view))
}

/// List the samples of a split.
///
/// RGB renders whose view is not selected, or whose geometry image is
/// missing, are dropped. Renders whose secondary geometry image (6-channel
/// mode) or mask (mask mode) is missing are dropped with a warning.
pub fn list_pairs(config: &DatasetConfig, split: Split) -> Result<SamplePaths> {
    config
        .validate()
        .map_err(|message| GiIoError::InvalidConfig { message })?;
    config
        .check_split_dirs(split)
        .map_err(|path| GiIoError::MissingDirectory { path })?;

    let rgb_dir = config.rgb_dir(split);
    if config.test_on_real {
        return Ok(SamplePaths {
            rgb: list_images(&rgb_dir)?,
            ..Default::default()
        });
    }

    let gi_dir = config.geometry_dir(split);
    let mask_dir = config.mask_dir(split);
    let gi_files: HashSet<String> = file_names(&gi_dir)?.into_iter().collect();
    let mask_files: HashSet<String> = if config.use_mask {
        file_names(&mask_dir)?.into_iter().collect()
    } else {
        HashSet::new()
    };

    log::info!("Listing {} files", split);
    let mut pairs = SamplePaths::default();
    let mut skipped = 0usize;

    for rgb_file in file_names(&rgb_dir)? {
        let Some((object, view)) = parse_rgb_name(&rgb_file) else {
            continue;
        };
        if !config.accepts_view(view) {
            continue;
        }

        let gi_file = config.geometry_file(&object);
        if !gi_files.contains(&gi_file) {
            continue;
        }

        let secondary = if config.gi_channels == 6 {
            let normal_file = config.normal_file(&object);
            if !gi_files.contains(&normal_file) {
                log::warn!("Skipping {}: missing {}", rgb_file, normal_file);
                skipped += 1;
                continue;
            }
            Some(gi_dir.join(normal_file))
        } else {
            None
        };

        if config.use_mask {
            let mask_file = config.mask_file(&object);
            if !mask_files.contains(&mask_file) {
                log::warn!("Skipping {}: missing {}", rgb_file, mask_file);
                skipped += 1;
                continue;
            }
            pairs.masks.push(mask_dir.join(mask_file));
        }

        pairs.rgb.push(rgb_dir.join(&rgb_file));
        pairs.geometry.push(GeometryPaths {
            primary: gi_dir.join(gi_file),
            secondary,
        });
    }

    log::info!("Listed {} rgb files", pairs.rgb.len());
    log::info!("Listed {} gi files", pairs.geometry.len());
    log::info!("Listed {} mask files", pairs.masks.len());
    if skipped > 0 {
        log::warn!("Skipped {} {} samples with missing files", skipped, split);
    }

    pairs.check_lengths(config.use_mask)?;
    Ok(pairs)
}

/// All `.png` files of a directory, in natural order.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(GiIoError::MissingDirectory {
            path: dir.to_path_buf(),
        });
    }
    let images: Vec<PathBuf> = file_names(dir)?
        .into_iter()
        .filter(|f| f.ends_with(".png"))
        .map(|f| dir.join(f))
        .collect();
    log::info!("Listed {} rgb files in {}", images.len(), dir.display());
    Ok(images)
}

/// File names of a directory, sorted naturally.
fn file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort_by(|a, b| natural_cmp(a, b));
    Ok(names)
}

/// Compare strings treating runs of ASCII digits as numbers.
///
/// `view2` sorts before `view10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.as_bytes();
    let mut b = b.as_bytes();

    loop {
        match (a.first(), b.first()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let (da, ra) = split_digits(a);
                let (db, rb) = split_digits(b);
                let ta = trim_zeros(da);
                let tb = trim_zeros(db);
                let ord = ta
                    .len()
                    .cmp(&tb.len())
                    .then_with(|| ta.cmp(tb))
                    .then_with(|| da.len().cmp(&db.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
                a = ra;
                b = rb;
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(y);
                }
                a = &a[1..];
                b = &b[1..];
            }
        }
    }
}

fn split_digits(s: &[u8]) -> (&[u8], &[u8]) {
    let n = s.iter().take_while(|c| c.is_ascii_digit()).count();
    s.split_at(n)
}

fn trim_zeros(s: &[u8]) -> &[u8] {
    let n = s.iter().take_while(|&&c| c == b'0').count();
    &s[n..]
}
