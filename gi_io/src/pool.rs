//! Bounded parallel decoding on a dedicated worker pool.

use std::path::PathBuf;

use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;

use crate::config::DatasetConfig;
use crate::decode::{decode_geometry, decode_mask, decode_rgb};
use crate::error::Result;
use crate::pairs::SamplePaths;

/// A decoded training sample, all buffers planar CHW.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// RGB input, `3 × rgb_size × rgb_size`.
    pub rgb: Vec<f32>,
    /// Geometry target, `3 × gi_size × gi_size`.
    pub geometry: Vec<f32>,
    /// Loss mask, `1 × gi_size × gi_size`.
    pub mask: Option<Vec<f32>>,
}

/// A decoded inference input.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSample {
    /// Source file.
    pub path: PathBuf,
    /// RGB input, `3 × size × size`.
    pub rgb: Vec<f32>,
}

/// Decoder running on its own rayon pool.
pub struct DecodePool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl DecodePool {
    /// Create a pool with `workers` threads.
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("gi-decode-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Decode every sample of a split. Fails on the first unreadable file.
    pub fn decode_samples(&self, paths: &SamplePaths, config: &DatasetConfig) -> Result<Vec<Sample>> {
        let use_mask = config.use_mask && !paths.masks.is_empty();
        let (rgb_size, gi_size) = (config.rgb_size, config.gi_size);

        let samples = self.pool.install(|| {
            (0..paths.len())
                .into_par_iter()
                .map(|i| -> Result<Sample> {
                    let rgb = decode_rgb(&paths.rgb[i], rgb_size)?;
                    let geometry = decode_geometry(&paths.geometry[i], gi_size)?;
                    let mask = if use_mask {
                        Some(decode_mask(&paths.masks[i], gi_size)?)
                    } else {
                        None
                    };
                    Ok(Sample {
                        rgb,
                        geometry,
                        mask,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })?;

        log::info!(
            "Decoded {} samples on {} workers",
            samples.len(),
            self.workers
        );
        Ok(samples)
    }

    /// Decode inference inputs.
    pub fn decode_images(&self, paths: &[PathBuf], size: usize) -> Result<Vec<ImageSample>> {
        self.pool.install(|| {
            paths
                .par_iter()
                .map(|path| -> Result<ImageSample> {
                    Ok(ImageSample {
                        path: path.clone(),
                        rgb: decode_rgb(path, size)?,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
    }
}

/// Shuffle samples in place.
pub fn shuffle_samples<T, R: Rng + ?Sized>(samples: &mut [T], rng: &mut R) {
    samples.shuffle(rng);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_shuffle_is_seeded() {
        let mut a: Vec<u32> = (0..32).collect();
        let mut b = a.clone();
        shuffle_samples(&mut a, &mut StdRng::seed_from_u64(7));
        shuffle_samples(&mut b, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(sorted, (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn test_pool_workers() {
        assert_eq!(DecodePool::new(0).unwrap().workers(), 1);
        assert_eq!(DecodePool::new(3).unwrap().workers(), 3);
    }

    #[test]
    fn test_decode_images_keeps_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..3 {
            let path = dir.path().join(format!("{i}.png"));
            image::RgbImage::new(2, 2).save(&path).unwrap();
            paths.push(path);
        }

        let pool = DecodePool::new(2).unwrap();
        let images = pool.decode_images(&paths, 2).unwrap();
        assert_eq!(images.len(), 3);
        for (image, path) in images.iter().zip(&paths) {
            assert_eq!(&image.path, path);
            assert_eq!(image.rgb.len(), 12);
        }
    }
}
