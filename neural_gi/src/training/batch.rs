//! Batching of decoded samples into NCHW tensors.

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use gi_io::{ImageSample, Sample};

use crate::error::{NeuralGiError, Result};

/// A batch of training or evaluation data.
#[derive(Debug, Clone)]
pub struct GiBatch<B: Backend> {
    /// RGB inputs: [batch, 3, rgb_size, rgb_size]
    pub images: Tensor<B, 4>,
    /// Geometry targets: [batch, 3, gi_size, gi_size]
    pub targets: Tensor<B, 4>,
    /// Loss masks: [batch, 1, gi_size, gi_size]
    pub masks: Option<Tensor<B, 4>>,
}

impl<B: Backend> GiBatch<B> {
    /// Stack decoded samples into a batch.
    ///
    /// Either every sample carries a mask or none does.
    pub fn from_samples(
        samples: &[Sample],
        rgb_size: usize,
        gi_size: usize,
        device: &B::Device,
    ) -> Result<Self> {
        let n = samples.len();
        if n == 0 {
            return Err(NeuralGiError::EmptyBatch);
        }

        let with_mask = samples.iter().filter(|s| s.mask.is_some()).count();
        if with_mask != 0 && with_mask != n {
            return Err(NeuralGiError::config(format!(
                "{with_mask} of {n} samples carry a mask"
            )));
        }

        let images = stack(
            samples.iter().map(|s| s.rgb.as_slice()),
            [n, 3, rgb_size, rgb_size],
            device,
        )?;
        let targets = stack(
            samples.iter().map(|s| s.geometry.as_slice()),
            [n, 3, gi_size, gi_size],
            device,
        )?;
        let masks = if with_mask == n {
            Some(stack(
                samples.iter().filter_map(|s| s.mask.as_deref()),
                [n, 1, gi_size, gi_size],
                device,
            )?)
        } else {
            None
        };

        Ok(Self {
            images,
            targets,
            masks,
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.images.dims()[0]
    }

    /// Whether the batch is empty. Never true for a constructed batch.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the device of this batch.
    pub fn device(&self) -> B::Device {
        self.images.device()
    }
}

impl<B: AutodiffBackend> GiBatch<B> {
    /// The same batch on the inner backend, for inference-mode evaluation.
    pub fn inner(self) -> GiBatch<B::InnerBackend> {
        GiBatch {
            images: self.images.inner(),
            targets: self.targets.inner(),
            masks: self.masks.map(Tensor::inner),
        }
    }
}

/// A batch of inference inputs.
#[derive(Debug, Clone)]
pub struct InputBatch<B: Backend> {
    /// RGB inputs: [batch, 3, size, size]
    pub images: Tensor<B, 4>,
}

impl<B: Backend> InputBatch<B> {
    /// Stack decoded inference inputs into a batch.
    pub fn from_images(samples: &[ImageSample], size: usize, device: &B::Device) -> Result<Self> {
        let n = samples.len();
        if n == 0 {
            return Err(NeuralGiError::EmptyBatch);
        }
        let images = stack(
            samples.iter().map(|s| s.rgb.as_slice()),
            [n, 3, size, size],
            device,
        )?;
        Ok(Self { images })
    }
}

fn stack<'a, B: Backend>(
    buffers: impl Iterator<Item = &'a [f32]>,
    shape: [usize; 4],
    device: &B::Device,
) -> Result<Tensor<B, 4>> {
    let per_sample = shape[1] * shape[2] * shape[3];
    let mut data = Vec::with_capacity(shape[0] * per_sample);
    for buffer in buffers {
        if buffer.len() != per_sample {
            return Err(NeuralGiError::ShapeMismatch {
                expected: shape[1..].to_vec(),
                got: vec![buffer.len()],
            });
        }
        data.extend_from_slice(buffer);
    }
    if data.len() != shape[0] * per_sample {
        return Err(NeuralGiError::EmptyBatch);
    }
    Ok(Tensor::from_data(TensorData::new(data, shape), device))
}
