//! Encoder and decoder composed into the full network.

use burn::module::Module;
use burn::prelude::*;

use crate::config::AutoencoderConfig;
use crate::error::{NeuralGiError, Result};

use super::decoder::Decoder;
use super::encoder::Encoder;
use super::block::Block;
use super::norm::{BatchStatistics, Normalization};

/// RGB image → latent tensor → geometry image.
#[derive(Module, Debug)]
pub struct Autoencoder<B: Backend> {
    /// Image encoder.
    pub encoder: Encoder<B>,
    /// Geometry-image decoder.
    pub decoder: Decoder<B>,
}

impl<B: Backend> Autoencoder<B> {
    /// Create a new autoencoder from configuration.
    pub fn new(config: &AutoencoderConfig, device: &B::Device) -> Result<Self> {
        config.validate().map_err(NeuralGiError::config)?;
        Ok(Self {
            encoder: Encoder::new(&config.encoder, device)?,
            decoder: Decoder::new(&config.decoder, device)?,
        })
    }

    /// Output shape for an NCHW input shape, or a `Shape` error when the
    /// network cannot process it.
    pub fn output_shape(&self, shape: [usize; 4]) -> Result<[usize; 4]> {
        if shape[0] == 0 {
            return Err(NeuralGiError::EmptyBatch);
        }
        let latent = self.encoder.output_shape(shape)?;
        self.decoder.output_shape(latent)
    }

    /// Shared forward routine. Records batch statistics when `stats` is given.
    pub fn forward(
        &self,
        images: Tensor<B, 4>,
        mut stats: Option<&mut BatchStatistics<B>>,
    ) -> Tensor<B, 4> {
        let latent = self.encoder.forward(images, stats.as_deref_mut());
        self.decoder.forward(latent, stats)
    }

    /// Inference-mode forward pass using running statistics.
    pub fn infer(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward(images, None)
    }

    /// Training-mode forward pass, returning the statistics to absorb later.
    pub fn forward_training(&self, images: Tensor<B, 4>) -> (Tensor<B, 4>, BatchStatistics<B>) {
        let mut stats = BatchStatistics::new();
        let output = self.forward(images, Some(&mut stats));
        (output, stats)
    }

    /// Number of normalization layers, i.e. entries per training forward.
    pub fn num_normalization_layers(&self) -> usize {
        2 * (self.encoder.num_blocks() + self.decoder.num_blocks())
    }

    /// Normalization layers in the order a training forward records them.
    pub fn normalization_layers(&self) -> Vec<&Normalization<B>> {
        self.encoder
            .blocks()
            .iter()
            .chain(self.decoder.blocks())
            .flat_map(|block| block.normalizations())
            .collect()
    }

    /// Fold a training forward's statistics into the running averages.
    ///
    /// The log has to be consumed exactly.
    pub fn absorb_statistics(self, mut stats: BatchStatistics<B>) -> Result<Self> {
        let encoder = self.encoder.absorb_statistics(&mut stats)?;
        let decoder = self.decoder.absorb_statistics(&mut stats)?;
        stats.finish()?;
        Ok(Self { encoder, decoder })
    }
}
