//! Residual image encoder.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::PaddingConfig2d;
use burn::prelude::*;

use crate::config::EncoderConfig;
use crate::error::{NeuralGiError, Result};

use super::block::{Block, ResidualBlockConfig};
use super::norm::BatchStatistics;
use super::padding::Padding2d;

/// Encoder mapping an RGB image to the latent tensor.
///
/// A strided "same" stem convolution followed by stages of one strided
/// residual block and `identity_blocks` stride-1 blocks. With the default
/// configuration a `[N, 3, 128, 128]` input becomes `[N, 512, 2, 2]`.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    stem: Conv2d<B>,
    blocks: Vec<Block<B>>,
    stem_kernel: usize,
    stem_stride: usize,
}

impl<B: Backend> Encoder<B> {
    /// Create a new encoder from configuration.
    pub fn new(config: &EncoderConfig, device: &B::Device) -> Result<Self> {
        config.validate().map_err(NeuralGiError::config)?;

        let stem = Conv2dConfig::new(
            [config.in_channels, config.stem_filters],
            [config.stem_kernel, config.stem_kernel],
        )
        .with_stride([config.stem_stride, config.stem_stride])
        .with_padding(PaddingConfig2d::Valid)
        .init(device);

        let mut blocks = Vec::new();
        let mut channels = config.stem_filters;
        for &filters in &config.stage_filters {
            let block = |in_channels, stride| {
                ResidualBlockConfig::new(in_channels, filters, config.kernel_size)
                    .with_stride(stride)
                    .with_momentum(config.momentum)
                    .with_epsilon(config.epsilon)
                    .init::<B>(device)
            };
            blocks.push(Block::from(block(channels, config.stage_stride)?));
            for _ in 0..config.identity_blocks {
                blocks.push(Block::from(block(filters, 1)?));
            }
            channels = filters;
        }

        Ok(Self {
            stem,
            blocks,
            stem_kernel: config.stem_kernel,
            stem_stride: config.stem_stride,
        })
    }

    /// Number of residual blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Residual blocks in forward order.
    pub fn blocks(&self) -> &[Block<B>] {
        &self.blocks
    }

    /// Latent shape for an NCHW input shape.
    pub fn output_shape(&self, shape: [usize; 4]) -> Result<[usize; 4]> {
        let [n, c, h, w] = shape;
        let [filters, in_channels, _, _] = self.stem.weight.val().dims();
        if c != in_channels {
            return Err(NeuralGiError::shape(format!(
                "encoder expects {in_channels} input channels, got {c}"
            )));
        }
        if h == 0 || w == 0 {
            return Err(NeuralGiError::shape("empty input image"));
        }

        let stem_out = [
            n,
            filters,
            h.div_ceil(self.stem_stride),
            w.div_ceil(self.stem_stride),
        ];
        self.blocks
            .iter()
            .try_fold(stem_out, |shape, block| block.output_shape(shape))
    }

    /// Forward pass.
    ///
    /// Input shape: [batch, channels, height, width]
    /// Output shape: [batch, latent_channels, latent_h, latent_w]
    pub fn forward(
        &self,
        x: Tensor<B, 4>,
        mut stats: Option<&mut BatchStatistics<B>>,
    ) -> Tensor<B, 4> {
        let [_, _, h, w] = x.dims();
        let pad = Padding2d::same(h, w, self.stem_kernel, self.stem_stride);
        let mut x = self.stem.forward(pad.apply(x));

        for block in &self.blocks {
            x = block.apply(x, stats.as_deref_mut());
        }
        x
    }

    /// Fold recorded statistics into every block, in forward order.
    pub fn absorb_statistics(self, log: &mut BatchStatistics<B>) -> Result<Self> {
        let blocks = self
            .blocks
            .into_iter()
            .map(|block| block.absorb_statistics(log))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { blocks, ..self })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn small_config() -> EncoderConfig {
        EncoderConfig::new()
            .with_stem_filters(4)
            .with_stage_filters(vec![8, 16])
            .with_identity_blocks(1)
    }

    #[test]
    fn test_default_block_count() {
        let device = Default::default();
        let encoder = Encoder::<TestBackend>::new(&EncoderConfig::new(), &device).unwrap();
        assert_eq!(encoder.num_blocks(), 15);
        assert_eq!(
            encoder.output_shape([1, 3, 128, 128]).unwrap(),
            [1, 512, 2, 2]
        );
    }

    #[test]
    fn test_forward_matches_shape_query() {
        let device = Default::default();
        let encoder = Encoder::<TestBackend>::new(&small_config(), &device).unwrap();

        let x = Tensor::zeros([2, 3, 16, 16], &device);
        let latent = encoder.forward(x, None);
        assert_eq!(latent.dims(), [2, 16, 2, 2]);
        assert_eq!(encoder.output_shape([2, 3, 16, 16]).unwrap(), [2, 16, 2, 2]);
    }

    #[test]
    fn test_odd_input_size() {
        let device = Default::default();
        let encoder = Encoder::<TestBackend>::new(&small_config(), &device).unwrap();
        // 15 → 8 → 4 → 2
        let latent = encoder.forward(Tensor::zeros([1, 3, 15, 15], &device), None);
        assert_eq!(latent.dims(), [1, 16, 2, 2]);
        assert_eq!(encoder.output_shape([1, 3, 15, 15]).unwrap(), [1, 16, 2, 2]);
    }

    #[test]
    fn test_rejects_wrong_channels_and_tiny_inputs() {
        let device = Default::default();
        let encoder = Encoder::<TestBackend>::new(&small_config(), &device).unwrap();
        assert!(encoder.output_shape([1, 1, 16, 16]).is_err());
        // 4 → 2, then a 3×3 stride-2 block on 2×2.
        assert!(encoder.output_shape([1, 3, 4, 4]).is_err());
    }

    #[test]
    fn test_training_forward_records_every_layer() {
        let device = Default::default();
        let encoder = Encoder::<TestBackend>::new(&small_config(), &device).unwrap();
        let mut log = BatchStatistics::new();

        let _ = encoder.forward(Tensor::ones([2, 3, 16, 16], &device), Some(&mut log));
        assert_eq!(log.len(), 2 * encoder.num_blocks());

        let _encoder = encoder.absorb_statistics(&mut log).unwrap();
        assert!(log.is_empty());
    }
}
