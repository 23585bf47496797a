//! Residual geometry-image decoder.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::PaddingConfig2d;
use burn::prelude::*;
use burn::tensor::activation::sigmoid;

use crate::config::DecoderConfig;
use crate::error::{NeuralGiError, Result};

use super::block::{Block, ResidualBlockConfig, ResidualUpsamplingBlockConfig};
use super::norm::BatchStatistics;
use super::padding::Padding2d;

/// Decoder mapping the latent tensor to a geometry image in `[0, 1]`.
///
/// Each stage is one upsampling block followed by `identity_blocks` stride-1
/// residual blocks; a same-padded convolution and a sigmoid produce the
/// output channels.
#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    blocks: Vec<Block<B>>,
    head: Conv2d<B>,
    head_kernel: usize,
}

impl<B: Backend> Decoder<B> {
    /// Create a new decoder from configuration.
    pub fn new(config: &DecoderConfig, device: &B::Device) -> Result<Self> {
        config.validate().map_err(NeuralGiError::config)?;

        let mut blocks = Vec::new();
        let mut channels = config.latent_channels;
        for &filters in &config.stage_filters {
            let up = ResidualUpsamplingBlockConfig::new(channels, filters, config.up_kernel)
                .with_stride(config.up_stride)
                .with_momentum(config.momentum)
                .with_epsilon(config.epsilon)
                .init::<B>(device)?;
            blocks.push(Block::from(up));

            for _ in 0..config.identity_blocks {
                let block = ResidualBlockConfig::new(filters, filters, config.kernel_size)
                    .with_momentum(config.momentum)
                    .with_epsilon(config.epsilon)
                    .init::<B>(device)?;
                blocks.push(Block::from(block));
            }
            channels = filters;
        }

        let head = Conv2dConfig::new(
            [channels, config.out_channels],
            [config.head_kernel, config.head_kernel],
        )
        .with_padding(PaddingConfig2d::Valid)
        .init(device);

        Ok(Self {
            blocks,
            head,
            head_kernel: config.head_kernel,
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

    /// Output shape for an NCHW latent shape.
    pub fn output_shape(&self, shape: [usize; 4]) -> Result<[usize; 4]> {
        let [n, c, h, w] = self
            .blocks
            .iter()
            .try_fold(shape, |shape, block| block.output_shape(shape))?;

        let [out_channels, in_channels, _, _] = self.head.weight.val().dims();
        if c != in_channels {
            return Err(NeuralGiError::shape(format!(
                "decoder head expects {in_channels} channels, got {c}"
            )));
        }
        Ok([n, out_channels, h, w])
    }

    /// Forward pass.
    ///
    /// Input shape: [batch, latent_channels, latent_h, latent_w]
    /// Output shape: [batch, out_channels, height, width], values in [0, 1]
    pub fn forward(
        &self,
        mut x: Tensor<B, 4>,
        mut stats: Option<&mut BatchStatistics<B>>,
    ) -> Tensor<B, 4> {
        for block in &self.blocks {
            x = block.apply(x, stats.as_deref_mut());
        }
        let x = self
            .head
            .forward(Padding2d::for_kernel(self.head_kernel).apply(x));
        sigmoid(x)
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
