//! Network modules for the geometry-image autoencoder.
//!
//! This module provides:
//! - Residual blocks (downsampling and transpose-convolution upsampling)
//!   composed through the [`Block`] enum
//! - Batch normalization with explicit running statistics
//! - The encoder, decoder and the assembled [`Autoencoder`]

pub mod autoencoder;
pub mod block;
pub mod decoder;
pub mod encoder;
pub mod norm;
pub mod padding;

pub use autoencoder::Autoencoder;
pub use block::{
    Block, ResidualBlock, ResidualBlockConfig, ResidualUpsamplingBlock,
    ResidualUpsamplingBlockConfig,
};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use norm::{BatchStatistics, LayerStatistics, Normalization, NormalizationConfig};
pub use padding::Padding2d;
