//! Pre-activation residual blocks.
//!
//! Both blocks compute `F(x) + shortcut(x)` where `F` is
//! `norm → relu → conv → norm → relu → conv`. They are composed into plain
//! sequences through the [`Block`] enum, which gives a uniform
//! [`Block::apply`] / [`Block::output_shape`] contract.

use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig};
use burn::nn::PaddingConfig2d;
use burn::prelude::*;
use burn::tensor::activation::relu;

use crate::error::{NeuralGiError, Result};

use super::norm::{BatchStatistics, Normalization, NormalizationConfig};
use super::padding::Padding2d;

/// Configuration for a [`ResidualBlock`].
#[derive(Config, Debug)]
pub struct ResidualBlockConfig {
    /// Input channels.
    pub in_channels: usize,
    /// Output channels.
    pub filters: usize,
    /// Square kernel size of both main-path convolutions.
    pub kernel_size: usize,
    /// Stride of the first convolution.
    #[config(default = 1)]
    pub stride: usize,
    /// Normalization momentum.
    #[config(default = 0.99)]
    pub momentum: f64,
    /// Normalization epsilon.
    #[config(default = 1e-3)]
    pub epsilon: f64,
}

impl ResidualBlockConfig {
    /// Validate the configuration.
    ///
    /// A stride-1 block adds its input unchanged, so it cannot change the
    /// channel count.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.in_channels == 0 || self.filters == 0 {
            return Err("channel counts must be positive".to_string());
        }
        if self.kernel_size == 0 {
            return Err("kernel_size must be positive".to_string());
        }
        if self.stride == 0 {
            return Err("stride must be positive".to_string());
        }
        if self.stride == 1 && self.in_channels != self.filters {
            return Err(format!(
                "stride-1 block cannot map {} channels to {}",
                self.in_channels, self.filters
            ));
        }
        Ok(())
    }

    /// Initialize the block.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ResidualBlock<B>> {
        self.validate().map_err(NeuralGiError::config)?;
        let k = [self.kernel_size, self.kernel_size];
        let norm = |features| {
            NormalizationConfig::new(features)
                .with_momentum(self.momentum)
                .with_epsilon(self.epsilon)
        };

        let conv_p = (self.stride > 1).then(|| {
            Conv2dConfig::new([self.in_channels, self.filters], [1, 1])
                .with_stride([self.stride, self.stride])
                .with_padding(PaddingConfig2d::Valid)
                .with_bias(false)
                .init(device)
        });

        Ok(ResidualBlock {
            norm_i: norm(self.in_channels).init(device),
            conv_p,
            conv_i: Conv2dConfig::new([self.in_channels, self.filters], k)
                .with_stride([self.stride, self.stride])
                .with_padding(PaddingConfig2d::Valid)
                .with_bias(false)
                .init(device),
            norm_o: norm(self.filters).init(device),
            conv_o: Conv2dConfig::new([self.filters, self.filters], k)
                .with_padding(PaddingConfig2d::Valid)
                .with_bias(false)
                .init(device),
            kernel_size: self.kernel_size,
            stride: self.stride,
        })
    }
}

/// Residual block, optionally downsampling.
///
/// With `stride > 1` the shortcut is a strided 1×1 projection of the
/// activated input and the main path pads by `kernel_size - 1` before its
/// strided convolution, so both produce `(H - 1) / stride + 1` rows.
#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    norm_i: Normalization<B>,
    conv_p: Option<Conv2d<B>>,
    conv_i: Conv2d<B>,
    norm_o: Normalization<B>,
    conv_o: Conv2d<B>,
    kernel_size: usize,
    stride: usize,
}

impl<B: Backend> ResidualBlock<B> {
    /// Spatial stride.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Normalization layers in forward order.
    pub fn normalizations(&self) -> [&Normalization<B>; 2] {
        [&self.norm_i, &self.norm_o]
    }

    /// Shape produced for an NCHW input shape.
    pub fn output_shape(&self, shape: [usize; 4]) -> Result<[usize; 4]> {
        let [n, c, h, w] = shape;
        let in_channels = self.conv_i.weight.val().dims()[1];
        if c != in_channels {
            return Err(NeuralGiError::shape(format!(
                "residual block expects {in_channels} channels, got {c}"
            )));
        }
        let filters = self.conv_i.weight.val().dims()[0];
        if h == 0 || w == 0 {
            return Err(NeuralGiError::shape("empty spatial extent"));
        }
        if self.stride == 1 {
            return Ok([n, filters, h, w]);
        }
        if h < self.kernel_size || w < self.kernel_size {
            return Err(NeuralGiError::shape(format!(
                "{h}x{w} input is smaller than the {k}x{k} kernel of a stride-{s} block",
                k = self.kernel_size,
                s = self.stride
            )));
        }
        Ok([
            n,
            filters,
            (h - 1) / self.stride + 1,
            (w - 1) / self.stride + 1,
        ])
    }

    /// Forward pass. Records batch statistics when `stats` is given.
    pub fn apply(
        &self,
        input: Tensor<B, 4>,
        mut stats: Option<&mut BatchStatistics<B>>,
    ) -> Tensor<B, 4> {
        let pad = Padding2d::for_kernel(self.kernel_size);
        let x = relu(self.norm_i.apply(input.clone(), stats.as_deref_mut()));

        let shortcut = match &self.conv_p {
            Some(conv_p) => conv_p.forward(x.clone()),
            None => input,
        };

        let y = self.conv_i.forward(pad.apply(x));
        let y = relu(self.norm_o.apply(y, stats));
        let y = self.conv_o.forward(pad.apply(y));

        merge(y, shortcut)
    }

    /// Fold recorded statistics into both normalization layers.
    pub fn absorb_statistics(self, log: &mut BatchStatistics<B>) -> Result<Self> {
        let norm_i = self.norm_i.absorb_statistics(log)?;
        let norm_o = self.norm_o.absorb_statistics(log)?;
        Ok(Self {
            norm_i,
            norm_o,
            ..self
        })
    }
}

/// Configuration for a [`ResidualUpsamplingBlock`].
#[derive(Config, Debug)]
pub struct ResidualUpsamplingBlockConfig {
    /// Input channels.
    pub in_channels: usize,
    /// Output channels.
    pub filters: usize,
    /// Square kernel size.
    pub kernel_size: usize,
    /// Upsampling factor.
    #[config(default = 2)]
    pub stride: usize,
    /// Normalization momentum.
    #[config(default = 0.99)]
    pub momentum: f64,
    /// Normalization epsilon.
    #[config(default = 1e-3)]
    pub epsilon: f64,
}

impl ResidualUpsamplingBlockConfig {
    /// Validate the configuration.
    ///
    /// The 1×1 projection reaches `(H - 1) * stride + kernel_size` only through
    /// output padding, which has to stay below the stride.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.in_channels == 0 || self.filters == 0 {
            return Err("channel counts must be positive".to_string());
        }
        if self.kernel_size == 0 {
            return Err("kernel_size must be positive".to_string());
        }
        if self.stride == 0 {
            return Err("stride must be positive".to_string());
        }
        if self.kernel_size > 1 && self.kernel_size - 1 >= self.stride {
            return Err(format!(
                "kernel_size {} needs a stride above {}",
                self.kernel_size,
                self.kernel_size - 1
            ));
        }
        Ok(())
    }

    /// Initialize the block.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ResidualUpsamplingBlock<B>> {
        self.validate().map_err(NeuralGiError::config)?;
        let k = self.kernel_size;
        let s = self.stride;
        let norm = |features| {
            NormalizationConfig::new(features)
                .with_momentum(self.momentum)
                .with_epsilon(self.epsilon)
        };

        Ok(ResidualUpsamplingBlock {
            norm_i: norm(self.in_channels).init(device),
            conv_p: ConvTranspose2dConfig::new([self.in_channels, self.filters], [1, 1])
                .with_stride([s, s])
                .with_padding_out([k - 1, k - 1])
                .with_bias(false)
                .init(device),
            conv_i: ConvTranspose2dConfig::new([self.in_channels, self.filters], [k, k])
                .with_stride([s, s])
                .with_bias(false)
                .init(device),
            norm_o: norm(self.filters).init(device),
            conv_o: Conv2dConfig::new([self.filters, self.filters], [k, k])
                .with_padding(PaddingConfig2d::Valid)
                .with_bias(false)
                .init(device),
            kernel_size: k,
            stride: s,
        })
    }
}

/// Residual block built on transpose convolutions. Always projects the
/// shortcut.
#[derive(Module, Debug)]
pub struct ResidualUpsamplingBlock<B: Backend> {
    norm_i: Normalization<B>,
    conv_p: ConvTranspose2d<B>,
    conv_i: ConvTranspose2d<B>,
    norm_o: Normalization<B>,
    conv_o: Conv2d<B>,
    kernel_size: usize,
    stride: usize,
}

impl<B: Backend> ResidualUpsamplingBlock<B> {
    /// Upsampling factor.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Normalization layers in forward order.
    pub fn normalizations(&self) -> [&Normalization<B>; 2] {
        [&self.norm_i, &self.norm_o]
    }

    /// Shape produced for an NCHW input shape: `(H - 1) * stride + kernel_size`.
    pub fn output_shape(&self, shape: [usize; 4]) -> Result<[usize; 4]> {
        let [n, c, h, w] = shape;
        // Transpose convolution weights are [in, out, k, k].
        let [in_channels, filters, _, _] = self.conv_i.weight.val().dims();
        if c != in_channels {
            return Err(NeuralGiError::shape(format!(
                "upsampling block expects {in_channels} channels, got {c}"
            )));
        }
        if h == 0 || w == 0 {
            return Err(NeuralGiError::shape("empty spatial extent"));
        }
        Ok([
            n,
            filters,
            (h - 1) * self.stride + self.kernel_size,
            (w - 1) * self.stride + self.kernel_size,
        ])
    }

    /// Forward pass. Records batch statistics when `stats` is given.
    pub fn apply(
        &self,
        input: Tensor<B, 4>,
        mut stats: Option<&mut BatchStatistics<B>>,
    ) -> Tensor<B, 4> {
        let x = relu(self.norm_i.apply(input, stats.as_deref_mut()));
        let shortcut = self.conv_p.forward(x.clone());

        let y = self.conv_i.forward(x);
        let y = relu(self.norm_o.apply(y, stats));
        let y = self
            .conv_o
            .forward(Padding2d::for_kernel(self.kernel_size).apply(y));

        merge(y, shortcut)
    }

    /// Fold recorded statistics into both normalization layers.
    pub fn absorb_statistics(self, log: &mut BatchStatistics<B>) -> Result<Self> {
        let norm_i = self.norm_i.absorb_statistics(log)?;
        let norm_o = self.norm_o.absorb_statistics(log)?;
        Ok(Self {
            norm_i,
            norm_o,
            ..self
        })
    }
}

/// One stage element of the encoder or decoder.
#[derive(Module, Debug)]
pub enum Block<B: Backend> {
    /// Downsampling-capable residual block.
    Residual(ResidualBlock<B>),
    /// Transpose-convolution residual block.
    Upsampling(ResidualUpsamplingBlock<B>),
}

impl<B: Backend> Block<B> {
    /// Forward pass of the wrapped block.
    pub fn apply(&self, x: Tensor<B, 4>, stats: Option<&mut BatchStatistics<B>>) -> Tensor<B, 4> {
        match self {
            Block::Residual(block) => block.apply(x, stats),
            Block::Upsampling(block) => block.apply(x, stats),
        }
    }

    /// Shape produced for an NCHW input shape.
    pub fn output_shape(&self, shape: [usize; 4]) -> Result<[usize; 4]> {
        match self {
            Block::Residual(block) => block.output_shape(shape),
            Block::Upsampling(block) => block.output_shape(shape),
        }
    }

    /// Normalization layers of the wrapped block.
    pub fn normalizations(&self) -> [&Normalization<B>; 2] {
        match self {
            Block::Residual(block) => block.normalizations(),
            Block::Upsampling(block) => block.normalizations(),
        }
    }

    /// Fold recorded statistics into the wrapped block.
    pub fn absorb_statistics(self, log: &mut BatchStatistics<B>) -> Result<Self> {
        Ok(match self {
            Block::Residual(block) => Block::Residual(block.absorb_statistics(log)?),
            Block::Upsampling(block) => Block::Upsampling(block.absorb_statistics(log)?),
        })
    }
}

impl<B: Backend> From<ResidualBlock<B>> for Block<B> {
    fn from(block: ResidualBlock<B>) -> Self {
        Block::Residual(block)
    }
}

impl<B: Backend> From<ResidualUpsamplingBlock<B>> for Block<B> {
    fn from(block: ResidualUpsamplingBlock<B>) -> Self {
        Block::Upsampling(block)
    }
}

/// Residual addition. Panics when the two paths disagree on shape.
fn merge<B: Backend>(main: Tensor<B, 4>, shortcut: Tensor<B, 4>) -> Tensor<B, 4> {
    let (a, b) = (main.dims(), shortcut.dims());
    assert_eq!(
        a, b,
        "residual merge shape mismatch: main path {a:?}, shortcut {b:?}"
    );
    main + shortcut
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn input(shape: [usize; 4]) -> Tensor<TestBackend, 4> {
        Tensor::random(
            shape,
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &Default::default(),
        )
    }

    #[test]
    fn test_validate_stride_one_channels() {
        assert!(ResidualBlockConfig::new(8, 8, 3).validate().is_ok());
        assert!(ResidualBlockConfig::new(8, 16, 3).validate().is_err());
        assert!(ResidualBlockConfig::new(8, 16, 3).with_stride(2).validate().is_ok());
        assert!(ResidualBlockConfig::new(8, 8, 0).validate().is_err());
    }

    #[test]
    fn test_validate_upsampling_alignment() {
        assert!(ResidualUpsamplingBlockConfig::new(8, 4, 2).validate().is_ok());
        assert!(ResidualUpsamplingBlockConfig::new(8, 4, 1).with_stride(1).validate().is_ok());
        assert!(ResidualUpsamplingBlockConfig::new(8, 4, 3).validate().is_err());
        assert!(ResidualUpsamplingBlockConfig::new(8, 4, 3).with_stride(3).validate().is_ok());
    }

    #[test]
    fn test_init_rejects_invalid() {
        let device = Default::default();
        let result = ResidualBlockConfig::new(4, 8, 3).init::<TestBackend>(&device);
        assert!(matches!(result, Err(NeuralGiError::InvalidConfig { .. })));
    }

    #[test]
    fn test_stride_one_keeps_shape() {
        let device = Default::default();
        let block = ResidualBlockConfig::new(4, 4, 3)
            .init::<TestBackend>(&device)
            .unwrap();
        let y = block.apply(input([2, 4, 9, 9]), None);
        assert_eq!(y.dims(), [2, 4, 9, 9]);
        assert_eq!(block.output_shape([2, 4, 9, 9]).unwrap(), [2, 4, 9, 9]);
    }

    #[test]
    fn test_even_kernel_stride_one() {
        let device = Default::default();
        let block = ResidualBlockConfig::new(4, 4, 2)
            .init::<TestBackend>(&device)
            .unwrap();
        assert_eq!(block.apply(input([1, 4, 6, 6]), None).dims(), [1, 4, 6, 6]);
    }

    #[test]
    fn test_strided_block_matches_shape_query() {
        let device = Default::default();
        let block = ResidualBlockConfig::new(4, 8, 3)
            .with_stride(2)
            .init::<TestBackend>(&device)
            .unwrap();

        for size in [3, 4, 7, 8, 16] {
            let y = block.apply(input([1, 4, size, size]), None);
            let expected = block.output_shape([1, 4, size, size]).unwrap();
            assert_eq!(y.dims(), expected, "input size {size}");
        }
        assert_eq!(block.output_shape([1, 4, 16, 16]).unwrap(), [1, 8, 8, 8]);
    }

    #[test]
    fn test_strided_block_rejects_small_input() {
        let device = Default::default();
        let block = ResidualBlockConfig::new(4, 8, 3)
            .with_stride(2)
            .init::<TestBackend>(&device)
            .unwrap();
        assert!(block.output_shape([1, 4, 3, 3]).is_ok());
        assert!(matches!(
            block.output_shape([1, 4, 2, 2]),
            Err(NeuralGiError::Shape { .. })
        ));
        assert!(block.output_shape([1, 5, 8, 8]).is_err());
    }

    #[test]
    fn test_upsampling_growth() {
        let device = Default::default();
        let block = ResidualUpsamplingBlockConfig::new(8, 4, 2)
            .init::<TestBackend>(&device)
            .unwrap();

        for size in [1, 2, 5] {
            let y = block.apply(input([2, 8, size, size]), None);
            let grown = (size - 1) * 2 + 2;
            assert_eq!(y.dims(), [2, 4, grown, grown]);
            assert_eq!(block.output_shape([2, 8, size, size]).unwrap(), y.dims());
        }
    }

    #[test]
    fn test_down_then_up_restores_size() {
        let device = Default::default();
        let down = ResidualBlockConfig::new(4, 8, 3)
            .with_stride(2)
            .init::<TestBackend>(&device)
            .unwrap();
        let up = ResidualUpsamplingBlockConfig::new(8, 4, 2)
            .init::<TestBackend>(&device)
            .unwrap();

        let y = up.apply(down.apply(input([1, 4, 16, 16]), None), None);
        assert_eq!(y.dims(), [1, 4, 16, 16]);
    }

    #[test]
    fn test_training_pass_records_two_layers_per_block() {
        let device = Default::default();
        let block: Block<TestBackend> = ResidualBlockConfig::new(4, 8, 3)
            .with_stride(2)
            .init::<TestBackend>(&device)
            .unwrap()
            .into();
        let mut log = BatchStatistics::new();
        let _ = block.apply(input([2, 4, 8, 8]), Some(&mut log));
        assert_eq!(log.len(), 2);

        let _block = block.absorb_statistics(&mut log).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    #[should_panic(expected = "residual merge shape mismatch")]
    fn test_merge_shape_mismatch_panics() {
        let device = Default::default();
        let a = Tensor::<TestBackend, 4>::zeros([1, 2, 4, 4], &device);
        let b = Tensor::<TestBackend, 4>::zeros([1, 2, 3, 3], &device);
        let _ = merge(a, b);
    }
}
