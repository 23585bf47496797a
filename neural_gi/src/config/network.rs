//! Network configuration types.
//!
//! Defaults reproduce the reference architecture: a 128×128 RGB input is
//! reduced to a 2×2×512 latent tensor and decoded back to a 128×128×3
//! geometry image.

use burn::config::Config;

/// Configuration for the [`Encoder`](crate::nn::Encoder).
#[derive(Config, Debug)]
pub struct EncoderConfig {
    /// Input image channels.
    #[config(default = 3)]
    pub in_channels: usize,

    /// Output channels of the stem convolution.
    #[config(default = 16)]
    pub stem_filters: usize,

    /// Stem kernel size.
    #[config(default = 3)]
    pub stem_kernel: usize,

    /// Stem stride.
    #[config(default = 2)]
    pub stem_stride: usize,

    /// Output channels of each stage.
    #[config(default = "vec![64, 96, 128, 256, 512]")]
    pub stage_filters: Vec<usize>,

    /// Kernel size of every residual block.
    #[config(default = 3)]
    pub kernel_size: usize,

    /// Stride of the first block of each stage.
    #[config(default = 2)]
    pub stage_stride: usize,

    /// Stride-1 blocks following the first block of each stage.
    #[config(default = 2)]
    pub identity_blocks: usize,

    /// Normalization momentum.
    #[config(default = 0.99)]
    pub momentum: f64,

    /// Normalization epsilon.
    #[config(default = 1e-3)]
    pub epsilon: f64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.in_channels == 0 || self.stem_filters == 0 {
            return Err("encoder channel counts must be positive".to_string());
        }
        if self.stem_kernel == 0 || self.stem_stride == 0 {
            return Err("stem kernel and stride must be positive".to_string());
        }
        if self.kernel_size == 0 || self.stage_stride == 0 {
            return Err("encoder kernel_size and stage_stride must be positive".to_string());
        }
        if self.stage_filters.iter().any(|&f| f == 0) {
            return Err("encoder stage_filters must be positive".to_string());
        }
        if self.stage_stride == 1 {
            // Every block is then an identity-shortcut block.
            let mut channels = self.stem_filters;
            for &filters in &self.stage_filters {
                if filters != channels {
                    return Err(
                        "stride-1 stages cannot change the channel count".to_string(),
                    );
                }
                channels = filters;
            }
        }
        Ok(())
    }

    /// Channels of the latent tensor.
    pub fn latent_channels(&self) -> usize {
        self.stage_filters
            .last()
            .copied()
            .unwrap_or(self.stem_filters)
    }

    /// Reject inputs that some strided stage would see smaller than its kernel.
    pub fn check_input_size(&self, input_size: usize) -> Result<(), String> {
        let mut size = input_size.div_ceil(self.stem_stride);
        for stage in 0..self.stage_filters.len() {
            if self.stage_stride > 1 && size < self.kernel_size {
                return Err(format!(
                    "stage {stage} sees {size}x{size}, smaller than its {k}x{k} kernel",
                    k = self.kernel_size
                ));
            }
            size = size.saturating_sub(1) / self.stage_stride + 1;
        }
        Ok(())
    }

    /// Spatial size of the latent tensor for a square input.
    pub fn output_size(&self, input_size: usize) -> usize {
        let mut size = input_size.div_ceil(self.stem_stride);
        for _ in &self.stage_filters {
            size = size.saturating_sub(1) / self.stage_stride + 1;
        }
        size
    }
}

/// Configuration for the [`Decoder`](crate::nn::Decoder).
#[derive(Config, Debug)]
pub struct DecoderConfig {
    /// Channels of the latent tensor.
    #[config(default = 512)]
    pub latent_channels: usize,

    /// Output channels of each stage.
    #[config(default = "vec![512, 256, 128, 96, 64, 32]")]
    pub stage_filters: Vec<usize>,

    /// Kernel size of the upsampling block opening each stage.
    #[config(default = 2)]
    pub up_kernel: usize,

    /// Upsampling factor of each stage.
    #[config(default = 2)]
    pub up_stride: usize,

    /// Kernel size of the stride-1 residual blocks.
    #[config(default = 3)]
    pub kernel_size: usize,

    /// Stride-1 blocks following the upsampling block of each stage.
    #[config(default = 2)]
    pub identity_blocks: usize,

    /// Output channels (x, y, z).
    #[config(default = 3)]
    pub out_channels: usize,

    /// Kernel size of the output convolution.
    #[config(default = 3)]
    pub head_kernel: usize,

    /// Normalization momentum.
    #[config(default = 0.99)]
    pub momentum: f64,

    /// Normalization epsilon.
    #[config(default = 1e-3)]
    pub epsilon: f64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.latent_channels == 0 || self.out_channels == 0 {
            return Err("decoder channel counts must be positive".to_string());
        }
        if self.stage_filters.iter().any(|&f| f == 0) {
            return Err("decoder stage_filters must be positive".to_string());
        }
        if self.up_kernel == 0 || self.up_stride == 0 {
            return Err("up_kernel and up_stride must be positive".to_string());
        }
        if self.up_kernel > 1 && self.up_kernel - 1 >= self.up_stride {
            return Err(format!(
                "up_kernel {} needs an up_stride above {}",
                self.up_kernel,
                self.up_kernel - 1
            ));
        }
        if self.kernel_size == 0 || self.head_kernel == 0 {
            return Err("decoder kernel sizes must be positive".to_string());
        }
        Ok(())
    }

    /// Spatial size of the decoded image for a square latent tensor.
    pub fn output_size(&self, latent_size: usize) -> usize {
        let mut size = latent_size;
        for _ in &self.stage_filters {
            size = size.saturating_sub(1) * self.up_stride + self.up_kernel;
        }
        size
    }
}

/// Configuration for the full [`Autoencoder`](crate::nn::Autoencoder).
#[derive(Config, Debug)]
pub struct AutoencoderConfig {
    /// Encoder configuration.
    pub encoder: EncoderConfig,

    /// Decoder configuration.
    pub decoder: DecoderConfig,

    /// Side length of the square input images.
    #[config(default = 128)]
    pub input_size: usize,
}

impl Default for AutoencoderConfig {
    fn default() -> Self {
        Self::new(EncoderConfig::default(), DecoderConfig::default())
    }
}

impl AutoencoderConfig {
    /// Validate the configuration.
    ///
    /// Besides the parts, checks that the latent channel counts agree and that
    /// `input_size` decodes back to `input_size`.
    pub fn validate(&self) -> Result<(), String> {
        self.encoder.validate()?;
        self.decoder.validate()?;

        if self.encoder.latent_channels() != self.decoder.latent_channels {
            return Err(format!(
                "encoder produces {} latent channels, decoder expects {}",
                self.encoder.latent_channels(),
                self.decoder.latent_channels
            ));
        }
        if self.input_size == 0 {
            return Err("input_size must be positive".to_string());
        }
        self.encoder.check_input_size(self.input_size)?;
        let latent = self.latent_size();
        let output = self.decoder.output_size(latent);
        if output != self.input_size {
            return Err(format!(
                "input size {} decodes to {} (latent {latent}x{latent})",
                self.input_size, output
            ));
        }
        Ok(())
    }

    /// Spatial size of the latent tensor.
    pub fn latent_size(&self) -> usize {
        self.encoder.output_size(self.input_size)
    }

    /// Fixed single-image input shape, NCHW.
    pub fn input_shape(&self) -> [usize; 4] {
        [1, self.encoder.in_channels, self.input_size, self.input_size]
    }

    /// Output shape for [`Self::input_shape`], NCHW.
    pub fn output_shape(&self) -> [usize; 4] {
        let size = self.decoder.output_size(self.latent_size());
        [1, self.decoder.out_channels, size, size]
    }
}
