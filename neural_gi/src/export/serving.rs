use std::fs;
use std::path::Path;

use burn::config::Config;
use burn::prelude::*;

use crate::config::AutoencoderConfig;
use crate::error::{NeuralGiError, Result};
use crate::nn::Autoencoder;
use crate::training::{recorder, CONFIG_FILE, MODEL_FILE};

/// Signature file inside a serving directory.
pub const SIGNATURE_FILE: &str = "signature.json";

/// Input and output description of an exported network.
#[derive(Config, Debug)]
pub struct ServingSignature {
    /// Name of the input tensor.
    #[config(default = "String::from(\"encoder_input\")")]
    pub input_name: String,
    /// Name of the output tensor.
    #[config(default = "String::from(\"prediction\")")]
    pub output_name: String,
    /// Input shape, NCHW.
    pub input_shape: Vec<usize>,
    /// Output shape, NCHW.
    pub output_shape: Vec<usize>,
}

impl ServingSignature {
    /// Signature of a network built from `config`.
    pub fn for_config(config: &AutoencoderConfig) -> Self {
        Self::new(config.input_shape().to_vec(), config.output_shape().to_vec())
    }
}

/// Write `model.mpk`, `config.json` and `signature.json` into `dir`.
pub fn export_for_serving<B: Backend>(
    dir: &Path,
    model: &Autoencoder<B>,
    config: &AutoencoderConfig,
) -> Result<ServingSignature> {
    config.validate().map_err(NeuralGiError::config)?;
    let signature = ServingSignature::for_config(config);

    let output = model.output_shape(config.input_shape())?;
    if output.as_slice() != signature.output_shape.as_slice() {
        return Err(NeuralGiError::ShapeMismatch {
            expected: signature.output_shape.clone(),
            got: output.to_vec(),
        });
    }

    fs::create_dir_all(dir)?;
    model
        .clone()
        .save_file(dir.join(MODEL_FILE), &recorder())
        .map_err(|e| NeuralGiError::checkpoint(format!("{e:?}")))?;
    config.save(dir.join(CONFIG_FILE))?;
    signature.save(dir.join(SIGNATURE_FILE))?;

    log::info!(
        "Exported serving model to {:?}: {} {:?} -> {} {:?}",
        dir,
        signature.input_name,
        signature.input_shape,
        signature.output_name,
        signature.output_shape
    );
    Ok(signature)
}

/// Load a network written by [`export_for_serving`].
pub fn load_serving_model<B: Backend>(
    dir: &Path,
    device: &B::Device,
) -> Result<(Autoencoder<B>, ServingSignature)> {
    let config =
        AutoencoderConfig::load(dir.join(CONFIG_FILE)).map_err(NeuralGiError::checkpoint)?;
    let signature =
        ServingSignature::load(dir.join(SIGNATURE_FILE)).map_err(NeuralGiError::checkpoint)?;

    let expected = ServingSignature::for_config(&config);
    if signature.input_shape != expected.input_shape {
        return Err(NeuralGiError::ShapeMismatch {
            expected: expected.input_shape,
            got: signature.input_shape,
        });
    }

    let model = Autoencoder::new(&config, device)?
        .load_file(dir.join(MODEL_FILE), &recorder(), device)
        .map_err(|e| NeuralGiError::checkpoint(format!("{e:?}")))?;
    Ok((model, signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_default_signature() {
        let signature = ServingSignature::for_config(&AutoencoderConfig::default());
        assert_eq!(signature.input_name, "encoder_input");
        assert_eq!(signature.output_name, "prediction");
        assert_eq!(signature.input_shape, vec![1, 3, 128, 128]);
        assert_eq!(signature.output_shape, vec![1, 3, 128, 128]);
    }

    #[test]
    fn test_export_and_load() {
        use crate::config::{DecoderConfig, EncoderConfig};

        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = AutoencoderConfig::new(
            EncoderConfig::new()
                .with_stem_filters(4)
                .with_stage_filters(vec![8, 8])
                .with_identity_blocks(0),
            DecoderConfig::new()
                .with_latent_channels(8)
                .with_stage_filters(vec![8, 4, 4])
                .with_identity_blocks(0),
        )
        .with_input_size(16);
        let model = Autoencoder::<TestBackend>::new(&config, &device).unwrap();

        let signature = export_for_serving(dir.path(), &model, &config).unwrap();
        assert_eq!(signature.input_shape, vec![1, 3, 16, 16]);
        assert!(dir.path().join(SIGNATURE_FILE).exists());

        let (loaded, loaded_signature) =
            load_serving_model::<TestBackend>(dir.path(), &device).unwrap();
        assert_eq!(loaded_signature.output_shape, vec![1, 3, 16, 16]);

        let x = Tensor::<TestBackend, 4>::full([1, 3, 16, 16], 0.5, &device);
        let a: Vec<f32> = model.infer(x.clone()).to_data().to_vec().unwrap();
        let b: Vec<f32> = loaded.infer(x).to_data().to_vec().unwrap();
        assert_eq!(a, b);
    }
}
