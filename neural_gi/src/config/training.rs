//! Training configuration types.

use std::path::{Path, PathBuf};

use burn::config::Config;
use gi_io::{write_parameter_log, DatasetConfig, ParamValue};

use super::AutoencoderConfig;
use crate::error::Result;

/// File the full experiment configuration is saved to, next to the
/// parameter log.
pub const EXPERIMENT_FILE: &str = "experiment.json";

/// Configuration for the reconstruction loss.
#[derive(Config, Debug)]
pub struct LossConfig {
    /// Weight each pixel's squared error by `mask + 1`.
    ///
    /// When set, every batch must carry a mask.
    #[config(default = true)]
    pub use_mask: bool,
}

impl Default for LossConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration of a training run.
#[derive(Config, Debug)]
pub struct ExperimentConfig {
    /// Directory receiving checkpoints, the parameter log and the mean shape.
    pub model_dir: PathBuf,

    /// Dataset layout and preprocessing.
    pub dataset: DatasetConfig,

    /// Network architecture.
    #[config(default = "AutoencoderConfig::default()")]
    pub model: AutoencoderConfig,

    /// Loss configuration.
    #[config(default = "LossConfig::default()")]
    pub loss: LossConfig,

    /// Adam learning rate.
    #[config(default = 1e-4)]
    pub learning_rate: f64,

    /// Samples per batch.
    #[config(default = 64)]
    pub batch_size: usize,

    /// Passes over the training split.
    #[config(default = 50)]
    pub epochs: usize,

    /// Evaluate on the validation split every this many epochs.
    #[config(default = 2)]
    pub epochs_between_evals: usize,

    /// Write a checkpoint every this many steps.
    #[config(default = 2000)]
    pub steps_between_checkpoints: usize,

    /// Log the training loss every this many steps.
    #[config(default = 100)]
    pub log_interval: usize,

    /// Seed for shuffling.
    #[config(default = 42)]
    pub seed: u64,
}

impl ExperimentConfig {
    /// Validate the configuration.
    ///
    /// Rejects a masked loss over a dataset that loads no masks, and image
    /// sizes the network cannot map onto each other.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.dataset.validate()?;
        self.model.validate()?;

        if self.loss.use_mask != self.dataset.use_mask {
            return Err(format!(
                "loss use_mask ({}) disagrees with dataset use_mask ({})",
                self.loss.use_mask, self.dataset.use_mask
            ));
        }
        if self.model.input_size != self.dataset.rgb_size {
            return Err(format!(
                "network input size {} differs from rgb_size {}",
                self.model.input_size, self.dataset.rgb_size
            ));
        }
        let [_, channels, size, _] = self.model.output_shape();
        if size != self.dataset.gi_size {
            return Err(format!(
                "network output size {size} differs from gi_size {}",
                self.dataset.gi_size
            ));
        }
        if channels != 3 {
            return Err(format!("network must output 3 channels, got {channels}"));
        }
        if self.learning_rate <= 0.0 {
            return Err("learning_rate must be positive".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be positive".to_string());
        }
        if self.epochs == 0 {
            return Err("epochs must be positive".to_string());
        }
        if self.epochs_between_evals == 0 {
            return Err("epochs_between_evals must be positive".to_string());
        }
        if self.steps_between_checkpoints == 0 {
            return Err("steps_between_checkpoints must be positive".to_string());
        }
        if self.log_interval == 0 {
            return Err("log_interval must be positive".to_string());
        }
        Ok(())
    }

    /// Entries for the parameter log. Dataset entries come last.
    pub fn parameter_entries(&self) -> Vec<(String, ParamValue)> {
        let mut entries = vec![
            (
                "model_dir".to_string(),
                ParamValue::scalar(self.model_dir.display()),
            ),
            (
                "learning_rate".to_string(),
                ParamValue::scalar(self.learning_rate),
            ),
            ("batch_size".to_string(), ParamValue::scalar(self.batch_size)),
            ("epochs".to_string(), ParamValue::scalar(self.epochs)),
            (
                "epochs_between_evals".to_string(),
                ParamValue::scalar(self.epochs_between_evals),
            ),
            (
                "steps_between_checkpoints".to_string(),
                ParamValue::scalar(self.steps_between_checkpoints),
            ),
            ("seed".to_string(), ParamValue::scalar(self.seed)),
        ];
        entries.extend(self.dataset.parameter_entries());
        entries
    }

    /// Write `parameters.txt` and the JSON configuration into the model
    /// directory. Returns the parameter log path.
    pub fn persist(&self) -> Result<PathBuf> {
        let path = write_parameter_log(&self.model_dir, &self.parameter_entries())?;
        self.save(self.experiment_file())?;
        Ok(path)
    }

    /// Location of the JSON configuration.
    pub fn experiment_file(&self) -> PathBuf {
        self.model_dir.join(EXPERIMENT_FILE)
    }

    /// Load a configuration written by [`Self::persist`].
    pub fn load_from_dir(model_dir: &Path) -> Result<Self> {
        Self::load(model_dir.join(EXPERIMENT_FILE))
            .map_err(crate::error::NeuralGiError::checkpoint)
    }
}
