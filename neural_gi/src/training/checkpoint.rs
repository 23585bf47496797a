//! Checkpoint save/load functionality for training state.
//!
//! A checkpoint directory holds:
//! - `model.mpk`: full-precision named MessagePack record of the network
//! - `config.json`: the [`AutoencoderConfig`] needed to rebuild it
//! - `metadata.json`: training progress ([`CheckpointMetadata`])
//! - `optimizer.mpk`: optimizer state (Adam moments), written by the trainer

use std::fs;
use std::path::{Path, PathBuf};

use burn::config::Config;
use burn::optim::Optimizer;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::backend::AutodiffBackend;

use crate::config::AutoencoderConfig;
use crate::error::{NeuralGiError, Result};
use crate::nn::Autoencoder;

/// Record file stem; the recorder appends `.mpk`.
pub const MODEL_FILE: &str = "model";
/// Network configuration file.
pub const CONFIG_FILE: &str = "config.json";
/// Progress file.
pub const METADATA_FILE: &str = "metadata.json";
/// Optimizer record stem; the recorder appends `.mpk`.
pub const OPTIMIZER_FILE: &str = "optimizer";

const CHECKPOINT_PREFIX: &str = "checkpoint_";

/// Recorder used for checkpoints and serving exports.
pub(crate) fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::default()
}

/// Checkpoint metadata stored as JSON.
#[derive(Config, Debug)]
pub struct CheckpointMetadata {
    /// Optimizer steps taken.
    pub step: usize,
    /// Epoch the checkpoint was written in.
    pub epoch: usize,
    /// Training loss of the last step.
    #[config(default = 0.0)]
    pub loss: f32,
    /// Best evaluation loss so far.
    #[config(default = "None")]
    pub best_eval_loss: Option<f32>,
}

/// Directory name of the checkpoint written at `step`.
pub fn checkpoint_dir(base_dir: &Path, step: usize) -> PathBuf {
    base_dir.join(format!("{CHECKPOINT_PREFIX}{step}"))
}

/// Save a training checkpoint to a directory.
pub fn save_checkpoint<B: Backend>(
    dir: &Path,
    model: &Autoencoder<B>,
    config: &AutoencoderConfig,
    metadata: &CheckpointMetadata,
) -> Result<()> {
    fs::create_dir_all(dir)?;

    model
        .clone()
        .save_file(dir.join(MODEL_FILE), &recorder())
        .map_err(|e| NeuralGiError::checkpoint(format!("{e:?}")))?;
    config.save(dir.join(CONFIG_FILE))?;
    metadata.save(dir.join(METADATA_FILE))?;

    log::info!(
        "Saved checkpoint to {:?} (step {}, epoch {})",
        dir,
        metadata.step,
        metadata.epoch
    );
    Ok(())
}

/// Load a training checkpoint from a directory.
///
/// Returns the rebuilt network, its configuration and the metadata.
pub fn load_checkpoint<B: Backend>(
    dir: &Path,
    device: &B::Device,
) -> Result<(Autoencoder<B>, AutoencoderConfig, CheckpointMetadata)> {
    if !checkpoint_exists(dir) {
        return Err(NeuralGiError::checkpoint(format!(
            "no checkpoint in {}",
            dir.display()
        )));
    }

    let config =
        AutoencoderConfig::load(dir.join(CONFIG_FILE)).map_err(NeuralGiError::checkpoint)?;
    let metadata =
        CheckpointMetadata::load(dir.join(METADATA_FILE)).map_err(NeuralGiError::checkpoint)?;
    let model = Autoencoder::new(&config, device)?
        .load_file(dir.join(MODEL_FILE), &recorder(), device)
        .map_err(|e| NeuralGiError::checkpoint(format!("{e:?}")))?;

    log::info!(
        "Loaded checkpoint from {:?} (step {}, epoch {})",
        dir,
        metadata.step,
        metadata.epoch
    );
    Ok((model, config, metadata))
}

/// Save the optimizer state into a checkpoint directory.
pub fn save_optimizer<B, O>(dir: &Path, optimizer: &O) -> Result<()>
where
    B: AutodiffBackend,
    O: Optimizer<Autoencoder<B>, B>,
{
    fs::create_dir_all(dir)?;
    Recorder::<B>::record(&recorder(), optimizer.to_record(), dir.join(OPTIMIZER_FILE))
        .map_err(|e| NeuralGiError::checkpoint(format!("{e:?}")))?;
    log::debug!("Saved optimizer state to {:?}", dir);
    Ok(())
}

/// Restore optimizer state saved by [`save_optimizer`].
pub fn load_optimizer<B, O>(dir: &Path, optimizer: O, device: &B::Device) -> Result<O>
where
    B: AutodiffBackend,
    O: Optimizer<Autoencoder<B>, B>,
{
    if !optimizer_state_exists(dir) {
        return Err(NeuralGiError::checkpoint(format!(
            "no optimizer state in {}",
            dir.display()
        )));
    }
    let record = Recorder::<B>::load(&recorder(), dir.join(OPTIMIZER_FILE), device)
        .map_err(|e| NeuralGiError::checkpoint(format!("{e:?}")))?;
    Ok(optimizer.load_record(record))
}

/// Whether a checkpoint directory carries optimizer state.
pub fn optimizer_state_exists(dir: &Path) -> bool {
    dir.join(OPTIMIZER_FILE).with_extension("mpk").exists()
}

/// Check if a complete checkpoint exists at the given path.
pub fn checkpoint_exists(dir: &Path) -> bool {
    dir.join(METADATA_FILE).exists()
        && dir.join(CONFIG_FILE).exists()
        && dir.join(MODEL_FILE).with_extension("mpk").exists()
}

/// Get the latest checkpoint from a series of numbered checkpoints.
///
/// Looks for directories named `checkpoint_N` where N is a step count.
pub fn find_latest_checkpoint(base_dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(base_dir).ok()?;
    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && checkpoint_exists(path))
        .filter_map(|path| {
            let step = path
                .file_name()?
                .to_str()?
                .strip_prefix(CHECKPOINT_PREFIX)?
                .parse::<usize>()
                .ok()?;
            Some((step, path))
        })
        .max_by_key(|(step, _)| *step)
        .map(|(_, path)| path)
}
