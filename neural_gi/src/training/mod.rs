//! Training infrastructure for the geometry-image autoencoder.
//!
//! This module provides:
//! - `predict` / `evaluate`: inference-mode entry points
//! - `Trainer`: training step, epoch loop, periodic evaluation
//! - Batching of decoded samples into tensors
//! - Step outputs and loss history
//! - Checkpoint save/load for training resumption

mod batch;
mod checkpoint;
mod metrics;
mod trainer;

pub use batch::{GiBatch, InputBatch};
pub use checkpoint::{
    checkpoint_dir, checkpoint_exists, find_latest_checkpoint, load_checkpoint, load_optimizer,
    optimizer_state_exists, save_checkpoint, save_optimizer, CheckpointMetadata, CONFIG_FILE,
    METADATA_FILE, MODEL_FILE, OPTIMIZER_FILE,
};
pub(crate) use checkpoint::recorder;
pub use metrics::{EvalOutput, LossTracker, Prediction, TrainStepOutput, TrainingHistory};
pub use trainer::{default_optimizer, evaluate, predict, Trainer};
