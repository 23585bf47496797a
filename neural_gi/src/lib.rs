//! # neural_gi
//!
//! Single-view 3D reconstruction with Burn: a residual convolutional
//! autoencoder maps an RGB render to a geometry image, which `gi_core`
//! unfolds into a triangle mesh.
//!
//! ## Features
//!
//! - **Residual blocks**: pre-activation blocks with explicit asymmetric
//!   padding and shape queries, plus transpose-convolution upsampling blocks
//! - **Explicit normalization state**: training forwards return their batch
//!   statistics, which are folded into the running averages alongside the
//!   optimizer step
//! - **Masked loss**: squared error weighted by `mask + 1`
//! - **Entry points**: [`predict`], [`Trainer::train_step`] and [`evaluate`]
//! - **Checkpoints and serving export** through burn's named MessagePack
//!   recorder
//!
//! ## Quick Start
//!
//! ```ignore
//! use burn::backend::{Autodiff, NdArray};
//! use neural_gi::prelude::*;
//!
//! type MyBackend = Autodiff<NdArray>;
//!
//! let device = Default::default();
//! let config = ExperimentConfig::new("runs/airplane".into(), DatasetConfig::new("data"));
//! let model = Autoencoder::<MyBackend>::new(&config.model, &device)?;
//! let mut trainer = Trainer::new(model, default_optimizer::<MyBackend>(), config, &device)?;
//!
//! trainer.fit(&mut train_samples, &val_samples)?;
//! let prediction = predict(&trainer.model().valid(), images)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! gi_core (geometry images, OFF meshes)
//!     │
//!     ├──────────────────┐
//!     ▼                  ▼
//! gi_io              neural_gi
//! (dataset)  ───────▶ (network, training)
//!                        │
//!                        ▼
//!                      demos
//!            (gi_train, gi_predict, gi_mesh)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod export;
pub mod loss;
pub mod nn;
pub mod training;

// Re-export key types for convenience
pub use config::{AutoencoderConfig, ExperimentConfig, LossConfig};
pub use error::{NeuralGiError, Result};
pub use loss::MaskedLoss;
pub use nn::Autoencoder;
pub use training::{evaluate, predict, Prediction, Trainer};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{
        AutoencoderConfig, DecoderConfig, EncoderConfig, ExperimentConfig, LossConfig,
    };
    pub use crate::error::{NeuralGiError, Result};
    pub use crate::export::{export_for_serving, load_serving_model, ServingSignature};
    pub use crate::loss::{mse, MaskedLoss};
    pub use crate::nn::{Autoencoder, BatchStatistics, Block, Decoder, Encoder};
    pub use crate::training::{
        checkpoint_exists, default_optimizer, evaluate, find_latest_checkpoint, load_checkpoint,
        predict, save_checkpoint, CheckpointMetadata, EvalOutput, GiBatch, InputBatch,
        Prediction, TrainStepOutput, Trainer, TrainingHistory,
    };

    pub use gi_io::DatasetConfig;
}
