//! Configuration types for neural_gi.
//!
//! This module provides Burn-style configuration structs for the network
//! architecture, the loss and a full training run.

mod network;
mod training;

pub use network::{AutoencoderConfig, DecoderConfig, EncoderConfig};
pub use training::{ExperimentConfig, LossConfig, EXPERIMENT_FILE};
