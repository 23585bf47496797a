//! Outputs of the three entry points and loss bookkeeping.

use burn::prelude::*;

use gi_core::GeometryImage;

use crate::error::{NeuralGiError, Result};

/// Output from a single training step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainStepOutput {
    /// Loss of the batch before the update.
    pub loss: f32,
    /// Step counter after the update.
    pub step: usize,
}

/// Output from an evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalOutput {
    /// Mean loss over the evaluated samples.
    pub loss: f32,
    /// Number of evaluated samples.
    pub samples: usize,
}

/// Decoded geometry images from an inference-mode forward pass.
#[derive(Debug, Clone)]
pub struct Prediction<B: Backend> {
    /// Network output: [batch, 3, height, width], values in [0, 1]
    pub geometry: Tensor<B, 4>,
}

impl<B: Backend> Prediction<B> {
    /// Wrap a network output.
    pub fn new(geometry: Tensor<B, 4>) -> Self {
        Self { geometry }
    }

    /// Number of predicted images.
    pub fn len(&self) -> usize {
        self.geometry.dims()[0]
    }

    /// Whether the prediction holds no images.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split the batch into HWC geometry images.
    pub fn to_images(&self) -> Result<Vec<GeometryImage>> {
        let [n, c, h, w] = self.geometry.dims();
        if c != GeometryImage::CHANNELS {
            return Err(NeuralGiError::ShapeMismatch {
                expected: vec![n, GeometryImage::CHANNELS, h, w],
                got: vec![n, c, h, w],
            });
        }

        let values: Vec<f32> = self
            .geometry
            .to_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| NeuralGiError::shape(format!("{e:?}")))?;

        values
            .chunks_exact(c * h * w)
            .map(|planar| GeometryImage::from_planar(h, w, planar).map_err(NeuralGiError::from))
            .collect()
    }
}

/// Running average over the last `window` losses.
#[derive(Debug, Clone)]
pub struct LossTracker {
    window: usize,
    losses: Vec<f32>,
    total_steps: usize,
}

impl LossTracker {
    /// Create a tracker averaging over `window` steps.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            losses: Vec::with_capacity(window),
            total_steps: 0,
        }
    }

    /// Record one step's loss.
    pub fn add(&mut self, loss: f32) {
        if self.losses.len() == self.window {
            self.losses.remove(0);
        }
        self.losses.push(loss);
        self.total_steps += 1;
    }

    /// Average of the recorded window, 0 when empty.
    pub fn average(&self) -> f32 {
        if self.losses.is_empty() {
            0.0
        } else {
            self.losses.iter().sum::<f32>() / self.losses.len() as f32
        }
    }

    /// Steps recorded since creation.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }
}

/// Loss history of a training run.
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    /// `(step, averaged training loss)` at each log interval.
    pub train: Vec<(usize, f32)>,
    /// `(epoch, evaluation loss)` at each evaluation.
    pub eval: Vec<(usize, f32)>,
}

impl TrainingHistory {
    /// Lowest evaluation loss so far.
    pub fn best_eval_loss(&self) -> Option<f32> {
        self.eval.iter().map(|&(_, loss)| loss).reduce(f32::min)
    }

    /// Most recent training loss.
    pub fn last_train_loss(&self) -> Option<f32> {
        self.train.last().map(|&(_, loss)| loss)
    }
}
