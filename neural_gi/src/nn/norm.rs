//! Batch normalization with explicitly owned running statistics.
//!
//! A training forward pass normalizes with the statistics of the current
//! batch and appends them to a [`BatchStatistics`] log. Nothing is mutated in
//! the layer itself; the trainer folds the log back into the running averages
//! with [`Normalization::absorb_statistics`] alongside the optimizer step.
//! Inference passes read the running averages and never record anything.

use std::collections::VecDeque;

use burn::config::Config;
use burn::module::{Module, Param, ParamId};
use burn::prelude::*;

use crate::error::{NeuralGiError, Result};

/// Configuration for a [`Normalization`] layer.
#[derive(Config, Debug)]
pub struct NormalizationConfig {
    /// Number of channels.
    pub num_features: usize,

    /// Weight of the previous running average when absorbing a batch.
    #[config(default = 0.99)]
    pub momentum: f64,

    /// Added to the variance before the square root.
    #[config(default = 1e-3)]
    pub epsilon: f64,
}

impl NormalizationConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.num_features == 0 {
            return Err("num_features must be positive".to_string());
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err("momentum must be in [0, 1)".to_string());
        }
        if self.epsilon <= 0.0 {
            return Err("epsilon must be positive".to_string());
        }
        Ok(())
    }

    /// Initialize the layer: unit scale, zero shift, zero mean, unit variance.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Normalization<B> {
        let n = self.num_features;
        Normalization {
            gamma: Param::from_tensor(Tensor::ones([n], device)),
            beta: Param::from_tensor(Tensor::zeros([n], device)),
            running_mean: Param::initialized(ParamId::new(), Tensor::zeros([n], device)),
            running_var: Param::initialized(ParamId::new(), Tensor::ones([n], device)),
            momentum: self.momentum,
            epsilon: self.epsilon,
        }
    }
}

/// Per-channel statistics of one layer for one batch.
#[derive(Debug, Clone)]
pub struct LayerStatistics<B: Backend> {
    /// Batch mean, `[channels]`.
    pub mean: Tensor<B, 1>,
    /// Unbiased batch variance, `[channels]`.
    pub var: Tensor<B, 1>,
}

/// Statistics recorded by a training forward pass, in layer order.
#[derive(Debug, Clone)]
pub struct BatchStatistics<B: Backend> {
    entries: VecDeque<LayerStatistics<B>>,
}

impl<B: Backend> Default for BatchStatistics<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> BatchStatistics<B> {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Number of recorded layers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append the statistics of the next layer.
    pub fn push(&mut self, stats: LayerStatistics<B>) {
        self.entries.push_back(stats);
    }

    /// Take the statistics of the earliest remaining layer.
    pub fn next_layer(&mut self) -> Result<LayerStatistics<B>> {
        self.entries
            .pop_front()
            .ok_or_else(|| NeuralGiError::StatisticsMismatch {
                message: "log exhausted before every normalization layer was updated".to_string(),
            })
    }

    /// Fail unless every recorded entry was consumed.
    pub fn finish(&self) -> Result<()> {
        if self.entries.is_empty() {
            Ok(())
        } else {
            Err(NeuralGiError::StatisticsMismatch {
                message: format!("{} unused entries", self.entries.len()),
            })
        }
    }
}

/// Batch normalization over the channel axis of NCHW tensors.
#[derive(Module, Debug)]
pub struct Normalization<B: Backend> {
    gamma: Param<Tensor<B, 1>>,
    beta: Param<Tensor<B, 1>>,
    running_mean: Param<Tensor<B, 1>>,
    running_var: Param<Tensor<B, 1>>,
    momentum: f64,
    epsilon: f64,
}

impl<B: Backend> Normalization<B> {
    /// Number of channels.
    pub fn num_features(&self) -> usize {
        self.gamma.val().dims()[0]
    }

    /// Current running mean.
    pub fn running_mean(&self) -> Tensor<B, 1> {
        self.running_mean.val()
    }

    /// Current running variance.
    pub fn running_var(&self) -> Tensor<B, 1> {
        self.running_var.val()
    }

    /// Normalize `x`.
    ///
    /// With a log, batch statistics are used and recorded; without one the
    /// running statistics are used.
    pub fn apply(&self, x: Tensor<B, 4>, stats: Option<&mut BatchStatistics<B>>) -> Tensor<B, 4> {
        let [n, c, h, w] = x.dims();

        let (mean, var) = match stats {
            Some(log) => {
                let count = n * h * w;
                let flat = x.clone().swap_dims(0, 1).reshape([c, count]);
                let mean = flat.clone().mean_dim(1);
                let var = (flat - mean.clone()).powf_scalar(2.0).mean_dim(1);

                let correction = if count > 1 {
                    count as f64 / (count - 1) as f64
                } else {
                    1.0
                };
                log.push(LayerStatistics {
                    mean: mean.clone().detach().reshape([c]),
                    var: var.clone().detach().mul_scalar(correction).reshape([c]),
                });

                (mean.reshape([1, c, 1, 1]), var.reshape([1, c, 1, 1]))
            }
            None => (
                self.running_mean.val().reshape([1, c, 1, 1]),
                self.running_var.val().reshape([1, c, 1, 1]),
            ),
        };

        let std = var.add_scalar(self.epsilon).sqrt();
        let gamma = self.gamma.val().reshape([1, c, 1, 1]);
        let beta = self.beta.val().reshape([1, c, 1, 1]);

        (x - mean).div(std).mul(gamma).add(beta)
    }

    /// Fold the next entry of `log` into the running statistics.
    ///
    /// `running = momentum * running + (1 - momentum) * batch`
    pub fn absorb_statistics(self, log: &mut BatchStatistics<B>) -> Result<Self> {
        let stats = log.next_layer()?;
        let expected = self.num_features();
        let got = stats.mean.dims()[0];
        if got != expected {
            return Err(NeuralGiError::StatisticsMismatch {
                message: format!("layer has {expected} channels, entry has {got}"),
            });
        }

        let m = self.momentum;
        let batch_mean = stats.mean.mul_scalar(1.0 - m);
        let batch_var = stats.var.mul_scalar(1.0 - m);
        let running_mean = self
            .running_mean
            .map(|running| running.mul_scalar(m).add(batch_mean.clone()).detach());
        let running_var = self
            .running_var
            .map(|running| running.mul_scalar(m).add(batch_var.clone()).detach());

        Ok(Self {
            running_mean,
            running_var,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn values(t: Tensor<TestBackend, 1>) -> Vec<f32> {
        t.to_data().to_vec().unwrap()
    }

    /// Channel 0 holds 0..8, channel 1 holds 10.
    fn sample_input() -> Tensor<TestBackend, 4> {
        let device = Default::default();
        let mut data: Vec<f32> = (0..8).map(|v| v as f32).collect();
        data.extend([10.0; 8]);
        let t = Tensor::<TestBackend, 1>::from_floats(data.as_slice(), &device);
        // [2 channels, 2 batch, 2, 2] → [batch, channels, 2, 2]
        t.reshape([2, 2, 2, 2]).swap_dims(0, 1)
    }

    #[test]
    fn test_config_validate() {
        assert!(NormalizationConfig::new(8).validate().is_ok());
        assert!(NormalizationConfig::new(0).validate().is_err());
        assert!(NormalizationConfig::new(8).with_momentum(1.0).validate().is_err());
        assert!(NormalizationConfig::new(8).with_epsilon(0.0).validate().is_err());
    }

    #[test]
    fn test_training_forward_records_statistics() {
        let device = Default::default();
        let norm = NormalizationConfig::new(2).init::<TestBackend>(&device);
        let mut log = BatchStatistics::new();

        let y = norm.apply(sample_input(), Some(&mut log));
        assert_eq!(y.dims(), [2, 2, 2, 2]);
        assert_eq!(log.len(), 1);

        let stats = log.next_layer().unwrap();
        let mean = values(stats.mean);
        assert!((mean[0] - 3.5).abs() < 1e-5);
        assert!((mean[1] - 10.0).abs() < 1e-5);
        // Unbiased variance of 0..8 is 6.0
        let var = values(stats.var);
        assert!((var[0] - 6.0).abs() < 1e-4);
        assert!(var[1].abs() < 1e-6);
    }

    #[test]
    fn test_training_forward_normalizes() {
        let device = Default::default();
        let norm = NormalizationConfig::new(2).init::<TestBackend>(&device);
        let mut log = BatchStatistics::new();

        let y = norm.apply(sample_input(), Some(&mut log));
        let flat: Vec<f32> = y.swap_dims(0, 1).reshape([16]).to_data().to_vec().unwrap();
        let mean0: f32 = flat[..8].iter().sum::<f32>() / 8.0;
        assert!(mean0.abs() < 1e-5);
        // Constant channel collapses to the shift.
        assert!(flat[8..].iter().all(|v| v.abs() < 1e-5));
    }

    #[test]
    fn test_inference_uses_running_statistics() {
        let device = Default::default();
        let norm = NormalizationConfig::new(2)
            .with_epsilon(1e-6)
            .init::<TestBackend>(&device);

        // Fresh layer: mean 0, var 1, so inference is (nearly) the identity.
        let x = sample_input();
        let y = norm.apply(x.clone(), None);
        let diff: f32 = (y - x).abs().max().into_scalar();
        assert!(diff < 1e-3);
    }

    #[test]
    fn test_inference_does_not_touch_running_statistics() {
        let device = Default::default();
        let norm = NormalizationConfig::new(2).init::<TestBackend>(&device);
        let _ = norm.apply(sample_input(), None);
        assert_eq!(values(norm.running_mean()), vec![0.0, 0.0]);
        assert_eq!(values(norm.running_var()), vec![1.0, 1.0]);
    }

    #[test]
    fn test_absorb_statistics() {
        let device = Default::default();
        let norm = NormalizationConfig::new(2)
            .with_momentum(0.5)
            .init::<TestBackend>(&device);
        let mut log = BatchStatistics::new();
        let _ = norm.apply(sample_input(), Some(&mut log));

        let norm = norm.absorb_statistics(&mut log).unwrap();
        assert!(log.finish().is_ok());

        let mean = values(norm.running_mean());
        assert!((mean[0] - 1.75).abs() < 1e-5);
        assert!((mean[1] - 5.0).abs() < 1e-5);
        let var = values(norm.running_var());
        assert!((var[0] - 3.5).abs() < 1e-4);
        assert!((var[1] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_absorb_from_empty_log_fails() {
        let device = Default::default();
        let norm = NormalizationConfig::new(2).init::<TestBackend>(&device);
        let mut log = BatchStatistics::new();
        assert!(matches!(
            norm.absorb_statistics(&mut log),
            Err(NeuralGiError::StatisticsMismatch { .. })
        ));
    }

    #[test]
    fn test_absorb_rejects_wrong_width() {
        let device = Default::default();
        let norm = NormalizationConfig::new(3).init::<TestBackend>(&device);
        let mut log = BatchStatistics::new();
        log.push(LayerStatistics {
            mean: Tensor::zeros([2], &device),
            var: Tensor::ones([2], &device),
        });
        assert!(norm.absorb_statistics(&mut log).is_err());
    }

    #[test]
    fn test_finish_reports_leftovers() {
        let device = Default::default();
        let mut log = BatchStatistics::<TestBackend>::new();
        log.push(LayerStatistics {
            mean: Tensor::zeros([2], &device),
            var: Tensor::ones([2], &device),
        });
        assert!(log.finish().is_err());
    }
}
