//! The three entry points: predict, train step and evaluate.
//!
//! `predict` and `evaluate` run the inference-mode forward on any backend.
//! Training lives on [`Trainer`], which owns the parameters and the
//! optimizer state and therefore needs an autodiff backend.

use std::path::Path;

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use rand::rngs::StdRng;
use rand::SeedableRng;

use gi_io::{shuffle_samples, Sample};

use crate::config::ExperimentConfig;
use crate::error::{NeuralGiError, Result};
use crate::loss::MaskedLoss;
use crate::nn::Autoencoder;

use super::batch::GiBatch;
use super::checkpoint::{
    checkpoint_dir, load_optimizer, save_checkpoint, save_optimizer, CheckpointMetadata,
};
use super::metrics::{EvalOutput, LossTracker, Prediction, TrainStepOutput, TrainingHistory};

/// Adam as used for training, epsilon 1e-8.
pub fn default_optimizer<B: AutodiffBackend>() -> impl Optimizer<Autoencoder<B>, B> {
    AdamConfig::new().with_epsilon(1e-8).init()
}

/// Inference-mode forward pass.
///
/// Uses the running statistics and nothing stochastic, so repeated calls on
/// the same input and parameters are bit-identical.
pub fn predict<B: Backend>(
    model: &Autoencoder<B>,
    images: Tensor<B, 4>,
) -> Result<Prediction<B>> {
    model.output_shape(images.dims())?;
    Ok(Prediction::new(model.infer(images)))
}

/// Inference-mode forward pass plus loss. Parameters are left untouched.
pub fn evaluate<B: Backend>(
    model: &Autoencoder<B>,
    batch: &GiBatch<B>,
    loss: &MaskedLoss,
) -> Result<EvalOutput> {
    loss.check_batch(batch.masks.is_some())?;
    let prediction = predict(model, batch.images.clone())?;
    let value = loss.compute(prediction.geometry, batch.targets.clone(), batch.masks.clone())?;
    Ok(EvalOutput {
        loss: value.into_scalar().elem::<f32>(),
        samples: batch.len(),
    })
}

/// Training state: parameters, optimizer, step counter and history.
pub struct Trainer<B: AutodiffBackend, O> {
    model: Autoencoder<B>,
    optimizer: O,
    loss: MaskedLoss,
    config: ExperimentConfig,
    device: B::Device,
    step: usize,
    epoch: usize,
    rng: StdRng,
    history: TrainingHistory,
}

impl<B, O> Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Autoencoder<B>, B>,
{
    /// Create a trainer. Fails when the experiment configuration is invalid.
    pub fn new(
        model: Autoencoder<B>,
        optimizer: O,
        config: ExperimentConfig,
        device: &B::Device,
    ) -> Result<Self> {
        config.validate().map_err(NeuralGiError::config)?;
        Ok(Self {
            model,
            optimizer,
            loss: MaskedLoss::new(config.loss.clone()),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            device: device.clone(),
            step: 0,
            epoch: 0,
            history: TrainingHistory::default(),
        })
    }

    /// Continue counting from a checkpoint's step.
    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    /// Restore the optimizer state stored in a checkpoint directory.
    pub fn with_optimizer_state(mut self, dir: &Path) -> Result<Self> {
        self.optimizer = load_optimizer::<B, O>(dir, self.optimizer, &self.device)?;
        Ok(self)
    }

    /// The current parameters.
    pub fn model(&self) -> &Autoencoder<B> {
        &self.model
    }

    /// Consume the trainer, returning the trained network.
    pub fn into_model(self) -> Autoencoder<B> {
        self.model
    }

    /// Optimizer steps taken.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Experiment configuration.
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Loss history so far.
    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    /// One optimization step on a batch.
    ///
    /// Training-mode forward, loss, backward and Adam update. The batch
    /// statistics of the forward are folded into the running averages
    /// alongside the update.
    pub fn train_step(&mut self, batch: &GiBatch<B>) -> Result<TrainStepOutput> {
        self.loss.check_batch(batch.masks.is_some())?;
        self.model.output_shape(batch.images.dims())?;

        let (prediction, stats) = self.model.forward_training(batch.images.clone());
        let loss = self
            .loss
            .compute(prediction, batch.targets.clone(), batch.masks.clone())?;
        let value = loss.clone().into_scalar().elem::<f32>();

        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        let model = self
            .optimizer
            .step(self.config.learning_rate, self.model.clone(), grads);
        self.model = model.absorb_statistics(stats)?;
        self.step += 1;

        Ok(TrainStepOutput {
            loss: value,
            step: self.step,
        })
    }

    /// Evaluate a batch with the current parameters.
    pub fn evaluate(&self, batch: &GiBatch<B>) -> Result<EvalOutput> {
        evaluate(&self.model.valid(), &batch.clone().inner(), &self.loss)
    }

    /// Evaluate a whole split, batch by batch. The loss is the
    /// sample-weighted mean of the batch losses.
    pub fn evaluate_samples(&self, samples: &[Sample]) -> Result<EvalOutput> {
        if samples.is_empty() {
            return Err(NeuralGiError::EmptyBatch);
        }
        let model = self.model.valid();
        let (rgb_size, gi_size) = (self.config.dataset.rgb_size, self.config.dataset.gi_size);

        let mut total = 0.0f64;
        let mut count = 0;
        for chunk in samples.chunks(self.config.batch_size) {
            let batch = GiBatch::<B>::from_samples(chunk, rgb_size, gi_size, &self.device)?;
            let output = evaluate(&model, &batch.inner(), &self.loss)?;
            total += f64::from(output.loss) * output.samples as f64;
            count += output.samples;
        }

        Ok(EvalOutput {
            loss: (total / count as f64) as f32,
            samples: count,
        })
    }

    /// Train for the configured number of epochs.
    ///
    /// The training split is reshuffled every epoch. The validation split is
    /// evaluated every `epochs_between_evals` epochs and after the last one,
    /// and a checkpoint is written every `steps_between_checkpoints` steps and
    /// at the end.
    pub fn fit(&mut self, train: &mut [Sample], val: &[Sample]) -> Result<&TrainingHistory> {
        if train.is_empty() {
            return Err(NeuralGiError::EmptyBatch);
        }
        let (rgb_size, gi_size) = (self.config.dataset.rgb_size, self.config.dataset.gi_size);
        let epochs = self.config.epochs;
        let mut tracker = LossTracker::new(self.config.log_interval);
        let mut last_loss = 0.0;

        log::info!(
            "Training on {} samples ({} validation) for {} epochs",
            train.len(),
            val.len(),
            epochs
        );

        for epoch in 0..epochs {
            self.epoch = epoch + 1;
            shuffle_samples(train, &mut self.rng);

            for chunk in train.chunks(self.config.batch_size) {
                let batch = GiBatch::from_samples(chunk, rgb_size, gi_size, &self.device)?;
                let output = self.train_step(&batch)?;
                tracker.add(output.loss);
                last_loss = output.loss;

                if output.step % self.config.log_interval == 0 {
                    log::info!(
                        "Epoch {}/{} step {}: loss = {:.6}",
                        self.epoch,
                        epochs,
                        output.step,
                        tracker.average()
                    );
                    self.history.train.push((output.step, tracker.average()));
                } else {
                    log::debug!("step {}: loss = {:.6}", output.step, output.loss);
                }

                if output.step % self.config.steps_between_checkpoints == 0 {
                    self.save_checkpoint(last_loss)?;
                }
            }

            if self.epoch % self.config.epochs_between_evals == 0 || self.epoch == epochs {
                if val.is_empty() {
                    log::warn!("No validation samples, skipping evaluation");
                } else {
                    let eval = self.evaluate_samples(val)?;
                    log::info!(
                        "Evaluation after epoch {}: loss = {:.6} over {} samples",
                        self.epoch,
                        eval.loss,
                        eval.samples
                    );
                    self.history.eval.push((self.epoch, eval.loss));
                }
            }
        }

        if self.step % self.config.steps_between_checkpoints != 0 {
            self.save_checkpoint(last_loss)?;
        }
        Ok(&self.history)
    }

    /// Write `checkpoint_<step>` into the model directory, optimizer state
    /// included.
    pub fn save_checkpoint(&self, loss: f32) -> Result<()> {
        let dir = checkpoint_dir(&self.config.model_dir, self.step);
        let metadata = CheckpointMetadata::new(self.step, self.epoch)
            .with_loss(loss)
            .with_best_eval_loss(self.history.best_eval_loss());
        save_checkpoint(&dir, &self.model, &self.config.model, &metadata)?;
        save_optimizer::<B, O>(&dir, &self.optimizer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AutoencoderConfig, DecoderConfig, EncoderConfig, LossConfig};
    use burn::backend::{Autodiff, NdArray};
    use gi_io::DatasetConfig;

    type TestBackend = Autodiff<NdArray>;

    fn tiny_model() -> AutoencoderConfig {
        AutoencoderConfig::new(
            EncoderConfig::new()
                .with_stem_filters(4)
                .with_stage_filters(vec![8, 8])
                .with_identity_blocks(0),
            DecoderConfig::new()
                .with_latent_channels(8)
                .with_stage_filters(vec![8, 4, 4])
                .with_identity_blocks(0),
        )
        .with_input_size(16)
    }

    fn experiment(dir: &std::path::Path, use_mask: bool) -> ExperimentConfig {
        let mut dataset = DatasetConfig::new("/unused");
        dataset.rgb_size = 16;
        dataset.gi_size = 16;
        dataset.use_mask = use_mask;
        ExperimentConfig::new(dir.to_path_buf(), dataset)
            .with_model(tiny_model())
            .with_loss(LossConfig::new().with_use_mask(use_mask))
            .with_batch_size(2)
            .with_epochs(1)
            .with_log_interval(1)
    }

    fn sample(value: f32) -> Sample {
        Sample {
            rgb: vec![value; 3 * 16 * 16],
            geometry: vec![0.5; 3 * 16 * 16],
            mask: None,
        }
    }

    #[test]
    fn test_train_step_increments_step() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = experiment(dir.path(), false);
        let model = Autoencoder::<TestBackend>::new(&config.model, &device).unwrap();
        let optimizer = default_optimizer::<TestBackend>();
        let mut trainer = Trainer::new(model, optimizer, config, &device).unwrap();

        let batch =
            GiBatch::from_samples(&[sample(0.2), sample(0.8)], 16, 16, &device).unwrap();
        let first = trainer.train_step(&batch).unwrap();
        let second = trainer.train_step(&batch).unwrap();

        assert_eq!(first.step, 1);
        assert_eq!(second.step, 2);
        assert!(first.loss.is_finite());
        assert_eq!(trainer.step(), 2);
    }

    #[test]
    fn test_masked_training_rejects_unmasked_batch() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = experiment(dir.path(), true);
        let model = Autoencoder::<TestBackend>::new(&config.model, &device).unwrap();
        let optimizer = default_optimizer::<TestBackend>();
        let mut trainer = Trainer::new(model, optimizer, config, &device).unwrap();

        let batch = GiBatch::from_samples(&[sample(0.2)], 16, 16, &device).unwrap();
        assert!(matches!(
            trainer.train_step(&batch),
            Err(NeuralGiError::MissingMask)
        ));
        assert_eq!(trainer.step(), 0);
    }

    #[test]
    fn test_fit_writes_final_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = experiment(dir.path(), false);
        let model = Autoencoder::<TestBackend>::new(&config.model, &device).unwrap();
        let optimizer = default_optimizer::<TestBackend>();
        let mut trainer = Trainer::new(model, optimizer, config, &device).unwrap();

        let mut train = vec![sample(0.1), sample(0.4), sample(0.9)];
        let val = vec![sample(0.3)];
        let history = trainer.fit(&mut train, &val).unwrap();

        // Three samples in batches of two.
        assert_eq!(history.train.len(), 2);
        assert_eq!(history.eval.len(), 1);
        assert!(super::super::checkpoint::checkpoint_exists(&checkpoint_dir(
            dir.path(),
            2
        )));
    }
}
