//! Geometry-image autoencoder training
//!
//! 1. Build and validate the experiment configuration
//! 2. Write the parameter log and the mean shape
//! 3. Pair and decode the training and validation splits
//! 4. Train with periodic evaluation and checkpoints
//! 5. Export the final network for serving
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin gi_train -- --data-dir data/LSS_airplane --model-dir runs/airplane
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use clap::Parser;

use gi_io::{default_views, ensure_mean_shape, list_pairs, DatasetConfig, DecodePool, Split};
use neural_gi::config::{ExperimentConfig, LossConfig};
use neural_gi::export::export_for_serving;
use neural_gi::nn::Autoencoder;
use neural_gi::training::{
    default_optimizer, find_latest_checkpoint, load_checkpoint, optimizer_state_exists, Trainer,
};

type Backend = Autodiff<NdArray>;

#[derive(Parser, Debug)]
#[command(about = "Train the geometry-image autoencoder")]
struct Args {
    /// Dataset root holding `trn`, `trn_rgb`, `trn_msk`, `val`, ...
    #[arg(long)]
    data_dir: PathBuf,

    /// Output directory for checkpoints, logs and the exported model.
    #[arg(long)]
    model_dir: PathBuf,

    /// Parameterization tag in geometry image names.
    #[arg(long, default_value = "arcSmi")]
    parameterization_suffix: String,

    /// RGB input resolution.
    #[arg(long, default_value_t = 128)]
    rgb_size: usize,

    /// Geometry image resolution.
    #[arg(long, default_value_t = 128)]
    gi_size: usize,

    /// Geometry image channels (3, or 6 with normals).
    #[arg(long, default_value_t = 3)]
    gi_channels: usize,

    /// Views to train on, comma separated. Defaults to the standard view set.
    #[arg(long, value_delimiter = ',')]
    views: Vec<String>,

    /// Train with plain MSE and no masks.
    #[arg(long)]
    no_mask: bool,

    /// Skip writing the training set's mean shape.
    #[arg(long)]
    no_mean_shape: bool,

    /// Adam learning rate.
    #[arg(long, default_value_t = 1e-4)]
    learning_rate: f64,

    /// Samples per batch.
    #[arg(long, default_value_t = 64)]
    batch_size: usize,

    /// Passes over the training split.
    #[arg(long, default_value_t = 50)]
    epochs: usize,

    /// Evaluate every this many epochs.
    #[arg(long, default_value_t = 2)]
    epochs_between_evals: usize,

    /// Checkpoint every this many steps.
    #[arg(long, default_value_t = 2000)]
    steps_between_checkpoints: usize,

    /// Decode worker threads.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Shuffle seed.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Continue from the latest checkpoint in the model directory.
    #[arg(long)]
    resume: bool,
}

impl Args {
    fn experiment(&self) -> ExperimentConfig {
        let dataset = DatasetConfig {
            parameterization_suffix: self.parameterization_suffix.clone(),
            rgb_size: self.rgb_size,
            gi_size: self.gi_size,
            gi_channels: self.gi_channels,
            selected_views: if self.views.is_empty() {
                default_views()
            } else {
                self.views.clone()
            },
            use_mask: !self.no_mask,
            generate_mean_shape: !self.no_mean_shape,
            num_workers: self.workers,
            ..DatasetConfig::new(&self.data_dir)
        };
        let model = neural_gi::AutoencoderConfig::default().with_input_size(self.rgb_size);

        ExperimentConfig::new(self.model_dir.clone(), dataset)
            .with_model(model)
            .with_loss(LossConfig::new().with_use_mask(!self.no_mask))
            .with_learning_rate(self.learning_rate)
            .with_batch_size(self.batch_size)
            .with_epochs(self.epochs)
            .with_epochs_between_evals(self.epochs_between_evals)
            .with_steps_between_checkpoints(self.steps_between_checkpoints)
            .with_seed(self.seed)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = args.experiment();
    config
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {e}"))?;
    let params = config.persist()?;
    log::info!("Parameters written to {}", params.display());

    let dataset = &config.dataset;
    for split in [Split::Train, Split::Validation] {
        dataset
            .check_split_dirs(split)
            .map_err(|dir| anyhow!("missing dataset directory {}", dir.display()))?;
    }

    let train_paths = list_pairs(dataset, Split::Train)?;
    let val_paths = list_pairs(dataset, Split::Validation)?;
    if let Some(off) = ensure_mean_shape(dataset, Split::Train, &train_paths, &config.model_dir)? {
        log::info!("Mean shape written to {}", off.display());
    }

    let pool = DecodePool::new(dataset.num_workers)?;
    let mut train = pool
        .decode_samples(&train_paths, dataset)
        .context("decoding training split")?;
    let val = pool
        .decode_samples(&val_paths, dataset)
        .context("decoding validation split")?;

    let device = Default::default();
    let resume_dir = find_latest_checkpoint(&config.model_dir).filter(|_| args.resume);
    let (model, step) = match &resume_dir {
        Some(dir) => {
            let (model, _, metadata) = load_checkpoint::<Backend>(dir, &device)?;
            log::info!("Resuming from {} at step {}", dir.display(), metadata.step);
            (model, metadata.step)
        }
        None => (Autoencoder::<Backend>::new(&config.model, &device)?, 0),
    };

    let model_config = config.model.clone();
    let mut trainer = Trainer::new(model, default_optimizer::<Backend>(), config, &device)?
        .with_step(step);
    if let Some(dir) = &resume_dir {
        if optimizer_state_exists(dir) {
            trainer = trainer.with_optimizer_state(dir)?;
        } else {
            log::warn!("No optimizer state in {}, starting Adam from zero", dir.display());
        }
    }
    let history = trainer.fit(&mut train, &val)?;
    if let Some(best) = history.best_eval_loss() {
        log::info!("Best evaluation loss: {best:.6}");
    }

    let serving_dir = trainer.config().model_dir.join("serving");
    let model = trainer.into_model().valid();
    export_for_serving(&serving_dir, &model, &model_config)?;
    Ok(())
}
