//! Prediction to OFF
//!
//! Runs a trained network on RGB renders and writes each predicted geometry
//! image, mirrored by (1, 1, -1), as an OFF mesh next to its input.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin gi_predict -- --checkpoint runs/airplane --input tst_rgb/
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use burn::backend::NdArray;
use clap::Parser;

use gi_core::{write_off_file, TriangleMesh, DEFAULT_REFLECTOR};
use gi_io::{list_images, DecodePool};
use neural_gi::training::{
    checkpoint_exists, find_latest_checkpoint, load_checkpoint, predict, InputBatch,
};

type Backend = NdArray;

#[derive(Parser, Debug)]
#[command(about = "Predict geometry images and write them as OFF meshes")]
struct Args {
    /// Checkpoint directory, or a model directory holding `checkpoint_<step>` directories.
    #[arg(long)]
    checkpoint: PathBuf,

    /// A PNG file or a directory of PNG files.
    #[arg(long)]
    input: PathBuf,

    /// Write to this directory instead of next to each input.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Write triangle faces.
    #[arg(long)]
    faces: bool,

    /// Images per forward pass.
    #[arg(long, default_value_t = 8)]
    batch_size: usize,

    /// Decode worker threads.
    #[arg(long, default_value_t = 4)]
    workers: usize,
}

fn resolve_checkpoint(path: &Path) -> anyhow::Result<PathBuf> {
    if checkpoint_exists(path) {
        return Ok(path.to_path_buf());
    }
    find_latest_checkpoint(path)
        .with_context(|| format!("no checkpoint found in {}", path.display()))
}

fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let off = input.with_extension("off");
    match (output_dir, off.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => off,
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if args.batch_size == 0 {
        bail!("--batch-size must be positive");
    }

    let device = Default::default();
    let checkpoint = resolve_checkpoint(&args.checkpoint)?;
    let (model, config, metadata) = load_checkpoint::<Backend>(&checkpoint, &device)?;
    log::info!(
        "Using {} (step {}, input {}x{})",
        checkpoint.display(),
        metadata.step,
        config.input_size,
        config.input_size
    );

    let inputs = if args.input.is_dir() {
        list_images(&args.input)?
    } else {
        vec![args.input.clone()]
    };
    if inputs.is_empty() {
        bail!("no PNG images in {}", args.input.display());
    }
    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let pool = DecodePool::new(args.workers)?;
    for chunk in inputs.chunks(args.batch_size) {
        let samples = pool.decode_images(chunk, config.input_size)?;
        let batch = InputBatch::<Backend>::from_images(&samples, config.input_size, &device)?;
        let images = predict(&model, batch.images)?.to_images()?;

        for (sample, image) in samples.iter().zip(images) {
            let mesh = TriangleMesh::from_source(image.mirrored(DEFAULT_REFLECTOR), args.faces)?;
            let path = output_path(&sample.path, args.output_dir.as_deref());
            let stats = write_off_file(&mesh, &path)
                .with_context(|| format!("writing {}", path.display()))?;
            log::info!(
                "{} -> {} ({} vertices, {} faces)",
                sample.path.display(),
                path.display(),
                stats.vertex_count,
                stats.face_count
            );
        }
    }
    Ok(())
}
