//! Geometry image to OFF
//!
//! Converts an existing geometry-image PNG into an OFF mesh, either as the
//! image itself or mirrored into a double-sided mesh.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin gi_mesh -- --geometry-image in/a_1_arcSmi_128_flatGI.png \
//!     --output out/a_1.off --faces --mirror
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use gi_core::{write_off_file, MeshSource, TriangleMesh, DEFAULT_REFLECTOR};
use gi_io::load_geometry_image;

#[derive(Parser, Debug)]
#[command(about = "Convert a geometry image PNG to an OFF mesh")]
struct Args {
    /// Geometry image (PNG, RGB encodes xyz).
    #[arg(long)]
    geometry_image: PathBuf,

    /// Output OFF file.
    #[arg(long)]
    output: PathBuf,

    /// Write triangle faces.
    #[arg(long)]
    faces: bool,

    /// Append the slice reflected by (1, 1, -1).
    #[arg(long)]
    mirror: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let image = load_geometry_image(&args.geometry_image)
        .with_context(|| format!("reading {}", args.geometry_image.display()))?;
    let source = if args.mirror {
        image.mirrored(DEFAULT_REFLECTOR)
    } else {
        MeshSource::Image(image)
    };
    let mesh = TriangleMesh::from_source(source, args.faces)?;

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let stats = write_off_file(&mesh, &args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    log::info!(
        "Wrote {} ({} vertices, {} faces)",
        args.output.display(),
        stats.vertex_count,
        stats.face_count
    );
    Ok(())
}
