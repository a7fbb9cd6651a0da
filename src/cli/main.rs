//! Command-line front end for the scan conversion pipeline.
//!
//! - `convert`: turn a scan image into sparse fog-volume / level-set
//!   grids, dense images, and surface meshes
//! - `demo`: synthesize a CT-like phantom and run the full pipeline on it

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::DVec3;

use scanvox::{
    read_scan_image, write_scan_image, Pipeline, PipelineConfig, ProductConfig, ScanImage,
    SparseEngine, Thresholds,
};

use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "scanvox")]
#[command(about = "Convert scalar scan volumes to sparse voxel grids and meshes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a scan image into grids, images, and meshes
    Convert(ConvertArgs),
    /// Synthesize a CT-like phantom and run the full pipeline on it
    Demo(DemoArgs),
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input scan image (raw-encoded NRRD)
    #[arg(short, long)]
    input: PathBuf,

    /// RON pipeline config; explicit flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Surface level in raw units (default: 1500, mid-bone for CT)
    #[arg(long)]
    iso_value: Option<f64>,

    /// Lower clamp bound in raw units (default: 1000)
    #[arg(long)]
    min: Option<f64>,

    /// Upper clamp bound in raw units (default: 3000)
    #[arg(long)]
    max: Option<f64>,

    /// Mesh simplification amount in [0, 1]
    #[arg(long)]
    adaptivity: Option<f64>,

    /// Densities within this distance of zero are not stored
    #[arg(long)]
    prune_tolerance: Option<f32>,

    /// Creator tag recorded on every produced grid
    #[arg(long)]
    creator: Option<String>,

    /// Write both grids into one container file
    /// (default: `<input stem>.svox` when no other output is requested)
    #[arg(short, long)]
    grids: Option<PathBuf>,

    /// Write the fog volume's densified image (NRRD)
    #[arg(long)]
    fog_image: Option<PathBuf>,

    /// Write the fog volume's isosurface mesh (.stl or .obj)
    #[arg(long)]
    fog_mesh: Option<PathBuf>,

    /// Write the level set's densified image (NRRD)
    #[arg(long)]
    level_set_image: Option<PathBuf>,

    /// Write the level set's zero-surface mesh (.stl or .obj)
    #[arg(long)]
    level_set_mesh: Option<PathBuf>,

    /// Stop after the fog-volume flow
    #[arg(long)]
    fog_only: bool,
}

#[derive(Parser, Debug)]
struct DemoArgs {
    /// Output directory for the phantom and every pipeline product
    #[arg(short, long, default_value = "demo")]
    output: PathBuf,

    /// Phantom edge length in voxels
    #[arg(long, default_value = "64")]
    size: usize,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => run_convert(args),
        Commands::Demo(args) => run_demo(args),
    }
}

fn run_convert(args: ConvertArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            let path = path.to_str().context("config path is not valid UTF-8")?;
            PipelineConfig::read_file(path).context("failed to read config")?
        }
        None => ct_defaults(),
    };

    if let Some(iso) = args.iso_value {
        config.iso_value = iso;
    }
    if let Some(min) = args.min {
        config.thresholds.min = min;
    }
    if let Some(max) = args.max {
        config.thresholds.max = max;
    }
    if let Some(adaptivity) = args.adaptivity {
        config.adaptivity = adaptivity;
    }
    if let Some(tolerance) = args.prune_tolerance {
        config.prune_tolerance = tolerance;
    }
    if let Some(creator) = args.creator {
        config.creator = creator;
    }
    config.fog_volume.image_path = args.fog_image.or(config.fog_volume.image_path);
    config.fog_volume.mesh_path = args.fog_mesh.or(config.fog_volume.mesh_path);
    config.level_set.image_path = args.level_set_image.or(config.level_set.image_path);
    config.level_set.mesh_path = args.level_set_mesh.or(config.level_set.mesh_path);

    let no_output_requested = args.grids.is_none()
        && config.fog_volume.grid_path.is_none()
        && config.fog_volume.image_path.is_none()
        && config.fog_volume.mesh_path.is_none()
        && config.level_set.grid_path.is_none()
        && config.level_set.image_path.is_none()
        && config.level_set.mesh_path.is_none();
    let grids_path = args.grids.or_else(|| {
        no_output_requested.then(|| args.input.with_extension("svox"))
    });

    let image = read_scan_image(&args.input)
        .with_context(|| format!("failed to read {:?}", args.input))?;
    println!(
        "Read {:?} image ({} samples)",
        image.dims,
        image.data.len()
    );

    let mut pipeline = Pipeline::new(SparseEngine, config);
    pipeline
        .run_fog_volume(&image)
        .context("fog-volume flow failed")?;
    if !args.fog_only {
        pipeline.run_level_set().context("level-set flow failed")?;
    }

    if let Some(path) = grids_path {
        let mut grids = Vec::new();
        if let Some(fog) = pipeline.fog_volume() {
            grids.push(fog);
        }
        if let Some(sdf) = pipeline.level_set() {
            grids.push(sdf);
        }
        pipeline
            .adapter()
            .write(&grids, &path)
            .context("failed to write grid container")?;
        println!("Wrote {} grid(s) to {:?}", grids.len(), path);
    }

    println!("Done");
    Ok(())
}

fn run_demo(args: DemoArgs) -> Result<()> {
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("failed to create {:?}", args.output))?;

    let image = phantom(args.size);
    let phantom_path = args.output.join("phantom.nrrd");
    write_scan_image(&phantom_path, &image).context("failed to write phantom")?;
    println!("Wrote {:?} phantom to {:?}", image.dims, phantom_path);

    let mut config = ct_defaults();
    config.fog_volume.grid_path = Some(args.output.join("fog_volume.svox"));
    config.fog_volume.mesh_path = Some(args.output.join("fog_volume.obj"));
    config.level_set.grid_path = Some(args.output.join("level_set.svox"));
    config.level_set.image_path = Some(args.output.join("level_set.nrrd"));
    config.level_set.mesh_path = Some(args.output.join("level_set.stl"));

    let mut pipeline = Pipeline::new(SparseEngine, config);
    pipeline.run(&image).context("pipeline failed")?;

    println!("Pipeline products are in {:?}", args.output);
    Ok(())
}

/// Bone extraction presets for CT data in Hounsfield-shifted units.
fn ct_defaults() -> PipelineConfig {
    PipelineConfig {
        iso_value: 1500.0,
        thresholds: Thresholds::new(1000.0, 3000.0),
        creator: "scanvox".to_owned(),
        fog_volume: ProductConfig {
            name: "fog_volume".to_owned(),
            ..Default::default()
        },
        level_set: ProductConfig {
            name: "level_set".to_owned(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A hollow bone-density sphere in an air background, with a soft rim so
/// the normalized densities ramp across the isosurface.
fn phantom(size: usize) -> ScanImage {
    let center = (size as f64 - 1.0) / 2.0;
    let outer = size as f64 * 0.35;
    let inner = outer * 0.6;
    let rim = 2.0;

    let mut data = vec![0.0f32; size * size * size];
    let mut linear = 0;
    for z in 0..size {
        for y in 0..size {
            for x in 0..size {
                let d = ((x as f64 - center).powi(2)
                    + (y as f64 - center).powi(2)
                    + (z as f64 - center).powi(2))
                .sqrt();
                // Distance into the shell, positive inside it.
                let depth = (outer - d).min(d - inner);
                let density = ((depth + rim) / (2.0 * rim)).clamp(0.0, 1.0);
                data[linear] = (3000.0 * density) as f32;
                linear += 1;
            }
        }
    }

    ScanImage {
        dims: vec![size, size, size],
        origin: DVec3::ZERO,
        spacing: DVec3::splat(0.5),
        data,
    }
}
