use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use light_field::camera::{CameraModel, Intrinsics, Pose};
use light_field::cli::{Cli, Command, InputArgs, ViewArgs};
use light_field::compositor::{ProjectionOptions, ProjectiveCompositor};
use light_field::config::{Backend, RenderConfig};
use light_field::core::{GpuContext, GpuRasterizer, SoftwareRasterizer};
use light_field::integrator::Integrator;
use light_field::loaders::{self, PoseFormat};
use light_field::shot::Shot;
use light_field::traits::Rasterizer;

// === Setup ===

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

fn load_config(cli: &Cli) -> Result<RenderConfig> {
    match &cli.config {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(RenderConfig::default()),
    }
}

/// GPU rasterizer when an adapter exists, software rasterizer otherwise
fn create_rasterizer(config: &RenderConfig) -> Result<Box<dyn Rasterizer>> {
    let (width, height) = config.resolution();
    if config.backend == Backend::Gpu {
        match GpuContext::new_blocking() {
            Ok(gpu) => {
                let rasterizer = GpuRasterizer::new(Arc::new(gpu), width, height, config.filter)
                    .context("Failed to create GPU rasterizer")?;
                return Ok(Box::new(rasterizer));
            }
            Err(e) => warn!("{e}; falling back to the software rasterizer"),
        }
    }
    Ok(Box::new(SoftwareRasterizer::new(width, height, config.filter)?))
}

// === Inputs ===

fn ingestion_fovy(input: &InputArgs, config: &RenderConfig) -> Option<f32> {
    match input.format {
        PoseFormat::Colmap => input.fovy,
        PoseFormat::Direct | PoseFormat::Legacy => Some(input.fovy.unwrap_or(config.default_fovy)),
    }
}

fn load_shots(input: &InputArgs, config: &RenderConfig) -> Result<Vec<Shot>> {
    let records = loaders::read_records(input.format, &input.poses, ingestion_fovy(input, config))
        .with_context(|| format!("Failed to read poses from {}", input.poses.display()))?;

    let image_dir = match &input.images {
        Some(dir) => dir.clone(),
        None => loaders::default_image_dir(input.format, &input.poses)?,
    };

    let shots = loaders::build_shots(records, &image_dir)
        .with_context(|| format!("Failed to load shots from {}", image_dir.display()))?;
    if shots.is_empty() {
        bail!("{} contains no shots", input.poses.display());
    }
    Ok(shots)
}

/// Start from one shot's camera and apply the overrides
fn virtual_camera(view: &ViewArgs, shots: &[Shot], config: &RenderConfig) -> Result<CameraModel> {
    let base = shots
        .get(view.view_shot)
        .with_context(|| format!("--view-shot {} out of range ({} shots)", view.view_shot, shots.len()))?
        .camera();

    let pose = Pose::new(
        view.position.unwrap_or(base.position()),
        view.rotation.unwrap_or(base.orientation()),
    )?;
    let fovy = view.view_fovy.unwrap_or(base.fovy_degrees());
    let intrinsics = Intrinsics::new(
        fovy,
        config.aspect_ratio(),
        base.intrinsics().near(),
        base.intrinsics().far(),
    )?;

    info!("Virtual camera at {} looking along {}", pose.position(), pose.front());
    Ok(CameraModel::new(pose, intrinsics))
}

// === Commands ===

fn project(
    compositor: &mut ProjectiveCompositor<Box<dyn Rasterizer>>,
    camera: &CameraModel,
    shots: &[Shot],
    focus: Option<f32>,
    output: &Path,
) -> Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let options = ProjectionOptions {
        focus,
        ..ProjectionOptions::default()
    };
    let images = compositor.project_multiple_shots(camera, shots, &options)?;

    for (index, image) in images.into_iter().enumerate() {
        let path = output.join(format!("projection_{index:03}.png"));
        image
            .into_rgba_image()?
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn integrate(
    compositor: &mut ProjectiveCompositor<Box<dyn Rasterizer>>,
    camera: &CameraModel,
    shots: &[Shot],
    focus: Option<f32>,
    output: &Path,
) -> Result<()> {
    let composite = Integrator::default().integrate(compositor, camera, shots, focus, None)?;
    composite
        .to_rgba_image()?
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {}", output.display());
    Ok(())
}

fn convert(input: &InputArgs, config: &RenderConfig, output: &Path) -> Result<()> {
    let records = loaders::read_records(input.format, &input.poses, ingestion_fovy(input, config))
        .with_context(|| format!("Failed to read poses from {}", input.poses.display()))?;
    loaders::write_pose_file(&loaders::export_records(&records), output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    let mut config = load_config(&cli)?;
    let start = Instant::now();

    match &cli.command {
        Command::Project {
            input,
            render,
            view,
            output,
        }
        | Command::Integrate {
            input,
            render,
            view,
            output,
        } => {
            render.apply(&mut config);
            config.validate()?;

            let shots = load_shots(input, &config)?;
            let camera = virtual_camera(view, &shots, &config)?;
            let mut compositor = ProjectiveCompositor::new(create_rasterizer(&config)?, config.proxy()?);

            if matches!(cli.command, Command::Project { .. }) {
                project(&mut compositor, &camera, &shots, render.focus, output)?;
            } else {
                integrate(&mut compositor, &camera, &shots, render.focus, output)?;
            }
        }
        Command::Convert { input, output } => convert(input, &config, output)?,
    }

    info!("Done in {:.1} ms", start.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}
