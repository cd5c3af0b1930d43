// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use glam::{Quat, Vec3};

use crate::config::{Backend, RenderConfig};
use crate::loaders::PoseFormat;
use crate::traits::rasterizer::TextureFilter;

#[derive(Parser, Debug, Clone)]
#[command(name = "light-field")]
#[command(about = "Render novel views from posed photographs", long_about = None)]
pub struct Cli {
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// JSON render configuration; flags override its values
    #[arg(long, global = true, env = "LIGHT_FIELD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Project every shot onto the proxy and write one PNG per shot
    Project {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        render: RenderArgs,
        #[command(flatten)]
        view: ViewArgs,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Integrate all shots into a single PNG
    Integrate {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        render: RenderArgs,
        #[command(flatten)]
        view: ViewArgs,
        /// Output image
        #[arg(short, long, default_value = "integral.png")]
        output: PathBuf,
    },
    /// Convert any supported pose source to a direct pose file
    Convert {
        #[command(flatten)]
        input: InputArgs,
        /// Output pose file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Pose file, or COLMAP model folder
    pub poses: PathBuf,

    #[arg(long, value_enum, default_value_t = PoseFormat::Direct)]
    pub format: PoseFormat,

    /// Image folder (defaults to the pose file's folder)
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Field of view in degrees: fallback for direct, required value for
    /// legacy, override for COLMAP
    #[arg(long)]
    pub fovy: Option<f32>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RenderArgs {
    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    /// Proxy plane distance for this render
    #[arg(long, allow_hyphen_values = true)]
    pub focus: Option<f32>,

    #[arg(long, value_enum)]
    pub filter: Option<TextureFilter>,

    #[arg(long, value_enum)]
    pub backend: Option<Backend>,
}

impl RenderArgs {
    pub fn apply(&self, config: &mut RenderConfig) {
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(filter) = self.filter {
            config.filter = filter;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Virtual camera position "x,y,z" (defaults to the chosen shot's)
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    pub position: Option<Vec3>,

    /// Virtual camera rotation "x,y,z,w" (defaults to the chosen shot's)
    #[arg(long, value_parser = parse_quat, allow_hyphen_values = true)]
    pub rotation: Option<Quat>,

    /// Virtual camera field of view in degrees
    #[arg(long)]
    pub view_fovy: Option<f32>,

    /// Index of the shot whose camera seeds the virtual camera
    #[arg(long, default_value_t = 0)]
    pub view_shot: usize,
}

fn parse_components<const N: usize>(value: &str) -> Result<[f32; N], String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f32>().map_err(|e| format!("{part:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    parts
        .try_into()
        .map_err(|parts: Vec<f32>| format!("expected {} comma-separated numbers, got {}", N, parts.len()))
}

fn parse_vec3(value: &str) -> Result<Vec3, String> {
    parse_components::<3>(value).map(Vec3::from_array)
}

fn parse_quat(value: &str) -> Result<Quat, String> {
    parse_components::<4>(value).map(Quat::from_array)
}
