pub mod camera;
pub mod cli;
pub mod compositor;
pub mod config;
pub mod core;
pub mod error;
pub mod integrator;
pub mod loaders;
pub mod proxy;
pub mod shot;
pub mod traits;
pub mod types;

pub use camera::{CameraModel, ControllableCamera, Intrinsics, Pose};
pub use compositor::{ProjectedImage, ProjectionOptions, ProjectiveCompositor};
pub use config::RenderConfig;
pub use error::{Error, Result};
pub use integrator::{Composite, Integrator};
pub use shot::{Shot, ShotImage};
