use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::intrinsics::DEFAULT_FOVY_DEGREES;
use crate::error::{Error, Result};
use crate::proxy::{ProxySurface, DEFAULT_PROXY_DISTANCE, DEFAULT_PROXY_HALF_EXTENT};
use crate::traits::rasterizer::TextureFilter;

pub const DEFAULT_RESOLUTION: u32 = 512;

/// Which rasterizer drives the compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// wgpu, with the fallback adapter when no hardware adapter exists
    #[default]
    Gpu,
    /// CPU reference rasterizer
    Software,
}

/// Render settings, loadable from JSON; missing keys take defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub default_fovy: f32,
    pub proxy_distance: f32,
    pub proxy_half_extent: f32,
    pub filter: TextureFilter,
    pub backend: Backend,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_RESOLUTION,
            height: DEFAULT_RESOLUTION,
            default_fovy: DEFAULT_FOVY_DEGREES,
            proxy_distance: DEFAULT_PROXY_DISTANCE,
            proxy_half_extent: DEFAULT_PROXY_HALF_EXTENT,
            filter: TextureFilter::default(),
            backend: Backend::default(),
        }
    }
}

impl RenderConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: RenderConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::config(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.default_fovy > 0.0 && self.default_fovy < 180.0) {
            return Err(Error::config(format!(
                "default fovy must be in (0, 180), got {}",
                self.default_fovy
            )));
        }
        self.proxy().map(|_| ())
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn proxy(&self) -> Result<ProxySurface> {
        ProxySurface::new(self.proxy_half_extent, self.proxy_distance)
    }
}
