use std::time::Instant;

use log::debug;

use crate::camera::CameraModel;
use crate::error::{Error, Result};
use crate::proxy::ProxySurface;
use crate::shot::Shot;
use crate::traits::rasterizer::{DrawCall, PixelLayout, Rasterizer};
use crate::types::ProjectionUniforms;

/// Per-call knobs for a projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionOptions {
    /// Proxy plane distance for this call, overriding the compositor's proxy
    pub focus: Option<f32>,
    /// Output size; the rasterizer's current size when `None`
    pub resolution: Option<(u32, u32)>,
    pub layout: PixelLayout,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            focus: None,
            resolution: None,
            layout: PixelLayout::TOP_DOWN,
        }
    }
}

impl ProjectionOptions {
    /// Bottom-up RGBA, as consumed by the integrator
    pub fn raw() -> Self {
        Self {
            layout: PixelLayout::RAW,
            ..Self::default()
        }
    }

    pub fn with_focus(mut self, focus: f32) -> Self {
        self.focus = Some(focus);
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Some((width, height));
        self
    }
}

/// One shot projected onto the proxy, as seen from the virtual camera
///
/// Alpha is 255 where the proxy lies inside the shot's frustum and 0
/// everywhere else.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedImage {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub pixels: Vec<u8>,
}

impl ProjectedImage {
    /// Alpha at column `x`, row `y` in this image's row order
    ///
    /// Panics if the coordinates are outside the image.
    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} image",
            self.width,
            self.height
        );
        self.pixels[(y as usize * self.width as usize + x as usize) * 4 + 3]
    }

    /// Convert into a top-down RGBA image whatever the readback layout was
    pub fn into_rgba_image(self) -> Result<image::RgbaImage> {
        let Self {
            width,
            height,
            layout,
            mut pixels,
        } = self;
        // both layout operations are involutions
        layout.apply(width, height, &mut pixels)?;
        PixelLayout::TOP_DOWN.apply(width, height, &mut pixels)?;
        image::RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| Error::InvalidInput(format!("pixel buffer does not match {width}x{height}")))
    }
}

/// Renders shots onto the proxy surface through a [`Rasterizer`]
pub struct ProjectiveCompositor<R: Rasterizer> {
    rasterizer: R,
    proxy: ProxySurface,
}

impl<R: Rasterizer> ProjectiveCompositor<R> {
    pub fn new(rasterizer: R, proxy: ProxySurface) -> Self {
        Self { rasterizer, proxy }
    }

    pub fn proxy(&self) -> &ProxySurface {
        &self.proxy
    }

    pub fn set_proxy(&mut self, proxy: ProxySurface) {
        self.proxy = proxy;
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.rasterizer.resolution()
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    pub fn into_rasterizer(self) -> R {
        self.rasterizer
    }

    /// Resize the framebuffer only when the requested size differs
    fn ensure_resolution(&mut self, resolution: Option<(u32, u32)>) -> Result<()> {
        if let Some((width, height)) = resolution {
            if self.rasterizer.resolution() != (width, height) {
                debug!(
                    "Reallocating framebuffer {:?} -> {width}x{height}",
                    self.rasterizer.resolution()
                );
                self.rasterizer.resize(width, height)?;
            }
        }
        Ok(())
    }

    fn proxy_for(&self, focus: Option<f32>) -> Result<ProxySurface> {
        match focus {
            Some(distance) => self.proxy.focused_at(distance),
            None => Ok(self.proxy),
        }
    }

    fn render(
        &mut self,
        proxy: &ProxySurface,
        virtual_camera: &CameraModel,
        shot: &Shot,
        layout: PixelLayout,
    ) -> Result<ProjectedImage> {
        let vertices = proxy.vertices();
        let uniforms = ProjectionUniforms::new(
            proxy.model_matrix(),
            virtual_camera.view_matrix(),
            virtual_camera.projection_matrix(),
            shot.camera().view_matrix(),
            shot.camera().projection_matrix(),
        );

        self.rasterizer.draw(&DrawCall {
            vertices: &vertices,
            indices: proxy.indices(),
            uniforms,
            texture: shot.image(),
        })?;

        let (width, height) = self.rasterizer.resolution();
        let pixels = self.rasterizer.read_pixels(layout)?;
        Ok(ProjectedImage {
            width,
            height,
            layout,
            pixels,
        })
    }

    /// Project one shot as seen from `virtual_camera`
    pub fn project_shot(
        &mut self,
        virtual_camera: &CameraModel,
        shot: &Shot,
        options: &ProjectionOptions,
    ) -> Result<ProjectedImage> {
        let start = Instant::now();
        self.ensure_resolution(options.resolution)?;
        let proxy = self.proxy_for(options.focus)?;

        let image = self.render(&proxy, virtual_camera, shot, options.layout)?;
        debug!(
            "Projected {} in {:.2} ms",
            shot.source().unwrap_or("<memory>"),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(image)
    }

    /// Project every shot from the same virtual camera, in input order
    ///
    /// Each readback finishes before the next draw starts.
    pub fn project_multiple_shots(
        &mut self,
        virtual_camera: &CameraModel,
        shots: &[Shot],
        options: &ProjectionOptions,
    ) -> Result<Vec<ProjectedImage>> {
        let start = Instant::now();
        self.ensure_resolution(options.resolution)?;
        let proxy = self.proxy_for(options.focus)?;

        let images = shots
            .iter()
            .map(|shot| self.render(&proxy, virtual_camera, shot, options.layout))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Projected {} shots in {:.2} ms",
            shots.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(images)
    }
}
