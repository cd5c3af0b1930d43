//! Coverage-weighted fusion of per-shot projections.
//!
//! Colour and alpha are summed independently over all shots and the colour
//! sum is then divided by the alpha sum. This is unordered evidence
//! accumulation, not back-to-front compositing, so the result does not
//! depend on shot order.

use std::time::Instant;

use log::debug;

use crate::camera::CameraModel;
use crate::compositor::{ProjectedImage, ProjectionOptions, ProjectiveCompositor};
use crate::error::{Error, Result};
use crate::shot::Shot;
use crate::traits::rasterizer::{PixelLayout, Rasterizer};

/// Integrated image, channels on a 0..=255 scale
///
/// Pixels no shot covers are transparent black.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    width: u32,
    height: u32,
    layout: PixelLayout,
    data: Vec<f32>,
}

impl Composite {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Pixel in the composite's own row order
    ///
    /// Panics if the coordinates are outside the composite.
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 4] {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} composite",
            self.width,
            self.height
        );
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Quantize to 8 bits per channel, keeping the layout
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|v| v.round().clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// Top-down RGBA image for encoders
    pub fn to_rgba_image(&self) -> Result<image::RgbaImage> {
        ProjectedImage {
            width: self.width,
            height: self.height,
            layout: self.layout,
            pixels: self.to_rgba8(),
        }
        .into_rgba_image()
    }
}

/// Fuses raw projections into a [`Composite`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Integrator {
    layout: PixelLayout,
}

impl Default for Integrator {
    fn default() -> Self {
        Self {
            layout: PixelLayout::TOP_DOWN,
        }
    }
}

impl Integrator {
    /// `layout` is applied once, to the fused result
    pub fn new(layout: PixelLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Fuse bottom-up RGBA projections of identical size
    pub fn accumulate(&self, images: &[ProjectedImage]) -> Result<Composite> {
        let first = images
            .first()
            .ok_or_else(|| Error::InvalidInput("no projections to integrate".to_string()))?;
        let (width, height) = (first.width, first.height);

        let mut sums = vec![0u32; width as usize * height as usize * 4];
        for (index, image) in images.iter().enumerate() {
            if (image.width, image.height) != (width, height) || image.pixels.len() != sums.len() {
                return Err(Error::InvalidInput(format!(
                    "projection {index} is {}x{}, expected {width}x{height}",
                    image.width, image.height
                )));
            }
            if image.layout != PixelLayout::RAW {
                return Err(Error::InvalidInput(format!(
                    "projection {index} is post-processed; integration needs raw readbacks"
                )));
            }
            for (sum, value) in sums.iter_mut().zip(&image.pixels) {
                *sum += *value as u32;
            }
        }

        self.layout.apply(width, height, &mut sums)?;

        let mut data = vec![0f32; sums.len()];
        for (out, sum) in data.chunks_exact_mut(4).zip(sums.chunks_exact(4)) {
            if sum[3] == 0 {
                continue;
            }
            let coverage = sum[3] as f32 / 255.0;
            out[0] = sum[0] as f32 / coverage;
            out[1] = sum[1] as f32 / coverage;
            out[2] = sum[2] as f32 / coverage;
            out[3] = sum[3] as f32 / coverage;
        }

        Ok(Composite {
            width,
            height,
            layout: self.layout,
            data,
        })
    }

    /// Project every shot from `virtual_camera` and fuse the results
    pub fn integrate<R: Rasterizer>(
        &self,
        compositor: &mut ProjectiveCompositor<R>,
        virtual_camera: &CameraModel,
        shots: &[Shot],
        focus: Option<f32>,
        resolution: Option<(u32, u32)>,
    ) -> Result<Composite> {
        let start = Instant::now();
        let options = ProjectionOptions {
            focus,
            resolution,
            layout: PixelLayout::RAW,
        };
        let projections = compositor.project_multiple_shots(virtual_camera, shots, &options)?;
        let composite = self.accumulate(&projections)?;

        debug!(
            "Integrated {} shots at {}x{} in {:.2} ms",
            shots.len(),
            composite.width,
            composite.height,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(composite)
    }
}
