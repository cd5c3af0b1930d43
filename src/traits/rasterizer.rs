use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::shot::ShotImage;
use crate::types::{ProjectionUniforms, Vertex};

/// Texture sampling filter for the shot image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
}

/// One projective-texturing draw: proxy geometry, matrices and the shot image
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub vertices: &'a [Vertex],
    pub indices: &'a [u32],
    pub uniforms: ProjectionUniforms,
    pub texture: &'a ShotImage,
}

/// Row order and channel order requested on readback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelLayout {
    /// Return rows top-down instead of the native bottom-up order
    pub flip_vertical: bool,
    /// Exchange the red and blue channels (BGRA output)
    pub swap_red_blue: bool,
}

impl PixelLayout {
    /// Bottom-up RGBA, exactly as rendered
    pub const RAW: PixelLayout = PixelLayout {
        flip_vertical: false,
        swap_red_blue: false,
    };

    /// Top-down RGBA, ready for image encoders
    pub const TOP_DOWN: PixelLayout = PixelLayout {
        flip_vertical: true,
        swap_red_blue: false,
    };

    /// Top-down BGRA
    pub const TOP_DOWN_BGRA: PixelLayout = PixelLayout {
        flip_vertical: true,
        swap_red_blue: true,
    };

    /// Rewrite a bottom-up RGBA buffer in place into this layout
    ///
    /// Generic over the channel type so accumulators can be post-processed
    /// the same way as 8-bit readbacks. Fails with `InvalidInput` when the
    /// buffer is not `width * height * 4` channels long.
    pub fn apply<T>(&self, width: u32, height: u32, pixels: &mut [T]) -> Result<()> {
        let row_bytes = width as usize * 4;
        let expected = row_bytes * height as usize;
        if pixels.len() != expected {
            return Err(Error::InvalidInput(format!(
                "buffer of {} channels does not match {width}x{height} RGBA",
                pixels.len()
            )));
        }
        if self.flip_vertical {
            let rows = height as usize;
            for y in 0..rows / 2 {
                let (upper, lower) = pixels.split_at_mut((rows - 1 - y) * row_bytes);
                upper[y * row_bytes..(y + 1) * row_bytes].swap_with_slice(&mut lower[..row_bytes]);
            }
        }
        if self.swap_red_blue {
            for pixel in pixels.chunks_exact_mut(4) {
                pixel.swap(0, 2);
            }
        }
        Ok(())
    }
}

/// Rasterization capability driven by the compositor
///
/// Holds one output framebuffer (colour + depth). Implementations are not
/// reentrant; a draw overwrites the framebuffer in place, so callers read
/// pixels back before issuing the next draw.
pub trait Rasterizer {
    /// Current framebuffer size
    fn resolution(&self) -> (u32, u32);

    /// Reallocate the framebuffer
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Clear to transparent black and draw the triangle list
    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()>;

    /// Read back the framebuffer as tightly packed 8-bit RGBA rows
    fn read_pixels(&mut self, layout: PixelLayout) -> Result<Vec<u8>>;
}

impl<R: Rasterizer + ?Sized> Rasterizer for Box<R> {
    fn resolution(&self) -> (u32, u32) {
        (**self).resolution()
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        (**self).resize(width, height)
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        (**self).draw(call)
    }

    fn read_pixels(&mut self, layout: PixelLayout) -> Result<Vec<u8>> {
        (**self).read_pixels(layout)
    }
}
