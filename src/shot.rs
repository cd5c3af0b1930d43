use std::path::{Path, PathBuf};

use log::debug;

use crate::camera::{CameraModel, Intrinsics, Pose};
use crate::error::{Error, Result};

/// RGBA8 pixel buffer with row 0 at the bottom of the image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ShotImage {
    /// Wrap a bottom-up RGBA8 buffer
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(Error::InvalidInput(format!(
                "image buffer of {} bytes does not match {}x{} RGBA",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Single-colour image, handy for synthetic shots
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::from_raw(width, height, pixels)
    }

    /// Convert a decoded top-down image into bottom-up storage
    pub fn from_rgba_image(image: &image::RgbaImage) -> Result<Self> {
        let flipped = image::imageops::flip_vertical(image);
        let (width, height) = flipped.dimensions();
        Self::from_raw(width, height, flipped.into_raw())
    }

    /// Decode an image file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|source| Error::Image {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Decoded {} ({}x{})", path.display(), decoded.width(), decoded.height());
        Self::from_rgba_image(&decoded.to_rgba8())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Texel at column `x`, row `y` (row 0 = bottom)
    ///
    /// Panics if the coordinates are outside the image.
    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(
            x < self.width && y < self.height,
            "texel ({x}, {y}) outside {}x{} image",
            self.width,
            self.height
        );
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }
}

/// Where a shot's pixels come from
#[derive(Debug, Clone)]
pub enum ShotSource {
    /// Image file, decoded on construction
    Path(PathBuf),
    /// Already decoded bottom-up pixels with an optional tag
    Image {
        image: ShotImage,
        tag: Option<String>,
    },
}

impl From<PathBuf> for ShotSource {
    fn from(path: PathBuf) -> Self {
        ShotSource::Path(path)
    }
}

impl From<&Path> for ShotSource {
    fn from(path: &Path) -> Self {
        ShotSource::Path(path.to_path_buf())
    }
}

impl From<ShotImage> for ShotSource {
    fn from(image: ShotImage) -> Self {
        ShotSource::Image { image, tag: None }
    }
}

/// One sample of the light field: a camera and the image it captured
#[derive(Debug, Clone)]
pub struct Shot {
    camera: CameraModel,
    image: ShotImage,
    source: Option<String>,
}

impl Shot {
    pub fn new(source: impl Into<ShotSource>, pose: Pose, intrinsics: Intrinsics) -> Result<Self> {
        let (image, source) = match source.into() {
            ShotSource::Path(path) => {
                let image = ShotImage::open(&path)?;
                (image, Some(path.to_string_lossy().into_owned()))
            }
            ShotSource::Image { image, tag } => (image, tag),
        };

        Ok(Self {
            camera: CameraModel::new(pose, intrinsics),
            image,
            source,
        })
    }

    /// Shot from an in-memory image with an identifying tag
    pub fn from_image(
        image: ShotImage,
        tag: impl Into<String>,
        pose: Pose,
        intrinsics: Intrinsics,
    ) -> Self {
        Self {
            camera: CameraModel::new(pose, intrinsics),
            image,
            source: Some(tag.into()),
        }
    }

    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    pub fn pose(&self) -> &Pose {
        self.camera.pose()
    }

    pub fn image(&self) -> &ShotImage {
        &self.image
    }

    /// File path or in-memory tag the shot was created from
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_validates_length() {
        assert!(ShotImage::from_raw(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            ShotImage::from_raw(2, 2, vec![0; 15]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            ShotImage::from_raw(0, 2, vec![]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_decoded_image_is_stored_bottom_up() {
        let mut top_down = image::RgbaImage::new(1, 2);
        top_down.put_pixel(0, 0, image::Rgba([255, 0, 0, 255])); // top
        top_down.put_pixel(0, 1, image::Rgba([0, 0, 255, 255])); // bottom

        let shot_image = ShotImage::from_rgba_image(&top_down).unwrap();
        assert_eq!(shot_image.texel(0, 0), [0, 0, 255, 255]);
        assert_eq!(shot_image.texel(0, 1), [255, 0, 0, 255]);
    }

    #[test]
    fn test_filled_image() {
        let image = ShotImage::filled(3, 2, [1, 2, 3, 4]).unwrap();
        assert_eq!(image.pixels().len(), 24);
        assert_eq!(image.texel(2, 1), [1, 2, 3, 4]);
    }

    #[test]
    #[should_panic(expected = "outside 3x2 image")]
    fn test_texel_outside_image_panics() {
        let image = ShotImage::filled(3, 2, [1, 2, 3, 4]).unwrap();
        image.texel(3, 0);
    }

    #[test]
    fn test_missing_file_is_format_error() {
        let result = Shot::new(
            PathBuf::from("/definitely/not/here.png"),
            Pose::IDENTITY,
            Intrinsics::default(),
        );
        match result {
            Err(err @ Error::Image { .. }) => assert!(err.is_format_error()),
            other => panic!("expected an image error, got {other:?}"),
        }
    }

    #[test]
    fn test_in_memory_shot_keeps_tag() {
        let image = ShotImage::filled(1, 1, [0, 0, 0, 255]).unwrap();
        let shot = Shot::new(
            ShotSource::Image {
                image,
                tag: Some("synthetic".into()),
            },
            Pose::IDENTITY,
            Intrinsics::default(),
        )
        .unwrap();
        assert_eq!(shot.source(), Some("synthetic"));
        assert_eq!(shot.image().dimensions(), (1, 1));
    }
}
