use glam::Mat4;

use crate::error::{Error, Result};

pub const DEFAULT_FOVY_DEGREES: f32 = 60.0;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 10000.0;

/// Vertical field of view, aspect ratio and clip planes
///
/// Always valid: `0 < fovy < 180`, `aspect > 0`, `0 < near < far`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    fovy_degrees: f32,
    aspect_ratio: f32,
    near: f32,
    far: f32,
}

impl Default for Intrinsics {
    fn default() -> Self {
        Self {
            fovy_degrees: DEFAULT_FOVY_DEGREES,
            aspect_ratio: 1.0,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }
}

impl Intrinsics {
    pub fn new(fovy_degrees: f32, aspect_ratio: f32, near: f32, far: f32) -> Result<Self> {
        if !(fovy_degrees > 0.0 && fovy_degrees < 180.0) {
            return Err(Error::config(format!(
                "vertical field of view must lie in (0, 180) degrees, got {fovy_degrees}"
            )));
        }
        if !(aspect_ratio > 0.0 && aspect_ratio.is_finite()) {
            return Err(Error::config(format!(
                "aspect ratio must be positive, got {aspect_ratio}"
            )));
        }
        if !(near > 0.0 && near < far && far.is_finite()) {
            return Err(Error::config(format!(
                "clip planes must satisfy 0 < near < far, got near={near} far={far}"
            )));
        }

        Ok(Self {
            fovy_degrees,
            aspect_ratio,
            near,
            far,
        })
    }

    /// Default clip planes with the given field of view and aspect ratio
    pub fn with_fov(fovy_degrees: f32, aspect_ratio: f32) -> Result<Self> {
        Self::new(fovy_degrees, aspect_ratio, DEFAULT_NEAR, DEFAULT_FAR)
    }

    pub fn fovy_degrees(&self) -> f32 {
        self.fovy_degrees
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    /// Same planes and aspect, different field of view
    pub fn set_fovy(&self, fovy_degrees: f32) -> Result<Self> {
        Self::new(fovy_degrees, self.aspect_ratio, self.near, self.far)
    }

    /// Symmetric right-handed perspective with clip-space depth in [-1, 1]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.fovy_degrees.to_radians(),
            self.aspect_ratio,
            self.near,
            self.far,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_rejects_invalid_fov() {
        assert!(matches!(Intrinsics::with_fov(0.0, 1.0), Err(Error::Configuration(_))));
        assert!(matches!(Intrinsics::with_fov(180.0, 1.0), Err(Error::Configuration(_))));
        assert!(matches!(Intrinsics::with_fov(-10.0, 1.0), Err(Error::Configuration(_))));
        assert!(matches!(Intrinsics::with_fov(f32::NAN, 1.0), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_rejects_invalid_planes() {
        assert!(matches!(Intrinsics::new(60.0, 1.0, 1.0, 1.0), Err(Error::Configuration(_))));
        assert!(matches!(Intrinsics::new(60.0, 1.0, 0.0, 10.0), Err(Error::Configuration(_))));
        assert!(matches!(Intrinsics::new(60.0, 1.0, 5.0, 2.0), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_rejects_invalid_aspect() {
        assert!(matches!(Intrinsics::with_fov(60.0, 0.0), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_projection_maps_frustum_edge_to_ndc_edge() {
        let intrinsics = Intrinsics::with_fov(90.0, 1.0).unwrap();
        let clip = intrinsics.projection_matrix() * Vec4::new(0.0, 5.0, -5.0, 1.0);
        assert!((clip.y / clip.w - 1.0).abs() < 1e-5);

        let clip = intrinsics.projection_matrix() * Vec4::new(-5.0, 0.0, -5.0, 1.0);
        assert!((clip.x / clip.w + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_projection_depth_range() {
        let intrinsics = Intrinsics::new(60.0, 1.0, 1.0, 100.0).unwrap();
        let proj = intrinsics.projection_matrix();

        let near = proj * Vec4::new(0.0, 0.0, -1.0, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert!((near.z / near.w + 1.0).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_set_fovy_keeps_planes() {
        let intrinsics = Intrinsics::new(45.0, 1.5, 0.5, 50.0).unwrap();
        let wider = intrinsics.set_fovy(70.0).unwrap();
        assert_eq!(wider.fovy_degrees(), 70.0);
        assert_eq!(wider.aspect_ratio(), 1.5);
        assert_eq!(wider.near(), 0.5);
        assert_eq!(wider.far(), 50.0);
    }
}
