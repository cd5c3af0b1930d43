use glam::{Mat3, Mat4, Quat, Vec3};

use crate::error::{Error, Result};

/// Rigid camera placement in world space
///
/// `orientation` rotates camera-frame vectors into the world: the camera looks
/// along `orientation * -Z` with `orientation * +Y` as its up vector. The
/// quaternion is stored normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    position: Vec3,
    orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    /// Camera at the origin looking down -Z
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    /// Create a pose, normalizing the orientation
    pub fn new(position: Vec3, orientation: Quat) -> Result<Self> {
        if !position.is_finite() {
            return Err(Error::InvalidInput(format!(
                "camera position must be finite, got {position}"
            )));
        }

        let length = orientation.length();
        if !length.is_finite() || length <= f32::EPSILON {
            return Err(Error::InvalidInput(format!(
                "camera orientation must be a non-zero quaternion, got {orientation}"
            )));
        }

        Ok(Self {
            position,
            orientation: orientation / length,
        })
    }

    /// Create a pose from raw `[x, y, z]` and `[x, y, z, w]` arrays
    pub fn from_arrays(position: [f32; 3], orientation_xyzw: [f32; 4]) -> Result<Self> {
        Self::new(
            Vec3::from_array(position),
            Quat::from_array(orientation_xyzw),
        )
    }

    /// Build a pose looking along `front` with the given `up` hint
    pub fn look_at(position: Vec3, front: Vec3, up: Vec3) -> Result<Self> {
        let front = front.normalize_or_zero();
        let right = front.cross(up).normalize_or_zero();
        if front == Vec3::ZERO || right == Vec3::ZERO {
            return Err(Error::InvalidInput(format!(
                "front {front} and up {up} must be non-zero and not parallel"
            )));
        }
        let true_up = right.cross(front);

        let basis = Mat3::from_cols(right, true_up, -front);
        Self::new(position, Quat::from_mat3(&basis))
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Viewing direction in world space
    pub fn front(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    /// `normalize(front × up)`
    pub fn right(&self) -> Vec3 {
        self.front().cross(self.up()).normalize()
    }

    /// World-to-camera transform: `R(q)ᵀ · T(-p)`
    ///
    /// Translation is applied first, then the inverse rotation. Virtual and
    /// shot cameras must both go through here or projective texturing mirrors.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_quat(self.orientation.conjugate()) * Mat4::from_translation(-self.position)
    }

    /// Camera-to-world transform, the inverse of [`Pose::view_matrix`]
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    pub fn with_position(&self, position: Vec3) -> Result<Self> {
        Self::new(position, self.orientation)
    }

    pub fn with_orientation(&self, orientation: Quat) -> Result<Self> {
        Self::new(self.position, orientation)
    }

    /// Same orientation, position shifted by `delta`
    pub fn translated(&self, delta: Vec3) -> Result<Self> {
        self.with_position(self.position + delta)
    }

    /// Compare two poses up to quaternion sign
    pub fn approx_eq(&self, other: &Pose, tolerance: f32) -> bool {
        self.position.abs_diff_eq(other.position, tolerance)
            && (1.0 - self.orientation.dot(other.orientation).abs()) <= tolerance
    }
}
