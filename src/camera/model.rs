use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use super::intrinsics::Intrinsics;
use super::pose::Pose;

/// A pose plus intrinsics, the viewpoint of either a shot or the virtual camera
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraModel {
    pose: Pose,
    intrinsics: Intrinsics,
}

impl CameraModel {
    pub fn new(pose: Pose, intrinsics: Intrinsics) -> Self {
        Self { pose, intrinsics }
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position()
    }

    pub fn orientation(&self) -> Quat {
        self.pose.orientation()
    }

    pub fn fovy_degrees(&self) -> f32 {
        self.intrinsics.fovy_degrees()
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    pub fn set_intrinsics(&mut self, intrinsics: Intrinsics) {
        self.intrinsics = intrinsics;
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.pose.view_matrix()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.intrinsics.projection_matrix()
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Normalized image coordinates of a world point, `(0,0)` bottom-left
    ///
    /// Returns `None` for points behind the camera. Coordinates outside
    /// `[0,1]²` are returned as-is; they are outside the frustum.
    pub fn project(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.view_projection() * Vec4::from((world, 1.0));
        if clip.w <= 0.0 {
            return None;
        }
        Some(Vec2::new(clip.x, clip.y) / clip.w * 0.5 + Vec2::splat(0.5))
    }
}
