use glam::{Quat, Vec3};

use super::intrinsics::Intrinsics;
use super::model::CameraModel;
use super::pose::Pose;
use crate::error::Result;

pub const MOVE_STEP: f32 = 0.1;
pub const ZOOM_STEP_DEGREES: f32 = 0.1;
pub const ROTATE_STEP_DEGREES: f32 = 0.2;

/// A single discrete camera step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraCommand {
    MoveForward,
    MoveBackward,
    StrafeLeft,
    StrafeRight,
    StrafeUp,
    StrafeDown,
    RotateLeft,
    RotateRight,
    ZoomIn,
    ZoomOut,
}

/// Increments applied by each command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSizes {
    pub translate: f32,
    pub rotate_degrees: f32,
    pub zoom_degrees: f32,
}

impl Default for StepSizes {
    fn default() -> Self {
        Self {
            translate: MOVE_STEP,
            rotate_degrees: ROTATE_STEP_DEGREES,
            zoom_degrees: ZOOM_STEP_DEGREES,
        }
    }
}

/// Interactively steered virtual camera
///
/// Wraps a [`CameraModel`] and mutates it in small steps. Not synchronized;
/// callers serialize access.
#[derive(Debug, Clone)]
pub struct ControllableCamera {
    camera: CameraModel,
    steps: StepSizes,
}

impl ControllableCamera {
    /// Camera at the origin looking down -Z
    pub fn new(aspect_ratio: f32) -> Result<Self> {
        let intrinsics = Intrinsics::with_fov(super::intrinsics::DEFAULT_FOVY_DEGREES, aspect_ratio)?;
        Ok(Self::from_camera(CameraModel::new(Pose::IDENTITY, intrinsics)))
    }

    pub fn from_camera(camera: CameraModel) -> Self {
        Self {
            camera,
            steps: StepSizes::default(),
        }
    }

    pub fn with_steps(mut self, steps: StepSizes) -> Self {
        self.steps = steps;
        self
    }

    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    pub fn steps(&self) -> StepSizes {
        self.steps
    }

    /// Apply one command
    ///
    /// On error (a zoom leaving the valid field of view) the camera is
    /// left unchanged.
    pub fn apply(&mut self, command: CameraCommand) -> Result<()> {
        let pose = *self.camera.pose();
        let step = self.steps.translate;

        match command {
            CameraCommand::MoveForward => self.translate(pose.front() * step),
            CameraCommand::MoveBackward => self.translate(-pose.front() * step),
            CameraCommand::StrafeRight => self.translate(pose.right() * step),
            CameraCommand::StrafeLeft => self.translate(-pose.right() * step),
            CameraCommand::StrafeUp => self.translate(pose.up() * step),
            CameraCommand::StrafeDown => self.translate(-pose.up() * step),
            CameraCommand::RotateLeft => self.yaw(self.steps.rotate_degrees),
            CameraCommand::RotateRight => self.yaw(-self.steps.rotate_degrees),
            CameraCommand::ZoomIn => self.zoom(-self.steps.zoom_degrees),
            CameraCommand::ZoomOut => self.zoom(self.steps.zoom_degrees),
        }
    }

    fn translate(&mut self, delta: Vec3) -> Result<()> {
        let pose = self.camera.pose().translated(delta)?;
        self.camera.set_pose(pose);
        Ok(())
    }

    /// Rotate the viewing direction around the camera's up axis
    fn yaw(&mut self, degrees: f32) -> Result<()> {
        let pose = *self.camera.pose();
        let rotation = Quat::from_axis_angle(pose.up(), degrees.to_radians());
        let rotated = Pose::look_at(pose.position(), rotation * pose.front(), pose.up())?;
        self.camera.set_pose(rotated);
        Ok(())
    }

    fn zoom(&mut self, delta_degrees: f32) -> Result<()> {
        let intrinsics = self.camera.intrinsics();
        let zoomed = intrinsics.set_fovy(intrinsics.fovy_degrees() + delta_degrees)?;
        self.camera.set_intrinsics(zoomed);
        Ok(())
    }
}
