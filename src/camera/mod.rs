//! Camera placement, intrinsics and the projection/view transforms derived from them

pub mod controllable;
pub mod intrinsics;
pub mod model;
pub mod pose;

pub use controllable::{CameraCommand, ControllableCamera, StepSizes};
pub use intrinsics::Intrinsics;
pub use model::CameraModel;
pub use pose::Pose;
