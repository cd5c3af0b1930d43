//! Pose ingestion: every external pose representation is normalized into
//! [`PoseRecord`] values before any image is decoded.

pub mod colmap;
pub mod direct;
mod keys;
pub mod legacy;

use std::path::{Path, PathBuf};
use std::time::Instant;

use glam::Quat;
use log::{debug, info};

use crate::camera::{Intrinsics, Pose};
use crate::error::{Error, Result};
use crate::shot::Shot;

pub use colmap::{load_shots_from_colmap, read_model, ColmapCamera, ColmapImage, ColmapModel};
pub use direct::{export_records, export_shots, load_shots_from_json, write_pose_file, PoseFile};
pub use legacy::{convert_legacy_matrix, load_shots_from_legacy_json};

/// Canonical camera description produced by every ingestion path
#[derive(Debug, Clone, PartialEq)]
pub struct PoseRecord {
    /// Image file name, relative to the image directory
    pub file: String,
    pub pose: Pose,
    pub intrinsics: Intrinsics,
}

/// Supported pose file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PoseFormat {
    /// JSON with explicit location and `(x,y,z,w)` rotation
    Direct,
    /// JSON with a 3x4 world-to-camera matrix per image
    Legacy,
    /// COLMAP sparse reconstruction folder (text or binary)
    Colmap,
}

/// Reorder a derived quaternion `(x,y,z,w)` into `(w,z,-y,x)`
///
/// Empirical fix-up applied to matrices from the legacy and COLMAP
/// pipelines; existing pose files depend on it. Not a known identity, so
/// do not simplify it without new reference data.
pub fn permute_quaternion(q: Quat) -> Quat {
    Quat::from_xyzw(q.w, q.z, -q.y, q.x)
}

/// Read pose records of any format without decoding images
///
/// `fovy` is the fallback field of view for `Direct`, the field of view for
/// `Legacy`, and an optional override for `Colmap`.
pub fn read_records(format: PoseFormat, path: &Path, fovy: Option<f32>) -> Result<Vec<PoseRecord>> {
    let default_fovy = fovy.unwrap_or(crate::camera::intrinsics::DEFAULT_FOVY_DEGREES);
    match format {
        PoseFormat::Direct => direct::read_pose_file(path, default_fovy),
        PoseFormat::Legacy => legacy::read_legacy_pose_file(path, default_fovy),
        PoseFormat::Colmap => colmap::records_from_model(&read_model(path)?, fovy),
    }
}

/// Directory image names are resolved against when none is given
///
/// JSON pose files name images relative to their own directory; COLMAP
/// models keep images elsewhere, so they need an explicit directory.
pub fn default_image_dir(format: PoseFormat, path: &Path) -> Result<PathBuf> {
    match format {
        PoseFormat::Direct | PoseFormat::Legacy => direct::parent_dir(path),
        PoseFormat::Colmap => Err(Error::config(format!(
            "no image directory given for COLMAP model {}",
            path.display()
        ))),
    }
}

/// Decode the image of every record, resolving file names against `image_dir`
///
/// Fails as a whole if any single shot fails.
pub fn build_shots(records: Vec<PoseRecord>, image_dir: &Path) -> Result<Vec<Shot>> {
    let start = Instant::now();
    let shots = records
        .into_iter()
        .map(|record| {
            let path = image_dir.join(&record.file);
            debug!("Loading shot {}", path.display());
            Shot::new(path, record.pose, record.intrinsics)
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Loaded {} shots from {} in {:.1} ms",
        shots.len(),
        image_dir.display(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(shots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permute_quaternion_components() {
        let q = Quat::from_xyzw(0.1, 0.2, 0.3, 0.4);
        let p = permute_quaternion(q);
        assert_eq!(p.to_array(), [0.4, 0.3, -0.2, 0.1]);
    }

    #[test]
    fn test_permute_preserves_length() {
        let q = Quat::from_rotation_y(0.8) * Quat::from_rotation_x(0.2);
        assert!((permute_quaternion(q).length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_colmap_needs_explicit_image_dir() {
        let result = default_image_dir(PoseFormat::Colmap, Path::new("sparse/0"));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
