//! Pose file format B: a 3x4 `[R | t]` world-to-camera matrix per image,
//! expressed with the Y and Z axes flipped relative to ours.

use std::fs;
use std::path::Path;

use glam::{Mat3, Quat, Vec3};
use log::{debug, info};
use serde_json::Value;

use super::direct::parent_dir;
use super::keys::{self, lookup, MATRIX_KEYS};
use super::{build_shots, permute_quaternion, PoseRecord};
use crate::camera::{Intrinsics, Pose};
use crate::error::{Error, Result};
use crate::shot::Shot;

const FLIP_YZ: Mat3 = Mat3::from_diagonal(Vec3::new(1.0, -1.0, -1.0));

/// Convert one legacy `[R | t]` matrix (rows) into a camera pose
///
/// The transform is conjugated with the Y/Z flip, inverted into a camera
/// placement and the resulting quaternion goes through
/// [`permute_quaternion`].
pub fn convert_legacy_matrix(rows: &[[f32; 4]; 3]) -> Result<Pose> {
    let raw_rotation = Mat3::from_cols(
        Vec3::new(rows[0][0], rows[1][0], rows[2][0]),
        Vec3::new(rows[0][1], rows[1][1], rows[2][1]),
        Vec3::new(rows[0][2], rows[1][2], rows[2][2]),
    );
    let raw_translation = Vec3::new(rows[0][3], rows[1][3], rows[2][3]);

    let rotation = FLIP_YZ * raw_rotation.transpose() * FLIP_YZ;
    let position = -(rotation * raw_translation);

    let orientation = Quat::from_mat3(&rotation);
    Pose::new(position, permute_quaternion(orientation))
}

/// Parse a format B document; every shot gets the field of view `fovy`
pub fn parse_legacy_pose_file(json: &str, fovy: f32) -> Result<Vec<PoseRecord>> {
    let document: Value = serde_json::from_str(json)?;
    let intrinsics = Intrinsics::with_fov(fovy, 1.0)?;

    keys::image_entries(&document)?
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let file = keys::require_file(entry, index)?;
            let matrix = lookup(entry, MATRIX_KEYS)
                .and_then(Value::as_array)
                .filter(|rows| rows.len() == 3)
                .ok_or_else(|| Error::format(format!("images[{index}] has no 3x4 matrix")))?;

            let mut rows = [[0.0f32; 4]; 3];
            for (row, value) in rows.iter_mut().zip(matrix) {
                *row = keys::number_array::<4>(value, "M3x4", index)?;
            }

            let pose = convert_legacy_matrix(&rows)?;
            debug!("{file}: position {} rotation {}", pose.position(), pose.orientation());

            Ok(PoseRecord {
                file,
                pose,
                intrinsics,
            })
        })
        .collect()
}

pub fn read_legacy_pose_file(path: &Path, fovy: f32) -> Result<Vec<PoseRecord>> {
    let json = fs::read_to_string(path)
        .map_err(|e| Error::format(format!("cannot read pose file {}: {e}", path.display())))?;
    let records = parse_legacy_pose_file(&json, fovy)?;
    info!("Read {} legacy poses from {}", records.len(), path.display());
    Ok(records)
}

/// Load shots whose image names are relative to the pose file's directory
pub fn load_shots_from_legacy_json(path: impl AsRef<Path>, fovy: f32) -> Result<Vec<Shot>> {
    let path = path.as_ref();
    let records = read_legacy_pose_file(path, fovy)?;
    build_shots(records, &parent_dir(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_matrix() {
        let rows = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ];
        let pose = convert_legacy_matrix(&rows).unwrap();
        assert!(pose.position().abs_diff_eq(Vec3::ZERO, 1e-6));
        // identity rotation (0,0,0,1) permutes to (1,0,0,0)
        let expected = Quat::from_xyzw(1.0, 0.0, 0.0, 0.0);
        assert!(pose.orientation().dot(expected).abs() > 1.0 - 1e-6);
    }

    #[test]
    fn test_translation_only_is_negated() {
        let rows = [
            [1.0, 0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0, 2.0],
            [0.0, 0.0, 1.0, 3.0],
        ];
        let pose = convert_legacy_matrix(&rows).unwrap();
        assert!(pose.position().abs_diff_eq(Vec3::new(-1.0, -2.0, -3.0), 1e-6));
    }

    #[test]
    fn test_rotation_about_x_is_inverted() {
        // R0 = Rx(90°); the Y/Z flip leaves an x rotation alone, so R_c = R0ᵀ = Rx(-90°)
        let rows = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, -1.0, 1.0],
            [0.0, 1.0, 0.0, 0.0],
        ];
        let pose = convert_legacy_matrix(&rows).unwrap();

        // -(Rx(-90°) · (0, 1, 0)) = -(0, 0, -1)
        assert!(pose.position().abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-6));

        // Rx(-90°) = (-s, 0, 0, s) permutes to (s, 0, 0, -s)
        let s = std::f32::consts::FRAC_1_SQRT_2;
        let expected = Quat::from_xyzw(s, 0.0, 0.0, -s);
        assert!(pose.orientation().dot(expected).abs() > 1.0 - 1e-6);
    }

    #[test]
    fn test_missing_matrix_is_format_error() {
        let json = r#"{"images": [{"imagefile": "a.png"}]}"#;
        assert!(matches!(parse_legacy_pose_file(json, 60.0), Err(Error::Format(_))));

        let json = r#"{"images": [{"imagefile": "a.png", "M3x4": [[1, 0, 0, 0], [0, 1, 0, 0]]}]}"#;
        assert!(matches!(parse_legacy_pose_file(json, 60.0), Err(Error::Format(_))));
    }

    #[test]
    fn test_uses_given_fov() {
        let json = r#"{"images": [{"image": "a.png", "M3x4": [[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0]]}]}"#;
        let records = parse_legacy_pose_file(json, 50.81543).unwrap();
        assert_eq!(records[0].file, "a.png");
        assert!((records[0].intrinsics.fovy_degrees() - 50.81543).abs() < 1e-5);
    }
}
