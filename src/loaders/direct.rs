//! Pose file format A: explicit location, `(x,y,z,w)` rotation and optional fovy

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::keys::{self, lookup, FOV_KEYS, POSITION_KEYS, ROTATION_KEYS};
use super::{build_shots, PoseRecord};
use crate::camera::{Intrinsics, Pose};
use crate::error::{Error, Result};
use crate::shot::Shot;

/// Serialized form written by the exporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFile {
    pub images: Vec<PoseFileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFileEntry {
    pub imagefile: String,
    pub location: [f32; 3],
    /// Quaternion in `(x, y, z, w)` order
    pub rotation: [f32; 4],
    pub fovy: f32,
}

/// Parse a format A document
///
/// Entries without a field of view use `default_fovy`. Shots are square
/// (aspect ratio 1).
pub fn parse_pose_file(json: &str, default_fovy: f32) -> Result<Vec<PoseRecord>> {
    let document: Value = serde_json::from_str(json)?;

    keys::image_entries(&document)?
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let file = keys::require_file(entry, index)?;
            let position = lookup(entry, POSITION_KEYS)
                .ok_or_else(|| Error::format(format!("images[{index}] has no location")))?;
            let rotation = lookup(entry, ROTATION_KEYS)
                .ok_or_else(|| Error::format(format!("images[{index}] has no rotation")))?;

            let position = keys::number_array::<3>(position, "location", index)?;
            let rotation = keys::number_array::<4>(rotation, "rotation", index)?;
            let fovy = match lookup(entry, FOV_KEYS).filter(|value| !value.is_null()) {
                Some(value) => value.as_f64().ok_or_else(|| {
                    Error::format(format!("images[{index}].fovy must be a number"))
                })? as f32,
                None => {
                    debug!("images[{index}] has no fovy, using {default_fovy}");
                    default_fovy
                }
            };

            Ok(PoseRecord {
                file,
                pose: Pose::from_arrays(position, rotation)?,
                intrinsics: Intrinsics::with_fov(fovy, 1.0)?,
            })
        })
        .collect()
}

/// Read and parse a format A file
pub fn read_pose_file(path: &Path, default_fovy: f32) -> Result<Vec<PoseRecord>> {
    let json = fs::read_to_string(path)
        .map_err(|e| Error::format(format!("cannot read pose file {}: {e}", path.display())))?;
    let records = parse_pose_file(&json, default_fovy)?;
    info!("Read {} poses from {}", records.len(), path.display());
    Ok(records)
}

/// Load shots whose image names are relative to the pose file's directory
pub fn load_shots_from_json(path: impl AsRef<Path>, default_fovy: f32) -> Result<Vec<Shot>> {
    let path = path.as_ref();
    let records = read_pose_file(path, default_fovy)?;
    build_shots(records, &parent_dir(path)?)
}

/// Convert pose records into the format A document
pub fn export_records(records: &[PoseRecord]) -> PoseFile {
    PoseFile {
        images: records
            .iter()
            .map(|record| PoseFileEntry {
                imagefile: base_name(&record.file),
                location: record.pose.position().to_array(),
                rotation: record.pose.orientation().to_array(),
                fovy: record.intrinsics.fovy_degrees(),
            })
            .collect(),
    }
}

/// Convert shots into the format A document
///
/// Every shot needs a source name; in-memory shots without a tag are rejected.
pub fn export_shots(shots: &[Shot]) -> Result<PoseFile> {
    let records = shots
        .iter()
        .enumerate()
        .map(|(i, shot)| {
            let file = shot.source().ok_or_else(|| {
                Error::InvalidInput(format!("shot {i} has no source file name to export"))
            })?;
            Ok(PoseRecord {
                file: file.to_owned(),
                pose: *shot.pose(),
                intrinsics: *shot.camera().intrinsics(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(export_records(&records))
}

/// Write a format A file
pub fn write_pose_file(pose_file: &PoseFile, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(pose_file)?;
    fs::write(path, json)?;
    info!("Wrote {} poses to {}", pose_file.images.len(), path.display());
    Ok(())
}

fn base_name(file: &str) -> String {
    Path::new(file)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_owned())
}

pub(crate) fn parent_dir(path: &Path) -> Result<std::path::PathBuf> {
    let absolute = fs::canonicalize(path)
        .map_err(|e| Error::format(format!("cannot resolve {}: {e}", path.display())))?;
    Ok(absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    const SAMPLE: &str = r#"{
        "images": [
            {"imagefile": "a.png", "location": [1, 2, 3], "rotation": [0, 0, 0, 1], "fovy": 45},
            {"file": "dir/b.png", "pos": [0, 0, -1], "quaternion": [0, 0.7071068, 0, 0.7071068]}
        ]
    }"#;

    #[test]
    fn test_parse_uses_aliases_and_default_fov() {
        let records = parse_pose_file(SAMPLE, 50.0).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].file, "a.png");
        assert_eq!(records[0].pose.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(records[0].intrinsics.fovy_degrees(), 45.0);

        assert_eq!(records[1].file, "dir/b.png");
        assert_eq!(records[1].intrinsics.fovy_degrees(), 50.0);
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        assert!(records[1].pose.orientation().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_missing_rotation_is_format_error() {
        let json = r#"{"images": [{"imagefile": "a.png", "location": [0, 0, 0]}]}"#;
        assert!(matches!(parse_pose_file(json, 60.0), Err(Error::Format(_))));
    }

    #[test]
    fn test_missing_file_is_format_error() {
        let json = r#"{"images": [{"location": [0, 0, 0], "rotation": [0, 0, 0, 1]}]}"#;
        assert!(matches!(parse_pose_file(json, 60.0), Err(Error::Format(_))));
    }

    #[test]
    fn test_null_fov_uses_default() {
        let json = r#"{"images": [{"imagefile": "a.png", "location": [0, 0, 0], "rotation": [0, 0, 0, 1], "fovy": null}]}"#;
        let records = parse_pose_file(json, 42.0).unwrap();
        assert_eq!(records[0].intrinsics.fovy_degrees(), 42.0);

        let json = r#"{"images": [{"imagefile": "a.png", "location": [0, 0, 0], "rotation": [0, 0, 0, 1], "fovy": "wide"}]}"#;
        assert!(matches!(parse_pose_file(json, 42.0), Err(Error::Format(_))));
    }

    #[test]
    fn test_invalid_fov_is_configuration_error() {
        let json = r#"{"images": [{"imagefile": "a.png", "location": [0, 0, 0], "rotation": [0, 0, 0, 1], "fovy": 200}]}"#;
        assert!(matches!(parse_pose_file(json, 60.0), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_export_uses_base_name() {
        let records = parse_pose_file(SAMPLE, 50.0).unwrap();
        let exported = export_records(&records);
        assert_eq!(exported.images[1].imagefile, "b.png");
        assert_eq!(exported.images[0].location, [1.0, 2.0, 3.0]);
        assert_eq!(exported.images[0].rotation, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_export_then_parse_round_trip() {
        let records = parse_pose_file(SAMPLE, 50.0).unwrap();
        let json = serde_json::to_string(&export_records(&records)).unwrap();
        let reparsed = parse_pose_file(&json, 10.0).unwrap();

        for (before, after) in records.iter().zip(&reparsed) {
            assert!(before.pose.approx_eq(&after.pose, 1e-5));
            assert_eq!(before.intrinsics.fovy_degrees(), after.intrinsics.fovy_degrees());
        }
    }
}
