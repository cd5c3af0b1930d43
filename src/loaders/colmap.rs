//! Read-only import of COLMAP sparse reconstructions (`cameras` + `images`,
//! text or binary encoding).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use glam::{DMat3, DQuat, DVec3};
use log::{debug, info};

use super::{build_shots, permute_quaternion, PoseRecord};
use crate::camera::{Intrinsics, Pose};
use crate::error::{Error, Result};
use crate::shot::Shot;

/// Camera intrinsics record
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapCamera {
    pub id: u32,
    pub model: String,
    pub width: u64,
    pub height: u64,
    pub params: Vec<f64>,
}

/// Registered image record; `qvec` is `(w, x, y, z)` world-to-camera
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapImage {
    pub id: u32,
    pub qvec: [f64; 4],
    pub tvec: [f64; 3],
    pub camera_id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColmapModel {
    pub cameras: BTreeMap<u32, ColmapCamera>,
    pub images: BTreeMap<u32, ColmapImage>,
}

/// Model names indexed by their binary model id
const MODEL_NAMES: [&str; 11] = [
    "SIMPLE_PINHOLE",
    "PINHOLE",
    "SIMPLE_RADIAL",
    "RADIAL",
    "OPENCV",
    "OPENCV_FISHEYE",
    "FULL_OPENCV",
    "FOV",
    "SIMPLE_RADIAL_FISHEYE",
    "RADIAL_FISHEYE",
    "THIN_PRISM_FISHEYE",
];

const MODEL_PARAM_COUNTS: [usize; 11] = [3, 4, 4, 5, 8, 8, 12, 5, 4, 5, 12];

/// Focal lengths and principal point of a supported camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeParams {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl ColmapCamera {
    /// Pinhole parameters; only the single- and dual-focal families are supported
    pub fn pinhole(&self) -> Result<PinholeParams> {
        let needed = match self.model.as_str() {
            "SIMPLE_PINHOLE" | "SIMPLE_RADIAL" | "RADIAL" => 3,
            "PINHOLE" | "OPENCV" | "OPENCV_FISHEYE" => 4,
            other => return Err(Error::UnsupportedModel(other.to_string())),
        };
        if self.params.len() < needed {
            return Err(Error::format(format!(
                "camera {} ({}) has {} params, expected at least {needed}",
                self.id,
                self.model,
                self.params.len()
            )));
        }

        let p = &self.params;
        Ok(if needed == 3 {
            PinholeParams {
                fx: p[0],
                fy: p[0],
                cx: p[1],
                cy: p[2],
            }
        } else {
            PinholeParams {
                fx: p[0],
                fy: p[1],
                cx: p[2],
                cy: p[3],
            }
        })
    }

    /// `2·atan(height / (2·f_y))` in degrees
    pub fn vertical_fov_degrees(&self) -> Result<f64> {
        let fy = self.pinhole()?.fy;
        if fy <= 0.0 {
            return Err(Error::format(format!("camera {} has focal length {fy}", self.id)));
        }
        Ok((2.0 * (self.height as f64 / (2.0 * fy)).atan()).to_degrees())
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Convert a COLMAP world-to-camera pose into a camera placement
pub fn convert_image_pose(image: &ColmapImage) -> Result<Pose> {
    let [qw, qx, qy, qz] = image.qvec;
    let world_to_camera = DMat3::from_quat(DQuat::from_xyzw(qx, qy, qz, qw).normalize());
    let translation = DVec3::from_array(image.tvec);

    let camera_to_world = world_to_camera.transpose();
    let position = -(camera_to_world * translation);
    let orientation = DQuat::from_mat3(&camera_to_world).as_quat();

    Pose::new(position.as_vec3(), permute_quaternion(orientation))
}

/// Pose records for every registered image, in image id order
///
/// `fovy` overrides the field of view derived from each camera.
pub fn records_from_model(model: &ColmapModel, fovy: Option<f32>) -> Result<Vec<PoseRecord>> {
    model
        .images
        .values()
        .map(|image| {
            let camera = model.cameras.get(&image.camera_id).ok_or_else(|| {
                Error::format(format!(
                    "image {} references unknown camera {}",
                    image.name, image.camera_id
                ))
            })?;

            let derived_fovy = camera.vertical_fov_degrees()? as f32;
            let intrinsics =
                Intrinsics::with_fov(fovy.unwrap_or(derived_fovy), camera.aspect_ratio() as f32)?;
            let pose = convert_image_pose(image)?;
            debug!(
                "{}: camera {} fovy {:.3} position {}",
                image.name,
                camera.model,
                derived_fovy,
                pose.position()
            );

            Ok(PoseRecord {
                file: image.name.clone(),
                pose,
                intrinsics,
            })
        })
        .collect()
}

/// Load shots from a reconstruction folder and an image folder
pub fn load_shots_from_colmap(
    model_dir: impl AsRef<Path>,
    image_dir: impl AsRef<Path>,
    fovy: Option<f32>,
) -> Result<Vec<Shot>> {
    let model = read_model(model_dir.as_ref())?;
    let records = records_from_model(&model, fovy)?;
    build_shots(records, image_dir.as_ref())
}

/// Read `cameras` and `images`, preferring the binary encoding
pub fn read_model(dir: &Path) -> Result<ColmapModel> {
    let binary = (dir.join("cameras.bin"), dir.join("images.bin"));
    let text = (dir.join("cameras.txt"), dir.join("images.txt"));

    let model = if binary.0.is_file() && binary.1.is_file() {
        ColmapModel {
            cameras: parse_cameras_bin(&read_bytes(&binary.0)?)?,
            images: parse_images_bin(&read_bytes(&binary.1)?)?,
        }
    } else if text.0.is_file() && text.1.is_file() {
        ColmapModel {
            cameras: parse_cameras_txt(&read_text(&text.0)?)?,
            images: parse_images_txt(&read_text(&text.1)?)?,
        }
    } else {
        return Err(Error::format(format!(
            "{} contains no COLMAP cameras/images files",
            dir.display()
        )));
    };

    if dir.join("points3D.bin").is_file() || dir.join("points3D.txt").is_file() {
        debug!("Ignoring points3D in {}", dir.display());
    }
    info!(
        "Read COLMAP model from {}: {} cameras, {} images",
        dir.display(),
        model.cameras.len(),
        model.images.len()
    );
    Ok(model)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::format(format!("cannot read {}: {e}", path.display())))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::format(format!("cannot read {}: {e}", path.display())))
}

fn parse_field<T: std::str::FromStr>(token: Option<&str>, what: &str, line: usize) -> Result<T> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| Error::format(format!("line {line}: missing or invalid {what}")))
}

/// `CAMERA_ID MODEL WIDTH HEIGHT PARAMS[]`
pub fn parse_cameras_txt(text: &str) -> Result<BTreeMap<u32, ColmapCamera>> {
    let mut cameras = BTreeMap::new();

    for (number, line) in text.lines().enumerate().map(|(i, l)| (i + 1, l.trim())) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let id = parse_field(tokens.next(), "camera id", number)?;
        let model: String = parse_field(tokens.next(), "camera model", number)?;
        let width = parse_field(tokens.next(), "width", number)?;
        let height = parse_field(tokens.next(), "height", number)?;
        let params = tokens
            .map(|t| parse_field(Some(t), "camera parameter", number))
            .collect::<Result<Vec<f64>>>()?;

        cameras.insert(
            id,
            ColmapCamera {
                id,
                model,
                width,
                height,
                params,
            },
        );
    }

    Ok(cameras)
}

/// `IMAGE_ID QW QX QY QZ TX TY TZ CAMERA_ID NAME`, each followed by a
/// (possibly empty) line of 2D points
pub fn parse_images_txt(text: &str) -> Result<BTreeMap<u32, ColmapImage>> {
    let mut images = BTreeMap::new();
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.starts_with('#'));

    while let Some((number, line)) = lines.next() {
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let id = parse_field(tokens.next(), "image id", number)?;
        let mut qvec = [0.0; 4];
        for q in qvec.iter_mut() {
            *q = parse_field(tokens.next(), "quaternion", number)?;
        }
        let mut tvec = [0.0; 3];
        for t in tvec.iter_mut() {
            *t = parse_field(tokens.next(), "translation", number)?;
        }
        let camera_id = parse_field(tokens.next(), "camera id", number)?;
        let name: String = parse_field(tokens.next(), "image name", number)?;

        // 2D points line
        lines.next();

        images.insert(
            id,
            ColmapImage {
                id,
                qvec,
                tvec,
                camera_id,
                name,
            },
        );
    }

    Ok(images)
}

/// Little-endian cursor over a binary model file
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| Error::format(format!("binary model truncated at byte {}", self.pos)))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    fn c_string(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| Error::format("unterminated image name in binary model"))?;
        let name = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(name)
    }
}

pub fn parse_cameras_bin(data: &[u8]) -> Result<BTreeMap<u32, ColmapCamera>> {
    let mut reader = ByteReader::new(data);
    let count = reader.u64()?;
    let mut cameras = BTreeMap::new();

    for _ in 0..count {
        let id = reader.u32()?;
        let model_id = reader.i32()?;
        let index = usize::try_from(model_id)
            .ok()
            .filter(|i| *i < MODEL_NAMES.len())
            .ok_or_else(|| Error::UnsupportedModel(format!("model id {model_id}")))?;
        let width = reader.u64()?;
        let height = reader.u64()?;
        let params = (0..MODEL_PARAM_COUNTS[index])
            .map(|_| reader.f64())
            .collect::<Result<Vec<_>>>()?;

        cameras.insert(
            id,
            ColmapCamera {
                id,
                model: MODEL_NAMES[index].to_string(),
                width,
                height,
                params,
            },
        );
    }

    Ok(cameras)
}

pub fn parse_images_bin(data: &[u8]) -> Result<BTreeMap<u32, ColmapImage>> {
    const POINT2D_BYTES: usize = 24;

    let mut reader = ByteReader::new(data);
    let count = reader.u64()?;
    let mut images = BTreeMap::new();

    for _ in 0..count {
        let id = reader.u32()?;
        let qvec = [reader.f64()?, reader.f64()?, reader.f64()?, reader.f64()?];
        let tvec = [reader.f64()?, reader.f64()?, reader.f64()?];
        let camera_id = reader.u32()?;
        let name = reader.c_string()?;

        let points = usize::try_from(reader.u64()?)
            .map_err(|_| Error::format("point count does not fit in memory"))?;
        let skip = points
            .checked_mul(POINT2D_BYTES)
            .ok_or_else(|| Error::format("point count overflow"))?;
        reader.take(skip)?;

        images.insert(
            id,
            ColmapImage {
                id,
                qvec,
                tvec,
                camera_id,
                name,
            },
        );
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn camera(model: &str, params: Vec<f64>) -> ColmapCamera {
        ColmapCamera {
            id: 1,
            model: model.to_string(),
            width: 640,
            height: 480,
            params,
        }
    }

    #[test]
    fn test_simple_models_share_focal_length() {
        for model in ["SIMPLE_PINHOLE", "SIMPLE_RADIAL", "RADIAL"] {
            let p = camera(model, vec![500.0, 320.0, 240.0, 0.01, 0.02]).pinhole().unwrap();
            assert_eq!((p.fx, p.fy, p.cx, p.cy), (500.0, 500.0, 320.0, 240.0));
        }
    }

    #[test]
    fn test_dual_focal_models() {
        for model in ["PINHOLE", "OPENCV", "OPENCV_FISHEYE"] {
            let p = camera(model, vec![500.0, 400.0, 320.0, 240.0, 0.0, 0.0, 0.0, 0.0])
                .pinhole()
                .unwrap();
            assert_eq!((p.fx, p.fy, p.cx, p.cy), (500.0, 400.0, 320.0, 240.0));
        }
    }

    #[test]
    fn test_unsupported_models() {
        for model in ["FULL_OPENCV", "FOV", "THIN_PRISM_FISHEYE", "WHATEVER"] {
            let result = camera(model, vec![1.0; 12]).vertical_fov_degrees();
            assert!(matches!(result, Err(Error::UnsupportedModel(_))), "{model}");
        }
    }

    #[test]
    fn test_vertical_fov() {
        let cam = camera("PINHOLE", vec![600.0, 240.0, 320.0, 240.0]);
        // height/2 == fy -> 2·atan(1) = 90 degrees
        assert!((cam.vertical_fov_degrees().unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_identity_image_pose() {
        let image = ColmapImage {
            id: 1,
            qvec: [1.0, 0.0, 0.0, 0.0],
            tvec: [1.0, 2.0, 3.0],
            camera_id: 1,
            name: "a.jpg".into(),
        };
        let pose = convert_image_pose(&image).unwrap();
        assert!(pose.position().abs_diff_eq(Vec3::new(-1.0, -2.0, -3.0), 1e-6));
        let expected = Quat::from_xyzw(1.0, 0.0, 0.0, 0.0);
        assert!(pose.orientation().dot(expected).abs() > 1.0 - 1e-6);
    }

    #[test]
    fn test_parse_text_model() {
        let cameras = "# Camera list\n1 PINHOLE 640 480 500 500 320 240\n";
        let images = "# Image list\n\
                      1 1 0 0 0 0 0 0 1 first.jpg\n\
                      100.0 200.0 -1\n\
                      2 1 0 0 0 1 0 0 1 second.jpg\n\
                      \n";

        let cameras = parse_cameras_txt(cameras).unwrap();
        let images = parse_images_txt(images).unwrap();
        assert_eq!(cameras[&1].params, vec![500.0, 500.0, 320.0, 240.0]);
        assert_eq!(images.len(), 2);
        assert_eq!(images[&2].name, "second.jpg");
        assert_eq!(images[&2].tvec, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unknown_camera_reference() {
        let mut model = ColmapModel::default();
        model.images.insert(
            1,
            ColmapImage {
                id: 1,
                qvec: [1.0, 0.0, 0.0, 0.0],
                tvec: [0.0; 3],
                camera_id: 7,
                name: "a.jpg".into(),
            },
        );
        assert!(matches!(records_from_model(&model, None), Err(Error::Format(_))));
    }

    #[test]
    fn test_quarter_turn_image_pose() {
        // world-to-camera Rz(90°) stored as (w, x, y, z)
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let image = ColmapImage {
            id: 4,
            qvec: [s, 0.0, 0.0, s],
            tvec: [1.0, 0.0, 0.0],
            camera_id: 1,
            name: "b.jpg".into(),
        };
        let pose = convert_image_pose(&image).unwrap();

        // camera-to-world Rz(-90°) sends (1, 0, 0) to (0, -1, 0)
        assert!(pose.position().abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-6));

        // Rz(-90°) = (0, 0, -s, s) reordered as (w, z, -y, x)
        let s = s as f32;
        let expected = Quat::from_xyzw(s, -s, 0.0, 0.0);
        assert!(pose.orientation().dot(expected).abs() > 1.0 - 1e-6);
    }

    fn push_f64s(data: &mut Vec<u8>, values: &[f64]) {
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
    }

    #[test]
    fn test_parse_binary_model() {
        let mut cameras = 2u64.to_le_bytes().to_vec();
        cameras.extend_from_slice(&3u32.to_le_bytes());
        cameras.extend_from_slice(&1i32.to_le_bytes()); // PINHOLE
        cameras.extend_from_slice(&640u64.to_le_bytes());
        cameras.extend_from_slice(&480u64.to_le_bytes());
        push_f64s(&mut cameras, &[500.0, 240.0, 320.0, 240.0]);
        cameras.extend_from_slice(&5u32.to_le_bytes());
        cameras.extend_from_slice(&2i32.to_le_bytes()); // SIMPLE_RADIAL
        cameras.extend_from_slice(&800u64.to_le_bytes());
        cameras.extend_from_slice(&600u64.to_le_bytes());
        push_f64s(&mut cameras, &[700.0, 400.0, 300.0, 0.01]);

        let s = std::f64::consts::FRAC_1_SQRT_2;
        let mut images = 2u64.to_le_bytes().to_vec();
        images.extend_from_slice(&1u32.to_le_bytes());
        push_f64s(&mut images, &[1.0, 0.0, 0.0, 0.0, 4.0, 5.0, 6.0]);
        images.extend_from_slice(&3u32.to_le_bytes());
        images.extend_from_slice(b"first.png\0");
        images.extend_from_slice(&2u64.to_le_bytes());
        images.extend_from_slice(&[0xAB; 48]); // two (x, y, point3D id) records
        images.extend_from_slice(&9u32.to_le_bytes());
        push_f64s(&mut images, &[s, 0.0, 0.0, s, 1.0, 0.0, 0.0]);
        images.extend_from_slice(&5u32.to_le_bytes());
        images.extend_from_slice(b"second.jpg\0");
        images.extend_from_slice(&0u64.to_le_bytes());

        let model = ColmapModel {
            cameras: parse_cameras_bin(&cameras).unwrap(),
            images: parse_images_bin(&images).unwrap(),
        };

        assert_eq!(model.cameras[&3].model, "PINHOLE");
        assert_eq!((model.cameras[&3].width, model.cameras[&3].height), (640, 480));
        assert_eq!(model.cameras[&5].model, "SIMPLE_RADIAL");
        assert_eq!(model.cameras[&5].params, vec![700.0, 400.0, 300.0, 0.01]);
        assert_eq!(model.images[&1].name, "first.png");
        assert_eq!(model.images[&1].tvec, [4.0, 5.0, 6.0]);
        assert_eq!(model.images[&9].name, "second.jpg");
        assert_eq!(model.images[&9].camera_id, 5);

        let records = records_from_model(&model, None).unwrap();
        assert_eq!(records.len(), 2);
        // fy = 240 = height / 2 -> 90 degrees
        assert!((records[0].intrinsics.fovy_degrees() - 90.0).abs() < 1e-4);
        assert!(records[0].pose.position().abs_diff_eq(Vec3::new(-4.0, -5.0, -6.0), 1e-6));
        assert!(records[1].pose.position().abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn test_unknown_binary_model_id() {
        let mut cameras = 1u64.to_le_bytes().to_vec();
        cameras.extend_from_slice(&1u32.to_le_bytes());
        cameras.extend_from_slice(&42i32.to_le_bytes());
        assert!(matches!(parse_cameras_bin(&cameras), Err(Error::UnsupportedModel(_))));
    }

    #[test]
    fn test_truncated_binary() {
        let mut data = 1u64.to_le_bytes().to_vec();
        data.extend_from_slice(&1u32.to_le_bytes());
        assert!(matches!(parse_cameras_bin(&data), Err(Error::Format(_))));
    }
}
