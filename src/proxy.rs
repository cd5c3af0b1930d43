use glam::{Mat4, Vec3};

use crate::error::{Error, Result};
use crate::types::Vertex;

pub const DEFAULT_PROXY_DISTANCE: f32 = 15.0;
pub const DEFAULT_PROXY_HALF_EXTENT: f32 = 15.0;

/// Two triangles covering the quad
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 1];

/// Flat square that shots are projected onto
///
/// The quad lies in its local `z = 0` plane and is placed at
/// `z = -distance` in world space by [`ProxySurface::model_matrix`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProxySurface {
    half_extent: f32,
    distance: f32,
}

impl Default for ProxySurface {
    fn default() -> Self {
        Self {
            half_extent: DEFAULT_PROXY_HALF_EXTENT,
            distance: DEFAULT_PROXY_DISTANCE,
        }
    }
}

impl ProxySurface {
    pub fn new(half_extent: f32, distance: f32) -> Result<Self> {
        if !(half_extent > 0.0 && half_extent.is_finite()) {
            return Err(Error::config(format!(
                "proxy half extent must be positive, got {half_extent}"
            )));
        }
        if !distance.is_finite() {
            return Err(Error::config(format!("proxy distance must be finite, got {distance}")));
        }
        Ok(Self {
            half_extent,
            distance,
        })
    }

    pub fn half_extent(&self) -> f32 {
        self.half_extent
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Same quad moved to a different focal distance
    pub fn focused_at(&self, distance: f32) -> Result<Self> {
        Self::new(self.half_extent, distance)
    }

    pub fn vertices(&self) -> [Vertex; 4] {
        let s = self.half_extent;
        [
            Vertex::new(Vec3::new(-s, -s, 0.0)),
            Vertex::new(Vec3::new(-s, s, 0.0)),
            Vertex::new(Vec3::new(s, -s, 0.0)),
            Vertex::new(Vec3::new(s, s, 0.0)),
        ]
    }

    pub fn indices(&self) -> &'static [u32] {
        &QUAD_INDICES
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, -self.distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_quad_in_world() {
        let proxy = ProxySurface::default();
        let model = proxy.model_matrix();
        let world: Vec<Vec3> = proxy
            .vertices()
            .iter()
            .map(|v| model.transform_point3(Vec3::from_array(v.position)))
            .collect();

        assert!(world.iter().all(|p| (p.z + 15.0).abs() < 1e-6));
        assert!(world.contains(&Vec3::new(-15.0, -15.0, -15.0)));
        assert!(world.contains(&Vec3::new(15.0, 15.0, -15.0)));
    }

    #[test]
    fn test_indices_cover_all_vertices() {
        let proxy = ProxySurface::default();
        let mut used: Vec<u32> = proxy.indices().to_vec();
        used.sort_unstable();
        used.dedup();
        assert_eq!(used, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_focus_moves_plane() {
        let proxy = ProxySurface::default().focused_at(4.0).unwrap();
        let p = proxy.model_matrix().transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(0.0, 0.0, -4.0));
    }

    #[test]
    fn test_invalid_extent() {
        assert!(matches!(ProxySurface::new(0.0, 1.0), Err(Error::Configuration(_))));
        assert!(matches!(ProxySurface::new(1.0, f32::INFINITY), Err(Error::Configuration(_))));
    }
}
