use glam::{Mat4, Vec3};

/// Proxy surface vertex for GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
}

impl Vertex {
    pub fn new(position: Vec3) -> Self {
        Self {
            position: position.to_array(),
        }
    }
}

/// Matrices for one projective-texturing draw
///
/// The first three place the proxy in the virtual camera, the last two
/// generate texture coordinates in the shot being sampled.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ProjectionUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub shot_view: [[f32; 4]; 4],
    pub shot_projection: [[f32; 4]; 4],
}

impl ProjectionUniforms {
    pub fn new(model: Mat4, view: Mat4, projection: Mat4, shot_view: Mat4, shot_projection: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            shot_view: shot_view.to_cols_array_2d(),
            shot_projection: shot_projection.to_cols_array_2d(),
        }
    }

    pub fn model(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.projection)
    }

    pub fn shot_view(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.shot_view)
    }

    pub fn shot_projection(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.shot_projection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout_size() {
        // five column-major mat4x4<f32>
        assert_eq!(std::mem::size_of::<ProjectionUniforms>(), 5 * 64);
        assert_eq!(std::mem::size_of::<Vertex>(), 12);
    }

    #[test]
    fn test_matrices_round_trip() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let u = ProjectionUniforms::new(m, Mat4::IDENTITY, m.transpose(), Mat4::ZERO, m);
        assert_eq!(u.model(), m);
        assert_eq!(u.projection(), m.transpose());
        assert_eq!(u.shot_view(), Mat4::ZERO);
        assert_eq!(bytemuck::bytes_of(&u).len(), 320);
    }
}
