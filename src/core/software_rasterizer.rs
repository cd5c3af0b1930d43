use glam::{Vec2, Vec3, Vec4};
use log::trace;

use crate::error::{Error, Result};
use crate::shot::ShotImage;
use crate::traits::rasterizer::{DrawCall, PixelLayout, Rasterizer, TextureFilter};

/// Vertex after the vertex stage: virtual clip position + shot clip position
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    clip: Vec4,
    shot: Vec4,
}

impl ClipVertex {
    fn lerp(&self, other: &ClipVertex, t: f32) -> ClipVertex {
        ClipVertex {
            clip: self.clip.lerp(other.clip, t),
            shot: self.shot.lerp(other.shot, t),
        }
    }

    /// Signed distance to the near plane `z = -w`
    fn near_distance(&self) -> f32 {
        self.clip.z + self.clip.w
    }
}

/// Vertex in framebuffer space
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    xy: Vec2,
    depth: f32,
    inv_w: f32,
    /// Shot clip coordinates divided by w
    shot_over_w: Vec4,
}

/// CPU implementation of the projective-texturing program
///
/// Bottom-up RGBA colour buffer plus a depth buffer, depth range [-1, 1].
#[derive(Clone)]
pub struct SoftwareRasterizer {
    width: u32,
    height: u32,
    color: Vec<u8>,
    depth: Vec<f32>,
    filter: TextureFilter,
}

impl SoftwareRasterizer {
    pub fn new(width: u32, height: u32, filter: TextureFilter) -> Result<Self> {
        let mut rasterizer = Self {
            width: 0,
            height: 0,
            color: Vec::new(),
            depth: Vec::new(),
            filter,
        };
        rasterizer.resize(width, height)?;
        Ok(rasterizer)
    }

    pub fn filter(&self) -> TextureFilter {
        self.filter
    }

    fn clear(&mut self) {
        self.color.fill(0);
        self.depth.fill(f32::INFINITY);
    }

    fn to_screen(&self, v: &ClipVertex) -> ScreenVertex {
        let inv_w = 1.0 / v.clip.w;
        let ndc = v.clip.truncate() * inv_w;
        ScreenVertex {
            xy: Vec2::new(
                (ndc.x * 0.5 + 0.5) * self.width as f32,
                (ndc.y * 0.5 + 0.5) * self.height as f32,
            ),
            depth: ndc.z,
            inv_w,
            shot_over_w: v.shot * inv_w,
        }
    }

    fn rasterize_triangle(&mut self, a: &ClipVertex, b: &ClipVertex, c: &ClipVertex, texture: &ShotImage) {
        let (a, b, c) = (self.to_screen(a), self.to_screen(b), self.to_screen(c));

        let area = edge(a.xy, b.xy, c.xy);
        if area == 0.0 || !area.is_finite() {
            return;
        }

        let min = a.xy.min(b.xy).min(c.xy).floor().max(Vec2::ZERO);
        let max = a
            .xy
            .max(b.xy)
            .max(c.xy)
            .ceil()
            .min(Vec2::new(self.width as f32, self.height as f32));

        for py in min.y as u32..max.y as u32 {
            for px in min.x as u32..max.x as u32 {
                let p = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
                let l0 = edge(b.xy, c.xy, p) / area;
                let l1 = edge(c.xy, a.xy, p) / area;
                let l2 = edge(a.xy, b.xy, p) / area;
                if l0 < 0.0 || l1 < 0.0 || l2 < 0.0 {
                    continue;
                }

                let depth = l0 * a.depth + l1 * b.depth + l2 * c.depth;
                let idx = (py * self.width + px) as usize;
                if depth > 1.0 || depth >= self.depth[idx] {
                    continue;
                }

                let inv_w = l0 * a.inv_w + l1 * b.inv_w + l2 * c.inv_w;
                let shot = (a.shot_over_w * l0 + b.shot_over_w * l1 + c.shot_over_w * l2) / inv_w;

                if let Some(rgb) = shade(shot, texture, self.filter) {
                    let offset = idx * 4;
                    self.color[offset..offset + 3].copy_from_slice(&rgb);
                    self.color[offset + 3] = 255;
                    self.depth[idx] = depth;
                }
            }
        }
    }
}

impl Rasterizer for SoftwareRasterizer {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::config(format!("framebuffer size {width}x{height} is empty")));
        }
        let pixel_count = width as usize * height as usize;
        self.width = width;
        self.height = height;
        self.color = vec![0; pixel_count * 4];
        self.depth = vec![f32::INFINITY; pixel_count];
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        self.clear();

        let uniforms = &call.uniforms;
        let model = uniforms.model();
        let mvp = uniforms.projection() * uniforms.view() * model;
        let shot_mvp = uniforms.shot_projection() * uniforms.shot_view() * model;

        let mut triangles = 0usize;
        for triangle in call.indices.chunks_exact(3) {
            let mut polygon = Vec::with_capacity(4);
            for &index in triangle {
                let vertex = call.vertices.get(index as usize).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "index {index} out of range for {} vertices",
                        call.vertices.len()
                    ))
                })?;
                let position = Vec3::from_array(vertex.position).extend(1.0);
                polygon.push(ClipVertex {
                    clip: mvp * position,
                    shot: shot_mvp * position,
                });
            }

            let clipped = clip_near(&polygon);
            for i in 1..clipped.len().saturating_sub(1) {
                self.rasterize_triangle(&clipped[0], &clipped[i], &clipped[i + 1], call.texture);
                triangles += 1;
            }
        }

        trace!("Software rasterizer drew {triangles} triangles");
        Ok(())
    }

    fn read_pixels(&mut self, layout: PixelLayout) -> Result<Vec<u8>> {
        let mut pixels = self.color.clone();
        layout.apply(self.width, self.height, &mut pixels)?;
        Ok(pixels)
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Sutherland-Hodgman against the near plane
fn clip_near(polygon: &[ClipVertex]) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(polygon.len() + 1);
    for (i, current) in polygon.iter().enumerate() {
        let next = &polygon[(i + 1) % polygon.len()];
        let (d0, d1) = (current.near_distance(), next.near_distance());

        if d0 >= 0.0 {
            out.push(*current);
        }
        if (d0 >= 0.0) != (d1 >= 0.0) {
            out.push(current.lerp(next, d0 / (d0 - d1)));
        }
    }
    out
}

/// Fragment stage: project into the shot, discard outside its frustum
fn shade(shot_clip: Vec4, texture: &ShotImage, filter: TextureFilter) -> Option<[u8; 3]> {
    if shot_clip.w <= 0.0 {
        return None;
    }
    let uv = Vec2::new(shot_clip.x, shot_clip.y) / shot_clip.w * 0.5 + Vec2::splat(0.5);
    if !(0.0..=1.0).contains(&uv.x) || !(0.0..=1.0).contains(&uv.y) {
        return None;
    }
    Some(sample(texture, uv, filter))
}

fn sample(texture: &ShotImage, uv: Vec2, filter: TextureFilter) -> [u8; 3] {
    let (w, h) = texture.dimensions();
    let max_x = (w - 1) as i64;
    let max_y = (h - 1) as i64;

    match filter {
        TextureFilter::Nearest => {
            let x = ((uv.x * w as f32) as i64).clamp(0, max_x) as u32;
            let y = ((uv.y * h as f32) as i64).clamp(0, max_y) as u32;
            let t = texture.texel(x, y);
            [t[0], t[1], t[2]]
        }
        TextureFilter::Linear => {
            let x = uv.x * w as f32 - 0.5;
            let y = uv.y * h as f32 - 0.5;
            let (x0, y0) = (x.floor(), y.floor());
            let (fx, fy) = (x - x0, y - y0);

            let fetch = |dx: i64, dy: i64| -> Vec3 {
                let tx = (x0 as i64 + dx).clamp(0, max_x) as u32;
                let ty = (y0 as i64 + dy).clamp(0, max_y) as u32;
                let t = texture.texel(tx, ty);
                Vec3::new(t[0] as f32, t[1] as f32, t[2] as f32)
            };

            let bottom = fetch(0, 0).lerp(fetch(1, 0), fx);
            let top = fetch(0, 1).lerp(fetch(1, 1), fx);
            let rgb = bottom.lerp(top, fy).round().clamp(Vec3::ZERO, Vec3::splat(255.0));
            [rgb.x as u8, rgb.y as u8, rgb.z as u8]
        }
    }
}
