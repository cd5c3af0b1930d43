use std::sync::Arc;

use glam::{Mat4, Vec4};
use log::debug;
use wgpu::util::DeviceExt;

use super::gpu_context::GpuContext;
use crate::error::{Error, Result};
use crate::shot::ShotImage;
use crate::traits::rasterizer::{DrawCall, PixelLayout, Rasterizer, TextureFilter};
use crate::types::{ProjectionUniforms, Vertex};

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

/// Remaps GL clip depth [-w, w] to the [0, w] range wgpu expects
const DEPTH_GL_TO_ZERO_ONE: Mat4 = Mat4::from_cols(
    Vec4::X,
    Vec4::Y,
    Vec4::new(0.0, 0.0, 0.5, 0.0),
    Vec4::new(0.0, 0.0, 0.5, 1.0),
);

/// Colour + depth attachments and the readback buffer for one resolution
struct RenderTarget {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    staging_buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row_bytes: u32,
}

impl RenderTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Projection Color Target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Projection Depth Target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        let padded_row_bytes = padded_bytes_per_row(width);
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Projection Staging Buffer"),
            size: padded_row_bytes as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            color,
            color_view,
            depth_view,
            staging_buffer,
            width,
            height,
            padded_row_bytes,
        }
    }
}

fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drop the row padding wgpu requires on texture-to-buffer copies
fn strip_row_padding(padded: &[u8], width: u32, height: u32, padded_row_bytes: u32) -> Vec<u8> {
    let row_bytes = width as usize * 4;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in padded.chunks_exact(padded_row_bytes as usize).take(height as usize) {
        pixels.extend_from_slice(&row[..row_bytes]);
    }
    pixels
}

/// wgpu render pipeline running `projective.wgsl`
pub struct GpuRasterizer {
    gpu: Arc<GpuContext>,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    target: RenderTarget,
}

impl GpuRasterizer {
    pub fn new(gpu: Arc<GpuContext>, width: u32, height: u32, filter: TextureFilter) -> Result<Self> {
        check_size(&gpu, width, height)?;
        let device = gpu.device();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Projective Texturing Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../projective.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Projection Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Projection Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Projection Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &VERTEX_ATTRIBUTES,
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Projection Uniform Buffer"),
            size: std::mem::size_of::<ProjectionUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let filter_mode = match filter {
            TextureFilter::Nearest => wgpu::FilterMode::Nearest,
            TextureFilter::Linear => wgpu::FilterMode::Linear,
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shot Texture Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter_mode,
            min_filter: filter_mode,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let target = RenderTarget::new(device, width, height);
        debug!("GPU rasterizer ready at {width}x{height} on {}", gpu.adapter_name());

        Ok(Self {
            gpu,
            pipeline,
            bind_group_layout,
            uniform_buffer,
            sampler,
            target,
        })
    }

    fn upload_texture(&self, image: &ShotImage) -> Result<wgpu::TextureView> {
        let (width, height) = image.dimensions();
        let max = self.gpu.device().limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(Error::InvalidInput(format!(
                "shot image {width}x{height} exceeds the device texture limit {max}"
            )));
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("Shot Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        // rows stay bottom-up: v = 0 samples the first row
        self.gpu.queue().write_texture(
            texture.as_image_copy(),
            image.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        Ok(texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }
}

fn check_size(gpu: &GpuContext, width: u32, height: u32) -> Result<()> {
    let max = gpu.device().limits().max_texture_dimension_2d;
    if width == 0 || height == 0 || width > max || height > max {
        return Err(Error::config(format!(
            "framebuffer size {width}x{height} outside 1..={max}"
        )));
    }
    Ok(())
}

impl Rasterizer for GpuRasterizer {
    fn resolution(&self) -> (u32, u32) {
        (self.target.width, self.target.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        check_size(&self.gpu, width, height)?;
        self.target = RenderTarget::new(self.gpu.device(), width, height);
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        if let Some(index) = call.indices.iter().find(|&&i| i as usize >= call.vertices.len()) {
            return Err(Error::InvalidInput(format!(
                "index {index} out of range for {} vertices",
                call.vertices.len()
            )));
        }

        let device = self.gpu.device();
        let queue = self.gpu.queue();

        let mut uniforms = call.uniforms;
        uniforms.projection = (DEPTH_GL_TO_ZERO_ONE * call.uniforms.projection()).to_cols_array_2d();
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        // an empty index list still clears the target
        let geometry = (!call.indices.is_empty()).then(|| {
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Proxy Vertex Buffer"),
                contents: bytemuck::cast_slice(call.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Proxy Index Buffer"),
                contents: bytemuck::cast_slice(call.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (vertex_buffer, index_buffer)
        });

        let texture_view = self.upload_texture(call.texture)?;
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Projection Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Projection Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Projection Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some((vertex_buffer, index_buffer)) = &geometry {
                render_pass.set_pipeline(&self.pipeline);
                render_pass.set_bind_group(0, &bind_group, &[]);
                render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
                render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..call.indices.len() as u32, 0, 0..1);
            }
        }

        encoder.copy_texture_to_buffer(
            self.target.color.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &self.target.staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.target.padded_row_bytes),
                    rows_per_image: Some(self.target.height),
                },
            },
            wgpu::Extent3d {
                width: self.target.width,
                height: self.target.height,
                depth_or_array_layers: 1,
            },
        );

        queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn read_pixels(&mut self, layout: PixelLayout) -> Result<Vec<u8>> {
        let target = &self.target;
        let padded = self.gpu.read_buffer_sync(&target.staging_buffer)?;
        let mut pixels = strip_row_padding(&padded, target.width, target.height, target.padded_row_bytes);

        // wgpu rows are top-down; bring them to the native bottom-up order first
        PixelLayout::TOP_DOWN.apply(target.width, target.height, &mut pixels)?;
        layout.apply(target.width, target.height, &mut pixels)?;
        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_row_padding() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
    }

    #[test]
    fn test_strip_row_padding() {
        let mut padded = vec![0u8; 512];
        padded[..4].copy_from_slice(&[1, 2, 3, 4]);
        padded[256..260].copy_from_slice(&[5, 6, 7, 8]);
        assert_eq!(strip_row_padding(&padded, 1, 2, 256), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_depth_remap() {
        let projection = Mat4::perspective_rh_gl(1.0, 1.0, 0.1, 100.0);
        let remapped = DEPTH_GL_TO_ZERO_ONE * projection;

        let near = remapped * Vec3::new(0.0, 0.0, -0.1).extend(1.0);
        let far = remapped * Vec3::new(0.0, 0.0, -100.0).extend(1.0);
        assert!((near.z / near.w).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);

        let gl = projection * Vec3::new(1.0, 2.0, -5.0).extend(1.0);
        let wgpu = remapped * Vec3::new(1.0, 2.0, -5.0).extend(1.0);
        assert_eq!(gl.x, wgpu.x);
        assert_eq!(gl.w, wgpu.w);
    }
}
