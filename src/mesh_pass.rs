//! Unlit textured mesh rendering for one or more eye viewports.
//!
//! The pass uses three bind groups:
//! - **Group 0**: per-eye uniforms (view-projection), dynamic offset per eye
//! - **Group 1**: per-draw uniforms (model matrix, color, UV transform),
//!   dynamic offset per draw
//! - **Group 2**: texture and sampler for the surface
//!
//! Every draw of a frame gets its own slot in the per-draw buffer, so all
//! uniform writes can be queued before the pass executes. There is no depth
//! buffer: surfaces are layered by draw order with alpha blending, and faces
//! are not culled because the dome is seen from inside.
//!
//! # Example
//!
//! ```ignore
//! let mut mesh_pass = MeshPass::new(&gpu);
//! let eyes = vec![EyePass {
//!     viewport: [0.0, 0.0, 800.0, 800.0],
//!     view_proj: projection * view,
//!     draws: vec![MeshDraw {
//!         mesh: &dome,
//!         model: Mat4::IDENTITY,
//!         color: [1.0; 4],
//!         uv_transform: TextureTransform::LEFT_HALF,
//!         texture: Some(&video_bind_group),
//!     }],
//! }];
//! mesh_pass.reserve(&gpu, 1, 1);
//! mesh_pass.render(&gpu, &mut render_pass, &eyes);
//! ```

use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Vertex3d};
use crate::stereo::TextureTransform;
use crate::texture::Texture;
use glam::Mat4;

/// Uniform slots are spaced at the minimum dynamic offset alignment.
const UNIFORM_STRIDE: u64 = 256;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct EyeUniforms {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ModelUniforms {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    uv_transform: [f32; 4],
}

/// One mesh to draw.
pub struct MeshDraw<'a> {
    pub mesh: &'a Mesh,
    pub model: Mat4,
    /// Color multiplier, alpha included.
    pub color: [f32; 4],
    pub uv_transform: TextureTransform,
    /// Texture bind group from [`MeshPass::bind_texture`]. `None` draws flat color.
    pub texture: Option<&'a wgpu::BindGroup>,
}

/// Everything drawn into one viewport.
pub struct EyePass<'a> {
    /// `(x, y, width, height)` in physical pixels.
    pub viewport: [f32; 4],
    pub view_proj: Mat4,
    pub draws: Vec<MeshDraw<'a>>,
}

pub struct MeshPass {
    pipeline: wgpu::RenderPipeline,
    eye_buffer: wgpu::Buffer,
    eye_bind_group: wgpu::BindGroup,
    eye_capacity: u64,
    eye_layout: wgpu::BindGroupLayout,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_capacity: u64,
    model_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    white_bind_group: wgpu::BindGroup,
}

impl MeshPass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        let eye_size = std::mem::size_of::<EyeUniforms>();
        let model_size = std::mem::size_of::<ModelUniforms>();
        let eye_layout = Self::uniform_layout(device, "eye uniforms layout", eye_size);
        let model_layout = Self::uniform_layout(device, "model uniforms layout", model_size);

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("surface texture layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let (eye_buffer, eye_bind_group) =
            Self::uniform_buffer(gpu, &eye_layout, "eye uniforms", 2, eye_size);
        let (model_buffer, model_bind_group) =
            Self::uniform_buffer(gpu, &model_layout, "model uniforms", 16, model_size);

        let mut white = image::RgbaImage::new(1, 1);
        white.put_pixel(0, 0, image::Rgba([255, 255, 255, 255]));
        let white = Texture::from_image(gpu, &white, crate::texture::Sampling::Ui, "white texture");
        let white_bind_group = Self::texture_bind_group(gpu, &texture_layout, &white);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene pipeline layout"),
            bind_group_layouts: &[&eye_layout, &model_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scene pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.format(),
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            eye_buffer,
            eye_bind_group,
            eye_capacity: 2,
            eye_layout,
            model_buffer,
            model_bind_group,
            model_capacity: 16,
            model_layout,
            texture_layout,
            white_bind_group,
        }
    }

    fn uniform_layout(device: &wgpu::Device, label: &str, size: usize) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(size as u64),
                },
                count: None,
            }],
        })
    }

    fn uniform_buffer(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        slots: u64,
        size: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: slots * UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(size as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn texture_bind_group(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        texture: &Texture,
    ) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("surface texture bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    /// Bind group for drawing with `texture`. Create once and keep it with
    /// the texture.
    pub fn bind_texture(&self, gpu: &GpuContext, texture: &Texture) -> wgpu::BindGroup {
        Self::texture_bind_group(gpu, &self.texture_layout, texture)
    }

    /// Make room for `eyes` viewports and `draws` draws in one frame.
    pub fn reserve(&mut self, gpu: &GpuContext, eyes: u64, draws: u64) {
        if eyes > self.eye_capacity {
            let capacity = eyes.next_power_of_two();
            let (buffer, bind_group) = Self::uniform_buffer(
                gpu,
                &self.eye_layout,
                "eye uniforms",
                capacity,
                std::mem::size_of::<EyeUniforms>(),
            );
            self.eye_buffer = buffer;
            self.eye_bind_group = bind_group;
            self.eye_capacity = capacity;
        }
        if draws > self.model_capacity {
            let capacity = draws.next_power_of_two();
            log::debug!("growing model uniforms to {capacity} slots");
            let (buffer, bind_group) = Self::uniform_buffer(
                gpu,
                &self.model_layout,
                "model uniforms",
                capacity,
                std::mem::size_of::<ModelUniforms>(),
            );
            self.model_buffer = buffer;
            self.model_bind_group = bind_group;
            self.model_capacity = capacity;
        }
    }

    /// Queue uniform writes for `eyes`, then record their draws into
    /// `render_pass`. Call [`MeshPass::reserve`] first; anything beyond the
    /// reserved capacity is dropped.
    pub fn render(
        &self,
        gpu: &GpuContext,
        render_pass: &mut wgpu::RenderPass<'_>,
        eyes: &[EyePass<'_>],
    ) {
        let draw_count: u64 = eyes.iter().map(|e| e.draws.len() as u64).sum();
        if draw_count == 0 {
            return;
        }
        if eyes.len() as u64 > self.eye_capacity || draw_count > self.model_capacity {
            log::warn!(
                "{} viewports / {draw_count} draws exceed reserved capacity; truncating",
                eyes.len()
            );
        }
        let eyes = &eyes[..eyes.len().min(self.eye_capacity as usize)];

        render_pass.set_pipeline(&self.pipeline);
        let mut slot = 0u64;
        for (i, eye) in eyes.iter().enumerate() {
            let eye_offset = i as u64 * UNIFORM_STRIDE;
            let uniforms = EyeUniforms {
                view_proj: eye.view_proj.to_cols_array_2d(),
            };
            gpu.queue
                .write_buffer(&self.eye_buffer, eye_offset, bytemuck::cast_slice(&[uniforms]));

            let [x, y, w, h] = eye.viewport;
            render_pass.set_viewport(x, y, w, h, 0.0, 1.0);
            render_pass.set_bind_group(0, &self.eye_bind_group, &[eye_offset as u32]);

            for draw in &eye.draws {
                if slot >= self.model_capacity {
                    return;
                }
                let model_offset = slot * UNIFORM_STRIDE;
                let uniforms = ModelUniforms {
                    model: draw.model.to_cols_array_2d(),
                    color: draw.color,
                    uv_transform: draw.uv_transform.to_array(),
                };
                gpu.queue.write_buffer(
                    &self.model_buffer,
                    model_offset,
                    bytemuck::cast_slice(&[uniforms]),
                );

                render_pass.set_bind_group(1, &self.model_bind_group, &[model_offset as u32]);
                render_pass.set_bind_group(2, draw.texture.unwrap_or(&self.white_bind_group), &[]);
                render_pass.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(draw.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
                slot += 1;
            }
        }
    }
}
