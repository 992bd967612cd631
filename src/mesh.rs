//! Geometry for the player's scene and spatial transforms.
//!
//! - [`Vertex3d`]: the vertex format every mesh uses (position, normal, uv)
//! - [`MeshData`]: CPU-side geometry, built by the shape constructors
//! - [`Mesh`]: the same geometry uploaded to GPU buffers
//! - [`Transform`]: position, rotation and scale of a scene node
//!
//! Only three shapes are needed: the inward-facing video dome, flat quads for
//! every panel surface, and the pointer beam.
//!
//! # Dome mapping
//!
//! The dome is the hemisphere in front of the viewer (−Z). Texture `u` sweeps
//! longitude from −90° (left, −X) to +90° (right, +X); `v` sweeps from the
//! zenith (0) to the nadir (1). One eye's half of a side-by-side frame
//! therefore covers exactly the 180° field it was shot with.
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |

use crate::gpu::GpuContext;
use glam::{Mat4, Quat, Vec3};
use std::f32::consts::PI;

/// A vertex with position, normal, and texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex3d {
    /// The wgpu vertex buffer layout for this vertex type.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Geometry that has not been uploaded yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Inward-facing hemisphere of `radius` centered at the origin.
    ///
    /// `segments` columns span the 180° longitude sweep, `rings` rows span
    /// zenith to nadir. Both are clamped to at least 1.
    pub fn dome(radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(1);
        let rings = rings.max(1);
        let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
        let mut indices = Vec::with_capacity((segments * rings * 6) as usize);

        for ring in 0..=rings {
            let v = ring as f32 / rings as f32;
            let theta = v * PI;
            let (sin_theta, cos_theta) = theta.sin_cos();

            for seg in 0..=segments {
                let u = seg as f32 / segments as f32;
                let lon = (u - 0.5) * PI;
                let (sin_lon, cos_lon) = lon.sin_cos();

                let dir = Vec3::new(sin_lon * sin_theta, cos_theta, -cos_lon * sin_theta);
                let position = dir * radius;
                vertices.push(Vertex3d::new(position.into(), (-dir).into(), [u, v]));
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;

                indices.extend_from_slice(&[current, next, current + 1]);
                indices.extend_from_slice(&[current + 1, next, next + 1]);
            }
        }

        Self { vertices, indices }
    }

    /// A `width` × `height` rectangle in the XY plane facing +Z.
    ///
    /// UV (0, 0) is the top-left corner so rasters map upright.
    pub fn quad(width: f32, height: f32) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        let n = [0.0, 0.0, 1.0];
        Self {
            vertices: vec![
                Vertex3d::new([-hw, -hh, 0.0], n, [0.0, 1.0]),
                Vertex3d::new([hw, -hh, 0.0], n, [1.0, 1.0]),
                Vertex3d::new([hw, hh, 0.0], n, [1.0, 0.0]),
                Vertex3d::new([-hw, hh, 0.0], n, [0.0, 0.0]),
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    /// Two crossed strips of `thickness` running from the origin to z = −1.
    ///
    /// Scale along Z to set the beam length.
    pub fn beam(thickness: f32) -> Self {
        let h = thickness * 0.5;
        let vertices = vec![
            // horizontal strip
            Vertex3d::new([-h, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([h, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0]),
            Vertex3d::new([h, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex3d::new([-h, 0.0, -1.0], [0.0, 1.0, 0.0], [0.0, 1.0]),
            // vertical strip
            Vertex3d::new([0.0, -h, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([0.0, h, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0]),
            Vertex3d::new([0.0, h, -1.0], [1.0, 0.0, 0.0], [1.0, 1.0]),
            Vertex3d::new([0.0, -h, -1.0], [1.0, 0.0, 0.0], [0.0, 1.0]),
        ];
        let indices = vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4];
        Self { vertices, indices }
    }
}

/// GPU-resident geometry with vertex and index buffers.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
}

impl Mesh {
    /// Upload `data` to the GPU.
    pub fn new(gpu: &GpuContext, data: &MeshData) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
        }
    }
}

/// Position, rotation, and scale of a scene node relative to its parent.
///
/// ```
/// use vr180::{Transform, Vec3, Quat};
///
/// let transform = Transform::new()
///     .position(Vec3::new(0.0, 0.5, -1.8))
///     .rotation(Quat::from_rotation_y(0.5))
///     .uniform_scale(2.0);
/// assert_eq!(transform.scale, Vec3::splat(2.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Scale, then rotate, then translate.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}
