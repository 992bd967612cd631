//! wgpu implementation of [`RenderBackend`] for the desktop preview.
//!
//! The renderer turns a [`RenderView`] into one [`EyePass`] per viewport. While
//! presenting, each eye gets an equal vertical strip of the window; in the flat
//! view the current video frame is shown whole as a poster, so the window is
//! not blank before a session starts.

use crate::config::PlayerConfig;
use crate::error::RenderError;
use crate::gpu::GpuContext;
use crate::icons::IconSet;
use crate::media::VideoFrame;
use crate::mesh::{Mesh, MeshData};
use crate::mesh_pass::{EyePass, MeshDraw, MeshPass};
use crate::render::{RenderBackend, RenderView, StereoTextureId};
use crate::scene::{DrawItem, RasterSlot, Shape, SurfaceTexture};
use crate::stereo::{EyeView, TextureTransform};
use crate::texture::{Sampling, Texture};
use glam::{Mat4, Vec3};
use std::collections::HashMap;

const BEAM_THICKNESS: f32 = 0.004;

/// A texture, its bind group and the revision of what it holds.
struct GpuImage {
    texture: Texture,
    bind_group: wgpu::BindGroup,
    revision: Option<u64>,
}

impl GpuImage {
    fn new(
        gpu: &GpuContext,
        pass: &MeshPass,
        width: u32,
        height: u32,
        sampling: Sampling,
        label: &str,
    ) -> Self {
        let texture = Texture::new(gpu, width, height, sampling, label);
        let bind_group = pass.bind_texture(gpu, &texture);
        Self {
            texture,
            bind_group,
            revision: None,
        }
    }

    /// Upload `image` if its revision is new, reallocating on size change.
    fn sync(
        &mut self,
        gpu: &GpuContext,
        pass: &MeshPass,
        image: &image::RgbaImage,
        revision: u64,
        sampling: Sampling,
        label: &str,
    ) {
        if self.revision == Some(revision) && self.texture.matches(image) {
            return;
        }
        if !self.texture.matches(image) {
            *self = Self::new(gpu, pass, image.width(), image.height(), sampling, label);
        }
        self.texture.write_rgba(gpu, image);
        self.revision = Some(revision);
    }
}

pub struct WgpuRenderer {
    gpu: GpuContext,
    pass: MeshPass,
    dome: Mesh,
    quad: Mesh,
    beam: Mesh,
    stereo: HashMap<StereoTextureId, GpuImage>,
    next_texture: u64,
    rasters: HashMap<RasterSlot, GpuImage>,
    poster: Option<GpuImage>,
    flat_size: (u32, u32),
    pending_error: Option<String>,
}

impl WgpuRenderer {
    pub fn new(gpu: GpuContext, config: &PlayerConfig) -> Self {
        let pass = MeshPass::new(&gpu);
        let dome = Mesh::new(
            &gpu,
            &MeshData::dome(config.dome.radius, config.dome.segments, config.dome.rings),
        );
        let quad = Mesh::new(&gpu, &MeshData::quad(1.0, 1.0));
        let beam = Mesh::new(&gpu, &MeshData::beam(BEAM_THICKNESS));
        let flat_size = (gpu.width(), gpu.height());
        Self {
            gpu,
            pass,
            dome,
            quad,
            beam,
            stereo: HashMap::new(),
            next_texture: 1,
            rasters: HashMap::new(),
            poster: None,
            flat_size,
            pending_error: None,
        }
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Follow the window size. The flat viewport is managed separately.
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    /// Live stereo textures.
    pub fn stereo_texture_count(&self) -> usize {
        self.stereo.len()
    }

    fn sync_rasters(&mut self, icons: &IconSet) {
        for slot in RasterSlot::ALL {
            let raster = icons.raster(slot);
            let (gpu, pass) = (&self.gpu, &self.pass);
            let (width, height) = raster.image.dimensions();
            self.rasters
                .entry(slot)
                .or_insert_with(|| {
                    GpuImage::new(gpu, pass, width, height, Sampling::Ui, "panel raster")
                })
                .sync(
                    gpu,
                    pass,
                    &raster.image,
                    raster.revision,
                    Sampling::Ui,
                    "panel raster",
                );
        }
    }

    fn sync_video(&mut self, view: &RenderView<'_>) {
        let Some(frame) = view.video else {
            return;
        };
        if view.presenting {
            if let Some(id) = view.scene.video_binding() {
                if let Some(image) = self.stereo.get_mut(&id) {
                    image.sync(
                        &self.gpu,
                        &self.pass,
                        frame.image,
                        frame.revision,
                        Sampling::Video,
                        "stereo video",
                    );
                }
            }
        } else {
            self.sync_poster(frame);
        }
    }

    fn sync_poster(&mut self, frame: VideoFrame<'_>) {
        let (gpu, pass) = (&self.gpu, &self.pass);
        let (width, height) = frame.image.dimensions();
        self.poster
            .get_or_insert_with(|| {
                GpuImage::new(gpu, pass, width, height, Sampling::Video, "poster")
            })
            .sync(gpu, pass, frame.image, frame.revision, Sampling::Video, "poster");
    }

    fn viewports(&self, count: usize, presenting: bool) -> Vec<[f32; 4]> {
        let (width, height) = (self.gpu.width() as f32, self.gpu.height() as f32);
        if presenting && count > 1 {
            let strip = width / count as f32;
            (0..count)
                .map(|i| [strip * i as f32, 0.0, strip, height])
                .collect()
        } else {
            let (fw, fh) = self.flat_size;
            vec![[0.0, 0.0, (fw as f32).min(width), (fh as f32).min(height)]]
        }
    }

    fn mesh_draw<'a>(
        &'a self,
        item: &DrawItem,
        eye: &EyeView,
        view: &RenderView<'_>,
    ) -> Option<MeshDraw<'a>> {
        let (mesh, model) = match item.shape {
            Shape::Dome => (&self.dome, item.model),
            Shape::Quad { width, height } => (
                &self.quad,
                item.model * Mat4::from_scale(Vec3::new(width, height, 1.0)),
            ),
            Shape::Beam => (&self.beam, item.model),
        };
        let (texture, uv_transform) = match item.texture {
            Some(SurfaceTexture::Video(id)) => {
                // the dome has nothing to show until its texture exists
                let image = self.stereo.get(&id)?;
                image.revision?;
                (Some(&image.bind_group), view.video_transform(eye))
            }
            Some(SurfaceTexture::Raster(slot)) => (
                self.rasters.get(&slot).map(|r| &r.bind_group),
                TextureTransform::FULL,
            ),
            None => (None, TextureTransform::FULL),
        };
        let mut color = item.color.to_array();
        color[3] *= item.opacity;
        Some(MeshDraw {
            mesh,
            model,
            color,
            uv_transform,
            texture,
        })
    }

    /// The flat-view poster: the whole frame letterboxed into the viewport.
    fn poster_draw(&self, viewport: [f32; 4]) -> Option<MeshDraw<'_>> {
        let poster = self.poster.as_ref()?;
        poster.revision?;
        let frame_aspect = poster.texture.width as f32 / poster.texture.height as f32;
        let view_aspect = viewport[2] / viewport[3].max(1.0);
        let (sx, sy) = if frame_aspect > view_aspect {
            (2.0, 2.0 * view_aspect / frame_aspect)
        } else {
            (2.0 * frame_aspect / view_aspect, 2.0)
        };
        Some(MeshDraw {
            mesh: &self.quad,
            model: Mat4::from_scale(Vec3::new(sx, sy, 1.0)),
            color: [1.0; 4],
            uv_transform: TextureTransform::FULL,
            texture: Some(&poster.bind_group),
        })
    }
}

impl RenderBackend for WgpuRenderer {
    fn create_stereo_texture(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<StereoTextureId, RenderError> {
        let max = self.gpu.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RenderError::TextureAllocation(format!(
                "{width}x{height} exceeds the device limit of {max}"
            )));
        }
        let id = StereoTextureId(self.next_texture);
        self.next_texture += 1;
        let image = GpuImage::new(
            &self.gpu,
            &self.pass,
            width,
            height,
            Sampling::Video,
            "stereo video",
        );
        self.stereo.insert(id, image);
        log::debug!("allocated stereo texture {id:?} ({width}x{height})");
        Ok(id)
    }

    fn dispose_stereo_texture(&mut self, id: StereoTextureId) {
        match self.stereo.remove(&id) {
            Some(image) => {
                image.texture.texture.destroy();
                log::debug!("disposed stereo texture {id:?}");
            }
            None => log::debug!("dispose of unknown stereo texture {id:?}"),
        }
    }

    fn render(&mut self, view: &RenderView<'_>) -> Result<(), RenderError> {
        self.sync_rasters(view.icons);
        self.sync_video(view);

        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                self.gpu.reconfigure();
                self.pending_error = Some("surface lost and reconfigured".to_string());
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("surface acquire timed out");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let items = view.scene.draw_list();
        let viewports = self.viewports(view.views.len(), view.presenting);
        // flat view: poster pass plus scene pass per viewport
        let passes_per_view = if view.presenting { 1 } else { 2 };
        self.pass.reserve(
            &self.gpu,
            (viewports.len() * passes_per_view) as u64,
            (viewports.len() * (items.len() + 1)) as u64,
        );

        let mut eyes = Vec::with_capacity(viewports.len() * passes_per_view);
        for (eye, viewport) in view.views.iter().zip(viewports) {
            if !view.presenting {
                if let Some(poster) = self.poster_draw(viewport) {
                    eyes.push(EyePass {
                        viewport,
                        view_proj: Mat4::IDENTITY,
                        draws: vec![poster],
                    });
                }
            }
            eyes.push(EyePass {
                viewport,
                view_proj: eye.projection * eye.view,
                draws: items
                    .iter()
                    .filter_map(|item| self.mesh_draw(item, eye, view))
                    .collect(),
            });
        }

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.pass.render(&self.gpu, &mut pass, &eyes);
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn take_error(&mut self) -> Option<String> {
        self.pending_error.take()
    }

    fn resize_flat_view(&mut self, width: u32, height: u32) {
        self.flat_size = (width.max(1), height.max(1));
    }

    fn restore_flat_view(&mut self) {
        self.flat_size = (self.gpu.width(), self.gpu.height());
        log::debug!("flat view restored to {}x{}", self.flat_size.0, self.flat_size.1);
    }
}
