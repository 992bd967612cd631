use crate::gpu::GpuContext;

/// How a texture is filtered and addressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sampling {
    /// Linear filtering clamped at the edges, so the two halves of a
    /// side-by-side frame do not bleed into each other at the border.
    Video,
    /// Linear filtering for panel rasters.
    Ui,
}

/// A GPU texture with its view and sampler.
///
/// # Example
///
/// ```ignore
/// let mut texture = Texture::new(&gpu, 4096, 2048, Sampling::Video, "stereo video");
/// if !texture.matches(&frame) {
///     texture = Texture::from_image(&gpu, &frame, Sampling::Video, "stereo video");
/// }
/// texture.write_rgba(&gpu, &frame);
/// ```
#[derive(Debug)]
pub struct Texture {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// An empty RGBA texture that can be written with [`Texture::write_rgba`].
    pub fn new(gpu: &GpuContext, width: u32, height: u32, sampling: Sampling, label: &str) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} sampler")),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: match sampling {
                Sampling::Video => wgpu::FilterMode::Nearest,
                Sampling::Ui => wgpu::FilterMode::Linear,
            },
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// A texture holding `image`.
    pub fn from_image(
        gpu: &GpuContext,
        image: &image::RgbaImage,
        sampling: Sampling,
        label: &str,
    ) -> Self {
        let texture = Self::new(gpu, image.width(), image.height(), sampling, label);
        texture.write_rgba(gpu, image);
        texture
    }

    /// Whether `image` fits this texture exactly.
    pub fn matches(&self, image: &image::RgbaImage) -> bool {
        image.dimensions() == (self.width, self.height)
    }

    /// Overwrite the texture with `image`. Sizes must match.
    pub fn write_rgba(&self, gpu: &GpuContext, image: &image::RgbaImage) {
        if !self.matches(image) {
            log::warn!(
                "skipping upload of {}x{} image into {}x{} texture",
                image.width(),
                image.height(),
                self.width,
                self.height
            );
            return;
        }
        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }
}
