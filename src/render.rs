//! The seam between the player and whatever draws the scene.
//!
//! The player never touches GPU objects directly. It asks a [`RenderBackend`]
//! for stereo textures by id, and once per frame hands it a [`RenderView`]
//! that borrows everything needed to draw: the scene, the panel rasters, the
//! current video frame and the eye views reported for the frame.

use crate::error::RenderError;
use crate::icons::IconSet;
use crate::media::VideoFrame;
use crate::scene::Scene;
use crate::stereo::{EyeView, StereoMapper};

/// Handle to a stereo video texture owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StereoTextureId(pub u64);

/// Per-frame data from the immersive platform.
#[derive(Debug, Clone)]
pub struct XrFrame {
    pub timestamp_ms: f64,
    /// One entry per eye, in the platform's order.
    pub views: Vec<EyeView>,
}

impl XrFrame {
    pub fn new(timestamp_ms: f64, views: Vec<EyeView>) -> Self {
        Self {
            timestamp_ms,
            views,
        }
    }

    /// A frame with no views carries no pose and cannot be drawn.
    pub fn has_pose(&self) -> bool {
        !self.views.is_empty()
    }
}

/// Everything a backend needs for one frame.
pub struct RenderView<'a> {
    pub scene: &'a Scene,
    pub icons: &'a IconSet,
    pub video: Option<VideoFrame<'a>>,
    pub views: &'a [EyeView],
    pub mapper: &'a StereoMapper,
    pub presenting: bool,
}

impl RenderView<'_> {
    /// UV transform for the dome as seen by `eye`.
    pub fn video_transform(&self, eye: &EyeView) -> crate::stereo::TextureTransform {
        self.mapper.transform_for(eye, self.presenting)
    }
}

pub trait RenderBackend {
    /// Allocate a texture for side-by-side video of the given size.
    fn create_stereo_texture(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<StereoTextureId, RenderError>;

    /// Release a texture. Unknown ids are ignored.
    fn dispose_stereo_texture(&mut self, id: StereoTextureId);

    /// Draw one frame. Uploads changed video and raster content first.
    fn render(&mut self, view: &RenderView<'_>) -> Result<(), RenderError>;

    /// Pending device error, if any. Clears it.
    fn take_error(&mut self) -> Option<String>;

    /// The flat view's size changed.
    fn resize_flat_view(&mut self, width: u32, height: u32);

    /// Return the output to the flat, single-view layout.
    fn restore_flat_view(&mut self);
}
