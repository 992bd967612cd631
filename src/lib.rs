//! # vr180
//!
//! A stereoscopic 180/360 video player for immersive sessions.
//!
//! The player maps a side-by-side video frame onto a dome around the viewer,
//! sending the left half to the left eye and the right half to the right eye,
//! and floats a translucent control panel in front of it. A controller ray
//! drives the panel: play/pause, rewind and forward, a seek bar, mute and an
//! exit button. The panel fades out after a period of inactivity and comes
//! back on any background click.
//!
//! The core is host-agnostic. A [`Player`] is generic over three seams:
//!
//! - [`MediaElement`]: the decoder/clock that owns playback state,
//! - [`XrPlatform`]: grants and ends immersive sessions,
//! - [`RenderBackend`]: draws the scene for each eye view.
//!
//! Everything that happens to the player arrives as a [`PlayerEvent`] on one
//! queue, drained by [`Player::pump`].
//!
//! ## Desktop preview
//!
//! ```no_run
//! use vr180::*;
//!
//! fn main() -> Result<(), SetupError> {
//!     init_logger();
//!     let frame = image::RgbaImage::new(2048, 1024);
//!     let media = SyntheticMedia::new(Some(frame), 60.0);
//!     run(PlayerConfig::default(), PreviewConfig::default(), media, "demo")
//! }
//! ```

mod app;
mod camera;
mod config;
mod error;
mod events;
mod frame_loop;
mod gpu;
mod icons;
mod input;
mod interaction;
mod logging;
pub mod media;
mod mesh;
mod mesh_pass;
mod panel;
pub mod picking;
mod player;
mod render;
mod renderer;
mod scene;
mod session;
mod stereo;
mod texture;
mod transport;

pub use app::{DesktopPlatform, run};
pub use camera::{Camera, Eye};
pub use config::{DomeConfig, PanelLayout, PlayerConfig, PreviewConfig};
pub use error::{ConfigError, MediaError, RenderError, SessionError, SetupError, XrError};
pub use events::{EventSender, PlayerEvent, channel};
pub use frame_loop::{FrameLoop, FrameTarget, Tick};
pub use gpu::GpuContext;
pub use icons::{IconSet, Raster, Shape2d, TitleSpec, load_font, panel_background, panel_raster};
pub use input::Input;
pub use interaction::{Command, ControllerPose, HitTestRouter, Interactable};
pub use logging::init_logger;
pub use media::{MediaElement, MediaEvent, ReadyState, SyntheticMedia, VideoFrame};
pub use mesh::{MeshData, Transform, Vertex3d};
pub use panel::{PanelPhase, PanelVisibility};
pub use picking::{Collider, Ray, RayHit};
pub use player::{EnterControl, PageChrome, Player};
pub use render::{RenderBackend, RenderView, StereoTextureId, XrFrame};
pub use renderer::WgpuRenderer;
pub use scene::{Color, DrawItem, RasterSlot, Scene, SceneHandles, Shape, SurfaceTexture};
pub use session::{
    ENTER_LABEL, EXIT_LABEL, RequestTicket, SessionContext, SessionId, SessionLifecycle,
    SessionState, XrPlatform, XrSession,
};
pub use stereo::{EyeView, StereoMapper, TextureTransform};
pub use transport::{SeekBarVisual, Transport, TransportOutcome};

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
