//! Error types.
//!
//! Errors are grouped by who can recover from them:
//!
//! - [`SetupError`]: the host could not initialize. Fatal to startup; the enter
//!   control stays disabled.
//! - [`XrError`]: the immersive platform refused or failed a request. The
//!   session lifecycle recovers and the user may retry.
//! - [`RenderError`]: a GPU-side failure. Fatal to the current session only.
//! - [`MediaError`]: playback problems. Logged; irrecoverable ones disable entry.
//! - [`ConfigError`]: a configuration file could not be read.
//! - [`SessionError`]: why a granted session could not be brought up.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while bringing up the desktop host.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create rendering surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to load font {path}: {reason}")]
    Font { path: PathBuf, reason: String },
    #[error("{0} uses a container that must be transcoded before playback")]
    NeedsTranscode(PathBuf),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures reported by the immersive session platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XrError {
    #[error("immersive sessions are not supported on this device")]
    Unsupported,
    #[error("permission to start an immersive session was denied")]
    PermissionDenied,
    #[error("required session feature `{0}` is not available")]
    FeatureUnsupported(String),
    #[error("the headset is in use by another session")]
    DeviceBusy,
    #[error("the session has already ended")]
    AlreadyEnded,
    #[error("platform error: {0}")]
    Platform(String),
}

/// GPU-side failures.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("failed to allocate stereo texture: {0}")]
    TextureAllocation(String),
    #[error("render backend error: {0}")]
    Backend(String),
}

/// Playback failures surfaced by a media element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("no media source is attached")]
    NoSource,
    #[error("playback was blocked: {0}")]
    PlaybackBlocked(String),
    #[error("media could not be decoded: {0}")]
    Decode(String),
}

/// Failures loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Why a granted session could not be entered.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("the scene has no video surface to bind the stereo texture to")]
    NoVideoSurface,
}
