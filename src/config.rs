//! Player configuration.
//!
//! [`PlayerConfig`] holds every tunable the player core reads: fade timing,
//! the auto-hide delay, transport step, ray range, dome tessellation and the
//! panel layout. All fields have defaults, so a JSON file only needs to name
//! the values it overrides:
//!
//! ```json
//! { "skip_seconds": 10.0, "panel": { "distance": 2.2 } }
//! ```
//!
//! [`PreviewConfig`] configures the desktop preview window.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tunables for the player core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Duration of a full panel fade (0→1 or 1→0).
    pub fade_duration_ms: f64,
    /// How long the panel stays up after the last interaction.
    pub auto_hide_delay_ms: f64,
    /// Rewind/forward step in seconds.
    pub skip_seconds: f64,
    /// Closest distance a controller ray can hit.
    pub ray_near: f32,
    /// Farthest distance a controller ray can hit. Also the pointer beam length.
    pub ray_far: f32,
    /// Panel opacity above which a background click hides instead of shows.
    pub visibility_epsilon: f32,
    /// Frame loop ticks between graphics health checks.
    pub health_check_interval: u64,
    /// Features every immersive session request must be granted.
    pub required_features: Vec<String>,
    /// Projection skew magnitude below which an eye is treated as monoscopic.
    pub stereo_threshold: f32,
    pub dome: DomeConfig,
    pub panel: PanelLayout,
    /// Edge length of the square button icon rasters.
    pub icon_size: u32,
    /// Width of the panel background raster. Height follows the panel aspect.
    pub panel_texture_width: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            fade_duration_ms: 200.0,
            auto_hide_delay_ms: 10_000.0,
            skip_seconds: 15.0,
            ray_near: 0.1,
            ray_far: 5.0,
            visibility_epsilon: 0.01,
            health_check_interval: 3600,
            required_features: vec!["local-floor".to_string()],
            stereo_threshold: 1e-4,
            dome: DomeConfig::default(),
            panel: PanelLayout::default(),
            icon_size: 128,
            panel_texture_width: 1024,
        }
    }
}

impl PlayerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn fade_duration_ms(mut self, ms: f64) -> Self {
        self.fade_duration_ms = ms;
        self
    }

    pub fn auto_hide_delay_ms(mut self, ms: f64) -> Self {
        self.auto_hide_delay_ms = ms;
        self
    }

    pub fn skip_seconds(mut self, seconds: f64) -> Self {
        self.skip_seconds = seconds;
        self
    }

    pub fn ray_range(mut self, near: f32, far: f32) -> Self {
        self.ray_near = near;
        self.ray_far = far;
        self
    }

    pub fn health_check_interval(mut self, ticks: u64) -> Self {
        self.health_check_interval = ticks;
        self
    }

    /// Height of the panel background raster for the configured width.
    pub fn panel_texture_height(&self) -> u32 {
        (self.panel_texture_width as f32 * self.panel.height_px / self.panel.width_px).round()
            as u32
    }
}

/// Tessellation of the video dome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomeConfig {
    pub radius: f32,
    /// Segments around the horizontal sweep.
    pub segments: u32,
    /// Rings from top to bottom.
    pub rings: u32,
}

impl Default for DomeConfig {
    fn default() -> Self {
        Self {
            radius: 500.0,
            segments: 64,
            rings: 32,
        }
    }
}

/// Panel geometry in design pixels, plus where the panel sits in the world.
///
/// Design pixels have their origin at the panel's top-left corner with +y
/// pointing down. [`PanelLayout::to_world`] converts them to panel-local world
/// units (origin at the panel center, +y up).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelLayout {
    pub width_px: f32,
    pub height_px: f32,
    pub corner_radius_px: f32,
    pub title_size_px: f32,
    pub title_top_px: f32,
    pub track_width_px: f32,
    pub track_height_px: f32,
    /// Track center, measured upward from the panel center.
    pub track_center_up_px: f32,
    /// Hit area height as a multiple of the track height.
    pub hit_height_factor: f32,
    pub button_size_px: f32,
    /// Vertical center of the button row.
    pub button_row_px: f32,
    pub exit_x_px: f32,
    pub rewind_x_px: f32,
    pub play_x_px: f32,
    pub forward_x_px: f32,
    pub volume_x_px: f32,
    /// Panel width in world units.
    pub world_width: f32,
    /// Panel center in world space.
    pub position: [f32; 3],
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self {
            width_px: 450.0,
            height_px: 132.0,
            corner_radius_px: 30.0,
            title_size_px: 14.0,
            title_top_px: 20.0,
            track_width_px: 386.0,
            track_height_px: 5.0,
            track_center_up_px: 132.0 / 2.0 - 54.0,
            hit_height_factor: 5.0,
            button_size_px: 44.0,
            button_row_px: 90.0,
            exit_x_px: 42.0,
            rewind_x_px: 169.0,
            play_x_px: 225.0,
            forward_x_px: 281.0,
            volume_x_px: 408.0,
            world_width: 1.5,
            position: [0.0, 0.5, -1.8],
        }
    }
}

impl PanelLayout {
    /// World units per design pixel.
    pub fn scale(&self) -> f32 {
        self.world_width / self.width_px
    }

    pub fn world_height(&self) -> f32 {
        self.height_px * self.scale()
    }

    pub fn track_world_width(&self) -> f32 {
        self.track_width_px * self.scale()
    }

    pub fn track_world_height(&self) -> f32 {
        self.track_height_px * self.scale()
    }

    /// Convert a design-pixel coordinate to panel-local world units.
    pub fn to_world(&self, x_px: f32, y_px: f32) -> [f32; 2] {
        let s = self.scale();
        [
            (x_px - self.width_px / 2.0) * s,
            (self.height_px / 2.0 - y_px) * s,
        ]
    }

    /// Vertical center of the seek track in panel-local world units.
    pub fn track_center_y(&self) -> f32 {
        self.track_center_up_px * self.scale()
    }
}

/// Desktop preview window settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Vertical field of view of each eye, in degrees.
    pub fov_y_degrees: f32,
    /// Height of the simulated head above the floor.
    pub eye_height: f32,
    /// Distance between the simulated eyes.
    pub eye_separation: f32,
    /// TrueType font used for the panel title. No title is drawn without one.
    pub font_path: Option<PathBuf>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            title: "VR180 Preview".to_string(),
            width: 1600,
            height: 800,
            fov_y_degrees: 90.0,
            eye_height: 0.5,
            eye_separation: 0.064,
            font_path: None,
        }
    }
}

impl PreviewConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn font(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            PlayerConfig::from_json_str(r#"{ "skip_seconds": 10.0, "dome": { "radius": 50.0 } }"#)
                .unwrap();
        assert_eq!(config.skip_seconds, 10.0);
        assert_eq!(config.dome.radius, 50.0);
        assert_eq!(config.dome.segments, 64);
        assert_eq!(config.fade_duration_ms, 200.0);
        assert_eq!(config.required_features, vec!["local-floor".to_string()]);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = PlayerConfig::from_json_str("{ skip_seconds: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = PlayerConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        match err {
            ConfigError::Io { path, .. } => assert!(path.ends_with("here.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn panel_texture_height_follows_aspect() {
        let config = PlayerConfig::default();
        assert_eq!(config.panel_texture_height(), 300);
    }

    #[test]
    fn layout_maps_design_pixels_to_world() {
        let layout = PanelLayout::default();
        let s = layout.scale();
        assert!((s - 1.5 / 450.0).abs() < 1e-7);
        let [x, y] = layout.to_world(225.0, 66.0);
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
        let [x, y] = layout.to_world(42.0, 90.0);
        assert!((x - (42.0 - 225.0) * s).abs() < 1e-6);
        assert!((y - (66.0 - 90.0) * s).abs() < 1e-6);
        assert!((layout.track_center_y() - 12.0 * s).abs() < 1e-6);
    }
}
