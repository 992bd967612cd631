//! Turning controller triggers into commands.
//!
//! Every node that can be pointed at carries an [`Interactable`] tag. When the
//! trigger is pressed, [`HitTestRouter::route`] casts the controller ray into
//! the scene, takes the single nearest hit, and maps its tag to a [`Command`].
//! Anything that is not a control (nothing hit, the panel background, the
//! video itself) toggles the panel.

use crate::config::PlayerConfig;
use crate::picking::Ray;
use crate::scene::Scene;
use glam::{Quat, Vec3};

/// Closed set of things the controller can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interactable {
    PlayPause,
    Rewind,
    Forward,
    Exit,
    Volume,
    SeekHit,
    PanelBackground,
    VideoSurface,
}

/// Controller position and orientation in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl ControllerPose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Pose at `position` whose forward axis points along `direction`.
    pub fn looking_along(position: Vec3, direction: Vec3) -> Self {
        let direction = direction.normalize_or_zero();
        let orientation = if direction == Vec3::ZERO {
            Quat::IDENTITY
        } else {
            Quat::from_rotation_arc(Vec3::NEG_Z, direction)
        };
        Self::new(position, orientation)
    }

    /// Ray along the controller's local −Z axis.
    pub fn ray(&self) -> Ray {
        Ray::new(self.position, self.orientation * Vec3::NEG_Z)
    }
}

/// What a trigger press asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    PlayPause,
    Rewind,
    Forward,
    VolumeToggle,
    /// Seek to a fraction of the duration, already clamped to `[0, 1]`.
    Seek { fraction: f64 },
    Exit,
    TogglePanel,
}

impl Command {
    /// Whether this command operates playback or the session, as opposed to
    /// just toggling the panel.
    pub fn is_control(&self) -> bool {
        !matches!(self, Command::TogglePanel)
    }
}

/// Resolves controller rays to commands.
#[derive(Debug, Clone, Copy)]
pub struct HitTestRouter {
    near: f32,
    far: f32,
}

impl HitTestRouter {
    pub fn new(near: f32, far: f32) -> Self {
        Self { near, far }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(config.ray_near, config.ray_far)
    }

    /// Command for a trigger press at `pose`.
    ///
    /// Seeking needs a finite duration; without one the seek area behaves
    /// like the panel background.
    pub fn route(&self, scene: &Scene, pose: &ControllerPose, duration_finite: bool) -> Command {
        let ray = pose.ray();
        let Some((kind, hit)) = scene.pick(&ray, self.near, self.far) else {
            return Command::TogglePanel;
        };
        log::debug!("trigger hit {kind:?} at {:.3}", hit.distance);

        match kind {
            Interactable::PlayPause => Command::PlayPause,
            Interactable::Rewind => Command::Rewind,
            Interactable::Forward => Command::Forward,
            Interactable::Exit => Command::Exit,
            Interactable::Volume => Command::VolumeToggle,
            Interactable::SeekHit if duration_finite => Command::Seek {
                fraction: scene.seek_fraction_at(hit.point),
            },
            Interactable::SeekHit | Interactable::PanelBackground | Interactable::VideoSurface => {
                Command::TogglePanel
            }
        }
    }
}
