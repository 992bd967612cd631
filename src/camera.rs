//! The simulated head for the desktop preview.
//!
//! A [`Camera`] is a position plus yaw/pitch, looking down −Z at rest. Besides
//! the usual view and projection matrices it produces a pair of off-axis eye
//! views the way a headset reports them: each eye is offset sideways and its
//! frustum is skewed toward the nose, so the left eye's projection has a
//! negative horizontal skew and the right eye's a positive one.

use crate::stereo::EyeView;
use glam::{EulerRot, Mat4, Quat, Vec3};

/// Fraction of the half-width by which each eye's frustum is shifted.
const EYE_FRUSTUM_SHIFT: f32 = 0.1;
const MAX_PITCH: f32 = 1.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Rotation about +Y in radians. Positive turns left.
    pub yaw: f32,
    /// Rotation about the camera's X axis in radians. Positive looks up.
    pub pitch: f32,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            fov_y: std::f32::consts::FRAC_PI_2,
            near: 0.05,
            far: 1000.0,
        }
    }
}

/// Which eye of a stereo pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov_y = fov_degrees.to_radians();
        self
    }

    /// Turn the head. Pitch is clamped short of straight up or down.
    pub fn turn(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw += d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.orientation() * Vec3::X
    }

    /// World-to-view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation(), self.position).inverse()
    }

    /// Symmetric perspective projection.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    /// View for the flat (non-immersive) window.
    pub fn flat_view(&self, aspect: f32) -> EyeView {
        EyeView::from_matrices(self.view_matrix(), self.projection_matrix(aspect))
    }

    /// One eye of a stereo pair separated by `separation` world units.
    pub fn eye(&self, eye: Eye, aspect: f32, separation: f32) -> (Mat4, Mat4) {
        let side = match eye {
            Eye::Left => -1.0,
            Eye::Right => 1.0,
        };
        let eye_position = self.position + self.right() * (side * separation * 0.5);
        let view = Mat4::from_rotation_translation(self.orientation(), eye_position).inverse();

        let top = self.near * (self.fov_y * 0.5).tan();
        let half_width = top * aspect;
        let shift = side * half_width * EYE_FRUSTUM_SHIFT;
        let projection = frustum_rh(
            -half_width + shift,
            half_width + shift,
            -top,
            top,
            self.near,
            self.far,
        );
        (view, projection)
    }

    /// Both eyes, enumerated left then right.
    pub fn stereo_views(&self, aspect: f32, separation: f32) -> [EyeView; 2] {
        let (lv, lp) = self.eye(Eye::Left, aspect, separation);
        let (rv, rp) = self.eye(Eye::Right, aspect, separation);
        [
            EyeView::enumerated(0, 2, lv, lp),
            EyeView::enumerated(1, 2, rv, rp),
        ]
    }
}

/// Right-handed off-axis projection with a `[0, 1]` depth range.
fn frustum_rh(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let depth = far / (near - far);
    Mat4::from_cols(
        glam::Vec4::new(2.0 * near / (right - left), 0.0, 0.0, 0.0),
        glam::Vec4::new(0.0, 2.0 * near / (top - bottom), 0.0, 0.0),
        glam::Vec4::new(
            (right + left) / (right - left),
            (top + bottom) / (top - bottom),
            depth,
            -1.0,
        ),
        glam::Vec4::new(0.0, 0.0, depth * near, 0.0),
    )
}
