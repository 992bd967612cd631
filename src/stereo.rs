//! Per-eye sampling of side-by-side stereo frames.
//!
//! A side-by-side frame packs the left eye's image into the left half and the
//! right eye's into the right half. Before each eye is drawn, [`StereoMapper`]
//! picks the horizontal window of the frame that eye samples, expressed as a
//! UV [`TextureTransform`].
//!
//! Eye identity comes from one of two places, in priority order:
//!
//! 1. The position of the view in an enumerated list of at least two per-eye
//!    cameras (index 0 is the left eye, index 1 the right eye).
//! 2. The horizontal skew of the view's projection matrix. Asymmetric frusta
//!    for the left eye are skewed one way and for the right eye the other,
//!    which shows up in column 2, row 0 (element 8 in column-major order).
//!
//! A view that neither source identifies samples the full frame.

use glam::{Mat4, Vec2};

/// UV transform applied to the dome texture: `uv' = offset + uv * repeat`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureTransform {
    pub offset: Vec2,
    pub repeat: Vec2,
}

impl TextureTransform {
    /// Sample the whole frame.
    pub const FULL: Self = Self {
        offset: Vec2::ZERO,
        repeat: Vec2::ONE,
    };

    /// Sample the left half.
    pub const LEFT_HALF: Self = Self {
        offset: Vec2::ZERO,
        repeat: Vec2::new(0.5, 1.0),
    };

    /// Sample the right half.
    pub const RIGHT_HALF: Self = Self {
        offset: Vec2::new(0.5, 0.0),
        repeat: Vec2::new(0.5, 1.0),
    };

    /// Packed as `(offset.x, offset.y, repeat.x, repeat.y)` for a uniform.
    pub fn to_array(&self) -> [f32; 4] {
        [self.offset.x, self.offset.y, self.repeat.x, self.repeat.y]
    }
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self::FULL
    }
}

/// What the renderer knows about the view being drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeView {
    /// Position of this view among the per-eye cameras, if they are enumerated.
    pub camera_index: Option<usize>,
    /// Number of enumerated per-eye cameras.
    pub camera_count: usize,
    pub projection: Mat4,
    pub view: Mat4,
}

impl EyeView {
    /// A view known only by its matrices.
    pub fn from_matrices(view: Mat4, projection: Mat4) -> Self {
        Self {
            camera_index: None,
            camera_count: 0,
            projection,
            view,
        }
    }

    /// A view at position `index` of `count` enumerated cameras.
    pub fn enumerated(index: usize, count: usize, view: Mat4, projection: Mat4) -> Self {
        Self {
            camera_index: Some(index),
            camera_count: count,
            projection,
            view,
        }
    }

    /// Projection element 8 in column-major order.
    pub fn horizontal_skew(&self) -> f32 {
        self.projection.z_axis.x
    }
}

/// Chooses which half of a side-by-side frame each eye samples.
#[derive(Debug, Clone, Copy)]
pub struct StereoMapper {
    threshold: f32,
}

impl Default for StereoMapper {
    fn default() -> Self {
        Self::new(1e-4)
    }
}

impl StereoMapper {
    /// `threshold` is the skew magnitude below which a projection is
    /// considered symmetric.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.abs(),
        }
    }

    /// Texture transform for `eye`.
    ///
    /// Outside an immersive session the frame is always shown whole.
    pub fn transform_for(&self, eye: &EyeView, presenting: bool) -> TextureTransform {
        if !presenting {
            return TextureTransform::FULL;
        }

        if let Some(index) = eye.camera_index.filter(|_| eye.camera_count >= 2) {
            return match index {
                1 => TextureTransform::RIGHT_HALF,
                _ => TextureTransform::LEFT_HALF,
            };
        }

        let skew = eye.horizontal_skew();
        if skew < -self.threshold {
            TextureTransform::LEFT_HALF
        } else if skew > self.threshold {
            TextureTransform::RIGHT_HALF
        } else {
            TextureTransform::FULL
        }
    }
}
