//! Off-screen rasters for the panel.
//!
//! Button icons are drawn from a handful of vector primitives into square
//! `RgbaImage`s, white on transparent, with supersampled coverage for smooth
//! edges. Shapes are specified in a 44-unit design box and scaled to the
//! raster size. The volume glyphs use a 24-unit box drawn at the same scale,
//! so they come out smaller and centered.
//!
//! [`IconSet`] owns every raster the panel displays. Each raster carries a
//! revision that advances on every redraw; the renderer re-uploads a slot
//! when its revision changes.

use crate::config::PlayerConfig;
use crate::error::SetupError;
use crate::media::MediaElement;
use crate::scene::RasterSlot;
use glam::Vec2;
use image::{Rgba, RgbaImage};
use std::f32::consts::PI;
use std::path::Path;

const VIEWBOX: f32 = 44.0;
const VOLUME_VIEWBOX: f32 = 24.0;
const SUPERSAMPLE: u32 = 4;

/// A filled 2D shape in design units (y down).
#[derive(Debug, Clone, PartialEq)]
pub enum Shape2d {
    Polygon(Vec<Vec2>),
    RoundedRect { min: Vec2, max: Vec2, radius: f32 },
    Capsule { a: Vec2, b: Vec2, radius: f32 },
    /// Ring segment between `start` and `end` radians, clockwise on screen.
    Arc {
        center: Vec2,
        radius: f32,
        half_width: f32,
        start: f32,
        end: f32,
    },
}

impl Shape2d {
    pub fn rounded_rect(x: f32, y: f32, w: f32, h: f32, radius: f32) -> Self {
        Self::RoundedRect {
            min: Vec2::new(x, y),
            max: Vec2::new(x + w, y + h),
            radius,
        }
    }

    pub fn capsule(a: (f32, f32), b: (f32, f32), radius: f32) -> Self {
        Self::Capsule {
            a: Vec2::new(a.0, a.1),
            b: Vec2::new(b.0, b.1),
            radius,
        }
    }

    pub fn polygon(points: &[(f32, f32)]) -> Self {
        Self::Polygon(points.iter().map(|&(x, y)| Vec2::new(x, y)).collect())
    }

    pub fn contains(&self, p: Vec2) -> bool {
        match self {
            Shape2d::Polygon(points) => polygon_contains(points, p),
            Shape2d::RoundedRect { min, max, radius } => {
                let half = (*max - *min) * 0.5;
                let r = radius.min(half.x).min(half.y).max(0.0);
                let q = (p - (*min + half)).abs() - (half - Vec2::splat(r));
                let outside = q.max(Vec2::ZERO).length() + q.x.max(q.y).min(0.0);
                outside <= r
            }
            Shape2d::Capsule { a, b, radius } => {
                let ab = *b - *a;
                let t = if ab.length_squared() > 0.0 {
                    ((p - *a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                (p - (*a + ab * t)).length() <= *radius
            }
            Shape2d::Arc {
                center,
                radius,
                half_width,
                start,
                end,
            } => {
                let d = p - *center;
                if (d.length() - radius).abs() > *half_width {
                    return false;
                }
                let mut angle = d.y.atan2(d.x);
                while angle < *start {
                    angle += 2.0 * PI;
                }
                angle <= *end
            }
        }
    }
}

fn polygon_contains(points: &[Vec2], p: Vec2) -> bool {
    let mut inside = false;
    let mut j = points.len().wrapping_sub(1);
    for i in 0..points.len() {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Paint `shapes` in `color` onto `image`, each scaled by `scale` and shifted
/// by `offset` pixels. Coverage is combined with source-over blending.
pub fn fill_shapes(
    image: &mut RgbaImage,
    shapes: &[Shape2d],
    scale: f32,
    offset: Vec2,
    color: [u8; 4],
    supersample: u32,
) {
    let n = supersample.max(1);
    let step = 1.0 / n as f32;
    let samples = (n * n) as f32;
    let (width, height) = image.dimensions();

    for y in 0..height {
        for x in 0..width {
            let mut hits = 0u32;
            for sy in 0..n {
                for sx in 0..n {
                    let px = x as f32 + (sx as f32 + 0.5) * step;
                    let py = y as f32 + (sy as f32 + 0.5) * step;
                    let p = (Vec2::new(px, py) - offset) / scale;
                    if shapes.iter().any(|s| s.contains(p)) {
                        hits += 1;
                    }
                }
            }
            if hits > 0 {
                let coverage = hits as f32 / samples;
                blend(image.get_pixel_mut(x, y), color, coverage);
            }
        }
    }
}

/// Source-over blend of `color` at `coverage` onto `dst` (straight alpha).
fn blend(dst: &mut Rgba<u8>, color: [u8; 4], coverage: f32) {
    let src_a = color[3] as f32 / 255.0 * coverage;
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let s = color[c] as f32 / 255.0;
        let d = dst[c] as f32 / 255.0;
        let v = (s * src_a + d * dst_a * (1.0 - src_a)) / out_a;
        dst[c] = (v * 255.0).round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

const WHITE: [u8; 4] = [255, 255, 255, 255];

fn icon(size: u32, shapes: &[Shape2d]) -> RgbaImage {
    let mut image = RgbaImage::new(size, size);
    let scale = size as f32 / VIEWBOX;
    fill_shapes(&mut image, shapes, scale, Vec2::ZERO, WHITE, SUPERSAMPLE);
    image
}

fn volume_icon(size: u32, shapes: &[Shape2d]) -> RgbaImage {
    let mut image = RgbaImage::new(size, size);
    let scale = size as f32 / VIEWBOX;
    let offset = Vec2::splat((size as f32 - VOLUME_VIEWBOX * scale) / 2.0);
    fill_shapes(&mut image, shapes, scale, offset, WHITE, SUPERSAMPLE);
    image
}

pub fn play_shapes() -> Vec<Shape2d> {
    vec![Shape2d::polygon(&[(15.0, 9.5), (33.2, 22.0), (15.0, 34.5)])]
}

pub fn pause_shapes() -> Vec<Shape2d> {
    vec![
        Shape2d::rounded_rect(16.0, 9.0, 5.0, 26.0, 2.0),
        Shape2d::rounded_rect(23.0, 9.0, 5.0, 26.0, 2.0),
    ]
}

fn speaker() -> Shape2d {
    Shape2d::polygon(&[
        (3.0, 9.0),
        (7.0, 9.0),
        (12.0, 4.5),
        (12.0, 19.5),
        (7.0, 15.0),
        (3.0, 15.0),
    ])
}

pub fn sound_on_shapes() -> Vec<Shape2d> {
    let wave = |radius: f32| Shape2d::Arc {
        center: Vec2::new(12.5, 12.0),
        radius,
        half_width: 0.8,
        start: -0.9,
        end: 0.9,
    };
    vec![speaker(), wave(4.5), wave(8.0)]
}

pub fn muted_shapes() -> Vec<Shape2d> {
    vec![
        speaker(),
        Shape2d::capsule((15.5, 9.0), (21.5, 15.0), 0.8),
        Shape2d::capsule((15.5, 15.0), (21.5, 9.0), 0.8),
    ]
}

/// Seven-segment "15" inside the skip arrows.
fn fifteen() -> Vec<Shape2d> {
    let r = 0.6;
    vec![
        // 1
        Shape2d::capsule((19.6, 19.3), (19.6, 24.9), r),
        Shape2d::capsule((18.2, 20.4), (19.6, 19.3), r),
        // 5
        Shape2d::capsule((22.4, 19.3), (25.8, 19.3), r),
        Shape2d::capsule((22.4, 19.3), (22.4, 22.0), r),
        Shape2d::capsule((22.4, 22.0), (25.8, 22.0), r),
        Shape2d::capsule((25.8, 22.0), (25.8, 24.9), r),
        Shape2d::capsule((22.4, 24.9), (25.8, 24.9), r),
    ]
}

/// Counter-clockwise arrow around "15".
pub fn rewind_shapes() -> Vec<Shape2d> {
    let mut shapes = vec![
        Shape2d::Arc {
            center: Vec2::new(22.0, 22.0),
            radius: 7.0,
            half_width: 0.75,
            start: -2.1,
            end: PI,
        },
        Shape2d::polygon(&[(15.6, 15.2), (18.9, 17.9), (15.2, 19.0)]),
    ];
    shapes.extend(fifteen());
    shapes
}

/// Clockwise arrow around "15"; the mirror image of rewind.
pub fn forward_shapes() -> Vec<Shape2d> {
    let mut shapes = vec![
        Shape2d::Arc {
            center: Vec2::new(22.0, 22.0),
            radius: 7.0,
            half_width: 0.75,
            start: 0.0,
            end: PI + 1.04,
        },
        Shape2d::polygon(&[(28.4, 15.2), (25.1, 17.9), (28.8, 19.0)]),
    ];
    shapes.extend(fifteen());
    shapes
}

/// Arrow leaving a bracket.
pub fn exit_shapes() -> Vec<Shape2d> {
    let r = 0.75;
    vec![
        Shape2d::capsule((13.5, 22.0), (26.0, 22.0), r),
        Shape2d::capsule((13.5, 22.0), (18.0, 17.5), r),
        Shape2d::capsule((13.5, 22.0), (18.0, 26.5), r),
        Shape2d::capsule((23.0, 16.8), (28.5, 16.8), r),
        Shape2d::capsule((30.0, 18.3), (30.0, 25.7), r),
        Shape2d::capsule((23.0, 27.2), (28.5, 27.2), r),
        Shape2d::Arc {
            center: Vec2::new(28.5, 18.3),
            radius: 1.5,
            half_width: r,
            start: -PI / 2.0,
            end: 0.0,
        },
        Shape2d::Arc {
            center: Vec2::new(28.5, 25.7),
            radius: 1.5,
            half_width: r,
            start: 0.0,
            end: PI / 2.0,
        },
    ]
}

/// Title text drawn on the panel background.
#[derive(Clone, Copy)]
pub struct TitleSpec<'a> {
    pub font: &'a fontdue::Font,
    pub text: &'a str,
    /// Glyph size in raster pixels.
    pub size: f32,
    /// Distance from the raster's top edge to the top of the text line.
    pub top: f32,
}

/// Load a TrueType/OpenType font from disk.
pub fn load_font(path: &Path) -> Result<fontdue::Font, SetupError> {
    let bytes = std::fs::read(path).map_err(|e| SetupError::Font {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()).map_err(|reason| {
        SetupError::Font {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    })
}

/// Rounded translucent black panel with an optional centered title.
pub fn panel_background(
    width: u32,
    height: u32,
    corner_radius: f32,
    title: Option<TitleSpec<'_>>,
) -> RgbaImage {
    let mut image = RgbaImage::new(width, height);
    let rect = Shape2d::rounded_rect(0.0, 0.0, width as f32, height as f32, corner_radius);
    fill_shapes(&mut image, &[rect], 1.0, Vec2::ZERO, [0, 0, 0, 178], 2);
    if let Some(title) = title {
        draw_title(&mut image, &title);
    }
    image
}

/// Background raster sized and scaled for `config`'s panel layout.
pub fn panel_raster(config: &PlayerConfig, font: Option<&fontdue::Font>, title: &str) -> RgbaImage {
    let layout = &config.panel;
    let width = config.panel_texture_width.max(1);
    let height = config.panel_texture_height().max(1);
    let sx = width as f32 / layout.width_px;
    let sy = height as f32 / layout.height_px;
    let title = font.map(|font| TitleSpec {
        font,
        text: title,
        size: layout.title_size_px * sy,
        top: layout.title_top_px * sy,
    });
    panel_background(width, height, layout.corner_radius_px * sx, title)
}

fn draw_title(image: &mut RgbaImage, title: &TitleSpec<'_>) {
    let font = title.font;
    let ascent = font
        .horizontal_line_metrics(title.size)
        .map(|m| m.ascent)
        .unwrap_or(title.size);
    let baseline_y = title.top + ascent;

    let glyphs: Vec<_> = title
        .text
        .chars()
        .map(|c| font.rasterize(c, title.size))
        .collect();
    let text_width: f32 = glyphs.iter().map(|(m, _)| m.advance_width).sum();
    let mut cursor_x = (image.width() as f32 - text_width) / 2.0;

    for (metrics, bitmap) in &glyphs {
        let gx = (cursor_x + metrics.xmin as f32).round() as i64;
        // ymin is the distance from the baseline to the glyph's bottom edge
        let gy = (baseline_y - metrics.ymin as f32 - metrics.height as f32).round() as i64;
        for row in 0..metrics.height {
            for col in 0..metrics.width {
                let coverage = bitmap[row * metrics.width + col];
                let (x, y) = (gx + col as i64, gy + row as i64);
                if coverage == 0
                    || x < 0
                    || y < 0
                    || x >= image.width() as i64
                    || y >= image.height() as i64
                {
                    continue;
                }
                blend(
                    image.get_pixel_mut(x as u32, y as u32),
                    WHITE,
                    coverage as f32 / 255.0,
                );
            }
        }
        cursor_x += metrics.advance_width;
    }
}

/// A raster and its change counter.
#[derive(Debug, Clone)]
pub struct Raster {
    pub image: RgbaImage,
    pub revision: u64,
}

impl Raster {
    fn new(image: RgbaImage) -> Self {
        Self { image, revision: 1 }
    }

    fn redraw(&mut self, image: RgbaImage) {
        self.image = image;
        self.revision += 1;
    }
}

/// Every raster shown on the panel.
#[derive(Debug, Clone)]
pub struct IconSet {
    size: u32,
    background: Raster,
    play_pause: Raster,
    rewind: Raster,
    forward: Raster,
    exit: Raster,
    volume: Raster,
    showing_play: bool,
    showing_muted: bool,
}

impl IconSet {
    /// Draw all icons at `size` pixels. Starts showing "play" and "sound on".
    pub fn new(size: u32, background: RgbaImage) -> Self {
        Self {
            size,
            background: Raster::new(background),
            play_pause: Raster::new(icon(size, &play_shapes())),
            rewind: Raster::new(icon(size, &rewind_shapes())),
            forward: Raster::new(icon(size, &forward_shapes())),
            exit: Raster::new(icon(size, &exit_shapes())),
            volume: Raster::new(volume_icon(size, &sound_on_shapes())),
            showing_play: true,
            showing_muted: false,
        }
    }

    /// Redraw the play/pause button: the play glyph when paused or ended.
    pub fn refresh_play_pause(&mut self, paused_or_ended: bool) {
        let shapes = if paused_or_ended {
            play_shapes()
        } else {
            pause_shapes()
        };
        self.play_pause.redraw(icon(self.size, &shapes));
        self.showing_play = paused_or_ended;
    }

    /// Redraw the volume button: the muted glyph when muted or silent.
    pub fn refresh_volume(&mut self, silent: bool) {
        let shapes = if silent {
            muted_shapes()
        } else {
            sound_on_shapes()
        };
        self.volume.redraw(volume_icon(self.size, &shapes));
        self.showing_muted = silent;
    }

    /// Redraw both dynamic icons from `media`.
    pub fn refresh_from_media<M: MediaElement + ?Sized>(&mut self, media: &M) {
        self.refresh_play_pause(media.paused() || media.ended());
        self.refresh_volume(media.muted() || media.volume() == 0.0);
    }

    pub fn showing_play(&self) -> bool {
        self.showing_play
    }

    pub fn showing_muted(&self) -> bool {
        self.showing_muted
    }

    pub fn raster(&self, slot: RasterSlot) -> &Raster {
        match slot {
            RasterSlot::PanelBackground => &self.background,
            RasterSlot::PlayPause => &self.play_pause,
            RasterSlot::Rewind => &self.rewind,
            RasterSlot::Forward => &self.forward,
            RasterSlot::Exit => &self.exit,
            RasterSlot::Volume => &self.volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha_at(image: &RgbaImage, x: u32, y: u32) -> u8 {
        image.get_pixel(x, y)[3]
    }

    #[test]
    fn shapes_contain_their_centers() {
        assert!(Shape2d::rounded_rect(0.0, 0.0, 10.0, 4.0, 2.0).contains(Vec2::new(5.0, 2.0)));
        assert!(!Shape2d::rounded_rect(0.0, 0.0, 10.0, 4.0, 2.0).contains(Vec2::new(0.1, 0.1)));
        assert!(Shape2d::capsule((0.0, 0.0), (10.0, 0.0), 1.0).contains(Vec2::new(5.0, 0.9)));
        let triangle = Shape2d::polygon(&[(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)]);
        assert!(triangle.contains(Vec2::new(1.0, 1.0)));
        assert!(!triangle.contains(Vec2::new(3.0, 3.0)));
    }

    #[test]
    fn arc_respects_its_sweep() {
        let arc = Shape2d::Arc {
            center: Vec2::ZERO,
            radius: 5.0,
            half_width: 0.5,
            start: -0.5,
            end: 0.5,
        };
        assert!(arc.contains(Vec2::new(5.0, 0.0)));
        assert!(!arc.contains(Vec2::new(-5.0, 0.0)));
        assert!(!arc.contains(Vec2::new(3.0, 0.0)));
    }

    #[test]
    fn pause_glyph_has_a_gap_between_bars() {
        let image = icon(44, &pause_shapes());
        assert_eq!(alpha_at(&image, 18, 22), 255);
        assert_eq!(alpha_at(&image, 25, 22), 255);
        assert_eq!(alpha_at(&image, 22, 22), 0);
        assert_eq!(alpha_at(&image, 2, 2), 0);
    }

    #[test]
    fn play_pause_icon_follows_media_state() {
        let mut icons = IconSet::new(44, RgbaImage::new(4, 4));
        assert!(icons.showing_play());
        let before = icons.raster(RasterSlot::PlayPause).revision;

        icons.refresh_play_pause(false);
        assert!(!icons.showing_play());
        let pause = icons.raster(RasterSlot::PlayPause);
        assert!(pause.revision > before);
        assert_eq!(alpha_at(&pause.image, 22, 22), 0);

        icons.refresh_play_pause(true);
        assert!(icons.showing_play());
        assert_eq!(alpha_at(&icons.raster(RasterSlot::PlayPause).image, 22, 22), 255);
    }

    #[test]
    fn redraw_is_idempotent_but_bumps_revision() {
        let mut icons = IconSet::new(32, RgbaImage::new(4, 4));
        icons.refresh_volume(true);
        let first = icons.raster(RasterSlot::Volume).clone();
        icons.refresh_volume(true);
        let second = icons.raster(RasterSlot::Volume);
        assert_eq!(first.image, second.image);
        assert_eq!(second.revision, first.revision + 1);
    }

    #[test]
    fn muted_and_sound_on_differ() {
        let mut icons = IconSet::new(64, RgbaImage::new(4, 4));
        let on = icons.raster(RasterSlot::Volume).image.clone();
        icons.refresh_volume(true);
        assert_ne!(on, icons.raster(RasterSlot::Volume).image);
        assert!(icons.showing_muted());
    }

    #[test]
    fn background_is_translucent_with_rounded_corners() {
        let image = panel_background(200, 60, 12.0, None);
        assert_eq!(alpha_at(&image, 0, 0), 0);
        assert_eq!(image.get_pixel(100, 30).0, [0, 0, 0, 178]);
    }

    #[test]
    fn panel_raster_follows_the_layout_aspect() {
        let config = PlayerConfig::default();
        let image = panel_raster(&config, None, "ignored without a font");
        assert_eq!(image.dimensions(), (1024, 300));
        assert_eq!(alpha_at(&image, 512, 150), 178);
    }

    #[test]
    fn missing_font_is_a_setup_error() {
        let err = load_font(Path::new("/no/such/font.ttf")).unwrap_err();
        assert!(matches!(err, SetupError::Font { .. }));
    }
}
