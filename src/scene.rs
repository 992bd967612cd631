//! The player's scene graph.
//!
//! [`Scene`] owns a `hecs::World` holding the video dome, the control panel
//! and the controller's pointer beam. Nodes are plain entities; hierarchy is a
//! [`Parent`] component, and a node is drawn and hit-tested only when it and
//! all of its ancestors are [`Visible`].
//!
//! ```text
//! dome                       (Surface: video, Interactable::VideoSurface)
//! panel root                 (Visible follows the panel fade)
//! ├── background             (Surface: raster, Interactable::PanelBackground)
//! ├── seek track             (Surface: flat gray)
//! ├── seek progress          (Surface: flat white, left-anchored fill)
//! ├── seek hit area          (Interactable::SeekHit, not drawn)
//! └── exit, rewind, play/pause, forward, volume buttons
//! pointer                    (Surface: beam, follows the controller)
//! ```
//!
//! The scene has no GPU state. The renderer consumes [`Scene::draw_list`] and
//! uploads rasters by [`RasterSlot`].

use crate::config::{PanelLayout, PlayerConfig};
use crate::interaction::{ControllerPose, Interactable};
use crate::mesh::Transform;
use crate::picking::{self, Collider, Ray, RayHit};
use crate::render::StereoTextureId;
use crate::transport::SeekBarVisual;
use glam::{Mat4, Vec2, Vec3};
use hecs::{Entity, World};

/// Ancestor chains longer than this are treated as cycles.
const MAX_DEPTH: usize = 16;

/// RGBA color with components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Opaque color from `0xRRGGBB`.
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::rgb(channel(16), channel(8), channel(0))
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
}

/// Parent node; the child's [`Transform`] is relative to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub Entity);

/// Whether a node (and its subtree) is drawn and hit-tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visible(pub bool);

/// Marks surfaces whose opacity follows the panel fade.
#[derive(Debug, Clone, Copy)]
pub struct PanelMember;

/// Off-screen rasters that panel surfaces display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterSlot {
    PanelBackground,
    PlayPause,
    Rewind,
    Forward,
    Exit,
    Volume,
}

impl RasterSlot {
    pub const ALL: [RasterSlot; 6] = [
        RasterSlot::PanelBackground,
        RasterSlot::PlayPause,
        RasterSlot::Rewind,
        RasterSlot::Forward,
        RasterSlot::Exit,
        RasterSlot::Volume,
    ];
}

/// What a surface samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceTexture {
    /// The per-session stereo video texture.
    Video(StereoTextureId),
    Raster(RasterSlot),
}

/// Geometry of a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Dome,
    Quad { width: f32, height: f32 },
    /// Unit-length pointer beam; length comes from the transform's Z scale.
    Beam,
}

/// A drawable node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub shape: Shape,
    pub color: Color,
    pub texture: Option<SurfaceTexture>,
    pub opacity: f32,
    /// Lower orders draw first.
    pub render_order: i32,
}

/// One surface to draw this frame, with its resolved world matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub entity: Entity,
    pub shape: Shape,
    pub model: Mat4,
    pub color: Color,
    pub texture: Option<SurfaceTexture>,
    pub opacity: f32,
    pub render_order: i32,
}

impl DrawItem {
    pub fn is_video(&self) -> bool {
        matches!(self.texture, Some(SurfaceTexture::Video(_)))
    }
}

/// Entities the player addresses directly.
#[derive(Debug, Clone, Copy)]
pub struct SceneHandles {
    pub dome: Entity,
    pub panel: Entity,
    pub background: Entity,
    pub seek_track: Entity,
    pub seek_progress: Entity,
    pub seek_hit: Entity,
    pub play_pause: Entity,
    pub rewind: Entity,
    pub forward: Entity,
    pub exit: Entity,
    pub volume: Entity,
    pub pointer: Entity,
}

/// The dome, the control panel and the pointer.
pub struct Scene {
    world: World,
    handles: SceneHandles,
    layout: PanelLayout,
}

impl Scene {
    /// Build the scene. Everything starts hidden and the dome has no texture.
    pub fn new(config: &PlayerConfig) -> Self {
        let mut world = World::new();
        let layout = config.panel.clone();
        let s = layout.scale();

        let dome = world.spawn((
            Transform::new(),
            Visible(false),
            Surface {
                shape: Shape::Dome,
                color: Color::WHITE,
                texture: None,
                opacity: 1.0,
                render_order: -1,
            },
            Interactable::VideoSurface,
            Collider::sphere(config.dome.radius),
        ));

        let panel = world.spawn((
            Transform::from_position(Vec3::from(layout.position)),
            Visible(false),
        ));

        let panel_size = Vec2::new(layout.world_width, layout.world_height());
        let background = world.spawn((
            Transform::new(),
            Parent(panel),
            Visible(true),
            panel_surface(
                panel_size,
                Color::WHITE,
                Some(SurfaceTexture::Raster(RasterSlot::PanelBackground)),
                0,
            ),
            PanelMember,
            Interactable::PanelBackground,
            Collider::quad(panel_size),
        ));

        let track_w = layout.track_world_width();
        let track_h = layout.track_world_height();
        let track_y = layout.track_center_y();

        let seek_track = world.spawn((
            Transform::from_position(Vec3::new(0.0, track_y, 0.01)),
            Parent(panel),
            Visible(true),
            panel_surface(Vec2::new(track_w, track_h), Color::from_hex(0x767676), None, 1),
            PanelMember,
        ));

        let progress_h = (layout.track_height_px - 1.0).max(1.0) * s;
        let seek_progress = world.spawn((
            Transform::from_position(Vec3::new(-track_w / 2.0, track_y + s, 0.015))
                .scale(Vec3::new(SeekBarVisual::MIN_SCALE, 1.0, 1.0)),
            Parent(panel),
            Visible(true),
            panel_surface(Vec2::new(track_w, progress_h), Color::WHITE, None, 2),
            PanelMember,
        ));

        let seek_hit = world.spawn((
            Transform::from_position(Vec3::new(0.0, track_y, 0.012)),
            Parent(panel),
            Visible(true),
            Interactable::SeekHit,
            Collider::quad(Vec2::new(track_w, track_h * layout.hit_height_factor)),
        ));

        let button_size = Vec2::splat(layout.button_size_px * s);
        let button = |world: &mut World, x_px: f32, slot: RasterSlot, kind: Interactable| {
            let [x, y] = layout.to_world(x_px, layout.button_row_px);
            world.spawn((
                Transform::from_position(Vec3::new(x, y, 0.02)),
                Parent(panel),
                Visible(true),
                panel_surface(
                    button_size,
                    Color::WHITE,
                    Some(SurfaceTexture::Raster(slot)),
                    3,
                ),
                PanelMember,
                kind,
                Collider::quad(button_size),
            ))
        };
        let exit = button(&mut world, layout.exit_x_px, RasterSlot::Exit, Interactable::Exit);
        let rewind = button(
            &mut world,
            layout.rewind_x_px,
            RasterSlot::Rewind,
            Interactable::Rewind,
        );
        let play_pause = button(
            &mut world,
            layout.play_x_px,
            RasterSlot::PlayPause,
            Interactable::PlayPause,
        );
        let forward = button(
            &mut world,
            layout.forward_x_px,
            RasterSlot::Forward,
            Interactable::Forward,
        );
        let volume = button(
            &mut world,
            layout.volume_x_px,
            RasterSlot::Volume,
            Interactable::Volume,
        );

        let pointer = world.spawn((
            Transform::new().scale(Vec3::new(1.0, 1.0, config.ray_far)),
            Visible(false),
            Surface {
                shape: Shape::Beam,
                color: Color::WHITE,
                texture: None,
                opacity: 0.5,
                render_order: 4,
            },
        ));

        Self {
            world,
            handles: SceneHandles {
                dome,
                panel,
                background,
                seek_track,
                seek_progress,
                seek_hit,
                play_pause,
                rewind,
                forward,
                exit,
                volume,
                pointer,
            },
            layout,
        }
    }

    pub fn handles(&self) -> &SceneHandles {
        &self.handles
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn layout(&self) -> &PanelLayout {
        &self.layout
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform> {
        self.world.get::<&Transform>(entity).ok().map(|t| *t)
    }

    /// Local-to-world matrix, following the parent chain.
    pub fn world_matrix(&self, entity: Entity) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(entity);
        for _ in 0..MAX_DEPTH {
            let Some(node) = current else { break };
            if let Ok(transform) = self.world.get::<&Transform>(node) {
                matrix = transform.matrix() * matrix;
            }
            current = self.world.get::<&Parent>(node).ok().map(|p| p.0);
        }
        matrix
    }

    /// Whether the node and all of its ancestors are visible.
    pub fn is_visible(&self, entity: Entity) -> bool {
        let mut current = Some(entity);
        for _ in 0..MAX_DEPTH {
            let Some(node) = current else { return true };
            if let Ok(visible) = self.world.get::<&Visible>(node) {
                if !visible.0 {
                    return false;
                }
            }
            current = self.world.get::<&Parent>(node).ok().map(|p| p.0);
        }
        false
    }

    pub fn set_visible(&mut self, entity: Entity, visible: bool) {
        if let Ok(mut flag) = self.world.get::<&mut Visible>(entity) {
            flag.0 = visible;
        }
    }

    fn own_visible(&self, entity: Entity) -> bool {
        self.world
            .get::<&Visible>(entity)
            .map(|v| v.0)
            .unwrap_or(true)
    }

    pub fn set_panel_visible(&mut self, visible: bool) {
        self.set_visible(self.handles.panel, visible);
    }

    pub fn panel_visible(&self) -> bool {
        self.own_visible(self.handles.panel)
    }

    /// Apply `opacity` to every panel surface.
    pub fn set_panel_opacity(&mut self, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        for (_, (surface, _)) in self.world.query_mut::<(&mut Surface, &PanelMember)>() {
            surface.opacity = opacity;
        }
    }

    /// Opacity currently painted on the panel.
    pub fn panel_opacity(&self) -> f32 {
        self.surface(self.handles.background)
            .map(|s| s.opacity)
            .unwrap_or(0.0)
    }

    pub fn set_dome_visible(&mut self, visible: bool) {
        self.set_visible(self.handles.dome, visible);
    }

    pub fn dome_visible(&self) -> bool {
        self.own_visible(self.handles.dome)
    }

    pub fn surface(&self, entity: Entity) -> Option<Surface> {
        self.world.get::<&Surface>(entity).ok().map(|s| *s)
    }

    /// Point the dome's material at a stereo texture.
    pub fn bind_video(&mut self, texture: StereoTextureId) {
        if let Ok(mut surface) = self.world.get::<&mut Surface>(self.handles.dome) {
            surface.texture = Some(SurfaceTexture::Video(texture));
        }
    }

    /// Detach the dome's stereo texture, returning what was bound.
    pub fn unbind_video(&mut self) -> Option<StereoTextureId> {
        let mut surface = self.world.get::<&mut Surface>(self.handles.dome).ok()?;
        match surface.texture.take() {
            Some(SurfaceTexture::Video(id)) => Some(id),
            other => {
                surface.texture = other;
                None
            }
        }
    }

    pub fn video_binding(&self) -> Option<StereoTextureId> {
        match self.surface(self.handles.dome)?.texture {
            Some(SurfaceTexture::Video(id)) => Some(id),
            _ => None,
        }
    }

    /// Stretch the progress bar to `visual`.
    pub fn set_seek_progress(&mut self, visual: &SeekBarVisual) {
        let track_w = self.layout.track_world_width();
        if let Ok(mut transform) = self.world.get::<&mut Transform>(self.handles.seek_progress) {
            transform.scale.x = visual.scale_x;
            transform.position.x = visual.center_x(track_w);
        }
    }

    /// Progress bar `(scale.x, position.x)` in panel-local units.
    pub fn seek_progress(&self) -> (f32, f32) {
        self.transform(self.handles.seek_progress)
            .map(|t| (t.scale.x, t.position.x))
            .unwrap_or((0.0, 0.0))
    }

    /// Fraction of the track under `world_point`, clamped to `[0, 1]`.
    pub fn seek_fraction_at(&self, world_point: Vec3) -> f64 {
        let inverse = self.world_matrix(self.handles.seek_track).inverse();
        let local = inverse.transform_point3(world_point);
        let width = self.layout.track_world_width();
        let fraction = (local.x + width / 2.0) / width;
        f64::from(fraction).clamp(0.0, 1.0)
    }

    /// Move the pointer beam to `pose`, or hide it.
    pub fn set_pointer(&mut self, pose: Option<&ControllerPose>) {
        let pointer = self.handles.pointer;
        match pose {
            Some(pose) => {
                if let Ok(mut transform) = self.world.get::<&mut Transform>(pointer) {
                    transform.position = pose.position;
                    transform.rotation = pose.orientation;
                }
                self.set_visible(pointer, true);
            }
            None => self.set_visible(pointer, false),
        }
    }

    /// Nearest visible interactable along `ray` within `[near, far]`.
    pub fn pick(&self, ray: &Ray, near: f32, far: f32) -> Option<(Interactable, RayHit)> {
        let candidates: Vec<_> = self
            .world
            .query::<(&Interactable, &Collider)>()
            .iter()
            .filter(|(entity, _)| self.is_visible(*entity))
            .map(|(entity, (_, collider))| (entity, self.world_matrix(entity), *collider))
            .collect();

        let hit = picking::raycast(candidates, ray, near, far)?;
        let kind = *self.world.get::<&Interactable>(hit.entity).ok()?;
        Some((kind, hit))
    }

    /// Visible surfaces with nonzero opacity, in draw order.
    pub fn draw_list(&self) -> Vec<DrawItem> {
        let mut items: Vec<DrawItem> = self
            .world
            .query::<&Surface>()
            .iter()
            .filter(|(entity, surface)| surface.opacity > 0.0 && self.is_visible(*entity))
            .map(|(entity, surface)| DrawItem {
                entity,
                shape: surface.shape,
                model: self.world_matrix(entity),
                color: surface.color,
                texture: surface.texture,
                opacity: surface.opacity,
                render_order: surface.render_order,
            })
            .collect();
        items.sort_by_key(|item| item.render_order);
        items
    }
}

fn panel_surface(
    size: Vec2,
    color: Color,
    texture: Option<SurfaceTexture>,
    render_order: i32,
) -> Surface {
    Surface {
        shape: Shape::Quad {
            width: size.x,
            height: size.y,
        },
        color,
        texture,
        opacity: 0.0,
        render_order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{Command, HitTestRouter};
    use glam::Quat;

    fn scene() -> Scene {
        Scene::new(&PlayerConfig::default())
    }

    fn shown(mut scene: Scene) -> Scene {
        scene.set_panel_visible(true);
        scene.set_panel_opacity(1.0);
        scene
    }

    /// Pose one meter in front of the panel aiming at a panel-local point.
    fn aim_at(scene: &Scene, local: Vec3) -> ControllerPose {
        let target = scene.world_matrix(scene.handles().panel).transform_point3(local);
        let origin = target + Vec3::new(0.0, 0.0, 1.0);
        ControllerPose::new(origin, Quat::IDENTITY)
    }

    fn aim_at_button(scene: &Scene, entity: Entity) -> ControllerPose {
        let target = scene.world_matrix(entity).transform_point3(Vec3::ZERO);
        ControllerPose::new(target + Vec3::new(0.0, 0.0, 1.0), Quat::IDENTITY)
    }

    #[test]
    fn everything_starts_hidden_and_unbound() {
        let scene = scene();
        assert!(!scene.dome_visible());
        assert!(!scene.panel_visible());
        assert_eq!(scene.video_binding(), None);
        assert!(scene.draw_list().is_empty());
    }

    #[test]
    fn child_matrices_include_the_panel_position() {
        let scene = scene();
        let h = *scene.handles();
        let p = scene.world_matrix(h.play_pause).transform_point3(Vec3::ZERO);
        let s = scene.layout().scale();
        assert!((p.x - 0.0).abs() < 1e-5);
        assert!((p.y - (0.5 - 24.0 * s)).abs() < 1e-5);
        assert!((p.z - (-1.8 + 0.02)).abs() < 1e-5);
    }

    #[test]
    fn hidden_panel_is_not_hit() {
        let scene = scene();
        let router = HitTestRouter::new(0.1, 5.0);
        let pose = aim_at_button(&scene, scene.handles().play_pause);
        assert_eq!(router.route(&scene, &pose, true), Command::TogglePanel);
    }

    #[test]
    fn buttons_route_to_their_commands() {
        let scene = shown(scene());
        let router = HitTestRouter::new(0.1, 5.0);
        let h = *scene.handles();
        let cases = [
            (h.play_pause, Command::PlayPause),
            (h.rewind, Command::Rewind),
            (h.forward, Command::Forward),
            (h.exit, Command::Exit),
            (h.volume, Command::VolumeToggle),
        ];
        for (entity, expected) in cases {
            let pose = aim_at_button(&scene, entity);
            assert_eq!(router.route(&scene, &pose, true), expected);
        }
    }

    #[test]
    fn background_and_empty_space_toggle_the_panel() {
        let scene = shown(scene());
        let router = HitTestRouter::new(0.1, 5.0);
        let s = scene.layout().scale();
        // Between the title and the seek track.
        let background = aim_at(&scene, Vec3::new(0.0, 40.0 * s, 0.0));
        assert_eq!(router.route(&scene, &background, true), Command::TogglePanel);

        let away = ControllerPose::new(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::PI));
        assert_eq!(router.route(&scene, &away, true), Command::TogglePanel);
    }

    #[test]
    fn seek_area_maps_to_clamped_fraction() {
        let scene = shown(scene());
        let router = HitTestRouter::new(0.1, 5.0);
        let track_y = scene.layout().track_center_y();
        let w = scene.layout().track_world_width();

        let quarter = aim_at(&scene, Vec3::new(-w / 4.0, track_y, 0.0));
        match router.route(&scene, &quarter, true) {
            Command::Seek { fraction } => assert!((fraction - 0.25).abs() < 1e-3),
            other => panic!("expected seek, got {other:?}"),
        }

        let track = scene.world_matrix(scene.handles().seek_track);
        let below_left = track.transform_point3(Vec3::new(-w, 0.0, 0.0));
        assert_eq!(scene.seek_fraction_at(below_left), 0.0);
        let past_right = track.transform_point3(Vec3::new(w, 0.0, 0.0));
        assert_eq!(scene.seek_fraction_at(past_right), 1.0);
    }

    #[test]
    fn seek_area_without_duration_toggles() {
        let scene = shown(scene());
        let router = HitTestRouter::new(0.1, 5.0);
        let track_y = scene.layout().track_center_y();
        let pose = aim_at(&scene, Vec3::new(0.0, track_y, 0.0));
        assert_eq!(router.route(&scene, &pose, false), Command::TogglePanel);
    }

    #[test]
    fn video_binding_round_trips() {
        let mut scene = scene();
        scene.bind_video(StereoTextureId(7));
        assert_eq!(scene.video_binding(), Some(StereoTextureId(7)));
        assert_eq!(scene.unbind_video(), Some(StereoTextureId(7)));
        assert_eq!(scene.unbind_video(), None);
    }

    #[test]
    fn draw_list_is_ordered_and_skips_invisible() {
        let mut scene = shown(scene());
        scene.bind_video(StereoTextureId(1));
        scene.set_dome_visible(true);
        let items = scene.draw_list();
        assert!(items[0].is_video());
        assert!(items.windows(2).all(|w| w[0].render_order <= w[1].render_order));
        // dome, background, track, progress, five buttons
        assert_eq!(items.len(), 9);

        scene.set_panel_visible(false);
        assert_eq!(scene.draw_list().len(), 1);
    }

    #[test]
    fn opacity_applies_to_all_panel_surfaces() {
        let mut scene = scene();
        scene.set_panel_opacity(0.4);
        let h = *scene.handles();
        for entity in [h.background, h.seek_track, h.seek_progress, h.volume] {
            assert_eq!(scene.surface(entity).unwrap().opacity, 0.4);
        }
        assert_eq!(scene.surface(h.dome).unwrap().opacity, 1.0);
    }

    #[test]
    fn hex_colors_decode() {
        let c = Color::from_hex(0x767676);
        assert!((c.r - 118.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.a, 1.0);
    }
}
