//! Scripted platform, session and render backend for driving a [`Player`]
//! without a headset or a GPU.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use image::RgbaImage;
use vr180::{
    Camera, ControllerPose, EventSender, MediaElement, Player, PlayerConfig, PlayerEvent, Quat,
    RenderBackend, RenderError, RenderView, RequestTicket, SessionId, StereoTextureId,
    SyntheticMedia, TextureTransform, Vec3, XrError, XrFrame, XrPlatform, XrSession,
};

pub type TestPlayer = Player<SyntheticMedia, FakePlatform, FakeBackend>;

/// Frame size of the test media.
pub const FRAME_SIZE: (u32, u32) = (64, 32);
pub const DURATION: f64 = 120.0;

/// How the fake platform answers session requests.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Grant,
    Reject(XrError),
    /// Hold the request; the test posts the answer itself.
    Hold,
}

/// Everything the granted sessions did, shared between them and the test.
#[derive(Debug, Default)]
pub struct SessionLog {
    pub end_calls: usize,
    pub ended: Vec<SessionId>,
    pub notifiers: HashMap<SessionId, EventSender>,
    pub fail_end: bool,
}

#[derive(Debug)]
pub struct FakePlatform {
    pub supported: Result<bool, XrError>,
    pub answer: Answer,
    pub requests: Vec<(RequestTicket, Vec<String>)>,
    pub log: Rc<RefCell<SessionLog>>,
    events: Option<EventSender>,
    next_id: u64,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            supported: Ok(true),
            answer: Answer::Grant,
            requests: Vec::new(),
            log: Rc::default(),
            events: None,
            next_id: 0,
        }
    }
}

impl FakePlatform {
    pub fn unsupported() -> Self {
        Self {
            supported: Ok(false),
            ..Self::default()
        }
    }

    pub fn answering(answer: Answer) -> Self {
        Self {
            answer,
            ..Self::default()
        }
    }

    pub fn connect(&mut self, events: EventSender) {
        self.events = Some(events);
    }

    /// A fresh session, as the platform would hand out on a grant.
    pub fn new_session(&mut self) -> Box<dyn XrSession> {
        self.next_id += 1;
        Box::new(FakeSession {
            id: SessionId(self.next_id),
            log: Rc::clone(&self.log),
        })
    }

    /// The platform ends `id` on its own, e.g. the headset was removed.
    pub fn end_externally(&mut self, id: SessionId) {
        let notifier = {
            let mut log = self.log.borrow_mut();
            log.ended.push(id);
            log.notifiers.remove(&id)
        };
        if let Some(notifier) = notifier {
            notifier.send(PlayerEvent::SessionEnded(id));
        }
    }

    pub fn end_calls(&self) -> usize {
        self.log.borrow().end_calls
    }

    pub fn ended(&self) -> Vec<SessionId> {
        self.log.borrow().ended.clone()
    }

    pub fn has_notifier(&self, id: SessionId) -> bool {
        self.log.borrow().notifiers.contains_key(&id)
    }
}

impl XrPlatform for FakePlatform {
    fn is_session_supported(&mut self) -> Result<bool, XrError> {
        self.supported.clone()
    }

    fn request_session(
        &mut self,
        ticket: RequestTicket,
        required_features: &[String],
    ) -> Result<(), XrError> {
        self.requests.push((ticket, required_features.to_vec()));
        let events = self
            .events
            .clone()
            .ok_or_else(|| XrError::Platform("not connected".into()))?;
        match self.answer.clone() {
            Answer::Grant => {
                let session = self.new_session();
                events.send(PlayerEvent::SessionGranted { ticket, session });
            }
            Answer::Reject(error) => events.send(PlayerEvent::SessionRejected { ticket, error }),
            Answer::Hold => {}
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakeSession {
    id: SessionId,
    log: Rc<RefCell<SessionLog>>,
}

impl XrSession for FakeSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn set_end_notifier(&mut self, notifier: Option<EventSender>) {
        let mut log = self.log.borrow_mut();
        match notifier {
            Some(notifier) => {
                log.notifiers.insert(self.id, notifier);
            }
            None => {
                log.notifiers.remove(&self.id);
            }
        }
    }

    fn end(&mut self) -> Result<(), XrError> {
        let notifier = {
            let mut log = self.log.borrow_mut();
            log.end_calls += 1;
            if log.fail_end {
                return Err(XrError::Platform("end refused".into()));
            }
            if log.ended.contains(&self.id) {
                return Err(XrError::AlreadyEnded);
            }
            log.ended.push(self.id);
            log.notifiers.get(&self.id).cloned()
        };
        if let Some(notifier) = notifier {
            notifier.send(PlayerEvent::SessionEnded(self.id));
        }
        Ok(())
    }
}

/// One `render` call as the backend saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRecord {
    pub presenting: bool,
    pub video_transforms: Vec<TextureTransform>,
    pub draw_items: usize,
    pub video_bound: Option<StereoTextureId>,
}

#[derive(Debug, Default)]
pub struct FakeBackend {
    next_id: u64,
    pub live: HashSet<StereoTextureId>,
    pub created: Vec<(u32, u32)>,
    pub disposed: Vec<StereoTextureId>,
    pub renders: Vec<RenderRecord>,
    pub flat_resizes: Vec<(u32, u32)>,
    pub flat_restores: usize,
    pub fail_allocation: bool,
    pub fail_render: bool,
    pub pending_error: Option<String>,
}

impl RenderBackend for FakeBackend {
    fn create_stereo_texture(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<StereoTextureId, RenderError> {
        if self.fail_allocation {
            return Err(RenderError::TextureAllocation("out of memory".into()));
        }
        self.next_id += 1;
        let id = StereoTextureId(self.next_id);
        self.live.insert(id);
        self.created.push((width, height));
        Ok(id)
    }

    fn dispose_stereo_texture(&mut self, id: StereoTextureId) {
        if self.live.remove(&id) {
            self.disposed.push(id);
        }
    }

    fn render(&mut self, view: &RenderView<'_>) -> Result<(), RenderError> {
        if self.fail_render {
            return Err(RenderError::Backend("device lost".into()));
        }
        self.renders.push(RenderRecord {
            presenting: view.presenting,
            video_transforms: view.views.iter().map(|v| view.video_transform(v)).collect(),
            draw_items: view.scene.draw_list().len(),
            video_bound: view.scene.video_binding(),
        });
        Ok(())
    }

    fn take_error(&mut self) -> Option<String> {
        self.pending_error.take()
    }

    fn resize_flat_view(&mut self, width: u32, height: u32) {
        self.flat_resizes.push((width, height));
    }

    fn restore_flat_view(&mut self) {
        self.flat_restores += 1;
    }
}

pub fn test_media() -> SyntheticMedia {
    SyntheticMedia::new(Some(RgbaImage::new(FRAME_SIZE.0, FRAME_SIZE.1)), DURATION)
}

/// A player whose platform and media are connected but not yet loaded.
pub fn player_with(platform: FakePlatform, media: SyntheticMedia) -> TestPlayer {
    let background = RgbaImage::new(64, 19);
    let mut player = Player::new(
        PlayerConfig::default(),
        media,
        platform,
        FakeBackend::default(),
        background,
    );
    let events = player.events();
    player.platform_mut().connect(events.clone());
    player.media_mut().attach(events);
    player
}

/// A connected player with its media loaded and the enter control enabled.
pub fn ready_player(platform: FakePlatform) -> TestPlayer {
    let mut player = player_with(platform, test_media());
    player.media_mut().load();
    player.pump(0.0);
    assert!(player.chrome().enter.enabled, "media should be ready");
    player
}

/// Click the enter control and handle the answer.
pub fn enter(player: &mut TestPlayer, now_ms: f64) {
    player.events().send(PlayerEvent::ToggleSession);
    player.pump(now_ms);
}

/// Id of the live session.
pub fn session_id(player: &TestPlayer) -> SessionId {
    player.lifecycle().session_id().expect("a live session")
}

/// A two-eye frame from a head at the origin.
pub fn stereo_frame(now_ms: f64) -> XrFrame {
    let views = Camera::default().stereo_views(1.0, 0.064);
    XrFrame::new(now_ms, views.to_vec())
}

/// Controller one meter in front of `entity`, aimed straight at its center.
pub fn aim_at_entity(player: &TestPlayer, entity: hecs::Entity) -> ControllerPose {
    let target = player.scene().world_matrix(entity).transform_point3(Vec3::ZERO);
    ControllerPose::new(target + Vec3::Z, Quat::IDENTITY)
}

/// Controller one meter in front of a panel-local point.
pub fn aim_at_panel(player: &TestPlayer, local: Vec3) -> ControllerPose {
    let panel = player.scene().handles().panel;
    let target = player.scene().world_matrix(panel).transform_point3(local);
    ControllerPose::new(target + Vec3::Z, Quat::IDENTITY)
}

/// Controller pointing away from everything.
pub fn aim_away() -> ControllerPose {
    ControllerPose::new(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::PI))
}

pub fn trigger(player: &mut TestPlayer, pose: ControllerPose, now_ms: f64) {
    player.events().send(PlayerEvent::Trigger(pose));
    player.pump(now_ms);
}

/// Whether the media is running.
pub fn playing(player: &TestPlayer) -> bool {
    !player.media().paused()
}
