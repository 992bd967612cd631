//! Immersive session lifecycle.
//!
//! All session state lives in [`SessionLifecycle`]: the current
//! [`SessionState`], the live session handle, and ownership of the stereo
//! texture bound to the dome. Every transition goes through this module.
//!
//! ```text
//! Idle ── request ──▶ Requesting ── grant ──▶ Active ── exit ──▶ Ending
//!   ▲                     │  reject / failed entry   │ context lost │
//!   │                     ▼                          ▼              ▼
//!   └──────────────────── Idle ◀──────────── cleanup ◀──────── ended
//! ```
//!
//! Platform calls that complete later (the session request, the session's
//! end) are answered by events on the player's channel. A grant carries the
//! [`RequestTicket`] it answers and an end notice carries the [`SessionId`]
//! that ended; anything that no longer matches is stale and is dropped.

use crate::error::{RenderError, SessionError, XrError};
use crate::events::EventSender;
use crate::frame_loop::FrameLoop;
use crate::icons::IconSet;
use crate::media::MediaElement;
use crate::panel::PanelVisibility;
use crate::render::{RenderBackend, StereoTextureId};
use crate::scene::Scene;
use crate::transport::SeekBarVisual;
use std::fmt;

/// Texture size used when the media has no frame yet.
const FALLBACK_TEXTURE_SIZE: (u32, u32) = (2, 1);

pub const ENTER_LABEL: &str = "Enter VR";
pub const EXIT_LABEL: &str = "Exit VR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Identifies one session request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket(pub u64);

/// Capability query and session requests.
pub trait XrPlatform {
    fn is_session_supported(&mut self) -> Result<bool, XrError>;

    /// Begin a request. The answer is posted later as
    /// `PlayerEvent::SessionGranted` or `PlayerEvent::SessionRejected`
    /// carrying `ticket`. An `Err` here means the request never started.
    fn request_session(
        &mut self,
        ticket: RequestTicket,
        required_features: &[String],
    ) -> Result<(), XrError>;
}

/// A granted immersive session.
pub trait XrSession: fmt::Debug {
    fn id(&self) -> SessionId;

    /// Install or remove the hook that posts `PlayerEvent::SessionEnded`.
    fn set_end_notifier(&mut self, notifier: Option<EventSender>);

    /// Ask the platform to end the session. Completion is signalled through
    /// the end notifier.
    fn end(&mut self) -> Result<(), XrError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting { ticket: RequestTicket },
    Active,
    Ending,
}

/// The player state a transition touches.
pub struct SessionContext<'a> {
    pub media: &'a mut dyn MediaElement,
    pub scene: &'a mut Scene,
    pub panel: &'a mut PanelVisibility,
    pub icons: &'a mut IconSet,
    pub backend: &'a mut dyn RenderBackend,
    pub frame_loop: &'a mut FrameLoop,
    pub events: &'a EventSender,
}

impl SessionContext<'_> {
    fn hide_panel(&mut self) {
        self.panel.force_hidden();
        self.scene.set_panel_opacity(0.0);
        self.scene.set_panel_visible(false);
    }
}

#[derive(Debug)]
pub struct SessionLifecycle {
    state: SessionState,
    active: Option<Box<dyn XrSession>>,
    /// A session we asked to end and are waiting to hear back from.
    ending: Option<Box<dyn XrSession>>,
    texture: Option<StereoTextureId>,
    required_features: Vec<String>,
    next_ticket: u64,
    teardowns: u64,
}

impl SessionLifecycle {
    pub fn new(required_features: Vec<String>) -> Self {
        Self {
            state: SessionState::Idle,
            active: None,
            ending: None,
            texture: None,
            required_features,
            next_ticket: 1,
            teardowns: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Whether an immersive session is presenting or shutting down.
    pub fn is_presenting(&self) -> bool {
        matches!(self.state, SessionState::Active | SessionState::Ending)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.active.as_ref().map(|s| s.id())
    }

    /// The stereo texture this lifecycle currently owns.
    pub fn texture(&self) -> Option<StereoTextureId> {
        self.texture
    }

    /// Completed teardowns since creation.
    pub fn teardowns(&self) -> u64 {
        self.teardowns
    }

    /// Label for the page's enter/exit control.
    pub fn toggle_label(&self) -> &'static str {
        if self.is_presenting() {
            EXIT_LABEL
        } else {
            ENTER_LABEL
        }
    }

    /// `Idle → Requesting`. Returns `None` when not idle.
    pub fn request(
        &mut self,
        platform: &mut dyn XrPlatform,
    ) -> Result<Option<RequestTicket>, XrError> {
        if self.state != SessionState::Idle {
            log::debug!("session request ignored in state {:?}", self.state);
            return Ok(None);
        }
        let ticket = RequestTicket(self.next_ticket);
        self.next_ticket += 1;
        self.state = SessionState::Requesting { ticket };
        log::info!("requesting immersive session ({:?})", self.required_features);

        if let Err(err) = platform.request_session(ticket, &self.required_features) {
            self.state = SessionState::Idle;
            return Err(err);
        }
        Ok(Some(ticket))
    }

    /// `Requesting → Idle` after the platform refused.
    pub fn on_rejected(&mut self, ticket: RequestTicket, error: &XrError) {
        if self.state != (SessionState::Requesting { ticket }) {
            log::debug!("ignoring stale rejection for {ticket:?}");
            return;
        }
        log::warn!("immersive session request failed: {error}");
        self.state = SessionState::Idle;
    }

    /// `Requesting → Active`, or back to `Idle` with everything rolled back
    /// if entry fails. Grants for any other ticket are ended on the spot.
    pub fn on_granted(
        &mut self,
        ticket: RequestTicket,
        mut session: Box<dyn XrSession>,
        ctx: &mut SessionContext<'_>,
    ) -> Result<(), SessionError> {
        if self.state != (SessionState::Requesting { ticket }) {
            log::debug!("ending {} granted for stale {ticket:?}", session.id());
            session.set_end_notifier(None);
            if let Err(err) = session.end() {
                log::debug!("stale session end failed: {err}");
            }
            return Ok(());
        }

        let id = session.id();
        match self.enter(session, ctx) {
            Ok(()) => {
                self.state = SessionState::Active;
                log::info!("{id} active");
                Ok(())
            }
            Err(err) => {
                log::error!("failed to enter {id}: {err}");
                self.roll_back(ctx);
                self.state = SessionState::Idle;
                Err(err)
            }
        }
    }

    fn enter(
        &mut self,
        mut session: Box<dyn XrSession>,
        ctx: &mut SessionContext<'_>,
    ) -> Result<(), SessionError> {
        session.set_end_notifier(Some(ctx.events.clone()));
        self.active = Some(session);

        if ctx.media.paused() {
            if let Err(err) = ctx.media.play() {
                log::warn!("playback did not resume on entry: {err}");
            }
        }

        let (width, height) = ctx
            .media
            .frame()
            .map(|frame| frame.image.dimensions())
            .unwrap_or(FALLBACK_TEXTURE_SIZE);
        let texture = ctx.backend.create_stereo_texture(width, height)?;
        self.texture = Some(texture);
        ctx.scene.bind_video(texture);
        if ctx.scene.video_binding() != Some(texture) {
            return Err(SessionError::NoVideoSurface);
        }
        ctx.scene.set_dome_visible(true);

        ctx.icons.refresh_from_media(&*ctx.media);
        ctx.scene
            .set_seek_progress(&SeekBarVisual::from_media(&*ctx.media));
        ctx.hide_panel();
        ctx.frame_loop.start();
        Ok(())
    }

    fn roll_back(&mut self, ctx: &mut SessionContext<'_>) {
        ctx.frame_loop.stop();
        if let Some(mut session) = self.active.take() {
            session.set_end_notifier(None);
            if let Err(err) = session.end() {
                log::warn!("could not end partially started {}: {err}", session.id());
            }
        }
        self.release_texture(ctx);
        if !ctx.media.paused() {
            ctx.media.pause();
        }
        ctx.scene.set_dome_visible(false);
        ctx.hide_panel();
    }

    /// `Active → Ending` on user request or end of media.
    ///
    /// The session reference is dropped before `end()` is called, so a second
    /// exit finds nothing to do. Cleanup runs when the end notice arrives, or
    /// right away if `end()` fails.
    pub fn exit(&mut self, ctx: &mut SessionContext<'_>) {
        let Some(mut session) = self.active.take() else {
            log::debug!("exit ignored in state {:?}", self.state);
            return;
        };
        self.state = SessionState::Ending;
        ctx.hide_panel();
        log::info!("ending {}", session.id());

        match session.end() {
            Ok(()) => self.ending = Some(session),
            Err(err) => {
                log::warn!("{} did not end cleanly: {err}", session.id());
                session.set_end_notifier(None);
                self.cleanup(ctx);
            }
        }
    }

    /// Immediate teardown after a fatal render error or context loss.
    ///
    /// Only the active session is asked to end. One already in `Ending` has
    /// had its `end()` call; it only loses its notifier here.
    pub fn abort(&mut self, reason: &str, ctx: &mut SessionContext<'_>) {
        if self.active.is_none() && self.ending.is_none() && !self.is_presenting() {
            log::debug!("abort ({reason}) with no session");
            return;
        }
        log::warn!("tearing down immersive session: {reason}");
        self.state = SessionState::Ending;
        ctx.hide_panel();
        if let Some(mut session) = self.active.take() {
            session.set_end_notifier(None);
            if let Err(err) = session.end() {
                log::warn!("{} did not end cleanly: {err}", session.id());
            }
        }
        if let Some(mut session) = self.ending.take() {
            log::debug!("dropping {} while its end is pending", session.id());
            session.set_end_notifier(None);
        }
        self.cleanup(ctx);
    }

    /// The platform reports that session `id` ended.
    pub fn on_ended(&mut self, id: SessionId, ctx: &mut SessionContext<'_>) {
        let ended = if self.active.as_ref().is_some_and(|s| s.id() == id) {
            log::info!("{id} ended by the platform");
            self.active.take()
        } else if self.ending.as_ref().is_some_and(|s| s.id() == id) {
            self.ending.take()
        } else {
            log::debug!("ignoring end notice for stale {id}");
            return;
        };
        if let Some(mut session) = ended {
            session.set_end_notifier(None);
        }
        self.state = SessionState::Ending;
        ctx.hide_panel();
        self.cleanup(ctx);
    }

    /// Reallocate and rebind the stereo texture after the graphics context
    /// comes back. Does nothing unless a session is showing the dome.
    pub fn on_context_restored(&mut self, ctx: &mut SessionContext<'_>) -> Result<(), RenderError> {
        if !self.is_active() || !ctx.scene.dome_visible() {
            log::debug!("context restored while not presenting");
            return Ok(());
        }
        self.release_texture(ctx);
        let (width, height) = ctx
            .media
            .frame()
            .map(|frame| frame.image.dimensions())
            .unwrap_or(FALLBACK_TEXTURE_SIZE);
        let texture = ctx.backend.create_stereo_texture(width, height)?;
        self.texture = Some(texture);
        ctx.scene.bind_video(texture);
        ctx.icons.refresh_from_media(&*ctx.media);
        log::info!("stereo texture restored");
        Ok(())
    }

    /// `Ending → Idle`. Safe to call any number of times from any state.
    fn cleanup(&mut self, ctx: &mut SessionContext<'_>) {
        ctx.frame_loop.stop();
        if !ctx.media.paused() {
            ctx.media.pause();
        }
        self.release_texture(ctx);
        ctx.scene.set_dome_visible(false);
        ctx.scene.set_pointer(None);
        ctx.hide_panel();

        if let Some(mut stray) = self.active.take() {
            log::warn!("{} was still referenced at cleanup", stray.id());
            stray.set_end_notifier(None);
        }
        ctx.backend.restore_flat_view();
        ctx.icons.refresh_from_media(&*ctx.media);

        if self.state != SessionState::Idle {
            self.teardowns += 1;
            log::info!("immersive session closed");
        }
        self.state = SessionState::Idle;
    }

    fn release_texture(&mut self, ctx: &mut SessionContext<'_>) {
        let Some(texture) = self.texture.take() else {
            return;
        };
        match ctx.scene.unbind_video() {
            Some(bound) if bound != texture => {
                log::warn!("dome was bound to {bound:?}, expected {texture:?}");
            }
            _ => {}
        }
        ctx.backend.dispose_stereo_texture(texture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Platform {
        requests: Vec<RequestTicket>,
        refuse: bool,
    }

    impl XrPlatform for Platform {
        fn is_session_supported(&mut self) -> Result<bool, XrError> {
            Ok(true)
        }

        fn request_session(
            &mut self,
            ticket: RequestTicket,
            features: &[String],
        ) -> Result<(), XrError> {
            assert_eq!(features, ["local-floor".to_string()]);
            if self.refuse {
                return Err(XrError::DeviceBusy);
            }
            self.requests.push(ticket);
            Ok(())
        }
    }

    fn lifecycle() -> SessionLifecycle {
        SessionLifecycle::new(vec!["local-floor".into()])
    }

    #[test]
    fn request_moves_to_requesting_once() {
        let mut platform = Platform::default();
        let mut lc = lifecycle();
        let ticket = lc.request(&mut platform).unwrap().unwrap();
        assert_eq!(lc.state(), SessionState::Requesting { ticket });
        assert_eq!(lc.request(&mut platform).unwrap(), None);
        assert_eq!(platform.requests, vec![ticket]);
    }

    #[test]
    fn failed_request_returns_to_idle() {
        let mut platform = Platform {
            refuse: true,
            ..Default::default()
        };
        let mut lc = lifecycle();
        assert_eq!(lc.request(&mut platform), Err(XrError::DeviceBusy));
        assert_eq!(lc.state(), SessionState::Idle);
        assert_eq!(lc.toggle_label(), ENTER_LABEL);
    }

    #[test]
    fn only_the_current_ticket_can_be_rejected() {
        let mut platform = Platform::default();
        let mut lc = lifecycle();
        let ticket = lc.request(&mut platform).unwrap().unwrap();
        lc.on_rejected(RequestTicket(ticket.0 + 10), &XrError::PermissionDenied);
        assert_eq!(lc.state(), SessionState::Requesting { ticket });
        lc.on_rejected(ticket, &XrError::PermissionDenied);
        assert_eq!(lc.state(), SessionState::Idle);
        assert_eq!(lc.texture(), None);
    }

    #[test]
    fn tickets_are_never_reused() {
        let mut platform = Platform::default();
        let mut lc = lifecycle();
        let first = lc.request(&mut platform).unwrap().unwrap();
        lc.on_rejected(first, &XrError::PermissionDenied);
        let second = lc.request(&mut platform).unwrap().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn session_ids_display_compactly() {
        assert_eq!(SessionId(4).to_string(), "session#4");
    }
}
