//! The player: one owner for the scene, the panel, the media element and the
//! session lifecycle, driven by events from a single queue.

use crate::config::PlayerConfig;
use crate::error::RenderError;
use crate::events::{self, EventSender, PlayerEvent};
use crate::frame_loop::{FrameLoop, FrameTarget, Tick};
use crate::icons::IconSet;
use crate::interaction::{ControllerPose, HitTestRouter};
use crate::media::{MediaElement, MediaEvent, ReadyState};
use crate::panel::PanelVisibility;
use crate::render::{RenderBackend, RenderView, XrFrame};
use crate::scene::Scene;
use crate::session::{ENTER_LABEL, SessionContext, SessionLifecycle, SessionState, XrPlatform};
use crate::stereo::{EyeView, StereoMapper};
use crate::transport::{SeekBarVisual, Transport, TransportOutcome};
use image::RgbaImage;
use std::sync::mpsc::Receiver;

/// The page's enter/exit button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnterControl {
    pub visible: bool,
    pub enabled: bool,
    pub label: &'static str,
}

/// Flat page controls outside the immersive scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChrome {
    pub enter: EnterControl,
    /// The "how to use" region, shown only when sessions are supported.
    pub info_visible: bool,
}

pub struct Player<M, P, R> {
    config: PlayerConfig,
    media: M,
    platform: P,
    backend: R,
    scene: Scene,
    panel: PanelVisibility,
    icons: IconSet,
    router: HitTestRouter,
    transport: Transport,
    mapper: StereoMapper,
    lifecycle: SessionLifecycle,
    frame_loop: FrameLoop,
    chrome: PageChrome,
    supported: bool,
    media_ready: bool,
    media_failed: bool,
    flat_size: Option<(u32, u32)>,
    events: EventSender,
    inbox: Receiver<PlayerEvent>,
}

impl<M, P, R> Player<M, P, R>
where
    M: MediaElement,
    P: XrPlatform,
    R: RenderBackend,
{
    /// Build the scene and check whether immersive sessions are available.
    ///
    /// `background` is the panel background raster, see
    /// [`crate::icons::panel_raster`].
    pub fn new(
        config: PlayerConfig,
        media: M,
        mut platform: P,
        backend: R,
        background: RgbaImage,
    ) -> Self {
        let supported = match platform.is_session_supported() {
            Ok(supported) => supported,
            Err(err) => {
                log::warn!("immersive capability check failed: {err}");
                false
            }
        };
        if supported {
            log::info!("immersive sessions supported");
        } else {
            log::warn!("immersive sessions unavailable; enter control hidden");
        }

        let (events, inbox) = events::channel();
        let mut scene = Scene::new(&config);
        scene.set_seek_progress(&SeekBarVisual::from_media(&media));
        let mut icons = IconSet::new(config.icon_size, background);
        icons.refresh_from_media(&media);

        Self {
            panel: PanelVisibility::new(config.fade_duration_ms, config.auto_hide_delay_ms),
            router: HitTestRouter::from_config(&config),
            transport: Transport::new(config.skip_seconds),
            mapper: StereoMapper::new(config.stereo_threshold),
            lifecycle: SessionLifecycle::new(config.required_features.clone()),
            frame_loop: FrameLoop::new(config.health_check_interval),
            chrome: PageChrome {
                enter: EnterControl {
                    visible: supported,
                    enabled: false,
                    label: ENTER_LABEL,
                },
                info_visible: supported,
            },
            supported,
            media_ready: false,
            media_failed: false,
            flat_size: None,
            config,
            media,
            platform,
            backend,
            scene,
            icons,
            events,
            inbox,
        }
    }

    /// A sender for posting events to this player.
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    /// Handle every queued event. Returns how many were handled.
    pub fn pump(&mut self, now_ms: f64) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.inbox.try_recv() {
            self.handle_event(event, now_ms);
            handled += 1;
        }
        handled
    }

    pub fn handle_event(&mut self, event: PlayerEvent, now_ms: f64) {
        log::trace!("event {event:?}");
        match event {
            PlayerEvent::Trigger(pose) => self.on_trigger(&pose, now_ms),
            PlayerEvent::ControllerMoved(pose) => {
                if self.lifecycle.is_active() {
                    self.scene.set_pointer(Some(&pose));
                }
            }
            PlayerEvent::ToggleSession => self.toggle_session(),
            PlayerEvent::Media(event) => self.on_media(event),
            PlayerEvent::SessionGranted { ticket, session } => {
                let (lifecycle, mut ctx) = self.split();
                if let Err(err) = lifecycle.on_granted(ticket, session, &mut ctx) {
                    log::debug!("session entry rolled back: {err}");
                }
            }
            PlayerEvent::SessionRejected { ticket, error } => {
                self.lifecycle.on_rejected(ticket, &error);
            }
            PlayerEvent::SessionEnded(id) => {
                let (lifecycle, mut ctx) = self.split();
                lifecycle.on_ended(id, &mut ctx);
            }
            PlayerEvent::ContextLost => {
                let (lifecycle, mut ctx) = self.split();
                lifecycle.abort("graphics context lost", &mut ctx);
            }
            PlayerEvent::ContextRestored => {
                let (lifecycle, mut ctx) = self.split();
                if let Err(err) = lifecycle.on_context_restored(&mut ctx) {
                    lifecycle.abort(&format!("stereo texture not restored: {err}"), &mut ctx);
                }
            }
            PlayerEvent::Resized { width, height } => self.on_resize(width, height),
        }
        self.sync_chrome();
    }

    /// Run one frame loop tick. A render failure ends the session.
    pub fn on_frame(&mut self, frame: Option<&XrFrame>, now_ms: f64) -> Tick {
        let result = self.frame_loop.tick(
            frame,
            now_ms,
            FrameTarget {
                panel: &mut self.panel,
                scene: &mut self.scene,
                backend: &mut self.backend,
                icons: &self.icons,
                video: self.media.frame(),
                mapper: &self.mapper,
            },
        );
        match result {
            Ok(tick) => tick,
            Err(err) => {
                log::error!("render failed: {err}");
                let (lifecycle, mut ctx) = self.split();
                lifecycle.abort("render failure", &mut ctx);
                self.sync_chrome();
                Tick::Stopped
            }
        }
    }

    /// Draw the flat (non-immersive) view.
    pub fn render_flat(&mut self, view: EyeView) -> Result<(), RenderError> {
        let views = [view];
        self.backend.render(&RenderView {
            scene: &self.scene,
            icons: &self.icons,
            video: self.media.frame(),
            views: &views,
            mapper: &self.mapper,
            presenting: false,
        })
    }

    fn split(&mut self) -> (&mut SessionLifecycle, SessionContext<'_>) {
        (
            &mut self.lifecycle,
            SessionContext {
                media: &mut self.media,
                scene: &mut self.scene,
                panel: &mut self.panel,
                icons: &mut self.icons,
                backend: &mut self.backend,
                frame_loop: &mut self.frame_loop,
                events: &self.events,
            },
        )
    }

    fn toggle_session(&mut self) {
        match self.lifecycle.state() {
            SessionState::Idle => {
                if !self.chrome.enter.enabled {
                    log::debug!("enter control is disabled");
                    return;
                }
                if let Err(err) = self.lifecycle.request(&mut self.platform) {
                    log::warn!("could not request an immersive session: {err}");
                }
            }
            SessionState::Active => {
                let (lifecycle, mut ctx) = self.split();
                lifecycle.exit(&mut ctx);
            }
            state => log::debug!("toggle ignored while {state:?}"),
        }
    }

    fn on_trigger(&mut self, pose: &ControllerPose, now_ms: f64) {
        if !self.lifecycle.is_active() {
            log::debug!("trigger outside an immersive session");
            return;
        }
        let command = self
            .router
            .route(&self.scene, pose, self.media.has_finite_duration());
        log::debug!("trigger -> {command:?}");

        if !command.is_control() {
            self.panel.toggle(now_ms, self.config.visibility_epsilon);
            self.scene.set_panel_visible(self.panel.group_visible());
            return;
        }

        self.panel.show(now_ms);
        self.scene.set_panel_visible(true);
        match self.transport.apply(&mut self.media, command) {
            TransportOutcome::Applied { seeked: true } => self.refresh_seek_bar(),
            TransportOutcome::Applied { seeked: false } | TransportOutcome::Skipped => {}
            TransportOutcome::ExitRequested => {
                let (lifecycle, mut ctx) = self.split();
                lifecycle.exit(&mut ctx);
            }
        }
    }

    fn on_media(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::LoadedMetadata => {
                self.refresh_seek_bar();
                self.icons.refresh_from_media(&self.media);
                if self.media.has_finite_duration() {
                    self.media_ready = true;
                }
            }
            MediaEvent::CanPlayThrough => {
                if self.media.ready_state() >= ReadyState::HaveFutureData {
                    self.media_ready = true;
                }
            }
            MediaEvent::TimeUpdate => {
                if self.media.has_finite_duration() {
                    self.refresh_seek_bar();
                }
            }
            MediaEvent::Playing | MediaEvent::Paused => {
                self.icons
                    .refresh_play_pause(self.media.paused() || self.media.ended());
            }
            MediaEvent::VolumeChange => {
                self.icons
                    .refresh_volume(self.media.muted() || self.media.volume() == 0.0);
            }
            MediaEvent::Ended => {
                if !self.media.paused() {
                    self.media.pause();
                }
                self.icons.refresh_play_pause(true);
                if self.lifecycle.is_active() {
                    log::info!("media ended; leaving immersive session");
                    let (lifecycle, mut ctx) = self.split();
                    lifecycle.exit(&mut ctx);
                }
            }
            MediaEvent::Error(err) => {
                log::error!("media error: {err}");
                self.media_failed = true;
            }
        }
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        if self.lifecycle.is_presenting() {
            log::debug!("flat resize to {width}x{height} ignored while presenting");
            return;
        }
        self.flat_size = Some((width, height));
        self.backend.resize_flat_view(width, height);
    }

    fn refresh_seek_bar(&mut self) {
        self.scene
            .set_seek_progress(&SeekBarVisual::from_media(&self.media));
    }

    fn sync_chrome(&mut self) {
        self.chrome.enter.visible = self.supported;
        self.chrome.enter.enabled = self.supported && self.media_ready && !self.media_failed;
        self.chrome.enter.label = self.lifecycle.toggle_label();
        self.chrome.info_visible = self.supported;
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn chrome(&self) -> &PageChrome {
        &self.chrome
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    pub fn is_presenting(&self) -> bool {
        self.lifecycle.is_presenting()
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn panel(&self) -> &PanelVisibility {
        &self.panel
    }

    pub fn icons(&self) -> &IconSet {
        &self.icons
    }

    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frame_loop
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn backend(&self) -> &R {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut R {
        &mut self.backend
    }

    /// Last flat view size applied, if any resize was seen.
    pub fn flat_size(&self) -> Option<(u32, u32)> {
        self.flat_size
    }
}
