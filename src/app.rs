//! Desktop preview host.
//!
//! Runs the player in a winit window against a simulated headset. The
//! [`DesktopPlatform`] grants sessions immediately (through the player's event
//! queue, like a real platform would answer later) and can simulate the user
//! taking the headset off. While a session is active the window is split into
//! left and right eye viewports and the mouse cursor stands in for the
//! controller.
//!
//! | Input        | Action                                   |
//! |--------------|------------------------------------------|
//! | `Enter`      | enter/exit the immersive session         |
//! | `Escape`     | take the headset off (external end)      |
//! | `L` / `R`    | lose / restore the graphics context      |
//! | arrow keys   | turn the head                            |
//! | left click   | controller trigger                       |

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;
use winit::application::ApplicationHandler;
use winit::event::{MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::camera::{Camera, Eye};
use crate::config::{PlayerConfig, PreviewConfig};
use crate::error::{SetupError, XrError};
use crate::events::{EventSender, PlayerEvent};
use crate::gpu::GpuContext;
use crate::icons;
use crate::input::Input;
use crate::interaction::ControllerPose;
use crate::media::SyntheticMedia;
use crate::picking::Ray;
use crate::player::Player;
use crate::render::XrFrame;
use crate::renderer::WgpuRenderer;
use crate::session::{RequestTicket, SessionId, XrPlatform, XrSession};

/// Features the simulated headset can grant.
const SUPPORTED_FEATURES: &[&str] = &["viewer", "local", "local-floor"];
/// Controller position relative to the head, in head space.
const HAND_OFFSET: Vec3 = Vec3::new(0.12, -0.15, -0.05);
/// Ray length used to aim when the cursor is over nothing.
const DEFAULT_REACH: f32 = 2.0;
/// Head turn rate in radians per second.
const TURN_SPEED: f32 = 1.5;

type PreviewPlayer = Player<SyntheticMedia, DesktopPlatform, WgpuRenderer>;

/// State shared by the simulated platform and the sessions it grants.
#[derive(Debug, Default)]
struct Headset {
    next_id: u64,
    active: Option<SessionId>,
    notifier: Option<EventSender>,
}

/// A headset simulated on the desktop.
#[derive(Debug, Default)]
pub struct DesktopPlatform {
    events: Option<EventSender>,
    headset: Rc<RefCell<Headset>>,
}

impl DesktopPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post grants and rejections to `events`.
    pub fn connect(&mut self, events: EventSender) {
        self.events = Some(events);
    }

    /// End the active session from the platform side, as if the headset had
    /// been taken off. Returns false when no session is running.
    pub fn remove_headset(&mut self) -> bool {
        let mut headset = self.headset.borrow_mut();
        let Some(id) = headset.active.take() else {
            return false;
        };
        log::info!("headset removed, ending {id}");
        if let Some(notifier) = headset.notifier.take() {
            notifier.send(PlayerEvent::SessionEnded(id));
        }
        true
    }
}

impl XrPlatform for DesktopPlatform {
    fn is_session_supported(&mut self) -> Result<bool, XrError> {
        Ok(true)
    }

    fn request_session(
        &mut self,
        ticket: RequestTicket,
        required_features: &[String],
    ) -> Result<(), XrError> {
        let events = self
            .events
            .as_ref()
            .ok_or_else(|| XrError::Platform("platform is not connected to a player".into()))?;

        if let Some(missing) = required_features
            .iter()
            .find(|f| !SUPPORTED_FEATURES.contains(&f.as_str()))
        {
            events.send(PlayerEvent::SessionRejected {
                ticket,
                error: XrError::FeatureUnsupported(missing.clone()),
            });
            return Ok(());
        }

        let mut headset = self.headset.borrow_mut();
        if headset.active.is_some() {
            events.send(PlayerEvent::SessionRejected {
                ticket,
                error: XrError::DeviceBusy,
            });
            return Ok(());
        }
        headset.next_id += 1;
        let id = SessionId(headset.next_id);
        headset.active = Some(id);
        events.send(PlayerEvent::SessionGranted {
            ticket,
            session: Box::new(DesktopSession {
                id,
                headset: Rc::clone(&self.headset),
            }),
        });
        Ok(())
    }
}

#[derive(Debug)]
struct DesktopSession {
    id: SessionId,
    headset: Rc<RefCell<Headset>>,
}

impl XrSession for DesktopSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn set_end_notifier(&mut self, notifier: Option<EventSender>) {
        let mut headset = self.headset.borrow_mut();
        if headset.active == Some(self.id) {
            headset.notifier = notifier;
        }
    }

    fn end(&mut self) -> Result<(), XrError> {
        let notifier = {
            let mut headset = self.headset.borrow_mut();
            if headset.active != Some(self.id) {
                return Err(XrError::AlreadyEnded);
            }
            headset.active = None;
            headset.notifier.take()
        };
        if let Some(notifier) = notifier {
            notifier.send(PlayerEvent::SessionEnded(self.id));
        }
        Ok(())
    }
}

/// What the host needs before the window exists.
struct Launch {
    config: PlayerConfig,
    preview: PreviewConfig,
    media: SyntheticMedia,
    title: String,
}

struct Running {
    window: Arc<Window>,
    player: PreviewPlayer,
    events: EventSender,
    camera: Camera,
    input: Input,
    preview: PreviewConfig,
    shown_title: String,
    start_time: Instant,
    last_frame: Instant,
}

enum PreviewApp {
    Pending(Option<Launch>),
    Running(Box<Running>),
    Failed(Option<SetupError>),
}

/// Open the preview window and run until it is closed.
pub fn run(
    config: PlayerConfig,
    preview: PreviewConfig,
    media: SyntheticMedia,
    title: impl Into<String>,
) -> Result<(), SetupError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = PreviewApp::Pending(Some(Launch {
        config,
        preview,
        media,
        title: title.into(),
    }));
    event_loop.run_app(&mut app)?;

    match app {
        PreviewApp::Failed(Some(err)) => Err(err),
        _ => Ok(()),
    }
}

impl ApplicationHandler for PreviewApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let PreviewApp::Pending(launch) = self else {
            return;
        };
        let Some(launch) = launch.take() else {
            return;
        };
        match Running::start(event_loop, launch) {
            Ok(running) => *self = PreviewApp::Running(Box::new(running)),
            Err(err) => {
                log::error!("preview setup failed: {err}");
                *self = PreviewApp::Failed(Some(err));
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let PreviewApp::Running(app) = self else {
            return;
        };

        app.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                app.player
                    .backend_mut()
                    .resize_surface(size.width, size.height);
                app.events.send(PlayerEvent::Resized {
                    width: size.width,
                    height: size.height,
                });
            }
            WindowEvent::RedrawRequested => {
                app.frame();
                app.input.begin_frame();
                app.window.request_redraw();
            }
            _ => {}
        }
    }
}

impl Running {
    fn start(event_loop: &ActiveEventLoop, launch: Launch) -> Result<Self, SetupError> {
        let Launch {
            config,
            preview,
            media,
            title,
        } = launch;

        let window_attrs = WindowAttributes::default()
            .with_title(&preview.title)
            .with_inner_size(winit::dpi::LogicalSize::new(preview.width, preview.height));
        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone())?;
        let renderer = WgpuRenderer::new(gpu, &config);

        let font = match &preview.font_path {
            Some(path) => match icons::load_font(path) {
                Ok(font) => Some(font),
                Err(err) => {
                    log::warn!("panel title disabled: {err}");
                    None
                }
            },
            None => None,
        };
        let background = icons::panel_raster(&config, font.as_ref(), &title);

        let mut player = Player::new(config, media, DesktopPlatform::new(), renderer, background);
        let events = player.events();
        player.platform_mut().connect(events.clone());
        player.media_mut().attach(events.clone());
        player.media_mut().load();

        let size = window.inner_size();
        events.send(PlayerEvent::Resized {
            width: size.width,
            height: size.height,
        });

        let camera = Camera::new()
            .at(0.0, preview.eye_height, 0.0)
            .with_fov(preview.fov_y_degrees);

        log::info!("preview ready: Enter toggles the session, Escape removes the headset");
        window.request_redraw();

        Ok(Self {
            window,
            player,
            events,
            camera,
            input: Input::new(),
            preview,
            shown_title: String::new(),
            start_time: Instant::now(),
            last_frame: Instant::now(),
        })
    }

    fn frame(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;
        let now_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;

        self.handle_keys(dt as f32);
        self.player.media_mut().advance(dt);
        self.update_controller();
        self.player.pump(now_ms);

        let size = self.window.inner_size();
        let (width, height) = (size.width.max(1) as f32, size.height.max(1) as f32);
        if self.player.is_presenting() {
            let eye_aspect = width / 2.0 / height;
            let views = self
                .camera
                .stereo_views(eye_aspect, self.preview.eye_separation);
            let frame = XrFrame::new(now_ms, views.to_vec());
            self.player.on_frame(Some(&frame), now_ms);
        } else if let Err(err) = self.player.render_flat(self.camera.flat_view(width / height)) {
            log::warn!("flat view render failed: {err}");
        }

        self.sync_title();
    }

    fn handle_keys(&mut self, dt: f32) {
        if self.input.key_pressed(KeyCode::Enter) {
            self.events.send(PlayerEvent::ToggleSession);
        }
        if self.input.key_pressed(KeyCode::Escape) && !self.player.platform_mut().remove_headset() {
            log::debug!("no headset session to remove");
        }
        if self.input.key_pressed(KeyCode::KeyL) {
            log::info!("simulating graphics context loss");
            self.events.send(PlayerEvent::ContextLost);
        }
        if self.input.key_pressed(KeyCode::KeyR) {
            log::info!("simulating graphics context restore");
            self.events.send(PlayerEvent::ContextRestored);
        }

        let yaw = self.input.axis(KeyCode::ArrowRight, KeyCode::ArrowLeft);
        let pitch = self.input.axis(KeyCode::ArrowDown, KeyCode::ArrowUp);
        self.camera
            .turn(yaw * TURN_SPEED * dt, pitch * TURN_SPEED * dt);
    }

    fn update_controller(&mut self) {
        if !self.player.is_presenting() {
            return;
        }
        let Some(pose) = self.controller_pose() else {
            return;
        };
        if self.input.cursor_moved() {
            self.events.send(PlayerEvent::ControllerMoved(pose));
        }
        if self.input.mouse_pressed(MouseButton::Left) {
            self.events.send(PlayerEvent::Trigger(pose));
        }
    }

    /// Aim the simulated controller at whatever is under the cursor.
    fn controller_pose(&self) -> Option<ControllerPose> {
        let cursor = self.input.cursor()?;
        let size = self.window.inner_size();
        let eye_width = size.width.max(2) as f32 / 2.0;
        let height = size.height.max(1) as f32;
        let (eye, x) = if cursor.x < eye_width {
            (Eye::Left, cursor.x)
        } else {
            (Eye::Right, cursor.x - eye_width)
        };

        let (view, projection) =
            self.camera
                .eye(eye, eye_width / height, self.preview.eye_separation);
        let ray = Ray::from_screen(x, cursor.y, eye_width, height, view, projection);

        let config = self.player.config();
        let reach = self
            .player
            .scene()
            .pick(&ray, config.ray_near, config.ray_far)
            .map(|(_, hit)| hit.distance)
            .unwrap_or(DEFAULT_REACH);
        let target = ray.point_at(reach);
        let hand = self.camera.position + self.camera.orientation() * HAND_OFFSET;
        Some(ControllerPose::looking_along(hand, target - hand))
    }

    fn sync_title(&mut self) {
        let chrome = self.player.chrome();
        let status = if !chrome.enter.visible {
            "immersive sessions unavailable".to_string()
        } else if chrome.enter.enabled {
            format!("{} [Enter]", chrome.enter.label)
        } else {
            "loading".to_string()
        };
        let title = format!("{} | {}", self.preview.title, status);
        if title != self.shown_title {
            self.window.set_title(&title);
            self.shown_title = title;
        }
    }
}
