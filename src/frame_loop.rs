//! Per-refresh work while an immersive session is presenting.

use crate::error::RenderError;
use crate::icons::IconSet;
use crate::media::VideoFrame;
use crate::panel::PanelVisibility;
use crate::render::{RenderBackend, RenderView, XrFrame};
use crate::scene::Scene;
use crate::stereo::StereoMapper;

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The loop is stopped.
    Stopped,
    /// No frame or pose this refresh.
    Skipped,
    Rendered,
}

/// Borrowed state a tick reads and updates.
pub struct FrameTarget<'a, R: RenderBackend + ?Sized> {
    pub panel: &'a mut PanelVisibility,
    pub scene: &'a mut Scene,
    pub backend: &'a mut R,
    pub icons: &'a IconSet,
    pub video: Option<VideoFrame<'a>>,
    pub mapper: &'a StereoMapper,
}

#[derive(Debug, Clone)]
pub struct FrameLoop {
    running: bool,
    ticks: u64,
    health_check_interval: u64,
}

impl FrameLoop {
    pub fn new(health_check_interval: u64) -> Self {
        Self {
            running: false,
            ticks: 0,
            health_check_interval: health_check_interval.max(1),
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ticks since the loop was created.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance the panel fade, then draw `frame`.
    ///
    /// A render failure stops the loop and is returned; the caller ends the
    /// session.
    pub fn tick<R: RenderBackend + ?Sized>(
        &mut self,
        frame: Option<&XrFrame>,
        now_ms: f64,
        target: FrameTarget<'_, R>,
    ) -> Result<Tick, RenderError> {
        if !self.running {
            return Ok(Tick::Stopped);
        }
        self.ticks += 1;

        let FrameTarget {
            panel,
            scene,
            backend,
            icons,
            video,
            mapper,
        } = target;

        if let Some(opacity) = panel.update(now_ms) {
            scene.set_panel_opacity(opacity);
        }
        scene.set_panel_visible(panel.group_visible());

        let Some(frame) = frame.filter(|f| f.has_pose()) else {
            return Ok(Tick::Skipped);
        };

        if self.ticks % self.health_check_interval == 0 {
            match backend.take_error() {
                Some(err) => log::error!("graphics error state: {err}"),
                None => log::debug!("graphics health check clean at tick {}", self.ticks),
            }
        }

        let view = RenderView {
            scene,
            icons,
            video,
            views: &frame.views,
            mapper,
            presenting: true,
        };
        if let Err(err) = backend.render(&view) {
            self.running = false;
            return Err(err);
        }
        Ok(Tick::Rendered)
    }
}
