//! Panel visibility: an opacity fade with a timed auto-hide.
//!
//! The panel is either resting (fully shown or fully hidden) or fading toward
//! its target opacity. [`PanelVisibility::show`] re-arms an auto-hide deadline
//! every time it is called, so operating a control keeps the panel up.
//!
//! Time is passed in explicitly as milliseconds on a monotonic clock. The
//! controller never reads a clock itself; the frame loop calls
//! [`PanelVisibility::update`] once per display refresh.
//!
//! ```
//! use vr180::PanelVisibility;
//!
//! let mut panel = PanelVisibility::new(200.0, 10_000.0);
//! panel.show(0.0);
//! panel.update(0.0);
//! panel.update(100.0);
//! assert_eq!(panel.opacity(), 0.5);
//! panel.update(200.0);
//! assert_eq!(panel.opacity(), 1.0);
//! assert!(!panel.is_animating());
//! ```

/// Coarse view of the controller's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelPhase {
    Hidden,
    Showing,
    Visible,
    Hiding,
}

/// Opacity state machine for the control panel.
#[derive(Debug, Clone)]
pub struct PanelVisibility {
    current: f32,
    target: f32,
    fade_ms: f64,
    auto_hide_ms: f64,
    group_visible: bool,
    hide_deadline: Option<f64>,
    /// Timestamp of the last fade step while the driver runs.
    last_step: Option<f64>,
}

impl PanelVisibility {
    /// A hidden panel.
    pub fn new(fade_ms: f64, auto_hide_ms: f64) -> Self {
        Self {
            current: 0.0,
            target: 0.0,
            fade_ms: fade_ms.max(f64::EPSILON),
            auto_hide_ms,
            group_visible: false,
            hide_deadline: None,
            last_step: None,
        }
    }

    /// Fade in and (re)arm the auto-hide deadline.
    pub fn show(&mut self, now_ms: f64) {
        self.hide_deadline = None;
        self.group_visible = true;
        self.target = 1.0;
        self.start_driver(now_ms);
        self.hide_deadline = Some(now_ms + self.auto_hide_ms);
    }

    /// Fade out. Cancels any pending auto-hide.
    pub fn hide(&mut self, now_ms: f64) {
        self.hide_deadline = None;
        self.target = 0.0;
        self.start_driver(now_ms);
    }

    /// Hide if the panel is currently shown above `epsilon`, otherwise show.
    pub fn toggle(&mut self, now_ms: f64, epsilon: f32) {
        if self.should_hide_on_toggle(epsilon) {
            self.hide(now_ms);
        } else {
            self.show(now_ms);
        }
    }

    pub fn should_hide_on_toggle(&self, epsilon: f32) -> bool {
        self.group_visible && self.current > epsilon
    }

    /// Snap to fully hidden, cancelling the fade and the auto-hide deadline.
    pub fn force_hidden(&mut self) {
        self.current = 0.0;
        self.target = 0.0;
        self.hide_deadline = None;
        self.last_step = None;
        self.group_visible = false;
    }

    /// Fire the auto-hide deadline if it has passed, then advance the fade.
    ///
    /// Returns the new opacity when it changed this call.
    pub fn update(&mut self, now_ms: f64) -> Option<f32> {
        self.poll_timers(now_ms);
        self.advance(now_ms)
    }

    /// Fire the auto-hide deadline if it has passed.
    pub fn poll_timers(&mut self, now_ms: f64) -> bool {
        match self.hide_deadline {
            Some(deadline) if now_ms >= deadline => {
                self.hide(now_ms);
                true
            }
            _ => false,
        }
    }

    /// One linear fade step. Returns the opacity when it changed.
    pub fn advance(&mut self, now_ms: f64) -> Option<f32> {
        let Some(last) = self.last_step else {
            return None;
        };
        if !self.is_animating() {
            self.last_step = None;
            return None;
        }

        let dt = (now_ms - last).max(0.0);
        self.last_step = Some(now_ms);
        let step = (dt / self.fade_ms) as f32;

        if self.target > self.current {
            self.current = (self.current + step).min(self.target);
        } else {
            self.current = (self.current - step).max(self.target);
        }

        if !self.is_animating() {
            self.last_step = None;
            if self.current == 0.0 {
                self.group_visible = false;
            }
        }
        Some(self.current)
    }

    fn start_driver(&mut self, now_ms: f64) {
        if self.is_animating() && self.last_step.is_none() {
            self.last_step = Some(now_ms);
        }
    }

    /// Opacity in `[0, 1]`.
    pub fn opacity(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_animating(&self) -> bool {
        self.current != self.target
    }

    /// Whether the panel group is rendered and hit-tested at all.
    pub fn group_visible(&self) -> bool {
        self.group_visible
    }

    pub fn hide_deadline(&self) -> Option<f64> {
        self.hide_deadline
    }

    pub fn phase(&self) -> PanelPhase {
        match (self.is_animating(), self.target > 0.0) {
            (true, true) => PanelPhase::Showing,
            (true, false) => PanelPhase::Hiding,
            (false, true) => PanelPhase::Visible,
            (false, false) => PanelPhase::Hidden,
        }
    }
}
