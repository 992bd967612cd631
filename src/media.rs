//! The media surface.
//!
//! The player never decodes video itself. It drives anything implementing
//! [`MediaElement`]: reads transport state, issues play/pause/seek/mute, and
//! pulls the current paint source for the dome texture. State changes come
//! back as [`MediaEvent`]s on the player's event channel.
//!
//! [`SyntheticMedia`] is a clock-driven element that shows a still
//! side-by-side frame. The desktop preview plays it, and tests use it to
//! script media behavior.

use crate::error::MediaError;
use crate::events::EventSender;
use image::RgbaImage;
use std::path::Path;

/// Container extensions that must be transcoded before they can be played.
pub const TRANSCODE_EXTENSIONS: &[&str] = &["mov", "aivu"];

/// Title shown when a source has no usable file name.
pub const DEFAULT_TITLE: &str = "Video Title";

/// How much data the element has buffered, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// Change notifications from a media element.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata,
    CanPlayThrough,
    TimeUpdate,
    Playing,
    Paused,
    Ended,
    Error(MediaError),
    VolumeChange,
}

/// A borrowed paint source and its change counter.
#[derive(Debug, Clone, Copy)]
pub struct VideoFrame<'a> {
    pub image: &'a RgbaImage,
    /// Increases whenever the pixels change.
    pub revision: u64,
}

/// Transport interface of a playable media element.
///
/// `duration` may be non-finite while it is unknown or for live sources.
pub trait MediaElement {
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn paused(&self) -> bool;
    fn ended(&self) -> bool;
    fn muted(&self) -> bool;
    fn volume(&self) -> f32;
    fn ready_state(&self) -> ReadyState;
    /// Whether a source is attached at all.
    fn has_source(&self) -> bool;

    /// Start or resume playback. May be refused.
    fn play(&mut self) -> Result<(), MediaError>;
    fn pause(&mut self);
    fn set_current_time(&mut self, seconds: f64);
    fn set_muted(&mut self, muted: bool);

    /// The frame to paint onto the dome, if any.
    fn frame(&self) -> Option<VideoFrame<'_>>;

    fn has_finite_duration(&self) -> bool {
        self.duration().is_finite()
    }
}

/// Whether `path` names a container that needs transcoding first.
pub fn needs_transcode(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            TRANSCODE_EXTENSIONS
                .iter()
                .any(|t| t.eq_ignore_ascii_case(ext))
        })
}

/// Human-readable title derived from a source path.
///
/// `clips/my-summer-trip.mp4` becomes `my summer trip`.
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(|stem| stem.replace('-', " "))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// Interval between `TimeUpdate` events during playback.
const TIME_UPDATE_INTERVAL: f64 = 0.25;

/// A media element driven by an explicit clock.
///
/// Call [`SyntheticMedia::advance`] with elapsed wall time to move playback
/// forward. Events are posted to the attached sender the way a real element
/// would fire them.
#[derive(Debug)]
pub struct SyntheticMedia {
    frame: Option<RgbaImage>,
    frame_revision: u64,
    current_time: f64,
    duration: f64,
    paused: bool,
    ended: bool,
    muted: bool,
    volume: f32,
    ready_state: ReadyState,
    events: Option<EventSender>,
    since_time_update: f64,
    blocked: Option<String>,
}

impl SyntheticMedia {
    /// A paused element with no data loaded yet.
    pub fn new(frame: Option<RgbaImage>, duration: f64) -> Self {
        Self {
            frame,
            frame_revision: 1,
            current_time: 0.0,
            duration,
            paused: true,
            ended: false,
            muted: false,
            volume: 1.0,
            ready_state: ReadyState::HaveNothing,
            events: None,
            since_time_update: 0.0,
            blocked: None,
        }
    }

    /// Post future events to `events`.
    pub fn attach(&mut self, events: EventSender) {
        self.events = Some(events);
    }

    /// Finish "loading": metadata first, then enough data to play through.
    pub fn load(&mut self) {
        self.ready_state = ReadyState::HaveMetadata;
        self.emit(MediaEvent::LoadedMetadata);
        if self.frame.is_some() {
            self.ready_state = ReadyState::HaveEnoughData;
            self.emit(MediaEvent::CanPlayThrough);
        }
    }

    /// Refuse future `play()` calls, as an autoplay policy would.
    pub fn block_playback(&mut self, reason: impl Into<String>) {
        self.blocked = Some(reason.into());
    }

    pub fn unblock_playback(&mut self) {
        self.blocked = None;
    }

    /// Fail irrecoverably, as a decode error would.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.ready_state = ReadyState::HaveNothing;
        self.paused = true;
        self.emit(MediaEvent::Error(MediaError::Decode(reason.into())));
    }

    pub fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        if volume != self.volume {
            self.volume = volume;
            self.emit(MediaEvent::VolumeChange);
        }
    }

    /// Replace the paint source.
    pub fn set_frame(&mut self, frame: RgbaImage) {
        self.frame = Some(frame);
        self.frame_revision += 1;
    }

    /// Move playback forward by `dt` seconds of wall time.
    pub fn advance(&mut self, dt: f64) {
        if self.paused || self.ended {
            return;
        }
        self.current_time += dt;
        self.since_time_update += dt;

        if self.duration.is_finite() && self.current_time >= self.duration {
            self.current_time = self.duration;
            self.since_time_update = 0.0;
            self.ended = true;
            self.paused = true;
            self.emit(MediaEvent::TimeUpdate);
            self.emit(MediaEvent::Paused);
            self.emit(MediaEvent::Ended);
            return;
        }

        if self.since_time_update >= TIME_UPDATE_INTERVAL {
            self.since_time_update = 0.0;
            self.emit(MediaEvent::TimeUpdate);
        }
    }

    fn emit(&self, event: MediaEvent) {
        if let Some(events) = &self.events {
            events.media(event);
        }
    }
}

impl MediaElement for SyntheticMedia {
    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn ended(&self) -> bool {
        self.ended
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn has_source(&self) -> bool {
        self.frame.is_some()
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if self.frame.is_none() {
            return Err(MediaError::NoSource);
        }
        if let Some(reason) = &self.blocked {
            return Err(MediaError::PlaybackBlocked(reason.clone()));
        }
        if !self.paused {
            return Ok(());
        }
        if self.ended {
            self.ended = false;
            self.current_time = 0.0;
        }
        self.paused = false;
        self.emit(MediaEvent::Playing);
        Ok(())
    }

    fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.emit(MediaEvent::Paused);
        }
    }

    fn set_current_time(&mut self, seconds: f64) {
        let upper = if self.duration.is_finite() {
            self.duration
        } else {
            f64::MAX
        };
        self.current_time = seconds.clamp(0.0, upper);
        if self.ended && self.current_time < self.duration {
            self.ended = false;
        }
        self.emit(MediaEvent::TimeUpdate);
    }

    fn set_muted(&mut self, muted: bool) {
        if muted != self.muted {
            self.muted = muted;
            self.emit(MediaEvent::VolumeChange);
        }
    }

    fn frame(&self) -> Option<VideoFrame<'_>> {
        self.frame.as_ref().map(|image| VideoFrame {
            image,
            revision: self.frame_revision,
        })
    }
}
