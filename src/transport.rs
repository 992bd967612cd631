//! Transport commands and the seek bar visual.
//!
//! [`Transport::apply`] performs a routed [`Command`] against the media
//! element. It never fails: refused playback is logged and the UI is left as
//! it was. The caller learns from the returned [`TransportOutcome`] whether the
//! seek bar needs a refresh or the session should end.

use crate::interaction::Command;
use crate::media::{MediaElement, ReadyState};

/// Fill state of the seek bar, derived from current time and duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekBarVisual {
    /// Played fraction in `[0, 1]`; 0 when the duration is unknown.
    pub fraction: f32,
    /// Horizontal scale of the full-width progress quad.
    pub scale_x: f32,
}

impl SeekBarVisual {
    /// Smallest scale the progress quad is given, so it never degenerates.
    pub const MIN_SCALE: f32 = 1e-4;

    /// Visual for `current_time` of `duration` seconds.
    ///
    /// Unknown, infinite or zero durations collapse the bar to its left end.
    pub fn from_times(current_time: f64, duration: f64) -> Self {
        if duration.is_finite() && duration > 0.0 {
            let fraction = (current_time / duration).clamp(0.0, 1.0) as f32;
            Self {
                fraction,
                scale_x: fraction.max(Self::MIN_SCALE),
            }
        } else {
            Self::collapsed()
        }
    }

    pub fn from_media<M: MediaElement + ?Sized>(media: &M) -> Self {
        Self::from_times(media.current_time(), media.duration())
    }

    pub fn collapsed() -> Self {
        Self {
            fraction: 0.0,
            scale_x: Self::MIN_SCALE,
        }
    }

    /// Center of the scaled quad that keeps its left edge on the track's
    /// left end.
    pub fn center_x(&self, track_width: f32) -> f32 {
        -track_width / 2.0 + track_width * self.scale_x / 2.0
    }
}

/// What the caller should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOutcome {
    /// The media was touched; refresh the seek bar when `seeked` is set.
    Applied { seeked: bool },
    /// A precondition was not met; nothing changed.
    Skipped,
    /// The user asked to leave the immersive session.
    ExitRequested,
}

/// Applies transport commands to a media element.
#[derive(Debug, Clone, Copy)]
pub struct Transport {
    skip_seconds: f64,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(15.0)
    }
}

impl Transport {
    pub fn new(skip_seconds: f64) -> Self {
        Self {
            skip_seconds: skip_seconds.abs(),
        }
    }

    pub fn apply<M: MediaElement + ?Sized>(
        &self,
        media: &mut M,
        command: Command,
    ) -> TransportOutcome {
        match command {
            Command::PlayPause => Self::play_pause(media),
            Command::Rewind => {
                media.set_current_time((media.current_time() - self.skip_seconds).max(0.0));
                TransportOutcome::Applied { seeked: true }
            }
            Command::Forward => {
                if !media.has_finite_duration() {
                    return TransportOutcome::Skipped;
                }
                let target = (media.current_time() + self.skip_seconds).min(media.duration());
                media.set_current_time(target);
                TransportOutcome::Applied { seeked: true }
            }
            Command::VolumeToggle => {
                media.set_muted(!media.muted());
                TransportOutcome::Applied { seeked: false }
            }
            Command::Seek { fraction } => {
                if !media.has_finite_duration() {
                    return TransportOutcome::Skipped;
                }
                media.set_current_time(fraction.clamp(0.0, 1.0) * media.duration());
                TransportOutcome::Applied { seeked: true }
            }
            Command::Exit => TransportOutcome::ExitRequested,
            Command::TogglePanel => TransportOutcome::Skipped,
        }
    }

    fn play_pause<M: MediaElement + ?Sized>(media: &mut M) -> TransportOutcome {
        if !media.has_source() {
            log::warn!("play/pause ignored: no media source");
            return TransportOutcome::Skipped;
        }
        if media.paused() || media.ended() {
            if media.ready_state() >= ReadyState::HaveEnoughData || media.has_source() {
                if let Err(err) = media.play() {
                    log::warn!("playback did not start: {err}");
                }
            }
        } else {
            media.pause();
        }
        TransportOutcome::Applied { seeked: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::SyntheticMedia;
    use image::RgbaImage;

    fn media(duration: f64, at: f64) -> SyntheticMedia {
        let mut media = SyntheticMedia::new(Some(RgbaImage::new(2, 1)), duration);
        media.set_current_time(at);
        media
    }

    #[test]
    fn forward_from_ten_seconds() {
        let mut m = media(120.0, 10.0);
        let outcome = Transport::default().apply(&mut m, Command::Forward);
        assert_eq!(outcome, TransportOutcome::Applied { seeked: true });
        assert_eq!(m.current_time(), 25.0);
        let visual = SeekBarVisual::from_media(&m);
        assert!((visual.fraction - 0.208).abs() < 1e-3);
    }

    #[test]
    fn rewind_and_forward_clamp() {
        let transport = Transport::default();
        let mut m = media(120.0, 4.0);
        transport.apply(&mut m, Command::Rewind);
        assert_eq!(m.current_time(), 0.0);

        let mut m = media(120.0, 110.0);
        transport.apply(&mut m, Command::Forward);
        assert_eq!(m.current_time(), 120.0);
    }

    #[test]
    fn forward_and_seek_need_finite_duration() {
        let transport = Transport::default();
        let mut m = media(f64::INFINITY, 30.0);
        assert_eq!(transport.apply(&mut m, Command::Forward), TransportOutcome::Skipped);
        assert_eq!(
            transport.apply(&mut m, Command::Seek { fraction: 0.5 }),
            TransportOutcome::Skipped
        );
        assert_eq!(m.current_time(), 30.0);

        transport.apply(&mut m, Command::Rewind);
        assert_eq!(m.current_time(), 15.0);
    }

    #[test]
    fn seek_uses_clamped_fraction() {
        let transport = Transport::default();
        let mut m = media(200.0, 0.0);
        transport.apply(&mut m, Command::Seek { fraction: 0.25 });
        assert_eq!(m.current_time(), 50.0);
        transport.apply(&mut m, Command::Seek { fraction: 1.7 });
        assert_eq!(m.current_time(), 200.0);
    }

    #[test]
    fn play_pause_toggles_and_swallows_refusal() {
        let transport = Transport::default();
        let mut m = media(60.0, 0.0);
        transport.apply(&mut m, Command::PlayPause);
        assert!(!m.paused());
        transport.apply(&mut m, Command::PlayPause);
        assert!(m.paused());

        m.block_playback("autoplay policy");
        let outcome = transport.apply(&mut m, Command::PlayPause);
        assert_eq!(outcome, TransportOutcome::Applied { seeked: false });
        assert!(m.paused());
    }

    #[test]
    fn play_pause_without_source_is_skipped() {
        let mut m = SyntheticMedia::new(None, 60.0);
        assert_eq!(
            Transport::default().apply(&mut m, Command::PlayPause),
            TransportOutcome::Skipped
        );
    }

    #[test]
    fn volume_toggles_mute() {
        let mut m = media(60.0, 0.0);
        Transport::default().apply(&mut m, Command::VolumeToggle);
        assert!(m.muted());
        Transport::default().apply(&mut m, Command::VolumeToggle);
        assert!(!m.muted());
    }

    #[test]
    fn exit_is_reported_to_caller() {
        let mut m = media(60.0, 0.0);
        assert_eq!(
            Transport::default().apply(&mut m, Command::Exit),
            TransportOutcome::ExitRequested
        );
    }

    #[test]
    fn seek_visual_is_left_anchored() {
        let w = 2.0;
        let half = SeekBarVisual::from_times(30.0, 60.0);
        assert_eq!(half.scale_x, 0.5);
        assert_eq!(half.center_x(w), -0.5);
        // Left edge stays at -w/2.
        assert_eq!(half.center_x(w) - w * half.scale_x / 2.0, -1.0);

        let start = SeekBarVisual::from_times(0.0, 60.0);
        assert_eq!(start.scale_x, SeekBarVisual::MIN_SCALE);

        let unknown = SeekBarVisual::from_times(30.0, f64::NAN);
        assert_eq!(unknown, SeekBarVisual::collapsed());
        let zero = SeekBarVisual::from_times(0.0, 0.0);
        assert_eq!(zero, SeekBarVisual::collapsed());
    }
}
