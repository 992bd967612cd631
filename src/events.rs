//! The player's event channel.
//!
//! Everything that happens *to* the player (controller triggers, media state
//! changes, session grants and terminations, graphics context loss) arrives as
//! a [`PlayerEvent`] on one queue. The player drains the queue on its own
//! thread, so the order in which events are handled is the order in which they
//! were sent, and stale continuations are recognized in one place by comparing
//! request tickets and session ids.

use crate::error::XrError;
use crate::interaction::ControllerPose;
use crate::media::MediaEvent;
use crate::session::{RequestTicket, SessionId, XrSession};
use std::sync::mpsc::{self, Receiver, Sender};

/// Something the player must react to.
#[derive(Debug)]
pub enum PlayerEvent {
    /// The controller's trigger was pressed.
    Trigger(ControllerPose),
    /// The controller moved. Only updates the pointer beam.
    ControllerMoved(ControllerPose),
    /// The page's enter/exit control was clicked.
    ToggleSession,
    /// The media element changed state.
    Media(MediaEvent),
    /// The platform granted a session request.
    SessionGranted {
        ticket: RequestTicket,
        session: Box<dyn XrSession>,
    },
    /// The platform refused a session request.
    SessionRejected { ticket: RequestTicket, error: XrError },
    /// A session ended, whether we asked for it or not.
    SessionEnded(SessionId),
    /// The graphics context was lost.
    ContextLost,
    /// The graphics context came back.
    ContextRestored,
    /// The flat (non-immersive) view changed size.
    Resized { width: u32, height: u32 },
}

/// Cloneable handle for posting events to the player.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<PlayerEvent>,
}

impl EventSender {
    /// Queue an event. Events sent after the player is gone are dropped.
    pub fn send(&self, event: PlayerEvent) {
        if let Err(mpsc::SendError(event)) = self.tx.send(event) {
            log::debug!("player is gone, dropping {event:?}");
        }
    }

    pub fn media(&self, event: MediaEvent) {
        self.send(PlayerEvent::Media(event));
    }
}

/// Create a connected sender/receiver pair.
pub fn channel() -> (EventSender, Receiver<PlayerEvent>) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_send_order() {
        let (tx, rx) = channel();
        tx.send(PlayerEvent::ContextLost);
        tx.media(MediaEvent::Ended);
        tx.send(PlayerEvent::ContextRestored);

        let received: Vec<_> = rx.try_iter().collect();
        assert!(matches!(received[0], PlayerEvent::ContextLost));
        assert!(matches!(received[1], PlayerEvent::Media(MediaEvent::Ended)));
        assert!(matches!(received[2], PlayerEvent::ContextRestored));
    }

    #[test]
    fn sending_after_receiver_dropped_is_silent() {
        let (tx, rx) = channel();
        drop(rx);
        tx.send(PlayerEvent::ToggleSession);
    }
}
