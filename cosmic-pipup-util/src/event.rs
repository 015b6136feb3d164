//! Hand-off of asynchronous completions to the UI thread.
//!
//! Fetch workers and playback backends never touch renderer state. They post a
//! [`MediaEvent`] through a [`UiHandle`]; the host drains the matching
//! receiver on its UI thread and feeds each event to the popup's renderer.

use crate::{DecodedImage, FetchError, PlaybackError};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Identifier the host assigns to each popup
pub type PopupId = u32;

/// Completion of asynchronous media work
#[derive(Debug, Clone)]
pub enum MediaEvent {
    ImageLoaded(DecodedImage),
    ImageFailed(FetchError),
    /// The player is ready; size reports may follow
    VideoPrepared,
    /// Natural video dimensions became known or changed
    VideoSizeChanged { width: u32, height: u32 },
    PlaybackFailed(PlaybackError),
}

impl MediaEvent {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            MediaEvent::ImageLoaded(_) => "image-loaded",
            MediaEvent::ImageFailed(_) => "image-failed",
            MediaEvent::VideoPrepared => "video-prepared",
            MediaEvent::VideoSizeChanged { .. } => "video-size-changed",
            MediaEvent::PlaybackFailed(_) => "playback-failed",
        }
    }
}

/// A [`MediaEvent`] addressed to one popup
#[derive(Debug, Clone)]
pub struct UiEvent {
    pub popup: PopupId,
    pub event: MediaEvent,
}

/// Sending half of the UI thread's event queue
#[derive(Debug, Clone)]
pub struct UiQueue {
    tx: UnboundedSender<UiEvent>,
}

impl UiQueue {
    /// Create a queue and the receiver the UI thread drains
    pub fn channel() -> (Self, UnboundedReceiver<UiEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }

    /// Sender scoped to one popup
    pub fn handle(&self, popup: PopupId) -> UiHandle {
        UiHandle {
            popup,
            tx: self.tx.clone(),
        }
    }
}

/// Posts events for one popup to the UI thread. Safe to use from any thread.
#[derive(Debug, Clone)]
pub struct UiHandle {
    popup: PopupId,
    tx: UnboundedSender<UiEvent>,
}

impl UiHandle {
    pub fn popup(&self) -> PopupId {
        self.popup
    }

    /// Queue `event`; returns `false` when the UI side is gone.
    pub fn post(&self, event: MediaEvent) -> bool {
        let name = event.name();
        match self.tx.send(UiEvent {
            popup: self.popup,
            event,
        }) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(
                    "UI queue closed, dropping {} event for popup {}",
                    name,
                    self.popup
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_tags_events_with_popup() {
        let (queue, mut rx) = UiQueue::channel();
        let handle = queue.handle(7);

        assert!(handle.post(MediaEvent::VideoPrepared));
        let event = rx.try_recv().unwrap();
        assert_eq!(event.popup, 7);
        assert!(matches!(event.event, MediaEvent::VideoPrepared));
    }

    #[test]
    fn test_post_after_receiver_dropped() {
        let (queue, rx) = UiQueue::channel();
        drop(rx);
        assert!(!queue.handle(1).post(MediaEvent::VideoPrepared));
    }

    #[test]
    fn test_events_from_other_threads() {
        let (queue, mut rx) = UiQueue::channel();
        let handle = queue.handle(3);

        std::thread::spawn(move || {
            handle.post(MediaEvent::VideoSizeChanged {
                width: 640,
                height: 360,
            });
        })
        .join()
        .unwrap();

        match rx.try_recv().unwrap().event {
            MediaEvent::VideoSizeChanged { width, height } => {
                assert_eq!((width, height), (640, 360));
            }
            other => panic!("Unexpected event {}", other.name()),
        }
    }
}
