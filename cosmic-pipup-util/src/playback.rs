//! Media playback seam.
//!
//! A [`PlaybackBackend`] hands out one [`Player`] per video popup. Players
//! report preparation and size changes asynchronously through the popup's
//! [`UiHandle`], never by calling back into the renderer.

use crate::fetch::{load_bytes, DEFAULT_FETCH_TIMEOUT};
use crate::{DecodedImage, FetchHandle, MediaEvent, UiHandle};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// A single media player
pub trait Player: Send {
    /// Begin preparing `uri`. Completion arrives as [`MediaEvent::VideoPrepared`].
    fn load(&mut self, uri: &Url) -> Result<(), PlaybackError>;

    /// Start playback, or start as soon as preparation completes
    fn start(&mut self) -> Result<(), PlaybackError>;

    fn is_playing(&self) -> bool;

    fn stop(&mut self) -> Result<(), PlaybackError>;

    /// Free all resources. The player is unusable afterwards.
    fn release(&mut self);

    /// Decoded picture for hosts that draw frames themselves
    fn picture(&self) -> Option<&DecodedImage> {
        None
    }

    /// Playback position, used by hosts to pick the frame to draw
    fn position(&self) -> Duration {
        Duration::ZERO
    }
}

pub trait PlaybackBackend: Send + Sync {
    fn create_player(&self, ui: UiHandle) -> Box<dyn Player>;
}

/// Playback errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// Format the backend cannot play
    Unsupported(String),
    /// Media could not be loaded
    Load(String),
    /// Operation requires a loaded player
    NotPrepared,
    /// Stopping playback failed
    Stop(String),
    /// Preparation did not complete in time
    Timeout,
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::Unsupported(e) => write!(f, "Unsupported media: {}", e),
            PlaybackError::Load(e) => write!(f, "Failed to load media: {}", e),
            PlaybackError::NotPrepared => write!(f, "Player has no media loaded"),
            PlaybackError::Stop(e) => write!(f, "Failed to stop playback: {}", e),
            PlaybackError::Timeout => write!(f, "Media preparation timed out"),
        }
    }
}

impl std::error::Error for PlaybackError {}

/// Plays animated GIFs and still images as video.
///
/// Anything the image decoder cannot read fails with
/// [`PlaybackError::Unsupported`].
#[derive(Debug, Clone, Copy)]
pub struct ImagePlaybackBackend {
    timeout: Duration,
}

impl ImagePlaybackBackend {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ImagePlaybackBackend {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl PlaybackBackend for ImagePlaybackBackend {
    fn create_player(&self, ui: UiHandle) -> Box<dyn Player> {
        Box::new(ImagePlayer::new(ui, self.timeout))
    }
}

pub struct ImagePlayer {
    ui: UiHandle,
    timeout: Duration,
    picture: Arc<OnceCell<DecodedImage>>,
    loading: Option<FetchHandle>,
    play_requested: bool,
    started_at: Option<Instant>,
    released: bool,
}

impl ImagePlayer {
    pub fn new(ui: UiHandle, timeout: Duration) -> Self {
        Self {
            ui,
            timeout,
            picture: Arc::new(OnceCell::new()),
            loading: None,
            play_requested: false,
            started_at: None,
            released: false,
        }
    }

    fn prepared(&self) -> bool {
        self.picture.get().is_some()
    }
}

impl Player for ImagePlayer {
    fn load(&mut self, uri: &Url) -> Result<(), PlaybackError> {
        if self.released {
            return Err(PlaybackError::NotPrepared);
        }
        if let Some(previous) = self.loading.take() {
            previous.cancel();
        }

        let cancel = FetchHandle::new();
        let worker_cancel = cancel.clone();
        let picture = Arc::clone(&self.picture);
        let ui = self.ui.clone();
        let uri = uri.clone();
        let timeout = self.timeout;

        thread::Builder::new()
            .name("media-prepare".into())
            .spawn(move || {
                let result = load_bytes(&uri, timeout, &worker_cancel)
                    .map_err(|e| PlaybackError::Load(e.to_string()))
                    .and_then(|bytes| {
                        DecodedImage::from_bytes(&bytes)
                            .map_err(|e| PlaybackError::Unsupported(e.to_string()))
                    });

                if worker_cancel.is_cancelled() {
                    debug!("Preparation of {} abandoned", uri);
                    return;
                }

                match result {
                    Ok(image) => {
                        let (width, height) = (image.width(), image.height());
                        if picture.set(image).is_err() {
                            warn!("Player for {} was already prepared", uri);
                            return;
                        }
                        ui.post(MediaEvent::VideoPrepared);
                        ui.post(MediaEvent::VideoSizeChanged { width, height });
                    }
                    Err(e) => {
                        ui.post(MediaEvent::PlaybackFailed(e));
                    }
                }
            })
            .map_err(|e| PlaybackError::Load(e.to_string()))?;

        self.loading = Some(cancel);
        Ok(())
    }

    fn start(&mut self) -> Result<(), PlaybackError> {
        if self.released || (self.loading.is_none() && !self.prepared()) {
            return Err(PlaybackError::NotPrepared);
        }
        self.play_requested = true;
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn is_playing(&self) -> bool {
        !self.released && self.play_requested && self.prepared()
    }

    fn stop(&mut self) -> Result<(), PlaybackError> {
        if self.released {
            return Err(PlaybackError::Stop("player already released".into()));
        }
        self.play_requested = false;
        self.started_at = None;
        Ok(())
    }

    fn release(&mut self) {
        if let Some(loading) = self.loading.take() {
            loading.cancel();
        }
        self.picture = Arc::new(OnceCell::new());
        self.play_requested = false;
        self.started_at = None;
        self.released = true;
    }

    fn picture(&self) -> Option<&DecodedImage> {
        self.picture.get()
    }

    fn position(&self) -> Duration {
        match self.started_at {
            Some(started) if self.is_playing() => started.elapsed(),
            _ => Duration::ZERO,
        }
    }
}
