//! Popup renderers.
//!
//! Every [`MediaVariant`] has exactly one renderer. A renderer is built
//! without side effects by [`build`], then driven through a two-phase
//! lifecycle on the host's UI thread:
//!
//! 1. [`Renderer::mount`] lays out the popup and starts any media work.
//! 2. [`Renderer::handle`] receives that work's completions, which may reveal
//!    the popup.
//! 3. [`Renderer::unmount`] releases everything. It may be called any number
//!    of times and never fails.

mod bitmap;
mod remote_image;
mod text;
mod video;
mod web;

pub use bitmap::BitmapRenderer;
pub use remote_image::ImageRenderer;
pub use text::TextRenderer;
pub use video::VideoRenderer;
pub use web::WebRenderer;

use crate::{
    ContentBackend, ContentError, ExternalBrowserBackend, HttpImageFetcher, ImageFetcher,
    ImagePlaybackBackend, LayoutStyle, MediaEvent, MediaVariant, PlaybackBackend, PlaybackError,
    Player, PopupDescription, PopupLayout, UiHandle,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Extra time granted after a fetch timeout before the host gives up on it
pub const REVEAL_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererKind {
    Text,
    Image,
    Bitmap,
    Video,
    Web,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// Built, not mounted yet
    Idle,
    /// Mounted but hidden until media arrives
    Pending,
    Visible,
    /// Media failed and the popup should be dismissed
    Failed,
    Unmounted,
}

/// Outcome of [`Renderer::mount`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mount {
    Visible,
    /// Hidden until a completion arrives. When `timeout` elapses first the
    /// host calls [`Renderer::reveal_timed_out`].
    Deferred { timeout: Option<Duration> },
    Failed,
}

impl From<RenderState> for Mount {
    fn from(state: RenderState) -> Self {
        match state {
            RenderState::Visible => Mount::Visible,
            RenderState::Idle | RenderState::Pending => Mount::Deferred { timeout: None },
            RenderState::Failed | RenderState::Unmounted => Mount::Failed,
        }
    }
}

/// Platform collaborators available to renderers
#[derive(Clone)]
pub struct Services {
    pub fetcher: Arc<dyn ImageFetcher>,
    pub playback: Arc<dyn PlaybackBackend>,
    pub content: Arc<dyn ContentBackend>,
}

impl Services {
    /// The collaborators used on a desktop without embedded media support:
    /// HTTP fetching, image-based playback and an external browser
    pub fn desktop(fetch_timeout: Duration) -> Self {
        Self {
            fetcher: Arc::new(HttpImageFetcher),
            playback: Arc::new(ImagePlaybackBackend::new(fetch_timeout)),
            content: Arc::new(ExternalBrowserBackend),
        }
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

/// Everything a renderer needs while mounting
#[derive(Debug, Clone)]
pub struct MountContext {
    pub services: Services,
    /// Completions for this popup are posted here
    pub ui: UiHandle,
    pub style: LayoutStyle,
    pub fetch_timeout: Duration,
    /// `None` waits for video preparation indefinitely
    pub video_prepare_timeout: Option<Duration>,
}

pub trait Renderer: Send {
    fn kind(&self) -> RendererKind;

    fn state(&self) -> RenderState;

    fn layout(&self) -> &PopupLayout;

    fn mount(&mut self, ctx: &MountContext) -> Mount;

    /// Apply a media completion. Completions that arrive after unmount, or
    /// that the renderer does not expect, are ignored.
    fn handle(&mut self, event: MediaEvent) {
        tracing::debug!(
            "{:?} renderer ignoring {} event",
            self.kind(),
            event.name()
        );
    }

    /// The deadline returned by [`Mount::Deferred`] elapsed
    fn reveal_timed_out(&mut self) {}

    fn unmount(&mut self);

    fn player(&self) -> Option<&dyn Player> {
        None
    }

    /// Hand the popup's web content to the content surface's outside view
    fn open_content(&self) -> Result<(), ContentError> {
        Err(ContentError::NoPage)
    }
}

/// Build the renderer for a description's media variant
pub fn build(description: PopupDescription) -> Box<dyn Renderer> {
    let (content, media) = description.into_parts();
    match media {
        MediaVariant::None => Box::new(TextRenderer::new(content)),
        MediaVariant::Image { uri, width } => Box::new(ImageRenderer::new(content, uri, width)),
        MediaVariant::Bitmap { pixels, width } => {
            Box::new(BitmapRenderer::new(content, pixels, width))
        }
        MediaVariant::Video { uri, width } => Box::new(VideoRenderer::new(content, uri, width)),
        MediaVariant::Web { uri, width, height } => {
            Box::new(WebRenderer::new(content, uri, width, height))
        }
    }
}

/// Build and mount in one step
pub fn mount_popup(description: PopupDescription, ctx: &MountContext) -> (Box<dyn Renderer>, Mount) {
    let mut renderer = build(description);
    let mount = renderer.mount(ctx);
    (renderer, mount)
}

/// Failures while tearing a renderer down. Logged, never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownError {
    Playback(PlaybackError),
    Content(ContentError),
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownError::Playback(e) => write!(f, "Playback teardown failed: {}", e),
            TeardownError::Content(e) => write!(f, "Content teardown failed: {}", e),
        }
    }
}

impl std::error::Error for TeardownError {}

impl From<PlaybackError> for TeardownError {
    fn from(e: PlaybackError) -> Self {
        TeardownError::Playback(e)
    }
}

impl From<ContentError> for TeardownError {
    fn from(e: ContentError) -> Self {
        TeardownError::Content(e)
    }
}
