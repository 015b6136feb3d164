use super::text::PopupBody;
use super::{Mount, MountContext, RenderState, Renderer, RendererKind, TeardownError};
use crate::decoded_image::scaled_height;
use crate::{FrameContent, FrameHeight, MediaEvent, Player, PopupContent, PopupLayout};
use tracing::{debug, error, warn};
use url::Url;

/// Video played by reference.
///
/// The frame starts at 1x1 and the popup stays hidden until the player is
/// prepared and reports the video's natural size.
pub struct VideoRenderer {
    body: PopupBody,
    uri: Url,
    width: u32,
    player: Option<Box<dyn Player>>,
    prepared: bool,
}

impl VideoRenderer {
    pub fn new(content: PopupContent, uri: Url, width: u32) -> Self {
        Self {
            body: PopupBody::new(content),
            uri,
            width,
            player: None,
            prepared: false,
        }
    }

    fn fail(&mut self, reason: &dyn std::fmt::Display) {
        error!("Video popup {} failed: {}", self.uri, reason);
        self.body.state = RenderState::Failed;
    }

    fn teardown_player(&mut self) -> Result<(), TeardownError> {
        let Some(mut player) = self.player.take() else {
            return Ok(());
        };
        let stopped = if player.is_playing() {
            player.stop()
        } else {
            Ok(())
        };
        player.release();
        stopped.map_err(TeardownError::from)
    }
}

impl std::fmt::Debug for VideoRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoRenderer")
            .field("uri", &self.uri)
            .field("width", &self.width)
            .field("state", &self.body.state)
            .field("prepared", &self.prepared)
            .finish_non_exhaustive()
    }
}

impl Renderer for VideoRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Video
    }

    fn state(&self) -> RenderState {
        self.body.state
    }

    fn layout(&self) -> &PopupLayout {
        &self.body.layout
    }

    fn mount(&mut self, ctx: &MountContext) -> Mount {
        if !self.body.mount_text(self.kind(), ctx.style, true) {
            return self.body.state.into();
        }
        if let Some(frame) = self.body.layout.frame_mut() {
            frame.width = 1;
            frame.height = FrameHeight::Fixed(1);
            frame.content = FrameContent::Video;
        }
        self.body.state = RenderState::Pending;

        let mut player = ctx.services.playback.create_player(ctx.ui.clone());
        let started = player.load(&self.uri).and_then(|()| player.start());
        self.player = Some(player);

        match started {
            Ok(()) => Mount::Deferred {
                timeout: ctx.video_prepare_timeout,
            },
            Err(e) => {
                self.fail(&e);
                Mount::Failed
            }
        }
    }

    fn handle(&mut self, event: MediaEvent) {
        if !matches!(self.body.state, RenderState::Pending | RenderState::Visible) {
            self.body.ignore(self.kind(), event.name());
            return;
        }

        match event {
            MediaEvent::VideoPrepared => {
                debug!("Video {} prepared", self.uri);
                self.prepared = true;
            }
            MediaEvent::VideoSizeChanged { width, height } => {
                if !self.prepared {
                    debug!("Ignoring size report for unprepared video {}", self.uri);
                    return;
                }
                if width == 0 || height == 0 {
                    debug!("Ignoring empty size report for video {}", self.uri);
                    return;
                }
                if let Some(frame) = self.body.layout.frame_mut() {
                    frame.width = self.width;
                    frame.height = FrameHeight::Fixed(scaled_height(self.width, width, height));
                }
                if self.body.state == RenderState::Pending {
                    self.body.reveal();
                }
            }
            MediaEvent::PlaybackFailed(e) => self.fail(&e),
            other => self.body.ignore(self.kind(), other.name()),
        }
    }

    fn reveal_timed_out(&mut self) {
        if self.body.state == RenderState::Pending {
            self.fail(&"preparation timed out");
        }
    }

    fn unmount(&mut self) {
        if self.body.is_unmounted() {
            return;
        }
        if let Err(e) = self.teardown_player() {
            warn!("Error tearing down video {}: {}", self.uri, e);
        }
        self.prepared = false;
        self.body.clear();
    }

    fn player(&self) -> Option<&dyn Player> {
        self.player.as_deref()
    }
}
