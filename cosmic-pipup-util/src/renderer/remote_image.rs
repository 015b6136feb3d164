use super::text::PopupBody;
use super::{Mount, MountContext, REVEAL_GRACE, RenderState, Renderer, RendererKind};
use crate::{
    FetchHandle, FetchRequest, FrameContent, FrameHeight, MediaEvent, PopupContent, PopupLayout,
};
use tracing::{debug, warn};
use url::Url;

/// Image fetched by reference.
///
/// The popup stays hidden until the fetch completes. A failed fetch removes
/// the media frame and shows the popup as text only.
#[derive(Debug)]
pub struct ImageRenderer {
    body: PopupBody,
    uri: Url,
    width: u32,
    fetch: Option<FetchHandle>,
}

impl ImageRenderer {
    pub fn new(content: PopupContent, uri: Url, width: u32) -> Self {
        Self {
            body: PopupBody::new(content),
            uri,
            width,
            fetch: None,
        }
    }

    fn degrade_to_text(&mut self) {
        self.fetch = None;
        self.body.layout.remove_frame();
        self.body.reveal();
    }
}

impl Renderer for ImageRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Image
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
            frame.width = self.width;
            frame.height = FrameHeight::WrapContent;
        }
        self.body.state = RenderState::Pending;

        debug!("Fetching popup image {}", self.uri);
        self.fetch = Some(ctx.services.fetcher.fetch(
            FetchRequest {
                uri: self.uri.clone(),
                timeout: ctx.fetch_timeout,
            },
            ctx.ui.clone(),
        ));

        Mount::Deferred {
            timeout: Some(ctx.fetch_timeout + REVEAL_GRACE),
        }
    }

    fn handle(&mut self, event: MediaEvent) {
        if self.body.state != RenderState::Pending {
            self.body.ignore(self.kind(), event.name());
            return;
        }

        match event {
            MediaEvent::ImageLoaded(image) => {
                self.fetch = None;
                if let Some(frame) = self.body.layout.frame_mut() {
                    frame.content = FrameContent::Image(image);
                }
                self.body.reveal();
            }
            MediaEvent::ImageFailed(e) => {
                warn!("Failed to load popup image {}: {}", self.uri, e);
                self.degrade_to_text();
            }
            other => self.body.ignore(self.kind(), other.name()),
        }
    }

    fn reveal_timed_out(&mut self) {
        if self.body.state != RenderState::Pending {
            return;
        }
        warn!("Popup image {} did not arrive in time", self.uri);
        if let Some(fetch) = &self.fetch {
            fetch.cancel();
        }
        self.degrade_to_text();
    }

    fn unmount(&mut self) {
        if self.body.is_unmounted() {
            return;
        }
        if let Some(fetch) = self.fetch.take() {
            debug!("Cancelling fetch of {}", self.uri);
            fetch.cancel();
        }
        self.body.clear();
    }
}
