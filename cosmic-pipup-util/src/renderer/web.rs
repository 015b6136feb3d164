use super::text::PopupBody;
use super::{Mount, MountContext, RenderState, Renderer, RendererKind, TeardownError};
use crate::{
    ContentError, ContentSettings, ContentSurface, FrameContent, FrameHeight, PopupContent,
    PopupLayout,
};
use tracing::warn;
use url::Url;

/// Web page in a fixed-size frame
pub struct WebRenderer {
    body: PopupBody,
    uri: Url,
    width: u32,
    height: u32,
    surface: Option<Box<dyn ContentSurface>>,
}

impl WebRenderer {
    pub fn new(content: PopupContent, uri: Url, width: u32, height: u32) -> Self {
        Self {
            body: PopupBody::new(content),
            uri,
            width,
            height,
            surface: None,
        }
    }
}

impl std::fmt::Debug for WebRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebRenderer")
            .field("uri", &self.uri)
            .field("size", &(self.width, self.height))
            .field("state", &self.body.state)
            .finish_non_exhaustive()
    }
}

impl Renderer for WebRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Web
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

        let settings = ContentSettings::default();
        let mut surface = ctx.services.content.create_surface(self.width, self.height);
        if let Err(e) = surface.load(&self.uri, &settings) {
            warn!("Web popup {} failed to load: {}", self.uri, e);
        }
        self.surface = Some(surface);

        if let Some(frame) = self.body.layout.frame_mut() {
            frame.width = self.width;
            frame.height = FrameHeight::Fixed(self.height);
            frame.content = FrameContent::Web {
                uri: self.uri.clone(),
                settings,
            };
        }

        self.body.reveal();
        Mount::Visible
    }

    fn open_content(&self) -> Result<(), ContentError> {
        self.surface.as_ref().ok_or(ContentError::Closed)?.open()
    }

    fn unmount(&mut self) {
        if self.body.state == RenderState::Unmounted {
            return;
        }
        if let Some(mut surface) = self.surface.take() {
            if let Err(e) = surface.close().map_err(TeardownError::from) {
                warn!("Error closing web popup {}: {}", self.uri, e);
            }
        }
        self.body.clear();
    }
}
