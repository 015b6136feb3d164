use super::{Mount, MountContext, RenderState, Renderer, RendererKind};
use crate::{LayoutStyle, PopupContent, PopupLayout};
use tracing::{debug, warn};

/// Text part shared by every renderer
#[derive(Debug)]
pub(crate) struct PopupBody {
    content: PopupContent,
    pub(crate) layout: PopupLayout,
    pub(crate) state: RenderState,
}

impl PopupBody {
    pub(crate) fn new(content: PopupContent) -> Self {
        Self {
            content,
            layout: PopupLayout::new(LayoutStyle::default()),
            state: RenderState::Idle,
        }
    }

    /// Lay out title and message. Returns `false` when already mounted.
    pub(crate) fn mount_text(&mut self, kind: RendererKind, style: LayoutStyle, with_frame: bool) -> bool {
        if self.state != RenderState::Idle {
            warn!("{:?} renderer mounted twice (state {:?})", kind, self.state);
            return false;
        }
        self.layout = PopupLayout::from_content(style, &self.content, with_frame);
        true
    }

    pub(crate) fn reveal(&mut self) {
        self.layout.visible = true;
        self.state = RenderState::Visible;
    }

    pub(crate) fn is_unmounted(&self) -> bool {
        self.state == RenderState::Unmounted
    }

    /// Drop everything laid out and mark the popup unmounted
    pub(crate) fn clear(&mut self) {
        self.layout = PopupLayout::new(self.layout.style);
        self.state = RenderState::Unmounted;
    }

    pub(crate) fn ignore(&self, kind: RendererKind, event: &'static str) {
        debug!("{:?} renderer in state {:?} ignoring {}", kind, self.state, event);
    }
}

/// Title and message only
#[derive(Debug)]
pub struct TextRenderer {
    body: PopupBody,
}

impl TextRenderer {
    pub fn new(content: PopupContent) -> Self {
        Self {
            body: PopupBody::new(content),
        }
    }
}

impl Renderer for TextRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Text
    }

    fn state(&self) -> RenderState {
        self.body.state
    }

    fn layout(&self) -> &PopupLayout {
        &self.body.layout
    }

    fn mount(&mut self, ctx: &MountContext) -> Mount {
        if self.body.mount_text(self.kind(), ctx.style, false) {
            self.body.reveal();
        }
        self.body.state.into()
    }

    fn unmount(&mut self) {
        if !self.body.is_unmounted() {
            self.body.clear();
        }
    }
}
