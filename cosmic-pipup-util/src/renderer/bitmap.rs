use super::text::PopupBody;
use super::{Mount, MountContext, RenderState, Renderer, RendererKind};
use crate::decoded_image::scaled_height;
use crate::{DecodedImage, FrameContent, FrameHeight, PopupContent, PopupLayout};
use tracing::debug;

/// Pixels supplied with the request. Shown synchronously.
#[derive(Debug)]
pub struct BitmapRenderer {
    body: PopupBody,
    pixels: Option<DecodedImage>,
    width: u32,
}

impl BitmapRenderer {
    pub fn new(content: PopupContent, pixels: DecodedImage, width: u32) -> Self {
        Self {
            body: PopupBody::new(content),
            pixels: Some(pixels),
            width,
        }
    }

    /// Pixels still owned by this renderer
    pub fn pixels(&self) -> Option<&DecodedImage> {
        self.pixels.as_ref()
    }
}

impl Renderer for BitmapRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Bitmap
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

        if let (Some(pixels), Some(frame)) = (&self.pixels, self.body.layout.frame_mut()) {
            let height = scaled_height(self.width, pixels.width(), pixels.height());
            frame.width = self.width;
            frame.height = FrameHeight::Fixed(height);
            frame.content = FrameContent::Image(pixels.clone());
        }

        self.body.reveal();
        Mount::Visible
    }

    fn unmount(&mut self) {
        if self.body.is_unmounted() {
            return;
        }
        if let Some(pixels) = self.pixels.take() {
            debug!("Releasing {} bytes of popup bitmap", pixels.byte_size());
        }
        self.body.clear();
    }
}
