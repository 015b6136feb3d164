use crate::subscriptions::popups::CloseReason;
use crate::widgets::ImageAnimator;
use cosmic::iced_runtime::core::window::Id as SurfaceId;
use cosmic::widget::image::Handle;
use cosmic_pipup_util::{
    DisplayRequest, FrameContent, Mount, MountContext, PopupDescription, RenderState, Renderer,
    UiEvent, mount_popup,
};

/// The popup currently on screen
pub struct ActivePopup {
    pub id: u32,
    pub surface: SurfaceId,
    pub renderer: Box<dyn Renderer>,
    pub animator: ImageAnimator,
}

impl ActivePopup {
    pub fn new(id: u32, surface: SurfaceId, renderer: Box<dyn Renderer>) -> Self {
        let mut popup = Self {
            id,
            surface,
            renderer,
            animator: ImageAnimator::new(),
        };
        popup.sync_media();
        popup
    }

    pub fn is_visible(&self) -> bool {
        self.renderer.layout().visible
    }

    pub fn has_failed(&self) -> bool {
        self.renderer.state() == RenderState::Failed
    }

    /// Pick up pixels that became drawable since the last call
    pub fn sync_media(&mut self) {
        if self.animator.has_image() || !self.is_visible() {
            return;
        }
        let source = match self.renderer.layout().frame.as_ref().map(|f| &f.content) {
            Some(FrameContent::Image(image)) => Some(image),
            Some(FrameContent::Video) => self.renderer.player().and_then(|p| p.picture()),
            _ => None,
        };
        if let Some(image) = source {
            self.animator.set_image(image);
        }
    }

    /// Frame to draw for the popup's media. Video follows its player's
    /// position, images run on the animator's clock.
    pub fn media_frame(&self, animate: bool) -> Option<&Handle> {
        if !animate {
            return self.animator.first();
        }
        match self.renderer.player() {
            Some(player) => self.animator.frame_at(player.position()),
            None => self.animator.current(),
        }
    }

    /// Release the renderer and everything drawn from it
    pub fn unmount(&mut self) {
        self.renderer.unmount();
        self.animator.clear();
    }

    fn settle(&mut self) -> Option<CloseReason> {
        self.sync_media();
        self.has_failed().then_some(CloseReason::Failed)
    }
}

/// Outcome of [`PopupState::show`]
pub struct Shown {
    /// Popup taken off screen to make room, already unmounted
    pub replaced: Option<ActivePopup>,
    pub mount: Mount,
}

/// One popup at a time; a new popup replaces the current one
#[derive(Default)]
pub struct PopupState {
    current: Option<ActivePopup>,
    /// Popup received before media could be mounted
    held: Option<(u32, DisplayRequest)>,
}

impl PopupState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ActivePopup> {
        self.current.as_ref()
    }

    /// The current popup, if it is `id`
    pub fn get(&self, id: u32) -> Option<&ActivePopup> {
        self.current.as_ref().filter(|p| p.id == id)
    }

    fn get_mut(&mut self, id: u32) -> Option<&mut ActivePopup> {
        self.current.as_mut().filter(|p| p.id == id)
    }

    /// Mount `description` as popup `id`, replacing whatever is on screen.
    ///
    /// A popup whose mount fails is unmounted again and never becomes
    /// current.
    pub fn show(
        &mut self,
        id: u32,
        surface: SurfaceId,
        description: PopupDescription,
        ctx: &MountContext,
    ) -> Shown {
        let replaced = self.current.take().map(|mut previous| {
            tracing::debug!("Popup {} replaced by {}", previous.id, id);
            previous.unmount();
            previous
        });

        let (mut renderer, mount) = mount_popup(description, ctx);
        tracing::debug!("Mounted {:?} popup {}: {:?}", renderer.kind(), id, mount);
        if mount == Mount::Failed {
            renderer.unmount();
        } else {
            self.current = Some(ActivePopup::new(id, surface, renderer));
        }

        Shown { replaced, mount }
    }

    /// Route a media completion to its popup.
    ///
    /// Returns the reason the popup has to close, if it does. Completions
    /// for a popup that is no longer current are dropped.
    pub fn apply_media(&mut self, event: UiEvent) -> Option<CloseReason> {
        let Some(popup) = self.get_mut(event.popup) else {
            tracing::debug!(
                "Dropping {} for popup {} which is gone",
                event.event.name(),
                event.popup
            );
            return None;
        };
        popup.renderer.handle(event.event);
        popup.settle()
    }

    /// Popup `id`'s media missed its reveal deadline
    pub fn reveal_timed_out(&mut self, id: u32) -> Option<CloseReason> {
        let popup = self.get_mut(id)?;
        popup.renderer.reveal_timed_out();
        popup.settle()
    }

    /// Take popup `id` off screen and release its renderer
    pub fn close(&mut self, id: u32) -> Option<ActivePopup> {
        self.get(id)?;
        let mut popup = self.current.take()?;
        popup.unmount();
        Some(popup)
    }

    /// Keep `request` until popups can be mounted. Returns the id of the
    /// held popup it displaces.
    pub fn hold(&mut self, id: u32, request: DisplayRequest) -> Option<u32> {
        self.held.replace((id, request)).map(|(previous, _)| previous)
    }

    pub fn take_held(&mut self) -> Option<(u32, DisplayRequest)> {
        self.held.take()
    }

    /// Discard the held popup if it is `id`, or whichever is held for `None`
    pub fn drop_held(&mut self, id: Option<u32>) -> Option<u32> {
        let matches = self
            .held
            .as_ref()
            .is_some_and(|(held, _)| id.is_none_or(|id| id == *held));
        if matches {
            self.held.take().map(|(held, _)| held)
        } else {
            None
        }
    }
}
