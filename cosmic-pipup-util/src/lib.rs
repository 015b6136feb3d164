pub mod color;
pub mod content;
pub mod decoded_image;
pub mod event;
pub mod fetch;
pub mod layout;
pub mod playback;
pub mod popup;
pub mod renderer;
pub mod request;

pub use color::{Color, ColorError};
pub use content::{
    ContentBackend, ContentError, ContentSettings, ContentSurface, ExternalBrowserBackend,
    ExternalBrowserSurface, is_safe_url,
};
pub use decoded_image::{DecodedImage, ImageFrame, MAX_FRAMES, scaled_height};
pub use event::{MediaEvent, PopupId, UiEvent, UiHandle, UiQueue};
pub use fetch::{
    DEFAULT_FETCH_TIMEOUT, FetchError, FetchHandle, FetchRequest, HttpImageFetcher, ImageFetcher,
};
pub use layout::{FrameContent, FrameHeight, LayoutStyle, MediaFrame, PopupLayout, TextElement};
pub use playback::{ImagePlaybackBackend, ImagePlayer, PlaybackBackend, PlaybackError, Player};
pub use popup::{MediaVariant, PopupContent, PopupDescription, PopupDescriptionBuilder};
pub use renderer::{
    Mount, MountContext, RenderState, Renderer, RendererKind, Services, TeardownError, build,
    mount_popup,
};
pub use request::{DisplayRequest, PopupRequest, Position, RequestError};
pub use url::Url;
