use crate::{Color, DecodedImage};
use url::Url;

/// What a popup shows: text, colors and one media body.
///
/// Descriptions are immutable once built. A description with no title, no
/// message and [`MediaVariant::None`] is valid and renders an empty container;
/// callers should avoid sending those.
#[derive(Debug, Clone)]
pub struct PopupDescription {
    content: PopupContent,
    media: MediaVariant,
}

/// Text and styling part of a [`PopupDescription`]
#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    pub title: Option<String>,
    pub title_size: f32,
    pub title_color: Color,
    pub message: Option<String>,
    pub message_size: f32,
    pub message_color: Color,
    pub background_color: Color,
}

/// Media body of a popup
#[derive(Debug, Clone)]
pub enum MediaVariant {
    None,
    /// Remote or local image fetched by reference
    Image { uri: Url, width: u32 },
    /// Pixels already decoded by the caller; ownership moves to the renderer
    Bitmap { pixels: DecodedImage, width: u32 },
    Video { uri: Url, width: u32 },
    /// Embedded web content in a fixed-size frame
    Web { uri: Url, width: u32, height: u32 },
}

impl MediaVariant {
    pub fn is_none(&self) -> bool {
        matches!(self, MediaVariant::None)
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            MediaVariant::None => "none",
            MediaVariant::Image { .. } => "image",
            MediaVariant::Bitmap { .. } => "bitmap",
            MediaVariant::Video { .. } => "video",
            MediaVariant::Web { .. } => "web",
        }
    }
}

pub const DEFAULT_TITLE_SIZE: f32 = 16.0;
pub const DEFAULT_MESSAGE_SIZE: f32 = 12.0;
pub const DEFAULT_TEXT_COLOR: Color = Color::rgb(1.0, 1.0, 1.0);
/// `#CC000000`
pub const DEFAULT_BACKGROUND_COLOR: Color = Color::new(0.0, 0.0, 0.0, 0.8);

impl Default for PopupContent {
    fn default() -> Self {
        Self {
            title: None,
            title_size: DEFAULT_TITLE_SIZE,
            title_color: DEFAULT_TEXT_COLOR,
            message: None,
            message_size: DEFAULT_MESSAGE_SIZE,
            message_color: DEFAULT_TEXT_COLOR,
            background_color: DEFAULT_BACKGROUND_COLOR,
        }
    }
}

impl PopupContent {
    /// Title text, `None` when missing or empty
    pub fn visible_title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }

    /// Message text, `None` when missing or empty
    pub fn visible_message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}

impl PopupDescription {
    pub fn new(content: PopupContent, media: MediaVariant) -> Self {
        Self { content, media }
    }

    pub fn builder() -> PopupDescriptionBuilder {
        PopupDescriptionBuilder::default()
    }

    pub fn content(&self) -> &PopupContent {
        &self.content
    }

    pub fn title(&self) -> Option<&str> {
        self.content.title.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.content.message.as_deref()
    }

    pub fn background_color(&self) -> Color {
        self.content.background_color
    }

    pub fn media(&self) -> &MediaVariant {
        &self.media
    }

    /// Split into text content and media, handing the media payload to
    /// whoever renders it.
    pub fn into_parts(self) -> (PopupContent, MediaVariant) {
        (self.content, self.media)
    }
}

/// Builder for [`PopupDescription`]
#[derive(Debug, Default)]
pub struct PopupDescriptionBuilder {
    content: PopupContent,
    media: Option<MediaVariant>,
}

impl PopupDescriptionBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.content.title = Some(title.into());
        self
    }

    pub fn title_size(mut self, size: f32) -> Self {
        self.content.title_size = size;
        self
    }

    pub fn title_color(mut self, color: Color) -> Self {
        self.content.title_color = color;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.content.message = Some(message.into());
        self
    }

    pub fn message_size(mut self, size: f32) -> Self {
        self.content.message_size = size;
        self
    }

    pub fn message_color(mut self, color: Color) -> Self {
        self.content.message_color = color;
        self
    }

    pub fn background_color(mut self, color: Color) -> Self {
        self.content.background_color = color;
        self
    }

    pub fn media(mut self, media: MediaVariant) -> Self {
        self.media = Some(media);
        self
    }

    pub fn build(self) -> PopupDescription {
        PopupDescription {
            content: self.content,
            media: self.media.unwrap_or(MediaVariant::None),
        }
    }
}
