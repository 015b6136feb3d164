use crate::{Color, ContentSettings, DecodedImage, PopupContent};
use url::Url;

/// Minimum popup width in pixels
pub const DEFAULT_MIN_WIDTH: u32 = 240;

/// Padding around popup content in pixels
pub const DEFAULT_PADDING: u16 = 20;

/// Host-wide styling applied to every popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutStyle {
    pub min_width: u32,
    pub padding: u16,
}

impl Default for LayoutStyle {
    fn default() -> Self {
        Self {
            min_width: DEFAULT_MIN_WIDTH,
            padding: DEFAULT_PADDING,
        }
    }
}

/// Retained description of what a mounted popup looks like.
///
/// Renderers own and mutate this; hosts read it to draw. Elements are laid
/// out top to bottom: title, message, media frame.
#[derive(Debug, Clone)]
pub struct PopupLayout {
    pub visible: bool,
    pub background: Color,
    pub style: LayoutStyle,
    pub title: Option<TextElement>,
    pub message: Option<TextElement>,
    pub frame: Option<MediaFrame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub text: String,
    pub size: f32,
    pub color: Color,
}

/// Container the media body is placed in, centered
#[derive(Debug, Clone)]
pub struct MediaFrame {
    pub width: u32,
    pub height: FrameHeight,
    pub content: FrameContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameHeight {
    /// Sized by the content
    WrapContent,
    Fixed(u32),
}

#[derive(Debug, Clone)]
pub enum FrameContent {
    Empty,
    Image(DecodedImage),
    /// Drawn from the renderer's player
    Video,
    Web { uri: Url, settings: ContentSettings },
}

impl PopupLayout {
    /// An empty, invisible popup
    pub fn new(style: LayoutStyle) -> Self {
        Self {
            visible: false,
            background: Color::new(0.0, 0.0, 0.0, 0.0),
            style,
            title: None,
            message: None,
            frame: None,
        }
    }

    /// Lay out the text part of a popup.
    ///
    /// Title and message are omitted when their text is missing or empty.
    /// The media frame is created (empty) only when `with_frame` is set.
    pub fn from_content(style: LayoutStyle, content: &PopupContent, with_frame: bool) -> Self {
        Self {
            visible: false,
            background: content.background_color,
            style,
            title: content.visible_title().map(|text| TextElement {
                text: text.to_string(),
                size: content.title_size,
                color: content.title_color,
            }),
            message: content.visible_message().map(|text| TextElement {
                text: text.to_string(),
                size: content.message_size,
                color: content.message_color,
            }),
            frame: with_frame.then(|| MediaFrame {
                width: 0,
                height: FrameHeight::WrapContent,
                content: FrameContent::Empty,
            }),
        }
    }

    /// Whether nothing would be drawn besides the background
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.message.is_none() && self.frame.is_none()
    }

    /// Remove the media frame, leaving a text-only popup
    pub fn remove_frame(&mut self) -> Option<MediaFrame> {
        self.frame.take()
    }

    pub fn frame_mut(&mut self) -> Option<&mut MediaFrame> {
        self.frame.as_mut()
    }
}
