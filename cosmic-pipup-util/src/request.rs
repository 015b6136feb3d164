//! Popup requests as sent by clients.
//!
//! A request is a JSON object with camelCase keys, every key optional:
//!
//! ```json
//! {
//!   "duration": 30,
//!   "position": 0,
//!   "title": "Doorbell",
//!   "titleColor": "#0066cc",
//!   "titleSize": 20,
//!   "message": "Someone is at the door",
//!   "messageColor": "#000000",
//!   "messageSize": 14,
//!   "backgroundColor": "#ffffff",
//!   "media": { "image": { "uri": "https://example.com/cam.jpg", "width": 480 } }
//! }
//! ```
//!
//! `media` holds at most one of `image`, `video`, `web` or `bitmap`. Bitmap
//! pixels travel next to the JSON as encoded image bytes.

use crate::popup::{DEFAULT_BACKGROUND_COLOR, DEFAULT_MESSAGE_SIZE, DEFAULT_TEXT_COLOR, DEFAULT_TITLE_SIZE};
use crate::{Color, ColorError, DecodedImage, MediaVariant, PopupContent, PopupDescription};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use url::Url;

/// Width used for image and video media when the request names none
pub const DEFAULT_MEDIA_WIDTH: u32 = 480;
pub const DEFAULT_WEB_WIDTH: u32 = 640;
pub const DEFAULT_WEB_HEIGHT: u32 = 480;

/// Screen corner (or center) a popup is shown at
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Position {
    #[default]
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
    Center,
}

impl TryFrom<u8> for Position {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Position::TopRight),
            1 => Ok(Position::TopLeft),
            2 => Ok(Position::BottomRight),
            3 => Ok(Position::BottomLeft),
            4 => Ok(Position::Center),
            other => Err(format!("invalid position {}", other)),
        }
    }
}

impl From<Position> for u8 {
    fn from(value: Position) -> Self {
        match value {
            Position::TopRight => 0,
            Position::TopLeft => 1,
            Position::BottomRight => 2,
            Position::BottomLeft => 3,
            Position::Center => 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PopupRequest {
    /// Seconds on screen
    pub duration: Option<u32>,
    pub position: Option<Position>,
    pub title: Option<String>,
    pub title_size: Option<f32>,
    pub title_color: Option<String>,
    pub message: Option<String>,
    pub message_size: Option<f32>,
    pub message_color: Option<String>,
    pub background_color: Option<String>,
    pub media: Option<MediaRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaRequest {
    pub image: Option<UriMedia>,
    pub video: Option<UriMedia>,
    pub web: Option<WebMedia>,
    pub bitmap: Option<BitmapMedia>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UriMedia {
    pub uri: String,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebMedia {
    pub uri: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitmapMedia {
    pub width: Option<u32>,
}

/// A validated request, ready to be shown
#[derive(Debug, Clone)]
pub struct DisplayRequest {
    pub description: PopupDescription,
    /// `None` lets the host pick its default lifetime
    pub duration: Option<Duration>,
    /// `None` lets the host pick its default placement
    pub position: Option<Position>,
}

impl PopupRequest {
    pub fn from_json(json: &str) -> Result<Self, RequestError> {
        serde_json::from_str(json).map_err(|e| RequestError::InvalidJson(e.to_string()))
    }

    /// Validate the request and build its description.
    ///
    /// `bitmap` carries the encoded image for bitmap popups. It may be sent
    /// without a `media.bitmap` entry, in which case the image's own width is
    /// used.
    pub fn into_display(self, bitmap: Option<&[u8]>) -> Result<DisplayRequest, RequestError> {
        let content = PopupContent {
            title: self.title,
            title_size: text_size("titleSize", self.title_size, DEFAULT_TITLE_SIZE)?,
            title_color: color("titleColor", self.title_color.as_deref(), DEFAULT_TEXT_COLOR)?,
            message: self.message,
            message_size: text_size("messageSize", self.message_size, DEFAULT_MESSAGE_SIZE)?,
            message_color: color("messageColor", self.message_color.as_deref(), DEFAULT_TEXT_COLOR)?,
            background_color: color(
                "backgroundColor",
                self.background_color.as_deref(),
                DEFAULT_BACKGROUND_COLOR,
            )?,
        };

        let media = media(self.media.unwrap_or_default(), bitmap)?;

        Ok(DisplayRequest {
            description: PopupDescription::new(content, media),
            duration: self
                .duration
                .filter(|secs| *secs > 0)
                .map(|secs| Duration::from_secs(u64::from(secs))),
            position: self.position,
        })
    }
}

fn text_size(field: &'static str, value: Option<f32>, default: f32) -> Result<f32, RequestError> {
    match value {
        None => Ok(default),
        Some(size) if size.is_finite() && size > 0.0 => Ok(size),
        Some(_) => Err(RequestError::InvalidSize(field)),
    }
}

fn color(field: &'static str, value: Option<&str>, default: Color) -> Result<Color, RequestError> {
    match value {
        None => Ok(default),
        Some(value) => Color::parse(value).map_err(|error| RequestError::InvalidColor { field, error }),
    }
}

fn uri(field: &'static str, value: &str) -> Result<Url, RequestError> {
    Url::parse(value).map_err(|_| RequestError::InvalidUri {
        field,
        value: value.to_string(),
    })
}

fn dimension(field: &'static str, value: Option<u32>, default: u32) -> Result<u32, RequestError> {
    match value.unwrap_or(default) {
        0 => Err(RequestError::InvalidDimension(field)),
        value => Ok(value),
    }
}

fn media(request: MediaRequest, bitmap: Option<&[u8]>) -> Result<MediaVariant, RequestError> {
    let kinds = [
        request.image.is_some(),
        request.video.is_some(),
        request.web.is_some(),
        request.bitmap.is_some() || bitmap.is_some(),
    ];
    if kinds.iter().filter(|set| **set).count() > 1 {
        return Err(RequestError::ConflictingMedia);
    }

    if let Some(image) = request.image {
        return Ok(MediaVariant::Image {
            uri: uri("media.image.uri", &image.uri)?,
            width: dimension("media.image.width", image.width, DEFAULT_MEDIA_WIDTH)?,
        });
    }

    if let Some(video) = request.video {
        return Ok(MediaVariant::Video {
            uri: uri("media.video.uri", &video.uri)?,
            width: dimension("media.video.width", video.width, DEFAULT_MEDIA_WIDTH)?,
        });
    }

    if let Some(web) = request.web {
        return Ok(MediaVariant::Web {
            uri: uri("media.web.uri", &web.uri)?,
            width: dimension("media.web.width", web.width, DEFAULT_WEB_WIDTH)?,
            height: dimension("media.web.height", web.height, DEFAULT_WEB_HEIGHT)?,
        });
    }

    match (request.bitmap, bitmap) {
        (Some(_), None) => Err(RequestError::MissingBitmap),
        (entry, Some(bytes)) => {
            let pixels = DecodedImage::from_bytes(bytes)
                .map_err(|e| RequestError::InvalidBitmap(e.to_string()))?;
            let requested = entry.and_then(|b| b.width);
            let width = dimension("media.bitmap.width", requested, pixels.width())?;
            let pixels = pixels
                .fit_width(width)
                .map_err(|e| RequestError::InvalidBitmap(e.to_string()))?;
            Ok(MediaVariant::Bitmap { pixels, width })
        }
        (None, None) => Ok(MediaVariant::None),
    }
}

/// Request validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum RequestError {
    /// Body is not a valid request object
    InvalidJson(String),
    InvalidColor {
        field: &'static str,
        error: ColorError,
    },
    InvalidUri {
        field: &'static str,
        value: String,
    },
    /// Zero width or height
    InvalidDimension(&'static str),
    /// Non-positive or non-finite text size
    InvalidSize(&'static str),
    /// More than one media kind in one request
    ConflictingMedia,
    /// `media.bitmap` without image bytes
    MissingBitmap,
    /// Image bytes could not be decoded
    InvalidBitmap(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidJson(e) => write!(f, "Invalid popup request: {}", e),
            RequestError::InvalidColor { field, error } => write!(f, "{}: {}", field, error),
            RequestError::InvalidUri { field, value } => {
                write!(f, "{}: invalid uri {:?}", field, value)
            }
            RequestError::InvalidDimension(field) => write!(f, "{}: must be greater than zero", field),
            RequestError::InvalidSize(field) => write!(f, "{}: must be a positive number", field),
            RequestError::ConflictingMedia => write!(f, "Only one media kind may be set"),
            RequestError::MissingBitmap => write!(f, "media.bitmap requires image data"),
            RequestError::InvalidBitmap(e) => write!(f, "Invalid bitmap: {}", e),
        }
    }
}

impl std::error::Error for RequestError {}
