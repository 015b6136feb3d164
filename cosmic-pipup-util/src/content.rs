//! Embedded web content seam.

use std::fmt;
use tracing::{info, warn};
use url::Url;

/// Settings a content surface is configured with before loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSettings {
    pub javascript: bool,
    pub dom_storage: bool,
    /// Media may autoplay when `false`
    pub media_requires_user_gesture: bool,
    /// Zoom out so the page fits the frame
    pub overview_mode: bool,
    pub wide_viewport: bool,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            javascript: true,
            dom_storage: true,
            media_requires_user_gesture: false,
            overview_mode: true,
            wide_viewport: true,
        }
    }
}

/// A frame that displays a web page
pub trait ContentSurface: Send {
    fn load(&mut self, uri: &Url, settings: &ContentSettings) -> Result<(), ContentError>;

    /// Show the loaded page outside the popup, when the surface can
    fn open(&self) -> Result<(), ContentError>;

    fn close(&mut self) -> Result<(), ContentError>;
}

pub trait ContentBackend: Send + Sync {
    fn create_surface(&self, width: u32, height: u32) -> Box<dyn ContentSurface>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    UnsafeUrl(String),
    Open(String),
    /// Nothing has been loaded
    NoPage,
    Closed,
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentError::UnsafeUrl(url) => write!(f, "Refusing to open url: {}", url),
            ContentError::Open(e) => write!(f, "Failed to open content: {}", e),
            ContentError::NoPage => write!(f, "No page loaded"),
            ContentError::Closed => write!(f, "Content surface is closed"),
        }
    }
}

impl std::error::Error for ContentError {}

/// Only web schemes may be handed to the desktop
pub fn is_safe_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Open a URL in the default browser
pub fn open_link(url: &Url) -> Result<(), ContentError> {
    if !is_safe_url(url) {
        return Err(ContentError::UnsafeUrl(url.to_string()));
    }
    open::that(url.as_str()).map_err(|e| ContentError::Open(e.to_string()))
}

/// Stands in for an embedded web view on desktops without one.
///
/// The page is shown as a link inside the popup frame; opening the surface
/// hands it to the user's browser.
#[derive(Debug, Default)]
pub struct ExternalBrowserSurface {
    width: u32,
    height: u32,
    page: Option<Url>,
    closed: bool,
}

impl ExternalBrowserSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            page: None,
            closed: false,
        }
    }
}

impl ContentSurface for ExternalBrowserSurface {
    fn load(&mut self, uri: &Url, settings: &ContentSettings) -> Result<(), ContentError> {
        if self.closed {
            return Err(ContentError::Closed);
        }
        if !is_safe_url(uri) {
            warn!("Web popup with non-web url {}", uri);
            return Err(ContentError::UnsafeUrl(uri.to_string()));
        }
        info!(
            "Showing {} in {}x{} frame (javascript: {})",
            uri, self.width, self.height, settings.javascript
        );
        self.page = Some(uri.clone());
        Ok(())
    }

    fn open(&self) -> Result<(), ContentError> {
        if self.closed {
            return Err(ContentError::Closed);
        }
        let page = self.page.as_ref().ok_or(ContentError::NoPage)?;
        open_link(page)
    }

    fn close(&mut self) -> Result<(), ContentError> {
        self.page = None;
        self.closed = true;
        Ok(())
    }
}

/// Creates [`ExternalBrowserSurface`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct ExternalBrowserBackend;

impl ContentBackend for ExternalBrowserBackend {
    fn create_surface(&self, width: u32, height: u32) -> Box<dyn ContentSurface> {
        Box::new(ExternalBrowserSurface::new(width, height))
    }
}
