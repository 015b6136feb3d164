//! Fetching images by reference.
//!
//! Fetches run on their own thread and report back through a [`UiHandle`].
//! Nothing is cached: every popup fetches its media afresh.

use crate::{DecodedImage, MediaEvent, UiHandle};
use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Timeout for fetching popup images
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Largest body accepted for a single fetch (32MB)
pub const MAX_FETCH_BYTES: usize = 32 * 1024 * 1024;

#[cfg(feature = "http")]
const USER_AGENT: &str = concat!("cosmic-pipup/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub uri: Url,
    pub timeout: Duration,
}

/// Loads images by reference without blocking the UI thread.
///
/// Implementations must post exactly one [`MediaEvent::ImageLoaded`] or
/// [`MediaEvent::ImageFailed`] through `ui`, unless the returned handle is
/// cancelled first.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, request: FetchRequest, ui: UiHandle) -> FetchHandle;
}

/// Cancellation handle for an in-flight fetch
#[derive(Debug, Clone, Default)]
pub struct FetchHandle {
    cancelled: Arc<AtomicBool>,
}

impl FetchHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the fetch to stop. Its completion will not be posted.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Fetches `http`, `https` and `file` URIs and decodes them
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpImageFetcher;

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, request: FetchRequest, ui: UiHandle) -> FetchHandle {
        let handle = FetchHandle::new();
        let cancel = handle.clone();
        let worker_ui = ui.clone();

        let spawn_result = thread::Builder::new()
            .name("image-fetch".into())
            .spawn(move || {
                let result = load_bytes(&request.uri, request.timeout, &cancel).and_then(|bytes| {
                    DecodedImage::from_bytes(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
                });

                if cancel.is_cancelled() {
                    debug!("Fetch of {} cancelled, dropping result", request.uri);
                    return;
                }

                match result {
                    Ok(image) => {
                        debug!(
                            "Fetched {} ({}x{}, {} frames)",
                            request.uri,
                            image.width(),
                            image.height(),
                            image.frame_count()
                        );
                        worker_ui.post(MediaEvent::ImageLoaded(image));
                    }
                    Err(e) => {
                        worker_ui.post(MediaEvent::ImageFailed(e));
                    }
                }
            });

        if let Err(e) = spawn_result {
            warn!("Failed to spawn image fetch thread: {}", e);
            ui.post(MediaEvent::ImageFailed(FetchError::Spawn(e.to_string())));
        }

        handle
    }
}

/// Read the raw bytes behind `uri` (blocking).
///
/// `timeout` bounds network requests; local files are read directly.
#[cfg_attr(not(feature = "http"), allow(unused_variables))]
pub fn load_bytes(uri: &Url, timeout: Duration, cancel: &FetchHandle) -> Result<Vec<u8>, FetchError> {
    match uri.scheme() {
        "file" => {
            let path = uri
                .to_file_path()
                .map_err(|_| FetchError::Io(format!("not a local path: {}", uri)))?;
            let file = std::fs::File::open(&path).map_err(io_error)?;
            read_capped(file, cancel)
        }
        #[cfg(feature = "http")]
        "http" | "https" => http_get(uri, timeout, cancel),
        other => Err(FetchError::UnsupportedScheme(other.to_string())),
    }
}

#[cfg(feature = "http")]
fn http_get(uri: &Url, timeout: Duration, cancel: &FetchHandle) -> Result<Vec<u8>, FetchError> {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    let agent: ureq::Agent = config.into();

    let response = agent
        .get(uri.as_str())
        .header("User-Agent", USER_AGENT)
        .call()
        .map_err(FetchError::from)?;

    read_capped(response.into_body().into_reader(), cancel)
}

fn read_capped(mut reader: impl Read, cancel: &FetchHandle) -> Result<Vec<u8>, FetchError> {
    let mut data = Vec::new();
    let mut buffer = [0u8; 8192];

    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let read = reader.read(&mut buffer).map_err(io_error)?;
        if read == 0 {
            break;
        }
        if data.len() + read > MAX_FETCH_BYTES {
            return Err(FetchError::TooLarge);
        }
        data.extend_from_slice(&buffer[..read]);
    }

    Ok(data)
}

fn io_error(e: std::io::Error) -> FetchError {
    match e.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => FetchError::Timeout,
        _ => FetchError::Io(e.to_string()),
    }
}

/// Image fetch errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request did not finish in time
    Timeout,
    /// Server answered with a non-success status
    Http(u16),
    /// Network or filesystem error
    Io(String),
    /// Body is not a decodable image
    Decode(String),
    /// Body exceeds [`MAX_FETCH_BYTES`]
    TooLarge,
    /// URI scheme this fetcher cannot load
    UnsupportedScheme(String),
    /// Fetch was cancelled
    Cancelled,
    /// Worker thread could not be started
    Spawn(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Timeout => write!(f, "Fetch timed out"),
            FetchError::Http(status) => write!(f, "Request failed with HTTP status {}", status),
            FetchError::Io(e) => write!(f, "IO error: {}", e),
            FetchError::Decode(e) => write!(f, "Image decode error: {}", e),
            FetchError::TooLarge => write!(f, "Image exceeds {} bytes", MAX_FETCH_BYTES),
            FetchError::UnsupportedScheme(scheme) => write!(f, "Unsupported uri scheme: {}", scheme),
            FetchError::Cancelled => write!(f, "Fetch cancelled"),
            FetchError::Spawn(e) => write!(f, "Failed to start fetch: {}", e),
        }
    }
}

impl std::error::Error for FetchError {}

#[cfg(feature = "http")]
impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => FetchError::Http(status),
            ureq::Error::Timeout(_) => FetchError::Timeout,
            ureq::Error::Io(e) => io_error(e),
            other => FetchError::Io(other.to_string()),
        }
    }
}
