use cosmic::widget::image::Handle;
use cosmic_pipup_util::DecodedImage;
use std::time::{Duration, Instant};

/// Controls playback of a popup's image frames
pub struct ImageAnimator {
    source: Option<DecodedImage>,
    handles: Vec<Handle>,
    start_time: Instant,
}

impl ImageAnimator {
    pub fn new() -> Self {
        Self {
            source: None,
            handles: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Upload `image`'s frames and restart playback from the first frame
    pub fn set_image(&mut self, image: &DecodedImage) {
        self.handles = image
            .frames()
            .iter()
            .map(|f| Handle::from_rgba(f.width, f.height, f.data.as_ref().clone()))
            .collect();
        self.source = Some(image.clone());
        self.reset();
    }

    pub fn has_image(&self) -> bool {
        self.source.is_some()
    }

    /// Drop all frames
    pub fn clear(&mut self) {
        self.source = None;
        self.handles.clear();
    }

    /// Reset animation to start
    pub fn reset(&mut self) {
        self.start_time = Instant::now();
    }

    pub fn is_animated(&self) -> bool {
        self.source.as_ref().is_some_and(DecodedImage::is_animated)
    }

    /// Frame to draw now, timed by the animator's own clock
    pub fn current(&self) -> Option<&Handle> {
        self.frame_at(self.start_time.elapsed())
    }

    /// Frame to draw `position` into the animation
    pub fn frame_at(&self, position: Duration) -> Option<&Handle> {
        let index = self
            .source
            .as_ref()
            .map(|image| image.frame_index_at(millis(position)))
            .unwrap_or_default();
        self.handles.get(index)
    }

    pub fn first(&self) -> Option<&Handle> {
        self.handles.first()
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

impl Default for ImageAnimator {
    fn default() -> Self {
        Self::new()
    }
}
