//! Decoded pixel data for popup media.
//!
//! A [`DecodedImage`] is the owned decoded-image handle carried by bitmap
//! popups and produced by image fetches. It holds one or more RGBA frames:
//! - Static images decode to a single frame
//! - Animated GIFs keep up to [`MAX_FRAMES`] frames with their delays
//!
//! Frames share their pixel buffers through `Arc`, so cloning a handle for
//! the layout model does not copy pixels. Dropping every clone releases them.
//!
//! Input comes from untrusted senders. Canvases larger than [`MAX_DIMENSION`]
//! are rejected before any pixels are allocated, and the decoded frames of one
//! image never exceed [`MAX_DECODED_BYTES`].

use fast_image_resize as fr;
use image::{AnimationDecoder, ImageDecoder, ImageError, ImageFormat, ImageReader, Limits};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// Maximum frames to keep per animation (memory protection)
pub const MAX_FRAMES: usize = 100;

/// Shortest frame delay honoured for animations
pub const MIN_FRAME_DELAY_MS: u32 = 10;

/// Largest accepted width or height
pub const MAX_DIMENSION: u32 = 4096;

/// Decoded pixel budget for one image, all frames included
pub const MAX_DECODED_BYTES: u64 = 64 * 1024 * 1024;

/// Single RGBA frame
#[derive(Debug, Clone)]
pub struct ImageFrame {
  /// Raw RGBA pixel data
  pub data: Arc<Vec<u8>>,
  /// Frame width in pixels
  pub width: u32,
  /// Frame height in pixels
  pub height: u32,
  /// Delay before the next frame
  pub delay_ms: u32,
}

/// Owned decoded image, static or animated
#[derive(Debug, Clone)]
pub struct DecodedImage {
  frames: Vec<ImageFrame>,
  total_duration_ms: u32,
}

impl DecodedImage {
  fn new(frames: Vec<ImageFrame>) -> Self {
    let total_duration_ms = frames.iter().map(|f| f.delay_ms).sum();
    Self { frames, total_duration_ms }
  }

  /// Wrap tightly packed RGBA pixels.
  ///
  /// # Errors
  ///
  /// Returns `ImageError` if a dimension is zero or `data` does not hold
  /// exactly `width * height * 4` bytes.
  pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ImageError> {
    if width == 0 || height == 0 {
      return Err(dimension_error());
    }
    if data.len() as u64 != u64::from(width) * u64::from(height) * 4 {
      return Err(ImageError::Limits(
        image::error::LimitError::from_kind(
          image::error::LimitErrorKind::InsufficientMemory,
        ),
      ));
    }

    Ok(Self::new(vec![ImageFrame {
      data: Arc::new(data),
      width,
      height,
      delay_ms: 0,
    }]))
  }

  /// Decode an encoded image (PNG, JPEG, GIF, WebP, ...).
  ///
  /// Multi-frame GIFs keep their animation; everything else decodes to a
  /// single frame.
  ///
  /// # Errors
  ///
  /// Returns `ImageError` if the format is unknown, decoding fails, or the
  /// image is larger than [`MAX_DIMENSION`] or [`MAX_DECODED_BYTES`].
  pub fn from_bytes(data: &[u8]) -> Result<Self, ImageError> {
    let format = image::guess_format(data)?;

    if format == ImageFormat::Gif {
      if let Some(animation) = Self::decode_gif(data)? {
        return Ok(animation);
      }
    }

    let mut reader = ImageReader::with_format(Cursor::new(data), format);
    reader.limits(decode_limits());
    let rgba = reader.decode()?.into_rgba8();
    let (width, height) = rgba.dimensions();
    Self::from_rgba(width, height, rgba.into_raw())
  }

  /// Load and decode an image file.
  ///
  /// # Errors
  ///
  /// Returns `ImageError` if the file cannot be read or is not a valid image.
  pub fn from_path(path: &Path) -> Result<Self, ImageError> {
    let data = std::fs::read(path).map_err(ImageError::IoError)?;
    Self::from_bytes(&data)
  }

  /// Returns `None` when the data is not a multi-frame GIF
  fn decode_gif(data: &[u8]) -> Result<Option<Self>, ImageError> {
    use image::codecs::gif::GifDecoder;

    let Ok(decoder) = GifDecoder::new(Cursor::new(data)) else {
      return Ok(None);
    };
    let (width, height) = decoder.dimensions();
    check_dimensions(width, height)?;

    // Every frame is composited onto the full canvas
    let frame_bytes = u64::from(width) * u64::from(height) * 4;
    let affordable = usize::try_from(MAX_DECODED_BYTES / frame_bytes).unwrap_or(usize::MAX);

    let frames: Vec<_> = decoder
      .into_frames()
      .filter_map(|f| f.ok())
      .take(MAX_FRAMES.min(affordable))
      .map(|frame| {
        let (numer, denom) = frame.delay().numer_denom_ms();
        let delay_ms = if denom == 0 {
          0
        } else {
          (u64::from(numer) / u64::from(denom)) as u32
        };
        let buffer = frame.into_buffer();
        let (width, height) = buffer.dimensions();

        ImageFrame {
          data: Arc::new(buffer.into_raw()),
          width,
          height,
          delay_ms: delay_ms.max(MIN_FRAME_DELAY_MS),
        }
      })
      .collect();

    Ok((frames.len() > 1).then(|| Self::new(frames)))
  }

  /// Downscale every frame so the image is at most `max_width` wide.
  ///
  /// Images already narrow enough are returned untouched. Aspect ratio is
  /// preserved using [`scaled_height`].
  ///
  /// # Errors
  ///
  /// Returns `ImageError` if resizing fails.
  pub fn fit_width(self, max_width: u32) -> Result<Self, ImageError> {
    if max_width == 0 {
      return Err(dimension_error());
    }
    if self.width() <= max_width {
      return Ok(self);
    }

    let frames = self
      .frames
      .into_iter()
      .map(|frame| {
        let new_height = scaled_height(max_width, frame.width, frame.height).max(1);
        let data = resize_rgba(&frame, max_width, new_height)?;
        Ok(ImageFrame {
          data: Arc::new(data),
          width: max_width,
          height: new_height,
          delay_ms: frame.delay_ms,
        })
      })
      .collect::<Result<Vec<_>, ImageError>>()?;

    Ok(Self::new(frames))
  }

  /// Width of the first frame
  pub fn width(&self) -> u32 {
    self.frames.first().map_or(0, |f| f.width)
  }

  /// Height of the first frame
  pub fn height(&self) -> u32 {
    self.frames.first().map_or(0, |f| f.height)
  }

  /// All frames, in display order
  pub fn frames(&self) -> &[ImageFrame] {
    &self.frames
  }

  /// Get number of frames
  pub fn frame_count(&self) -> usize {
    self.frames.len()
  }

  /// Check if this is actually animated (more than 1 frame)
  pub fn is_animated(&self) -> bool {
    self.frames.len() > 1
  }

  /// Index of the frame to show `elapsed_ms` into the animation (loops)
  pub fn frame_index_at(&self, elapsed_ms: u32) -> usize {
    if self.frames.len() <= 1 || self.total_duration_ms == 0 {
      return 0;
    }

    let looped_time = elapsed_ms % self.total_duration_ms;
    let mut accumulated = 0u32;

    for (index, frame) in self.frames.iter().enumerate() {
      accumulated += frame.delay_ms;
      if accumulated > looped_time {
        return index;
      }
    }

    0
  }

  /// Bytes of pixel data held by this handle
  pub fn byte_size(&self) -> usize {
    self.frames.iter().map(|f| f.data.len()).sum()
  }
}

/// Height of a box `width` wide that keeps the `source_width` x
/// `source_height` aspect ratio, rounded to the nearest pixel.
///
/// Returns 0 when `source_width` is 0.
pub fn scaled_height(width: u32, source_width: u32, source_height: u32) -> u32 {
  if source_width == 0 {
    return 0;
  }
  let numerator = u64::from(width) * u64::from(source_height);
  let source_width = u64::from(source_width);
  let rounded = (2 * numerator + source_width) / (2 * source_width);
  u32::try_from(rounded).unwrap_or(u32::MAX)
}

fn decode_limits() -> Limits {
  let mut limits = Limits::default();
  limits.max_image_width = Some(MAX_DIMENSION);
  limits.max_image_height = Some(MAX_DIMENSION);
  limits.max_alloc = Some(MAX_DECODED_BYTES);
  limits
}

fn check_dimensions(width: u32, height: u32) -> Result<(), ImageError> {
  if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
    return Err(dimension_error());
  }
  Ok(())
}

fn dimension_error() -> ImageError {
  ImageError::Limits(image::error::LimitError::from_kind(
    image::error::LimitErrorKind::DimensionError,
  ))
}

/// Resize one RGBA frame with Lanczos3.
fn resize_rgba(frame: &ImageFrame, new_width: u32, new_height: u32) -> Result<Vec<u8>, ImageError> {
  let mut src = fr::images::Image::from_vec_u8(
    frame.width,
    frame.height,
    (*frame.data).clone(),
    fr::PixelType::U8x4,
  )
  .map_err(|_| dimension_error())?;

  let mut dst = fr::images::Image::new(new_width, new_height, fr::PixelType::U8x4);

  // Multiply alpha for proper blending during resize
  fr::MulDiv::default()
    .multiply_alpha_inplace(&mut src)
    .map_err(|_| dimension_error())?;

  let mut resizer = fr::Resizer::new();
  let resize_options = fr::ResizeOptions::new()
    .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3));

  resizer
    .resize(&src, &mut dst, Some(&resize_options))
    .map_err(|_| dimension_error())?;

  fr::MulDiv::default()
    .divide_alpha_inplace(&mut dst)
    .map_err(|_| dimension_error())?;

  Ok(dst.into_vec())
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbaImage;

  fn frame(delay_ms: u32) -> ImageFrame {
    ImageFrame {
      data: Arc::new(vec![0u8; 4]),
      width: 1,
      height: 1,
      delay_ms,
    }
  }

  #[test]
  fn test_scaled_height_preserves_aspect() {
    assert_eq!(scaled_height(240, 100, 50), 120);
    assert_eq!(scaled_height(480, 1920, 1080), 270);
    assert_eq!(scaled_height(100, 100, 100), 100);
  }

  #[test]
  fn test_scaled_height_rounds_to_nearest() {
    // 100 * 1 / 3 = 33.33
    assert_eq!(scaled_height(100, 3, 1), 33);
    // 100 * 2 / 3 = 66.67
    assert_eq!(scaled_height(100, 3, 2), 67);
    // 5 * 1 / 2 = 2.5 rounds up
    assert_eq!(scaled_height(5, 2, 1), 3);
  }

  #[test]
  fn test_scaled_height_zero_source_width() {
    assert_eq!(scaled_height(240, 0, 50), 0);
  }

  #[test]
  fn test_from_rgba_validates_length() {
    assert!(DecodedImage::from_rgba(2, 2, vec![0; 16]).is_ok());
    assert!(DecodedImage::from_rgba(2, 2, vec![0; 15]).is_err());
    assert!(DecodedImage::from_rgba(0, 2, vec![]).is_err());
  }

  #[test]
  fn test_from_bytes_png() {
    let img = RgbaImage::from_fn(8, 4, |x, _| image::Rgba([x as u8, 0, 0, 255]));
    let mut encoded = Vec::new();
    img
      .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
      .expect("encode png");

    let decoded = DecodedImage::from_bytes(&encoded).unwrap();
    assert_eq!(decoded.width(), 8);
    assert_eq!(decoded.height(), 4);
    assert!(!decoded.is_animated());
    assert_eq!(decoded.byte_size(), 8 * 4 * 4);
  }

  #[test]
  fn test_from_bytes_garbage() {
    assert!(DecodedImage::from_bytes(b"definitely not an image").is_err());
  }

  #[test]
  fn test_from_path_missing_file() {
    assert!(DecodedImage::from_path(Path::new("/nonexistent/popup.png")).is_err());
  }

  #[test]
  fn test_fit_width_downscales() {
    let decoded = DecodedImage::from_rgba(200, 100, vec![128; 200 * 100 * 4]).unwrap();
    let fitted = decoded.fit_width(100).unwrap();
    assert_eq!(fitted.width(), 100);
    assert_eq!(fitted.height(), 50);
    assert_eq!(fitted.byte_size(), 100 * 50 * 4);
  }

  #[test]
  fn test_fit_width_keeps_small_images() {
    let decoded = DecodedImage::from_rgba(20, 10, vec![128; 20 * 10 * 4]).unwrap();
    let pixels = Arc::clone(&decoded.frames()[0].data);
    let fitted = decoded.fit_width(100).unwrap();
    assert!(Arc::ptr_eq(&pixels, &fitted.frames()[0].data));
  }

  #[test]
  fn test_frame_at_loops() {
    let anim = DecodedImage::new(vec![frame(100), frame(100), frame(100)]);
    assert!(anim.is_animated());
    assert_eq!(anim.frame_index_at(0), 0);
    assert_eq!(anim.frame_index_at(150), 1);
    assert_eq!(anim.frame_index_at(250), 2);
    assert_eq!(anim.frame_index_at(350), 0);
  }

  #[test]
  fn test_static_image_always_first_frame() {
    let still = DecodedImage::new(vec![frame(0)]);
    assert_eq!(still.frame_index_at(12345), 0);
  }

  /// GIF with a `width` x `height` logical screen holding `frames` 1x1
  /// frames. A few bytes each, but every frame decodes to the full canvas.
  fn tiny_frames_on_large_canvas(width: u16, height: u16, frames: usize) -> Vec<u8> {
    let mut gif = b"GIF89a".to_vec();
    gif.extend_from_slice(&width.to_le_bytes());
    gif.extend_from_slice(&height.to_le_bytes());
    // two-entry global colour table, black and white
    gif.extend_from_slice(&[0x80, 0x00, 0x00]);
    gif.extend_from_slice(&[0, 0, 0, 255, 255, 255]);
    for _ in 0..frames {
      // graphic control: 100 ms delay
      gif.extend_from_slice(&[0x21, 0xF9, 0x04, 0x00, 10, 0, 0x00, 0x00]);
      // 1x1 image at the origin, one pixel of colour 0
      gif.extend_from_slice(&[0x2C, 0, 0, 0, 0, 1, 0, 1, 0, 0x00]);
      gif.extend_from_slice(&[0x02, 0x02, 0x44, 0x01, 0x00]);
    }
    gif.push(0x3B);
    gif
  }

  #[test]
  fn test_animation_stays_within_pixel_budget() {
    let gif = tiny_frames_on_large_canvas(1000, 1000, 100);
    assert!(gif.len() < 4096);

    let decoded = DecodedImage::from_bytes(&gif).unwrap();
    assert!(decoded.is_animated());
    assert_eq!(decoded.width(), 1000);
    assert!(decoded.frame_count() < 100);
    assert!(decoded.byte_size() as u64 <= MAX_DECODED_BYTES);
  }

  #[test]
  fn test_oversized_canvas_rejected_before_decoding() {
    let gif = tiny_frames_on_large_canvas(8000, 8000, 3);
    assert!(DecodedImage::from_bytes(&gif).is_err());
  }

  #[test]
  fn test_small_animation_keeps_every_frame() {
    let gif = tiny_frames_on_large_canvas(4, 4, 5);
    let decoded = DecodedImage::from_bytes(&gif).unwrap();
    assert_eq!(decoded.frame_count(), 5);
    assert_eq!(decoded.frame_index_at(150), 1);
  }
}
