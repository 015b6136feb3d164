use cosmic::Element;
use cosmic::iced::{ContentFit, Length};
use cosmic::widget::{container, image};
use cosmic_pipup_util::FrameHeight;

/// Draw one image frame inside a popup's media frame
pub fn media_image<'a, Message: 'a>(
  handle: image::Handle,
  width: u32,
  height: FrameHeight,
) -> Element<'a, Message> {
  let height = frame_height(height);

  container(
    image(handle)
      .width(Length::Fixed(width as f32))
      .height(height)
      .content_fit(ContentFit::Contain),
  )
  .width(Length::Fixed(width as f32))
  .height(height)
  .into()
}

/// Empty frame of the given size, used while media is not drawable
pub fn placeholder_frame<'a, Message: 'a>(width: u32, height: FrameHeight) -> Element<'a, Message> {
  container(cosmic::widget::Space::new(
    Length::Fixed(width as f32),
    frame_height(height),
  ))
  .into()
}

pub fn frame_height(height: FrameHeight) -> Length {
  match height {
    FrameHeight::WrapContent => Length::Shrink,
    FrameHeight::Fixed(h) => Length::Fixed(h as f32),
  }
}
