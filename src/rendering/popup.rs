use crate::constants::{ELEMENT_SPACING, POPUP_RADIUS};
use crate::fl;
use crate::handlers::Message;
use crate::state::ActivePopup;
use crate::widgets::{media_image, placeholder_frame};
use cosmic::Element;
use cosmic::iced::{Alignment, Background, Border, Length};
use cosmic::iced_widget::column;
use cosmic::widget::{button, container, mouse_area, text};
use cosmic_pipup_util::{FrameContent, MediaFrame, TextElement};

/// Convert a popup color to the toolkit's
pub fn to_iced(color: cosmic_pipup_util::Color) -> cosmic::iced::Color {
    cosmic::iced::Color::from_rgba(color.r, color.g, color.b, color.a)
}

/// Render the visible popup: title, message and media frame stacked on its
/// background. Clicking the popup dismisses it.
pub fn popup_view(popup: &ActivePopup, animate: bool) -> Element<'static, Message> {
    let layout = popup.renderer.layout();
    let mut elements: Vec<Element<'static, Message>> = Vec::with_capacity(3);

    if let Some(title) = &layout.title {
        elements.push(text_element(title));
    }
    if let Some(message) = &layout.message {
        elements.push(text_element(message));
    }
    if let Some(frame) = &layout.frame {
        elements.push(media_element(popup, frame, animate));
    }

    let background = to_iced(layout.background);
    let body = container(
        column(elements)
            .spacing(ELEMENT_SPACING)
            .align_x(Alignment::Center),
    )
    .padding(layout.style.padding)
    .width(Length::Shrink)
    .class(cosmic::theme::Container::custom(move |_theme| {
        container::Style {
            background: Some(Background::Color(background)),
            border: Border {
                radius: POPUP_RADIUS.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }));

    mouse_area(body).on_press(Message::Dismissed(popup.id)).into()
}

fn text_element(element: &TextElement) -> Element<'static, Message> {
    text(element.text.clone())
        .size(element.size)
        .class(cosmic::theme::Text::Color(to_iced(element.color)))
        .into()
}

fn media_element(popup: &ActivePopup, frame: &MediaFrame, animate: bool) -> Element<'static, Message> {
    match &frame.content {
        FrameContent::Image(_) | FrameContent::Video => {
            match popup.media_frame(animate) {
                Some(handle) => media_image(handle.clone(), frame.width, frame.height),
                None => placeholder_frame(frame.width, frame.height),
            }
        }
        FrameContent::Web { uri, .. } => {
            container(
                column![
                    text::body(uri.to_string()),
                    button::suggested(fl!("open-in-browser")).on_press(Message::OpenPage(popup.id)),
                ]
                .spacing(ELEMENT_SPACING)
                .align_x(Alignment::Center),
            )
            .center_x(Length::Fixed(frame.width as f32))
            .center_y(crate::widgets::frame_height(frame.height))
            .into()
        }
        FrameContent::Empty => placeholder_frame(frame.width, frame.height),
    }
}
