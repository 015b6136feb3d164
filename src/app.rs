// Popup lifecycle
// ===============
//
// Popups arrive over D-Bus as validated `DisplayRequest`s. Only one popup is
// on screen at a time: a new popup unmounts the current one, closes its layer
// surface and reports it as replaced.
//
// Each popup owns a renderer from `cosmic_pipup_util`. Renderers never block
// the UI thread. Image fetches and media preparation run on worker threads and
// post completions to a `UiQueue`; the media subscription delivers them here
// as `Message::Media`, where they are routed to the popup they belong to.
// Completions for a popup that is already gone are dropped.
//
// Timers:
// - `Timeout` ends the popup's lifetime
// - `RevealTimeout` fires when a deferred popup's media has not arrived
//
// A popup whose media fails outright (video that cannot play) is dismissed
// with reason `Failed`.

use crate::constants::{POPUP_MARGIN, POPUP_MAX_SIZE};
use crate::handlers::Message;
use crate::rendering::popup_view;
use crate::state::PopupState;
use crate::subscriptions::{
    media,
    popups::{self, CloseReason},
};
use cosmic::app::{Core, Settings};
use cosmic::cosmic_config::{Config, CosmicConfigEntry};
use cosmic::iced::platform_specific::runtime::wayland::layer_surface::{
    IcedMargin, IcedOutput, SctkLayerSurfaceSettings,
};
use cosmic::iced::platform_specific::shell::wayland::commands::layer_surface::{
    Anchor, KeyboardInteractivity, destroy_layer_surface, get_layer_surface,
};
use cosmic::iced::{self, Length, Limits, Subscription};
use cosmic::iced_runtime::core::window::Id as SurfaceId;
use cosmic::iced_widget::vertical_space;
use cosmic::widget::{autosize, container};
use cosmic::{Element, app::Task};
use cosmic_pipup_config::PopupsConfig;
use cosmic_pipup_util::{
    DisplayRequest, LayoutStyle, MediaVariant, Mount, MountContext, PopupDescription, Position,
    Services, UiQueue,
};
use std::time::Duration;
use tokio::sync::mpsc;

pub fn run() -> cosmic::iced::Result {
    cosmic::app::run::<CosmicPipup>(
        Settings::default()
            .antialiasing(true)
            .client_decorations(true)
            .debug(false)
            .default_text_size(16.0)
            .scale_factor(1.0)
            .no_main_window(true)
            .exit_on_close(false),
        (),
    )?;
    Ok(())
}

struct CosmicPipup {
    core: Core,
    autosize_id: iced::id::Id,
    popups: PopupState,
    popups_tx: Option<mpsc::Sender<popups::Input>>,
    ui_queue: Option<UiQueue>,
    services: Services,
    config: PopupsConfig,
}

impl CosmicPipup {
    fn layout_style(&self) -> LayoutStyle {
        LayoutStyle {
            min_width: self.config.min_width,
            padding: self.config.padding,
        }
    }

    fn animate(&self) -> bool {
        self.config.enable_animations
    }

    fn report_closed(&self, id: u32, reason: CloseReason) {
        if let Some(sender) = &self.popups_tx {
            let sender = sender.clone();
            tokio::spawn(async move {
                if let Err(err) = sender.send(popups::Input::Closed(id, reason)).await {
                    tracing::error!("Failed to report closed popup {}: {}", id, err);
                }
            });
        }
    }

    fn show_popup(&mut self, id: u32, request: DisplayRequest) -> Task<Message> {
        if self.config.do_not_disturb {
            tracing::debug!("Do not disturb, dropping popup {}", id);
            self.report_closed(id, CloseReason::Dismissed);
            return Task::none();
        }

        let Some(queue) = self.ui_queue.clone() else {
            if let Some(previous) = self.popups.hold(id, request) {
                self.report_closed(previous, CloseReason::Replaced);
            }
            return Task::none();
        };

        let DisplayRequest {
            description,
            duration,
            position,
        } = request;
        let description = if self.config.show_media {
            description
        } else {
            let (content, _) = description.into_parts();
            PopupDescription::new(content, MediaVariant::None)
        };
        let ctx = MountContext {
            services: self.services.clone(),
            ui: queue.handle(id),
            style: self.layout_style(),
            fetch_timeout: self.config.fetch_timeout(),
            video_prepare_timeout: self.config.video_prepare_timeout(),
        };

        let surface = SurfaceId::unique();
        let shown = self.popups.show(id, surface, description, &ctx);

        let mut tasks = Vec::new();
        if let Some(previous) = shown.replaced {
            self.report_closed(previous.id, CloseReason::Replaced);
            tasks.push(destroy_layer_surface(previous.surface));
        }

        match shown.mount {
            Mount::Failed => {
                self.report_closed(id, CloseReason::Failed);
                return Task::batch(tasks);
            }
            Mount::Deferred {
                timeout: Some(timeout),
            } => {
                tasks.push(after(timeout, Message::RevealTimeout(id)));
            }
            Mount::Deferred { timeout: None } | Mount::Visible => {}
        }

        let position = position.unwrap_or_else(|| position_for(&self.config.anchor));
        tasks.push(get_layer_surface(SctkLayerSurfaceSettings {
            id: surface,
            anchor: anchor_for(position),
            exclusive_zone: 0,
            keyboard_interactivity: KeyboardInteractivity::None,
            namespace: "pipup".to_string(),
            margin: IcedMargin {
                top: POPUP_MARGIN,
                right: POPUP_MARGIN,
                bottom: POPUP_MARGIN,
                left: POPUP_MARGIN,
            },
            size: Some((Some(self.config.min_width), Some(1))),
            output: IcedOutput::Active,
            size_limits: Limits::NONE
                .min_width(1.0)
                .min_height(1.0)
                .max_height(POPUP_MAX_SIZE)
                .max_width(POPUP_MAX_SIZE),
            ..Default::default()
        }));

        let lifetime = self.config.popup_duration(duration);
        tasks.push(after(lifetime, Message::Timeout(id)));

        Task::batch(tasks)
    }

    fn close(&mut self, id: u32, reason: CloseReason) -> Task<Message> {
        let Some(popup) = self.popups.close(id) else {
            return Task::none();
        };
        tracing::debug!("Closed popup {} ({:?})", id, reason);
        self.report_closed(id, reason);
        destroy_layer_surface(popup.surface)
    }

    fn dismiss(&mut self, id: Option<u32>) -> Task<Message> {
        if let Some(held) = self.popups.drop_held(id) {
            self.report_closed(held, CloseReason::Dismissed);
        }
        match id.or_else(|| self.popups.current().map(|p| p.id)) {
            Some(id) => self.close(id, CloseReason::Dismissed),
            None => Task::none(),
        }
    }

    fn handle_media(&mut self, event: media::Event) -> Task<Message> {
        match event {
            media::Event::Ready(queue) => {
                self.ui_queue = Some(queue);
                if let Some((id, request)) = self.popups.take_held() {
                    return self.show_popup(id, request);
                }
            }
            media::Event::Media(event) => {
                let id = event.popup;
                if let Some(reason) = self.popups.apply_media(event) {
                    return self.close(id, reason);
                }
            }
        }
        Task::none()
    }
}

/// Send `message` after `delay`
fn after(delay: Duration, message: Message) -> Task<Message> {
    iced::Task::perform(tokio::time::sleep(delay), move |_| cosmic::action::app(message))
}

fn position_for(anchor: &cosmic_pipup_config::Anchor) -> Position {
    use cosmic_pipup_config::Anchor as Configured;
    match anchor {
        Configured::TopRight => Position::TopRight,
        Configured::TopLeft => Position::TopLeft,
        Configured::BottomRight => Position::BottomRight,
        Configured::BottomLeft => Position::BottomLeft,
        Configured::Center => Position::Center,
    }
}

fn anchor_for(position: Position) -> Anchor {
    match position {
        Position::TopRight => Anchor::TOP.union(Anchor::RIGHT),
        Position::TopLeft => Anchor::TOP.union(Anchor::LEFT),
        Position::BottomRight => Anchor::BOTTOM.union(Anchor::RIGHT),
        Position::BottomLeft => Anchor::BOTTOM.union(Anchor::LEFT),
        Position::Center => Anchor::empty(),
    }
}

impl cosmic::Application for CosmicPipup {
    type Message = Message;
    type Executor = cosmic::executor::single::Executor;
    type Flags = ();
    const APP_ID: &'static str = crate::config::APP_ID;

    fn init(core: Core, _flags: ()) -> (Self, Task<Message>) {
        let helper = Config::new(cosmic_pipup_config::ID, PopupsConfig::VERSION).ok();

        let config: PopupsConfig = helper
            .as_ref()
            .map(|helper| {
                PopupsConfig::get_entry(helper).unwrap_or_else(|(errors, config)| {
                    for err in errors {
                        if err.is_err() {
                            tracing::error!("{:?}", err);
                        }
                    }
                    config
                })
            })
            .unwrap_or_default();
        (
            CosmicPipup {
                core,
                autosize_id: iced::id::Id::new("autosize"),
                popups: PopupState::new(),
                popups_tx: None,
                ui_queue: None,
                services: Services::desktop(config.fetch_timeout()),
                config,
            },
            Task::none(),
        )
    }

    fn core(&self) -> &Core {
        &self.core
    }

    fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }

    fn view(&self) -> Element<Self::Message> {
        unimplemented!();
    }

    fn update(&mut self, message: Message) -> Task<Self::Message> {
        match message {
            Message::Popups(e) => match e {
                popups::Event::Ready(tx) => {
                    self.popups_tx = Some(tx);
                }
                popups::Event::Popup { id, request } => {
                    return self.show_popup(id, request);
                }
                popups::Event::Dismiss(id) => {
                    return self.dismiss(Some(id));
                }
                popups::Event::DismissAll => {
                    return self.dismiss(None);
                }
            },
            Message::Media(event) => {
                return self.handle_media(event);
            }
            Message::Timeout(id) => {
                return self.close(id, CloseReason::Expired);
            }
            Message::RevealTimeout(id) => {
                if let Some(reason) = self.popups.reveal_timed_out(id) {
                    return self.close(id, reason);
                }
            }
            Message::Dismissed(id) => {
                return self.close(id, CloseReason::Dismissed);
            }
            Message::OpenPage(id) => {
                if let Some(popup) = self.popups.get(id) {
                    if let Err(e) = popup.renderer.open_content() {
                        tracing::error!("Failed to open page of popup {}: {}", id, e);
                    }
                }
            }
            Message::Config(config) => {
                if config.fetch_timeout_ms != self.config.fetch_timeout_ms {
                    self.services = Services::desktop(config.fetch_timeout());
                }
                self.config = config;
            }
            Message::Frame(_) => {}
        }
        Task::none()
    }

    fn view_window(&self, id: SurfaceId) -> Element<Message> {
        let Some(popup) = self
            .popups
            .current()
            .filter(|p| p.surface == id && p.is_visible())
        else {
            return container(vertical_space().height(Length::Fixed(1.0)))
                .center_x(Length::Fixed(1.0))
                .center_y(Length::Fixed(1.0))
                .into();
        };

        autosize::autosize(popup_view(popup, self.animate()), self.autosize_id.clone())
            .min_width(popup.renderer.layout().style.min_width as f32)
            .min_height(1.)
            .max_width(POPUP_MAX_SIZE)
            .max_height(POPUP_MAX_SIZE)
            .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![
            self.core
                .watch_config(cosmic_pipup_config::ID)
                .map(|u| {
                    for why in u
                        .errors
                        .into_iter()
                        .filter(cosmic::cosmic_config::Error::is_err)
                    {
                        tracing::error!(?why, "config load error");
                    }
                    Message::Config(u.config)
                }),
            popups::popups().map(Message::Popups),
            media::media_events().map(Message::Media),
        ];

        let animating = self
            .popups
            .current()
            .is_some_and(|p| p.is_visible() && p.animator.is_animated());
        if animating && self.animate() {
            subscriptions.push(
                iced::time::every(crate::constants::ANIMATION_TICK).map(Message::Frame),
            );
        }

        Subscription::batch(subscriptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_for_corners() {
        assert_eq!(
            anchor_for(Position::TopRight),
            Anchor::TOP.union(Anchor::RIGHT)
        );
        assert_eq!(
            anchor_for(Position::BottomLeft),
            Anchor::BOTTOM.union(Anchor::LEFT)
        );
        assert!(anchor_for(Position::Center).is_empty());
    }

    #[test]
    fn test_configured_anchor_maps_to_position() {
        assert_eq!(
            position_for(&cosmic_pipup_config::Anchor::default()),
            Position::TopRight
        );
        assert_eq!(
            position_for(&cosmic_pipup_config::Anchor::Center),
            Position::Center
        );
    }
}
