//! Drains media completions onto the UI thread.

use crate::constants::CHANNEL_BUFFER_SIZE;
use cosmic::{
    iced::{
        futures::{self, SinkExt},
        stream,
    },
    iced_futures::Subscription,
};
use cosmic_pipup_util::{UiEvent, UiQueue};

#[derive(Debug, Clone)]
pub enum Event {
    /// Queue renderers and their workers post to
    Ready(UiQueue),
    Media(UiEvent),
}

pub fn media_events() -> Subscription<Event> {
    struct MediaWorker;

    Subscription::run_with_id(
        std::any::TypeId::of::<MediaWorker>(),
        stream::channel(CHANNEL_BUFFER_SIZE, |mut output| async move {
            let (queue, mut rx) = UiQueue::channel();
            _ = output.send(Event::Ready(queue)).await;

            while let Some(event) = rx.recv().await {
                if output.send(Event::Media(event)).await.is_err() {
                    tracing::debug!("Media event subscription closed");
                    break;
                }
            }

            futures::pending!();
        }),
    )
}
