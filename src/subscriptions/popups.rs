use crate::constants::{
    CHANNEL_BUFFER_SIZE, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY, RATE_LIMIT_CLEANUP_INTERVAL, RATE_LIMIT_MAX_SENDERS,
    RATE_LIMIT_PER_MINUTE,
};
use cosmic::{
    iced::{
        futures::{self, SinkExt},
        stream,
    },
    iced_futures::Subscription,
};
use cosmic_pipup_util::{DisplayRequest, PopupRequest, RequestError};
use futures::channel::mpsc;
use std::{
    collections::HashMap,
    num::NonZeroU32,
    time::{Duration, Instant},
};
use tokio::{
    sync::mpsc::{Receiver, Sender, channel},
    task::JoinHandle,
};
use tracing::error;

use zbus::{
    Connection, connection::Builder as ConnectionBuilder, interface, message::Header,
    object_server::SignalEmitter,
};

pub const DBUS_NAME: &str = "io.github.CosmicPipup";
pub const DBUS_PATH: &str = "/io/github/CosmicPipup";

/// Why a popup went away, as sent with `PopupClosed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CloseReason {
    Expired = 1,
    Dismissed = 2,
    Replaced = 3,
    Failed = 4,
}

#[derive(Debug)]
pub struct Conns {
    popups: Connection,
    pub tx: Sender<Input>,
    rx: Receiver<Input>,
}

impl Conns {
    pub async fn new() -> zbus::Result<Self> {
        let (tx, rx) = channel(CHANNEL_BUFFER_SIZE);

        let popups = retry(CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY, || {
            let builder = ConnectionBuilder::session()
                .and_then(|conn| conn.name(DBUS_NAME))
                .and_then(|conn| conn.serve_at(DBUS_PATH, Popups::new(tx.clone())));
            async move {
                match builder {
                    Ok(builder) => builder.build().await,
                    Err(err) => Err(err),
                }
            }
        })
        .await?;

        Ok(Self { tx, popups, rx })
    }
}

/// Run `connect` up to `attempts` times, pausing `delay` after each failure
async fn retry<T, F, Fut>(attempts: usize, delay: Duration, mut connect: F) -> zbus::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = zbus::Result<T>>,
{
    let mut last_error = None;
    for attempt in 1..=attempts {
        match connect().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                error!(
                    "Failed to serve {} at {} (attempt {}/{}): {}",
                    DBUS_NAME, DBUS_PATH, attempt, attempts, err
                );
                last_error = Some(err);
            }
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }
    Err(last_error
        .unwrap_or_else(|| zbus::Error::Failure("Failed to create the dbus server".to_string())))
}

struct Start;
struct Waiting;

struct Machine<S> {
    output: mpsc::Sender<Event>,
    marker: core::marker::PhantomData<S>,
}

impl<S> Machine<S> {
    pub fn new(output: mpsc::Sender<Event>) -> Self {
        Self {
            output,
            marker: core::marker::PhantomData,
        }
    }

    pub fn transition<Next>(self) -> Machine<Next> {
        Machine::<Next> {
            output: self.output,
            marker: core::marker::PhantomData,
        }
    }
}

impl Machine<Start> {
    pub async fn exec(mut self) -> Result<(Machine<Waiting>, Conns), ()> {
        let handle: JoinHandle<zbus::Result<_>> = tokio::spawn(async move {
            let conns = Conns::new().await?;
            Ok(conns)
        });

        match handle.await {
            Ok(Ok(conns)) => {
                _ = self.output.send(Event::Ready(conns.tx.clone())).await;
                Ok((self.transition::<Waiting>(), conns))
            }
            Ok(Err(err)) => {
                error!("Failed to create connection {}", err);
                Err(())
            }
            Err(err) => {
                error!("Failed to create connection {}", err);
                Err(())
            }
        }
    }
}

impl Machine<Waiting> {
    pub async fn exec(mut self, mut conns: Conns) {
        while let Some(next) = conns.rx.recv().await {
            match next {
                Input::Popup { id, request } => {
                    _ = self.output.send(Event::Popup { id, request }).await;
                }
                Input::Dismiss(id) => {
                    _ = self.output.send(Event::Dismiss(id)).await;
                }
                Input::DismissAll => {
                    _ = self.output.send(Event::DismissAll).await;
                }
                Input::Closed(id, reason) => {
                    let object_server = conns.popups.object_server();
                    let Ok(iface_ref) = object_server.interface::<_, Popups>(DBUS_PATH).await
                    else {
                        continue;
                    };
                    if let Err(err) =
                        Popups::popup_closed(iface_ref.signal_emitter(), id, reason as u32).await
                    {
                        error!("Failed to signal closed popup {}", err);
                    }
                }
            }
        }
    }
}

#[derive(Debug)]
pub enum Input {
    Popup { id: u32, request: DisplayRequest },
    Dismiss(u32),
    DismissAll,
    Closed(u32, CloseReason),
}

#[derive(Debug, Clone)]
pub enum Event {
    Ready(Sender<Input>),
    Popup { id: u32, request: DisplayRequest },
    Dismiss(u32),
    DismissAll,
}

pub fn popups() -> Subscription<Event> {
    struct SomeWorker;

    Subscription::run_with_id(
        std::any::TypeId::of::<SomeWorker>(),
        stream::channel(CHANNEL_BUFFER_SIZE, |output| async move {
            let machine = Machine::<Start>::new(output);

            if let Ok((waiting, conns)) = machine.exec().await {
                waiting.exec(conns).await;
            };

            futures::pending!();
        }),
    )
}

/// Rate limiter to prevent popup spam
struct RateLimiter {
    // sender -> (window_start, count_in_window)
    limits: HashMap<String, (Instant, u32)>,
}

impl RateLimiter {
    const WINDOW: Duration = Duration::from_secs(60);

    fn new() -> Self {
        Self {
            limits: HashMap::new(),
        }
    }

    /// Check if a popup from the given sender should be accepted.
    fn check_and_update(&mut self, sender: &str) -> bool {
        if self.limits.len() >= RATE_LIMIT_MAX_SENDERS {
            self.cleanup();
        }

        if self.limits.len() >= RATE_LIMIT_MAX_SENDERS {
            tracing::warn!(
                "Rate limiter tracking too many senders ({}), rejecting popup from '{}'",
                self.limits.len(),
                sender
            );
            return false;
        }

        let now = Instant::now();
        let entry = self.limits.entry(sender.to_string()).or_insert((now, 0));

        if now.duration_since(entry.0) > Self::WINDOW {
            *entry = (now, 1);
            return true;
        }

        if entry.1 >= RATE_LIMIT_PER_MINUTE {
            tracing::warn!(
                "Rate limiting popups from '{}' - exceeded {} popups per minute",
                sender,
                RATE_LIMIT_PER_MINUTE
            );
            return false;
        }

        entry.1 += 1;
        true
    }

    fn cleanup(&mut self) {
        let now = Instant::now();
        self.limits
            .retain(|_, (start, _)| now.duration_since(*start) <= Self::WINDOW);
    }
}

pub struct Popups {
    tx: Sender<Input>,
    next_id: NonZeroU32,
    limiter: RateLimiter,
}

impl Popups {
    fn new(tx: Sender<Input>) -> Self {
        Self {
            tx,
            next_id: NonZeroU32::MIN,
            limiter: RateLimiter::new(),
        }
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = id.checked_add(1).unwrap_or_else(|| {
            tracing::warn!("Popup ID overflowed");
            NonZeroU32::MIN
        });
        id.get()
    }

    async fn submit(
        &mut self,
        header: &Header<'_>,
        request: &str,
        bitmap: Option<Vec<u8>>,
    ) -> zbus::fdo::Result<u32> {
        if self.next_id.get() % RATE_LIMIT_CLEANUP_INTERVAL == 0 {
            self.limiter.cleanup();
        }

        let sender = header
            .sender()
            .map(|s| s.to_string())
            .unwrap_or_default();
        if !self.limiter.check_and_update(&sender) {
            return Err(zbus::fdo::Error::LimitsExceeded(format!(
                "more than {} popups per minute",
                RATE_LIMIT_PER_MINUTE
            )));
        }

        let request = parse_request(request.to_string(), bitmap)
            .await
            .map_err(|e| zbus::fdo::Error::InvalidArgs(e.to_string()))?;

        let id = self.allocate_id();
        tracing::debug!(
            "Popup {} from '{}' with {} media",
            id,
            sender,
            request.description.media().name()
        );
        if let Err(err) = self.tx.send(Input::Popup { id, request }).await {
            tracing::error!("Failed to send popup: {}", err);
        }

        Ok(id)
    }
}

/// Validate a request off the async executor; bitmaps are decoded here
async fn parse_request(json: String, bitmap: Option<Vec<u8>>) -> Result<DisplayRequest, RequestError> {
    match tokio::task::spawn_blocking(move || {
        PopupRequest::from_json(&json)?.into_display(bitmap.as_deref())
    })
    .await
    {
        Ok(result) => result,
        Err(err) => Err(RequestError::InvalidBitmap(err.to_string())),
    }
}

#[interface(name = "io.github.CosmicPipup")]
impl Popups {
    /// Show a popup described by a JSON request. Returns the popup id.
    async fn notify(
        &mut self,
        #[zbus(header)] header: Header<'_>,
        request: &str,
    ) -> zbus::fdo::Result<u32> {
        self.submit(&header, request, None).await
    }

    /// Show a popup whose media is the encoded image in `image`
    async fn notify_with_bitmap(
        &mut self,
        #[zbus(header)] header: Header<'_>,
        request: &str,
        image: Vec<u8>,
    ) -> zbus::fdo::Result<u32> {
        self.submit(&header, request, Some(image)).await
    }

    async fn dismiss(&self, id: u32) {
        if let Err(err) = self.tx.send(Input::Dismiss(id)).await {
            tracing::error!("Failed to send dismiss: {}", err);
        }
    }

    async fn dismiss_all(&self) {
        if let Err(err) = self.tx.send(Input::DismissAll).await {
            tracing::error!("Failed to send dismiss all: {}", err);
        }
    }

    /// id	UINT32	The popup that was closed.
    /// reason	UINT32
    ///
    /// 1 - The popup expired.
    ///
    /// 2 - The popup was dismissed.
    ///
    /// 3 - The popup was replaced by a newer one.
    ///
    /// 4 - The popup's media failed.
    #[zbus(signal)]
    async fn popup_closed(
        signal_ctxt: &SignalEmitter<'_>,
        id: u32,
        reason: u32,
    ) -> zbus::Result<()>;
}
