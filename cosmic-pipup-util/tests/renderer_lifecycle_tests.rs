//! Integration tests for the popup renderer lifecycle
//!
//! Platform collaborators are replaced by fakes that record what renderers
//! ask of them. The UI thread is simulated by draining the event queue into
//! the renderer under test.

use cosmic_pipup_util::{
    build, mount_popup, Color, ContentBackend, ContentError, ContentSettings, ContentSurface,
    DecodedImage, FetchError, FetchHandle, FetchRequest, FrameContent, FrameHeight, ImageFetcher,
    LayoutStyle, MediaEvent, MediaVariant, Mount, MountContext, PlaybackBackend, PlaybackError,
    Player, PopupDescription, RenderState, Renderer, RendererKind, Services, UiEvent, UiHandle,
    UiQueue,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
const PREPARE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Default)]
struct FakeFetcher {
    requests: Mutex<Vec<(FetchRequest, FetchHandle)>>,
}

impl FakeFetcher {
    fn last_handle(&self) -> FetchHandle {
        self.requests.lock().unwrap().last().unwrap().1.clone()
    }
}

impl ImageFetcher for FakeFetcher {
    fn fetch(&self, request: FetchRequest, _ui: UiHandle) -> FetchHandle {
        let handle = FetchHandle::new();
        self.requests.lock().unwrap().push((request, handle.clone()));
        handle
    }
}

#[derive(Debug, Default)]
struct PlayerLog {
    loaded: Vec<Url>,
    starts: usize,
    stops: usize,
    releases: usize,
}

#[derive(Default)]
struct FakePlayback {
    log: Arc<Mutex<PlayerLog>>,
    fail_start: bool,
    fail_stop: bool,
}

struct FakePlayer {
    log: Arc<Mutex<PlayerLog>>,
    fail_start: bool,
    fail_stop: bool,
    playing: bool,
}

impl Player for FakePlayer {
    fn load(&mut self, uri: &Url) -> Result<(), PlaybackError> {
        self.log.lock().unwrap().loaded.push(uri.clone());
        Ok(())
    }

    fn start(&mut self) -> Result<(), PlaybackError> {
        self.log.lock().unwrap().starts += 1;
        if self.fail_start {
            return Err(PlaybackError::Unsupported("video/x-test".into()));
        }
        self.playing = true;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn stop(&mut self) -> Result<(), PlaybackError> {
        self.log.lock().unwrap().stops += 1;
        if self.fail_stop {
            return Err(PlaybackError::Stop("device lost".into()));
        }
        self.playing = false;
        Ok(())
    }

    fn release(&mut self) {
        self.log.lock().unwrap().releases += 1;
        self.playing = false;
    }
}

impl PlaybackBackend for FakePlayback {
    fn create_player(&self, _ui: UiHandle) -> Box<dyn Player> {
        Box::new(FakePlayer {
            log: Arc::clone(&self.log),
            fail_start: self.fail_start,
            fail_stop: self.fail_stop,
            playing: false,
        })
    }
}

#[derive(Debug, Default)]
struct SurfaceLog {
    created: Vec<(u32, u32)>,
    loaded: Vec<(Url, ContentSettings)>,
    opens: usize,
    closes: usize,
}

#[derive(Default)]
struct FakeContent {
    log: Arc<Mutex<SurfaceLog>>,
    fail_close: bool,
}

struct FakeSurface {
    log: Arc<Mutex<SurfaceLog>>,
    fail_close: bool,
}

impl ContentSurface for FakeSurface {
    fn load(&mut self, uri: &Url, settings: &ContentSettings) -> Result<(), ContentError> {
        self.log.lock().unwrap().loaded.push((uri.clone(), settings.clone()));
        Ok(())
    }

    fn open(&self) -> Result<(), ContentError> {
        self.log.lock().unwrap().opens += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ContentError> {
        self.log.lock().unwrap().closes += 1;
        if self.fail_close {
            return Err(ContentError::Closed);
        }
        Ok(())
    }
}

impl ContentBackend for FakeContent {
    fn create_surface(&self, width: u32, height: u32) -> Box<dyn ContentSurface> {
        self.log.lock().unwrap().created.push((width, height));
        Box::new(FakeSurface {
            log: Arc::clone(&self.log),
            fail_close: self.fail_close,
        })
    }
}

struct Harness {
    fetcher: Arc<FakeFetcher>,
    playback: Arc<FakePlayback>,
    content: Arc<FakeContent>,
    queue: UiQueue,
    rx: UnboundedReceiver<UiEvent>,
}

impl Harness {
    fn new() -> Self {
        Self::with(FakePlayback::default(), FakeContent::default())
    }

    fn with(playback: FakePlayback, content: FakeContent) -> Self {
        let (queue, rx) = UiQueue::channel();
        Self {
            fetcher: Arc::new(FakeFetcher::default()),
            playback: Arc::new(playback),
            content: Arc::new(content),
            queue,
            rx,
        }
    }

    fn ctx(&self, popup: u32) -> MountContext {
        MountContext {
            services: Services {
                fetcher: self.fetcher.clone(),
                playback: self.playback.clone(),
                content: self.content.clone(),
            },
            ui: self.queue.handle(popup),
            style: LayoutStyle::default(),
            fetch_timeout: FETCH_TIMEOUT,
            video_prepare_timeout: Some(PREPARE_TIMEOUT),
        }
    }

    /// Deliver `event` the way a worker thread would, then drain the queue
    fn complete(&mut self, renderer: &mut dyn Renderer, popup: u32, event: MediaEvent) {
        self.queue.handle(popup).post(event);
        while let Ok(UiEvent { event, .. }) = self.rx.try_recv() {
            renderer.handle(event);
        }
    }
}

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn solid_image(width: u32, height: u32) -> DecodedImage {
    DecodedImage::from_rgba(width, height, vec![200; (width * height * 4) as usize]).unwrap()
}

fn describe(media: MediaVariant) -> PopupDescription {
    PopupDescription::builder()
        .title("Doorbell")
        .message("Someone is at the door")
        .media(media)
        .build()
}

#[test]
fn test_factory_selects_renderer_per_variant() {
    let cases = vec![
        (MediaVariant::None, RendererKind::Text),
        (
            MediaVariant::Image { uri: url("https://example.com/a.png"), width: 480 },
            RendererKind::Image,
        ),
        (
            MediaVariant::Bitmap { pixels: solid_image(4, 4), width: 4 },
            RendererKind::Bitmap,
        ),
        (
            MediaVariant::Video { uri: url("https://example.com/a.mp4"), width: 480 },
            RendererKind::Video,
        ),
        (
            MediaVariant::Web { uri: url("https://example.com"), width: 640, height: 480 },
            RendererKind::Web,
        ),
    ];

    for (media, kind) in cases {
        let renderer = build(describe(media));
        assert_eq!(renderer.kind(), kind);
        assert_eq!(renderer.state(), RenderState::Idle, "build must not mount");
        assert!(!renderer.layout().visible);
    }
}

#[test]
fn test_build_has_no_side_effects() {
    let harness = Harness::new();
    let _image = build(describe(MediaVariant::Image {
        uri: url("https://example.com/a.png"),
        width: 480,
    }));
    let _video = build(describe(MediaVariant::Video {
        uri: url("https://example.com/a.mp4"),
        width: 480,
    }));

    assert!(harness.fetcher.requests.lock().unwrap().is_empty());
    assert!(harness.playback.log.lock().unwrap().loaded.is_empty());
}

#[test]
fn test_text_popup_omits_empty_text() {
    let harness = Harness::new();
    let description = PopupDescription::builder()
        .title("")
        .message("Only a message")
        .message_color(Color::rgb(1.0, 0.0, 0.0))
        .build();

    let (renderer, mount) = mount_popup(description, &harness.ctx(1));

    assert_eq!(mount, Mount::Visible);
    let layout = renderer.layout();
    assert!(layout.visible);
    assert!(layout.title.is_none());
    assert!(layout.frame.is_none());
    let message = layout.message.as_ref().unwrap();
    assert_eq!(message.text, "Only a message");
    assert_eq!(message.color, Color::rgb(1.0, 0.0, 0.0));
}

#[test]
fn test_empty_description_renders_empty_container() {
    let harness = Harness::new();
    let (renderer, mount) = mount_popup(PopupDescription::builder().build(), &harness.ctx(1));

    assert_eq!(mount, Mount::Visible);
    assert!(renderer.layout().is_empty());
}

#[test]
fn test_bitmap_frame_uses_scaled_height() {
    let harness = Harness::new();
    let description = describe(MediaVariant::Bitmap {
        pixels: solid_image(100, 50),
        width: 240,
    });

    let (renderer, mount) = mount_popup(description, &harness.ctx(1));

    assert_eq!(mount, Mount::Visible);
    assert_eq!(renderer.state(), RenderState::Visible);
    let frame = renderer.layout().frame.as_ref().unwrap();
    assert_eq!(frame.width, 240);
    assert_eq!(frame.height, FrameHeight::Fixed(120));
    assert!(matches!(frame.content, FrameContent::Image(_)));
}

#[test]
fn test_bitmap_unmount_releases_pixels() {
    let harness = Harness::new();
    let pixels = solid_image(10, 10);
    let shared = Arc::clone(&pixels.frames()[0].data);

    let (mut renderer, _) = mount_popup(
        describe(MediaVariant::Bitmap { pixels, width: 10 }),
        &harness.ctx(1),
    );
    assert!(Arc::strong_count(&shared) > 1);

    renderer.unmount();

    assert_eq!(Arc::strong_count(&shared), 1);
    assert!(renderer.layout().frame.is_none());
    assert_eq!(renderer.state(), RenderState::Unmounted);
}

#[test]
fn test_image_hidden_until_loaded() {
    let mut harness = Harness::new();
    let uri = url("https://example.com/cam.jpg");
    let (mut renderer, mount) = mount_popup(
        describe(MediaVariant::Image { uri: uri.clone(), width: 320 }),
        &harness.ctx(4),
    );

    assert!(matches!(mount, Mount::Deferred { timeout: Some(_) }));
    assert_eq!(renderer.state(), RenderState::Pending);
    assert!(!renderer.layout().visible);
    {
        let requests = harness.fetcher.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0.uri, uri);
        assert_eq!(requests[0].0.timeout, FETCH_TIMEOUT);
    }

    harness.complete(renderer.as_mut(), 4, MediaEvent::ImageLoaded(solid_image(64, 32)));

    assert_eq!(renderer.state(), RenderState::Visible);
    assert!(renderer.layout().visible);
    let frame = renderer.layout().frame.as_ref().unwrap();
    assert_eq!(frame.width, 320);
    assert_eq!(frame.height, FrameHeight::WrapContent);
    match &frame.content {
        FrameContent::Image(image) => assert_eq!(image.width(), 64),
        other => panic!("Expected image content, got {:?}", other),
    }
}

#[test]
fn test_image_failure_degrades_to_text() {
    let mut harness = Harness::new();
    let (mut renderer, _) = mount_popup(
        describe(MediaVariant::Image { uri: url("https://example.com/404.png"), width: 320 }),
        &harness.ctx(2),
    );

    harness.complete(renderer.as_mut(), 2, MediaEvent::ImageFailed(FetchError::Http(404)));

    let layout = renderer.layout();
    assert!(layout.visible);
    assert!(layout.frame.is_none());
    assert_eq!(layout.title.as_ref().unwrap().text, "Doorbell");
    assert_eq!(layout.message.as_ref().unwrap().text, "Someone is at the door");
    assert_eq!(renderer.state(), RenderState::Visible);
}

#[test]
fn test_image_unmount_cancels_fetch_and_ignores_late_result() {
    let mut harness = Harness::new();
    let (mut renderer, _) = mount_popup(
        describe(MediaVariant::Image { uri: url("https://example.com/slow.png"), width: 320 }),
        &harness.ctx(3),
    );
    let fetch = harness.fetcher.last_handle();

    renderer.unmount();
    assert!(fetch.is_cancelled());

    harness.complete(renderer.as_mut(), 3, MediaEvent::ImageLoaded(solid_image(8, 8)));

    assert_eq!(renderer.state(), RenderState::Unmounted);
    assert!(!renderer.layout().visible);
    assert!(renderer.layout().is_empty());
}

#[test]
fn test_image_reveal_timeout_shows_text() {
    let harness = Harness::new();
    let (mut renderer, _) = mount_popup(
        describe(MediaVariant::Image { uri: url("https://example.com/hang.png"), width: 320 }),
        &harness.ctx(3),
    );

    renderer.reveal_timed_out();

    assert!(harness.fetcher.last_handle().is_cancelled());
    assert!(renderer.layout().visible);
    assert!(renderer.layout().frame.is_none());
}

#[test]
fn test_video_visible_only_after_size_report() {
    let mut harness = Harness::new();
    let uri = url("https://example.com/clip.mp4");
    let (mut renderer, mount) = mount_popup(
        describe(MediaVariant::Video { uri: uri.clone(), width: 480 }),
        &harness.ctx(5),
    );

    assert_eq!(mount, Mount::Deferred { timeout: Some(PREPARE_TIMEOUT) });
    assert!(!renderer.layout().visible);
    let frame = renderer.layout().frame.as_ref().unwrap();
    assert_eq!((frame.width, frame.height), (1, FrameHeight::Fixed(1)));
    {
        let log = harness.playback.log.lock().unwrap();
        assert_eq!(log.loaded, vec![uri]);
        assert_eq!(log.starts, 1);
    }
    assert!(renderer.player().is_some_and(|p| p.is_playing()));

    // size reports before preparation do not count
    harness.complete(
        renderer.as_mut(),
        5,
        MediaEvent::VideoSizeChanged { width: 1920, height: 1080 },
    );
    assert!(!renderer.layout().visible);

    harness.complete(renderer.as_mut(), 5, MediaEvent::VideoPrepared);
    assert!(!renderer.layout().visible);

    harness.complete(
        renderer.as_mut(),
        5,
        MediaEvent::VideoSizeChanged { width: 1920, height: 1080 },
    );
    assert!(renderer.layout().visible);
    assert_eq!(renderer.state(), RenderState::Visible);
    let frame = renderer.layout().frame.as_ref().unwrap();
    assert_eq!(frame.width, 480);
    assert_eq!(frame.height, FrameHeight::Fixed(270));
}

#[test]
fn test_video_start_failure_fails_popup() {
    let harness = Harness::with(
        FakePlayback {
            fail_start: true,
            ..FakePlayback::default()
        },
        FakeContent::default(),
    );
    let (mut renderer, mount) = mount_popup(
        describe(MediaVariant::Video { uri: url("https://example.com/clip.mkv"), width: 480 }),
        &harness.ctx(6),
    );

    assert_eq!(mount, Mount::Failed);
    assert_eq!(renderer.state(), RenderState::Failed);
    assert!(!renderer.layout().visible);

    renderer.unmount();
    assert_eq!(harness.playback.log.lock().unwrap().releases, 1);
}

#[test]
fn test_video_preparation_timeout_fails_popup() {
    let harness = Harness::new();
    let (mut renderer, _) = mount_popup(
        describe(MediaVariant::Video { uri: url("https://example.com/clip.mp4"), width: 480 }),
        &harness.ctx(7),
    );

    renderer.reveal_timed_out();

    assert_eq!(renderer.state(), RenderState::Failed);
    assert!(!renderer.layout().visible);
}

#[test]
fn test_video_playback_failure_fails_popup() {
    let mut harness = Harness::new();
    let (mut renderer, _) = mount_popup(
        describe(MediaVariant::Video { uri: url("https://example.com/clip.mp4"), width: 480 }),
        &harness.ctx(8),
    );

    harness.complete(
        renderer.as_mut(),
        8,
        MediaEvent::PlaybackFailed(PlaybackError::Load("connection reset".into())),
    );

    assert_eq!(renderer.state(), RenderState::Failed);
}

#[test]
fn test_unmount_is_idempotent_when_stop_fails() {
    let harness = Harness::with(
        FakePlayback {
            fail_stop: true,
            ..FakePlayback::default()
        },
        FakeContent::default(),
    );
    let (mut renderer, _) = mount_popup(
        describe(MediaVariant::Video { uri: url("https://example.com/clip.mp4"), width: 480 }),
        &harness.ctx(9),
    );

    renderer.unmount();
    renderer.unmount();

    let log = harness.playback.log.lock().unwrap();
    assert_eq!(log.stops, 1);
    assert_eq!(log.releases, 1);
    assert_eq!(renderer.state(), RenderState::Unmounted);
    assert!(renderer.player().is_none());
}

#[test]
fn test_unmount_before_mount_is_harmless() {
    for media in [
        MediaVariant::None,
        MediaVariant::Video { uri: url("https://example.com/clip.mp4"), width: 480 },
        MediaVariant::Web { uri: url("https://example.com"), width: 640, height: 480 },
    ] {
        let mut renderer = build(describe(media));
        renderer.unmount();
        renderer.unmount();
        assert_eq!(renderer.state(), RenderState::Unmounted);
    }
}

#[test]
fn test_web_popup_loads_with_content_settings() {
    let harness = Harness::new();
    let uri = url("https://example.com/dashboard");
    let (mut renderer, mount) = mount_popup(
        describe(MediaVariant::Web { uri: uri.clone(), width: 800, height: 600 }),
        &harness.ctx(10),
    );

    assert_eq!(mount, Mount::Visible);
    let frame = renderer.layout().frame.as_ref().unwrap();
    assert_eq!(frame.width, 800);
    assert_eq!(frame.height, FrameHeight::Fixed(600));
    {
        let log = harness.content.log.lock().unwrap();
        assert_eq!(log.created, vec![(800, 600)]);
        let (loaded, settings) = &log.loaded[0];
        assert_eq!(loaded, &uri);
        assert!(settings.javascript);
        assert!(settings.dom_storage);
        assert!(settings.wide_viewport);
        assert!(settings.overview_mode);
        assert!(!settings.media_requires_user_gesture);
    }

    renderer.unmount();
    assert_eq!(harness.content.log.lock().unwrap().closes, 1);
}

#[test]
fn test_opening_web_content_goes_through_the_surface() {
    let harness = Harness::new();
    let (mut renderer, _) = mount_popup(
        describe(MediaVariant::Web { uri: url("https://example.com"), width: 640, height: 480 }),
        &harness.ctx(13),
    );

    assert_eq!(renderer.open_content(), Ok(()));
    assert_eq!(harness.content.log.lock().unwrap().opens, 1);

    renderer.unmount();
    assert_eq!(renderer.open_content(), Err(ContentError::Closed));
    assert_eq!(harness.content.log.lock().unwrap().opens, 1);
}

#[test]
fn test_text_popup_has_no_content_to_open() {
    let harness = Harness::new();
    let (renderer, _) = mount_popup(describe(MediaVariant::None), &harness.ctx(14));
    assert_eq!(renderer.open_content(), Err(ContentError::NoPage));
}

#[test]
fn test_web_close_failure_is_swallowed() {
    let harness = Harness::with(
        FakePlayback::default(),
        FakeContent {
            fail_close: true,
            ..FakeContent::default()
        },
    );
    let (mut renderer, _) = mount_popup(
        describe(MediaVariant::Web { uri: url("https://example.com"), width: 640, height: 480 }),
        &harness.ctx(11),
    );

    renderer.unmount();
    renderer.unmount();

    assert_eq!(harness.content.log.lock().unwrap().closes, 1);
    assert_eq!(renderer.state(), RenderState::Unmounted);
}

#[test]
fn test_second_mount_is_ignored() {
    let harness = Harness::new();
    let ctx = harness.ctx(12);
    let (mut renderer, _) = mount_popup(
        describe(MediaVariant::Image { uri: url("https://example.com/a.png"), width: 320 }),
        &ctx,
    );

    let again = renderer.mount(&ctx);

    assert_eq!(again, Mount::Deferred { timeout: None });
    assert_eq!(harness.fetcher.requests.lock().unwrap().len(), 1);
}
