use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::playback::{PlayerAdapter, PlayerEvent, PlayerTrack};
use core_cache::CacheConfig;
use core_runtime::config::CoreConfig;
use core_service::{CoreError, CoreService, ServiceOptions};
use mockall::mock;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

mock! {
    Backend {}

    #[async_trait]
    impl HttpClient for Backend {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

struct RecordingPlayer {
    loaded: Mutex<Vec<PlayerTrack>>,
    events: broadcast::Sender<PlayerEvent>,
}

impl RecordingPlayer {
    fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(8);
        Arc::new(Self {
            loaded: Mutex::new(Vec::new()),
            events,
        })
    }
}

#[async_trait]
impl PlayerAdapter for RecordingPlayer {
    async fn load(&self, track: PlayerTrack) -> BridgeResult<()> {
        self.loaded.lock().push(track);
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn seek(&self, _position: Duration) -> BridgeResult<()> {
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn position(&self) -> BridgeResult<Duration> {
        Ok(Duration::ZERO)
    }

    async fn duration(&self) -> BridgeResult<Option<Duration>> {
        Ok(None)
    }

    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}

const BASE: &str = "http://catalog.local:8789";

fn json(body: &str) -> HttpResponse {
    HttpResponse::new(200, body.to_string())
        .with_header("Content-Type", "application/json")
        .with_header("Cache-Control", "max-age=300")
}

fn expect_get(backend: &mut MockBackend, path: &'static str, body: &'static str, times: usize) {
    backend
        .expect_execute()
        .withf(move |request| request.url == format!("{BASE}{path}"))
        .times(times)
        .returning(move |_| Ok(json(body)));
}

fn config(backend: MockBackend, player: Arc<RecordingPlayer>) -> CoreConfig {
    CoreConfig::builder()
        .catalog_base_url(BASE)
        .http_client(Arc::new(backend))
        .player(player)
        .enable_stream_probe(false)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_radio_through_cached_catalog() {
    let mut backend = MockBackend::new();
    expect_get(
        &mut backend,
        "/youtube/audio/x",
        r#"{"videoId":"x","title":"Seed","artist":"Band","audioUrl":"https://cdn/x"}"#,
        1,
    );
    expect_get(
        &mut backend,
        "/youtube/related/x",
        r#"{"items":[{"videoId":"y","title":"Y"},{"videoId":"z","title":"Z"},{"videoId":"w","title":"W"},{"videoId":"v","title":"V"}]}"#,
        1,
    );

    let player = RecordingPlayer::new();
    let core = CoreService::bootstrap(config(backend, player.clone()), ServiceOptions::default())
        .await
        .unwrap();

    assert!(core.engine().play_by_id("x").await);

    let snapshot = core.engine().snapshot();
    assert_eq!(snapshot.queue_ids(), vec!["x", "y", "z", "w", "v"]);
    assert_eq!(player.loaded.lock()[0].url, "https://cdn/x");

    // Second lookup is answered by the response cache
    let stream = core.catalog().resolve_stream("x").await.unwrap();
    assert_eq!(stream.stream_url, "https://cdn/x");

    let stats = core.cache().unwrap().stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.stored, 2);

    core.shutdown().await;
}

#[tokio::test]
async fn test_play_playlist_by_id() {
    let mut backend = MockBackend::new();
    expect_get(
        &mut backend,
        "/youtube/playlist/p1",
        r#"{"songs":[{"videoId":"a","title":"A"},{"videoId":"b","title":"B"}]}"#,
        1,
    );
    expect_get(
        &mut backend,
        "/youtube/audio/b",
        r#"{"videoId":"b","audioUrl":"https://cdn/b"}"#,
        1,
    );

    let player = RecordingPlayer::new();
    let core = CoreService::bootstrap(config(backend, player.clone()), ServiceOptions::default())
        .await
        .unwrap();

    assert!(core.play_playlist_by_id("p1", 1).await.unwrap());

    let snapshot = core.engine().snapshot();
    assert_eq!(snapshot.queue_ids(), vec!["a", "b"]);
    assert_eq!(snapshot.current_index, Some(1));
    assert!(!snapshot.radio_mode);
    assert_eq!(player.loaded.lock()[0].title, "B");
}

#[tokio::test]
async fn test_missing_playlist_is_a_catalog_error() {
    let mut backend = MockBackend::new();
    backend
        .expect_execute()
        .returning(|_| Ok(HttpResponse::new(404, "not found")));

    let core = CoreService::bootstrap(
        config(backend, RecordingPlayer::new()),
        ServiceOptions::default(),
    )
    .await
    .unwrap();

    let err = core.play_playlist_by_id("gone", 0).await.unwrap_err();
    assert!(matches!(err, CoreError::Catalog(_)));
    assert!(core.engine().snapshot().queue.is_empty());
}

#[tokio::test]
async fn test_cache_can_be_disabled() {
    let config = CoreConfig::builder()
        .catalog_base_url(BASE)
        .http_client(Arc::new(MockBackend::new()))
        .player(RecordingPlayer::new())
        .enable_response_cache(false)
        .build()
        .unwrap();

    let core = CoreService::bootstrap(config, ServiceOptions::default())
        .await
        .unwrap();
    assert!(core.cache().is_none());
    assert!(core.engine().config().probe_streams);
}

#[tokio::test]
async fn test_probe_flag_overrides_engine_option() {
    let core = CoreService::bootstrap(
        config(MockBackend::new(), RecordingPlayer::new()),
        ServiceOptions::default(),
    )
    .await
    .unwrap();
    assert!(!core.engine().config().probe_streams);
}

#[tokio::test]
async fn test_invalid_cache_options_are_rejected() {
    let options = ServiceOptions::default().with_cache(CacheConfig::new().with_max_entries(0));

    let result = CoreService::bootstrap(config(MockBackend::new(), RecordingPlayer::new()), options).await;
    assert!(matches!(result, Err(CoreError::InitializationFailed(_))));
}
