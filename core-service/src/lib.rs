//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP client, native
//! player, clock) into the shared Rust core: catalog GETs go through the
//! response cache, stream probes use the raw client, and the queue engine is
//! started with its player listener attached. Desktop hosts typically enable
//! the `desktop-shims` feature so a `reqwest` client is supplied by default.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::http::HttpClient;
use core_cache::{CacheConfig, CachingHttpClient};
use core_catalog::{CatalogClient, HttpCatalogClient};
use core_playback::{AlwaysLive, EngineConfig, HttpStreamProbe, QueueEngine, StreamProbe};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Tuning for the components the service builds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceOptions {
    pub engine: EngineConfig,
    pub cache: CacheConfig,
}

impl ServiceOptions {
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

struct ServiceInner {
    engine: QueueEngine,
    catalog: Arc<HttpCatalogClient>,
    cache: Option<Arc<CachingHttpClient>>,
    events: EventBus,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ServiceInner {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.abort();
        }
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

impl CoreService {
    /// Build every component from `config` and start the player listener.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// ```ignore
    /// let config = CoreConfig::builder()
    ///     .catalog_base_url("https://catalog.example.com")
    ///     .player(player)
    ///     .build()?;
    /// let core = CoreService::bootstrap(config, ServiceOptions::default()).await?;
    /// core.engine().play_by_id("dQw4w9WgXcQ").await;
    /// ```
    pub async fn bootstrap(config: CoreConfig, options: ServiceOptions) -> Result<Self> {
        config.validate()?;
        options
            .cache
            .validate()
            .map_err(CoreError::InitializationFailed)?;

        let events = EventBus::new(config.event_buffer_size);

        let (catalog_http, cache) =
            if config.features.enable_response_cache {
                let mut client = CachingHttpClient::with_config(
                    config.http_client.clone(),
                    config.clock.clone(),
                    &options.cache,
                );
                if options.cache.emit_events {
                    client = client.with_event_bus(events.clone());
                }
                let client = Arc::new(client);
                let shared: Arc<dyn HttpClient> = client.clone();
                (shared, Some(client))
            } else {
                (config.http_client.clone(), None)
            };

        let catalog = Arc::new(
            HttpCatalogClient::new(catalog_http, config.catalog_base_url.clone())
                .with_timeout(config.http_timeout)
                .with_thumbnail_template(options.engine.thumbnail_template.clone()),
        );

        let probe_streams = options.engine.probe_streams && config.features.enable_stream_probe;
        let probe: Arc<dyn StreamProbe> = if probe_streams {
            Arc::new(HttpStreamProbe::new(
                config.http_client.clone(),
                options.engine.probe_timeout,
            ))
        } else {
            Arc::new(AlwaysLive)
        };

        let engine = QueueEngine::new(
            options.engine.with_probe_streams(probe_streams),
            catalog.clone(),
            config.player.clone(),
            probe,
            config.clock.clone(),
            events.clone(),
        )?;
        let listener = Mutex::new(Some(engine.spawn_event_listener()));

        info!(
            catalog = %config.catalog_base_url,
            response_cache = cache.is_some(),
            probe_streams,
            "Core service started"
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                engine,
                catalog,
                cache,
                events,
                listener,
            }),
        })
    }

    pub fn engine(&self) -> &QueueEngine {
        &self.inner.engine
    }

    pub fn catalog(&self) -> Arc<dyn CatalogClient> {
        self.inner.catalog.clone()
    }

    /// The response cache, when enabled.
    pub fn cache(&self) -> Option<&CachingHttpClient> {
        self.inner.cache.as_deref()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.inner.events.subscribe()
    }

    /// Fetch a playlist from the catalog and play it from `start_index`.
    ///
    /// Returns whether playback started.
    pub async fn play_playlist_by_id(&self, playlist_id: &str, start_index: usize) -> Result<bool> {
        let tracks = self.inner.catalog.playlist_tracks(playlist_id).await?;
        debug!(playlist_id, count = tracks.len(), "Playlist fetched");
        Ok(self.inner.engine.play_playlist(tracks, start_index).await)
    }

    /// Stop playback and detach from the player's notifications.
    pub async fn shutdown(&self) {
        if let Some(listener) = self.inner.listener.lock().take() {
            listener.abort();
        }
        self.inner.engine.stop().await;
        info!("Core service stopped");
    }
}
