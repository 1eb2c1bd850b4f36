//! Host wiring for the core.
//!
//! [`CoreConfig`] carries the bridges the host injects and the few settings
//! shared across crates. [`CoreConfigBuilder::build`] fails fast when a
//! required bridge is absent so misconfiguration surfaces at startup rather
//! than on the first play request.
//!
//! | Bridge | Required | Fallback |
//! |--------|----------|----------|
//! | [`PlayerAdapter`] | yes | none |
//! | [`HttpClient`] | no | `ReqwestHttpClient` with `desktop-shims` |
//! | [`Clock`] | no | [`SystemClock`] |
//! | [`LoggerSink`] | no | console only |
//!
//! ```ignore
//! let config = CoreConfig::builder()
//!     .catalog_base_url("https://catalog.example.com")
//!     .player(Arc::new(NativePlayer::new()))
//!     .enable_stream_probe(false)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::logging::LoggingConfig;
use bridge_traits::{Clock, HttpClient, LoggerSink, PlayerAdapter, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default timeout applied to catalog requests.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Validated bridges and settings. Built with [`CoreConfig::builder`].
#[derive(Clone)]
pub struct CoreConfig {
    /// Root URL of the remote catalog API (no trailing path segments required)
    pub catalog_base_url: Url,

    /// HTTP client for catalog calls and stream probes
    pub http_client: Arc<dyn HttpClient>,

    /// Native player (required)
    pub player: Arc<dyn PlayerAdapter>,

    /// Time source for cache expiry and stream URL freshness
    pub clock: Arc<dyn Clock>,

    /// Host log forwarding (optional)
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Timeout applied to each catalog request
    pub http_timeout: Duration,

    /// Capacity of the core event bus
    pub event_buffer_size: usize,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("catalog_base_url", &self.catalog_base_url.as_str())
            .field("http_client", &"HttpClient { ... }")
            .field("player", &"PlayerAdapter { ... }")
            .field("clock", &"Clock { ... }")
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("http_timeout", &self.http_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Optional behaviors, all enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Route catalog GETs through the response cache
    pub enable_response_cache: bool,

    /// Probe stream URLs for liveness before loading them
    pub enable_stream_probe: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_response_cache: true,
            enable_stream_probe: true,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Check the settings the builder cannot enforce by type: an http(s)
    /// catalog URL, a timeout within 1 s..=300 s and a non-zero bus capacity.
    pub fn validate(&self) -> Result<()> {
        match self.catalog_base_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::Config(format!(
                    "Catalog base URL must use http or https, got '{}'",
                    other
                )))
            }
        }

        if self.http_timeout < Duration::from_secs(1) {
            return Err(Error::Config(
                "HTTP timeout must be at least 1 second".to_string(),
            ));
        }

        if self.http_timeout > Duration::from_secs(300) {
            return Err(Error::Config(
                "HTTP timeout exceeds maximum of 300 seconds".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Logging settings forwarding records to the injected sink, if any.
    ///
    /// ```ignore
    /// core_runtime::logging::init_logging(config.logging())?;
    /// ```
    pub fn logging(&self) -> LoggingConfig {
        let logging = LoggingConfig::default();
        match &self.logger_sink {
            Some(sink) => logging.with_logger_sink(Arc::clone(sink)),
            None => logging,
        }
    }
}

fn player_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "PlayerAdapter".to_string(),
        message: "A native player is required to load and play tracks. \
                 Inject the host platform's player adapter with .player()."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for catalog access. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Mobile: inject the platform-native HTTP adapter."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout).map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

/// Incremental [`CoreConfig`] construction.
#[derive(Default)]
pub struct CoreConfigBuilder {
    catalog_base_url: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    player: Option<Arc<dyn PlayerAdapter>>,
    clock: Option<Arc<dyn Clock>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    http_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Root of the catalog API. Endpoint paths are appended to it.
    pub fn catalog_base_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_base_url = Some(url.into());
        self
    }

    /// Client for catalog calls and stream probes.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the native player implementation (required).
    pub fn player(mut self, player: Arc<dyn PlayerAdapter>) -> Self {
        self.player = Some(player);
        self
    }

    /// Overrides the time source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the host logger sink.
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Sets the catalog request timeout.
    ///
    /// Default: 30 seconds
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Sets the event bus capacity.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Enables or disables the response cache in front of catalog calls.
    pub fn enable_response_cache(mut self, enabled: bool) -> Self {
        self.features.enable_response_cache = enabled;
        self
    }

    /// Enables or disables stream liveness probing.
    pub fn enable_stream_probe(mut self, enabled: bool) -> Self {
        self.features.enable_stream_probe = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// # Errors
    ///
    /// [`Error::Config`] without a catalog URL or when validation fails,
    /// [`Error::InvalidUrl`] when it does not parse, and
    /// [`Error::CapabilityMissing`] without a player, or without an HTTP
    /// client on builds lacking `desktop-shims`.
    pub fn build(self) -> Result<CoreConfig> {
        let raw_url = self.catalog_base_url.ok_or_else(|| {
            Error::Config(
                "Catalog base URL is required. Use .catalog_base_url() to set it.".to_string(),
            )
        })?;

        let catalog_base_url = Url::parse(raw_url.trim())?;

        let player = self.player.ok_or_else(player_missing_error)?;

        let http_timeout = self.http_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(http_timeout)?,
        };

        let config = CoreConfig {
            catalog_base_url,
            http_client,
            player,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            logger_sink: self.logger_sink,
            http_timeout,
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
