//! # Engine Configuration
//!
//! Tuning knobs for the queue engine. Every field has a serde default so a
//! partial document (or `{}`) deserializes into a working configuration.

use core_catalog::DEFAULT_THUMBNAIL_TEMPLATE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Queue engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Unplayed tracks kept queued ahead of the current one in radio mode.
    ///
    /// Default: 4.
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,

    /// Age after which a resolved stream URL is re-resolved without probing.
    ///
    /// Default: 30 minutes.
    #[serde(default = "default_stream_url_ttl")]
    pub stream_url_ttl: Duration,

    /// Bound on each liveness probe request (HEAD, then ranged GET).
    ///
    /// Default: 30 seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: Duration,

    /// Whether to probe a cached stream URL before loading it.
    ///
    /// Default: true.
    #[serde(default = "default_probe_streams")]
    pub probe_streams: bool,

    /// Quiet period that closes a burst of next taps.
    ///
    /// Default: 120 ms.
    #[serde(default = "default_tap_debounce")]
    pub tap_debounce: Duration,

    /// Minimum spacing between two completion-driven advances.
    ///
    /// Default: 400 ms.
    #[serde(default = "default_auto_advance_cooldown")]
    pub auto_advance_cooldown: Duration,

    /// Minimum spacing between two presentation-layer lookahead requests.
    ///
    /// Default: 1.5 seconds.
    #[serde(default = "default_lookahead_cooldown")]
    pub lookahead_cooldown: Duration,

    /// Whether a user-initiated next at the end of the queue wraps to the
    /// first track. Completion at the end always stops.
    ///
    /// Default: true.
    #[serde(default = "default_wrap_on_next")]
    pub wrap_on_next: bool,

    /// Artwork used for entries without a thumbnail; `{id}` is substituted.
    #[serde(default = "default_thumbnail_template")]
    pub thumbnail_template: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookahead: default_lookahead(),
            stream_url_ttl: default_stream_url_ttl(),
            probe_timeout: default_probe_timeout(),
            probe_streams: default_probe_streams(),
            tap_debounce: default_tap_debounce(),
            auto_advance_cooldown: default_auto_advance_cooldown(),
            lookahead_cooldown: default_lookahead_cooldown(),
            wrap_on_next: default_wrap_on_next(),
            thumbnail_template: default_thumbnail_template(),
        }
    }
}

impl EngineConfig {
    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn with_wrap_on_next(mut self, wrap: bool) -> Self {
        self.wrap_on_next = wrap;
        self
    }

    pub fn with_probe_streams(mut self, probe: bool) -> Self {
        self.probe_streams = probe;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.stream_url_ttl.is_zero() {
            return Err("stream_url_ttl must be > 0".to_string());
        }

        if self.probe_timeout.is_zero() {
            return Err("probe_timeout must be > 0".to_string());
        }

        if self.tap_debounce.is_zero() {
            return Err("tap_debounce must be > 0".to_string());
        }

        if !self.thumbnail_template.contains("{id}") {
            return Err("thumbnail_template must contain {id}".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_lookahead() -> usize {
    4
}

fn default_stream_url_ttl() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_probe_streams() -> bool {
    true
}

fn default_tap_debounce() -> Duration {
    Duration::from_millis(120)
}

fn default_auto_advance_cooldown() -> Duration {
    Duration::from_millis(400)
}

fn default_lookahead_cooldown() -> Duration {
    Duration::from_millis(1500)
}

fn default_wrap_on_next() -> bool {
    true
}

fn default_thumbnail_template() -> String {
    DEFAULT_THUMBNAIL_TEMPLATE.to_string()
}
