//! Cache configuration

use serde::{Deserialize, Serialize};

/// Configuration for the response cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Upper bound on stored entries. `None` keeps every entry until a manual
    /// clear; `Some(n)` evicts the least recently used entry beyond `n`.
    #[serde(default)]
    pub max_entries: Option<usize>,

    /// Publish cache events on the core event bus
    #[serde(default = "default_emit_events")]
    pub emit_events: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: None,
            emit_events: default_emit_events(),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of entries.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Enable or disable event emission.
    pub fn with_events(mut self, enabled: bool) -> Self {
        self.emit_events = enabled;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_entries == Some(0) {
            return Err("max_entries must be at least 1 when set".to_string());
        }

        Ok(())
    }
}

fn default_emit_events() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, None);
        assert!(config.emit_events);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_bound_rejected() {
        assert!(CacheConfig::new().with_max_entries(0).validate().is_err());
        assert!(CacheConfig::new().with_max_entries(1).validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: CacheConfig = serde_json::from_str(r#"{"max_entries": 64}"#).unwrap();
        assert_eq!(config.max_entries, Some(64));
        assert!(config.emit_events);
    }
}
