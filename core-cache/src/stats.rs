//! Cache statistics and monitoring

use serde::{Deserialize, Serialize};

/// Counters describing how GET requests were answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Answered from a live entry without touching the network
    pub hits: u64,

    /// Went to the network (with or without conditional headers)
    pub misses: u64,

    /// Network answered `304` and the stored body was reused
    pub revalidated: u64,

    /// Network failed and an expired entry was returned
    pub stale_served: u64,

    /// Responses written into the cache
    pub stored: u64,

    /// Non-GET requests passed straight through
    pub bypassed: u64,

    /// Entries currently held
    pub entries: usize,
}

impl CacheStats {
    /// Total GET lookups.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Share of lookups answered without a network round trip, in percent.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.lookups();
        if lookups == 0 {
            return 0.0;
        }

        (self.hits as f64 / lookups as f64) * 100.0
    }

    /// Share of network lookups that ended up served stale, in percent.
    pub fn stale_rate(&self) -> f64 {
        if self.misses == 0 {
            return 0.0;
        }

        (self.stale_served as f64 / self.misses as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_with_no_traffic() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.stale_rate(), 0.0);
    }

    #[test]
    fn test_rates() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            stale_served: 1,
            ..Default::default()
        };
        assert_eq!(stats.lookups(), 4);
        assert_eq!(stats.hit_rate(), 75.0);
        assert_eq!(stats.stale_rate(), 100.0);
    }
}
