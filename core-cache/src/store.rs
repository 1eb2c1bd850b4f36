//! In-memory response store.

use bridge_traits::http::HttpResponse;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;

use crate::key::CacheKey;
use crate::stats::CacheStats;

/// A stored response plus the validators needed to revalidate it.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl CacheEntry {
    pub fn from_response(
        response: &HttpResponse,
        stored_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
            stored_at,
            expires_at,
            etag: response.header("etag").map(str::to_string),
            last_modified: response.header("last-modified").map(str::to_string),
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Whether a conditional request can be made for this entry.
    pub fn has_validators(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }

    pub fn to_response(&self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// How a lookup was answered, for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Hit,
    Miss,
    Revalidated,
    StaleServed,
    Stored,
    Bypassed,
}

struct Inner {
    entries: LruCache<CacheKey, CacheEntry>,
    stats: CacheStats,
}

/// Process-wide response store.
///
/// Unbounded unless constructed with [`ResponseCache::bounded`]. The lock is
/// never held across an await point.
pub struct ResponseCache {
    inner: Mutex<Inner>,
}

impl ResponseCache {
    pub fn unbounded() -> Self {
        Self::with_lru(LruCache::unbounded())
    }

    pub fn bounded(max_entries: NonZeroUsize) -> Self {
        Self::with_lru(LruCache::new(max_entries))
    }

    /// Build from an optional bound; `None` or zero means unbounded.
    pub fn with_capacity(max_entries: Option<usize>) -> Self {
        match max_entries.and_then(NonZeroUsize::new) {
            Some(bound) => Self::bounded(bound),
            None => Self::unbounded(),
        }
    }

    fn with_lru(entries: LruCache<CacheKey, CacheEntry>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries,
                stats: CacheStats::default(),
            }),
        }
    }

    /// Returns a copy of the entry, marking it recently used.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.lock().entries.get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, entry: CacheEntry) {
        self.inner.lock().entries.put(key, entry);
    }

    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.lock().entries.pop(key)
    }

    /// Remove every entry. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        removed
    }

    /// Remove entries whose key contains `prefix`. Returns how many were dropped.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.inner.lock();
        let doomed: Vec<CacheKey> = inner
            .entries
            .iter()
            .filter(|(key, _)| key.matches_prefix(prefix))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            inner.entries.pop(key);
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len(),
            ..inner.stats.clone()
        }
    }

    pub(crate) fn record(&self, outcome: Outcome) {
        let mut inner = self.inner.lock();
        let stats = &mut inner.stats;
        match outcome {
            Outcome::Hit => stats.hits += 1,
            Outcome::Miss => stats.misses += 1,
            Outcome::Revalidated => stats.revalidated += 1,
            Outcome::StaleServed => stats.stale_served += 1,
            Outcome::Stored => stats.stored += 1,
            Outcome::Bypassed => stats.bypassed += 1,
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ResponseCache")
            .field("entries", &inner.entries.len())
            .field("capacity", &inner.entries.cap())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::http::HttpMethod;
    use chrono::Duration as ChronoDuration;

    fn key(path: &str) -> CacheKey {
        CacheKey::new(HttpMethod::Get, &format!("https://api.example.com{}", path), &[])
    }

    fn entry(body: &'static str, ttl_secs: i64) -> CacheEntry {
        let now = Utc::now();
        CacheEntry::from_response(
            &HttpResponse::new(200, body).with_header("ETag", "\"v1\""),
            now,
            now + ChronoDuration::seconds(ttl_secs),
        )
    }

    #[test]
    fn test_entry_freshness_and_validators() {
        let e = entry("{}", 60);
        assert!(e.is_fresh(Utc::now()));
        assert!(!e.is_fresh(Utc::now() + ChronoDuration::seconds(61)));
        assert!(e.has_validators());
        assert_eq!(e.etag.as_deref(), Some("\"v1\""));
        assert_eq!(e.to_response().body, Bytes::from_static(b"{}"));
    }

    #[test]
    fn test_unbounded_keeps_everything() {
        let cache = ResponseCache::unbounded();
        for i in 0..500 {
            cache.insert(key(&format!("/youtube/audio/{}", i)), entry("{}", 60));
        }
        assert_eq!(cache.len(), 500);
    }

    #[test]
    fn test_bounded_evicts_least_recently_used() {
        let cache = ResponseCache::with_capacity(Some(2));
        cache.insert(key("/a"), entry("a", 60));
        cache.insert(key("/b"), entry("b", 60));
        assert!(cache.get(&key("/a")).is_some());
        cache.insert(key("/c"), entry("c", 60));

        assert!(cache.get(&key("/a")).is_some());
        assert!(cache.get(&key("/b")).is_none());
        assert!(cache.get(&key("/c")).is_some());
    }

    #[test]
    fn test_invalidate_prefix_and_clear() {
        let cache = ResponseCache::default();
        cache.insert(key("/youtube/related/a"), entry("[]", 60));
        cache.insert(key("/youtube/related/b"), entry("[]", 60));
        cache.insert(key("/youtube/audio/a"), entry("{}", 60));

        assert_eq!(cache.invalidate_prefix("/youtube/related/"), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.clear(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stats_snapshot_includes_entry_count() {
        let cache = ResponseCache::default();
        cache.insert(key("/a"), entry("a", 60));
        cache.record(Outcome::Hit);
        cache.record(Outcome::Miss);
        cache.record(Outcome::StaleServed);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.stale_served, 1);
        assert_eq!(stats.entries, 1);
    }
}
