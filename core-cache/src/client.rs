//! Caching decorator over any [`HttpClient`].

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy},
    time::Clock,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use core_runtime::logging::redact_url;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::freshness::{request_bypasses_fresh_entry, Freshness};
use crate::key::CacheKey;
use crate::stats::CacheStats;
use crate::store::{CacheEntry, Outcome, ResponseCache};

/// Header attached to responses served past their expiry.
pub const STALE_WARNING: &str = "110 - \"Response is Stale\"";

/// [`HttpClient`] that answers GETs from a [`ResponseCache`] when it can.
///
/// Lookup order for a GET:
/// 1. A live entry is returned without touching the network, unless the
///    request carries `Cache-Control: no-cache`.
/// 2. Otherwise the request goes out, conditional when the stored entry has
///    an `ETag` or `Last-Modified`.
/// 3. `304` keeps the stored body and refreshes its expiry from the new
///    response headers, if they carry a lifetime.
/// 4. A 2xx replaces the entry, or deletes it under `no-store`.
/// 5. A transport error or 5xx falls back to the stored entry, however old.
///
/// Every other method is forwarded untouched.
pub struct CachingHttpClient {
    inner: Arc<dyn HttpClient>,
    store: Arc<ResponseCache>,
    clock: Arc<dyn Clock>,
    events: Option<EventBus>,
}

impl CachingHttpClient {
    pub fn new(inner: Arc<dyn HttpClient>, clock: Arc<dyn Clock>) -> Self {
        Self::with_store(inner, Arc::new(ResponseCache::unbounded()), clock)
    }

    pub fn with_config(
        inner: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
        config: &CacheConfig,
    ) -> Self {
        Self::with_store(
            inner,
            Arc::new(ResponseCache::with_capacity(config.max_entries)),
            clock,
        )
    }

    /// Share an existing store, e.g. between two decorators.
    pub fn with_store(
        inner: Arc<dyn HttpClient>,
        store: Arc<ResponseCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner,
            store,
            clock,
            events: None,
        }
    }

    /// Publish cache events on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn store(&self) -> &Arc<ResponseCache> {
        &self.store
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    /// Drop every stored response.
    pub fn clear(&self) -> usize {
        let removed = self.store.clear();
        self.emit(CacheEvent::Cleared {
            prefix: None,
            removed,
        });
        removed
    }

    /// Drop stored responses whose key contains `url_prefix`.
    pub fn invalidate_prefix(&self, url_prefix: &str) -> usize {
        let removed = self.store.invalidate_prefix(url_prefix);
        debug!(prefix = %url_prefix, removed, "Invalidated cached responses");
        self.emit(CacheEvent::Cleared {
            prefix: Some(url_prefix.to_string()),
            removed,
        });
        removed
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.events {
            bus.emit(CoreEvent::Cache(event));
        }
    }

    fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
        ChronoDuration::from_std(ttl)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(now)
    }

    fn serve_stale(&self, key: &CacheKey, entry: &CacheEntry, cause: &str) -> HttpResponse {
        warn!(
            url = %redact_url(key.url()),
            status = entry.status,
            cause,
            "Network failed, serving stale cached response"
        );
        self.store.record(Outcome::StaleServed);
        self.emit(CacheEvent::StaleServed {
            url: redact_url(key.url()),
            status: entry.status,
        });
        entry.to_response().with_header("Warning", STALE_WARNING)
    }

    fn revalidated(&self, key: CacheKey, mut entry: CacheEntry, response: &HttpResponse) -> HttpResponse {
        let now = self.clock.now();
        let freshness = Freshness::from_response(response, now);
        if let Some(ttl) = freshness.ttl {
            entry.expires_at = Self::expiry(now, ttl);
        }

        debug!(url = %redact_url(key.url()), "Cached response revalidated");
        self.store.record(Outcome::Revalidated);
        self.emit(CacheEvent::Revalidated {
            url: redact_url(key.url()),
        });

        let reply = entry.to_response();
        self.store.insert(key, entry);
        reply
    }

    fn store_response(&self, key: CacheKey, response: &HttpResponse) {
        let now = self.clock.now();
        let freshness = Freshness::from_response(response, now);

        if freshness.no_store {
            if self.store.remove(&key).is_some() {
                debug!(url = %redact_url(key.url()), "Dropped cached response (no-store)");
            }
            return;
        }

        let expires_at = Self::expiry(now, freshness.storable_ttl());
        self.store
            .insert(key, CacheEntry::from_response(response, now, expires_at));
        self.store.record(Outcome::Stored);
    }

    async fn execute_get(
        &self,
        request: HttpRequest,
        policy: Option<RetryPolicy>,
    ) -> Result<HttpResponse> {
        let key = CacheKey::for_request(&request);
        let cached = self.store.get(&key);
        let now = self.clock.now();

        if let Some(entry) = &cached {
            if entry.is_fresh(now) && !request_bypasses_fresh_entry(&request) {
                debug!(url = %redact_url(key.url()), "Cache hit");
                self.store.record(Outcome::Hit);
                return Ok(entry.to_response());
            }
        }

        self.store.record(Outcome::Miss);

        let mut outbound = request;
        if let Some(entry) = &cached {
            if let Some(etag) = &entry.etag {
                outbound = outbound.header("If-None-Match", etag.clone());
            }
            if let Some(last_modified) = &entry.last_modified {
                outbound = outbound.header("If-Modified-Since", last_modified.clone());
            }
        }

        let result = match policy {
            Some(policy) => self.inner.execute_with_retry(outbound, policy).await,
            None => self.inner.execute(outbound).await,
        };

        match (result, cached) {
            (Ok(response), Some(entry)) if response.is_not_modified() => {
                Ok(self.revalidated(key, entry, &response))
            }
            (Ok(response), Some(entry)) if response.is_server_error() => {
                let cause = format!("HTTP {}", response.status);
                Ok(self.serve_stale(&key, &entry, &cause))
            }
            (Ok(response), _) => {
                if response.is_success() {
                    self.store_response(key, &response);
                }
                Ok(response)
            }
            (Err(error), Some(entry)) => Ok(self.serve_stale(&key, &entry, &error.to_string())),
            (Err(error), None) => Err(error),
        }
    }
}

#[async_trait]
impl HttpClient for CachingHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        if !request.method.is_cacheable() {
            self.store.record(Outcome::Bypassed);
            return self.inner.execute(request).await;
        }
        self.execute_get(request, None).await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        if !request.method.is_cacheable() {
            self.store.record(Outcome::Bypassed);
            return self.inner.execute_with_retry(request, policy).await;
        }
        self.execute_get(request, Some(policy)).await
    }
}

impl std::fmt::Debug for CachingHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingHttpClient")
            .field("store", &self.store)
            .field("events", &self.events.is_some())
            .finish()
    }
}
