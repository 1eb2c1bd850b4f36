//! Remote catalog client
//!
//! Resolves stream URLs, related-track lists and search results from the
//! catalog backend.
//! Requests go through whatever [`HttpClient`] is injected; in the assembled
//! core that is the caching decorator, so repeated lookups are served from the
//! response cache and survive short network outages.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{CatalogError, Result};
use crate::types::{
    decode_playlist, decode_related, decode_search, decode_stream, decode_suggestions,
    ResolvedStream, SearchResult, TrackMeta, DEFAULT_THUMBNAIL_TEMPLATE,
};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Catalog lookups used by the queue engine.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Resolve metadata and a playable URL for `id`.
    ///
    /// # Errors
    ///
    /// [`CatalogError::MissingStreamUrl`] when the catalog has no URL.
    async fn resolve_stream(&self, id: &str) -> Result<ResolvedStream>;

    /// Like [`resolve_stream`](Self::resolve_stream), but skips any cached
    /// answer that is still considered fresh.
    async fn resolve_stream_fresh(&self, id: &str) -> Result<ResolvedStream>;

    /// Tracks related to `id`, in catalog order. May be empty.
    async fn related_tracks(&self, id: &str) -> Result<Vec<TrackMeta>>;

    /// Tracks of a playlist, in playlist order.
    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackMeta>>;

    /// Free-text search over songs, videos, playlists, albums and artists.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;

    /// Query completions. A blank query yields an empty list.
    async fn search_suggestions(&self, query: &str) -> Result<Vec<String>>;
}

/// [`CatalogClient`] over the HTTP catalog API.
///
/// Endpoints, relative to the base URL:
/// - `GET /youtube/audio/{id}`
/// - `GET /youtube/related/{id}`
/// - `GET /youtube/playlist/{id}`
/// - `GET /search?q=`
/// - `GET /search/suggestions?q=`
pub struct HttpCatalogClient {
    http_client: Arc<dyn HttpClient>,
    base_url: Url,
    timeout: Duration,
    thumbnail_template: String,
}

impl HttpCatalogClient {
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: Url) -> Self {
        Self {
            http_client,
            base_url,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            thumbnail_template: DEFAULT_THUMBNAIL_TEMPLATE.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the fallback thumbnail; `{id}` is substituted.
    pub fn with_thumbnail_template(mut self, template: impl Into<String>) -> Self {
        self.thumbnail_template = template.into();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL. Segments are percent-encoded, so
    /// identifiers containing `/` or `?` stay a single segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                CatalogError::InvalidUrl(format!("{} cannot be a base URL", self.base_url))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn get_json(&self, url: Url, query: &[(&str, &str)], bypass_fresh: bool) -> Result<Value> {
        let mut request = HttpRequest::get(url.as_str())
            .header("Accept", "application/json")
            .timeout(self.timeout);
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        if bypass_fresh {
            request = request.header("Cache-Control", "no-cache");
        }

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            warn!(status = response.status, path = url.path(), "Catalog request failed");
            return Err(CatalogError::HttpStatus {
                status: response.status,
                endpoint: url.path().to_string(),
            });
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| CatalogError::InvalidResponse(format!("{}: {}", url.path(), e)))
    }

    async fn fetch_stream(&self, id: &str, bypass_fresh: bool) -> Result<ResolvedStream> {
        let url = self.endpoint(&["youtube", "audio", id])?;
        let payload = self.get_json(url, &[], bypass_fresh).await?;
        let stream = decode_stream(&payload, id, &self.thumbnail_template)?;
        debug!(track_id = %id, title = %stream.title, "Resolved stream");
        Ok(stream)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    #[instrument(skip(self))]
    async fn resolve_stream(&self, id: &str) -> Result<ResolvedStream> {
        self.fetch_stream(id, false).await
    }

    #[instrument(skip(self))]
    async fn resolve_stream_fresh(&self, id: &str) -> Result<ResolvedStream> {
        self.fetch_stream(id, true).await
    }

    #[instrument(skip(self))]
    async fn related_tracks(&self, id: &str) -> Result<Vec<TrackMeta>> {
        let url = self.endpoint(&["youtube", "related", id])?;
        let payload = self.get_json(url, &[], false).await?;
        let related = decode_related(&payload, &self.thumbnail_template);
        debug!(seed_id = %id, count = related.len(), "Fetched related tracks");
        Ok(related)
    }

    #[instrument(skip(self))]
    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackMeta>> {
        let url = self.endpoint(&["youtube", "playlist", playlist_id])?;
        let payload = self.get_json(url, &[], false).await?;
        Ok(decode_playlist(&payload, &self.thumbnail_template))
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let url = self.endpoint(&["search"])?;
        let payload = self.get_json(url, &[("q", query)], false).await?;
        let results = decode_search(&payload, &self.thumbnail_template);
        debug!(count = results.len(), "Search returned");
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn search_suggestions(&self, query: &str) -> Result<Vec<String>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let url = self.endpoint(&["search", "suggestions"])?;
        let payload = self.get_json(url, &[("q", query)], false).await?;
        Ok(decode_suggestions(&payload))
    }
}

impl std::fmt::Debug for HttpCatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCatalogClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}
