//! Play queue with identifier de-duplication.

use bridge_traits::playback::PlayerTrack;
use chrono::{DateTime, Utc};
use core_catalog::{fallback_thumbnail, ResolvedStream, TrackMeta};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// One entry of the play queue.
///
/// `stream_url` and `stream_fetched_at` cache the last resolution of the
/// playable location; both are cleared or replaced together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_fetched_at: Option<DateTime<Utc>>,
}

impl QueueItem {
    /// Normalize catalog metadata. Returns `None` when the id is blank.
    pub fn from_meta(meta: TrackMeta, thumbnail_template: &str) -> Option<Self> {
        let id = meta.id.trim().to_string();
        if id.is_empty() {
            return None;
        }

        let thumbnail_url = if meta.thumbnail_url.trim().is_empty() {
            fallback_thumbnail(thumbnail_template, &id)
        } else {
            meta.thumbnail_url
        };

        Some(Self {
            id,
            title: meta.title,
            artist: meta.artist,
            thumbnail_url,
            stream_url: None,
            stream_fetched_at: None,
        })
    }

    /// Record a fresh resolution. Empty display fields are filled in from it;
    /// fields already set are kept.
    pub fn apply_stream(&mut self, stream: &ResolvedStream, fetched_at: DateTime<Utc>) {
        self.stream_url = Some(stream.stream_url.clone());
        self.stream_fetched_at = Some(fetched_at);

        if self.title.is_empty() {
            self.title = stream.title.clone();
        }
        if self.artist.is_empty() {
            self.artist = stream.artist.clone();
        }
        if self.thumbnail_url.is_empty() {
            self.thumbnail_url = stream.thumbnail_url.clone();
        }
    }

    /// True when the stream URL is missing or older than `ttl` at `now`.
    pub fn needs_resolution(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (&self.stream_url, self.stream_fetched_at) {
            (Some(_), Some(fetched_at)) => match (now - fetched_at).to_std() {
                Ok(age) => age > ttl,
                // Fetched "in the future": clock moved backwards, trust it
                Err(_) => false,
            },
            _ => true,
        }
    }

    /// Copy handed to the native player. Requires a resolved stream.
    pub fn to_player_track(&self) -> Option<PlayerTrack> {
        let url = self.stream_url.clone().filter(|url| !url.is_empty())?;
        Some(PlayerTrack {
            id: self.id.clone(),
            url,
            title: display_or_unknown(&self.title),
            artist: display_or_unknown(&self.artist),
            artwork: self.thumbnail_url.clone(),
        })
    }
}

fn display_or_unknown(value: &str) -> String {
    if value.is_empty() {
        "Unknown".to_string()
    } else {
        value.to_string()
    }
}

/// Ordered queue whose ids are unique.
///
/// Append-only apart from wholesale replacement; played entries stay behind
/// the current index for "previous".
#[derive(Debug, Clone, Default)]
pub struct Queue {
    items: Vec<QueueItem>,
    seen: HashSet<String>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&QueueItem> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut QueueItem> {
        self.items.get_mut(index)
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Append unless the id is already present.
    pub fn push(&mut self, item: QueueItem) -> bool {
        if !self.seen.insert(item.id.clone()) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Append every new item. Returns how many were added.
    pub fn extend(&mut self, items: impl IntoIterator<Item = QueueItem>) -> usize {
        let mut added = 0;
        for item in items {
            if self.push(item) {
                added += 1;
            }
        }
        added
    }

    /// Replace the contents, keeping the first occurrence of each id.
    pub fn replace(&mut self, items: impl IntoIterator<Item = QueueItem>) {
        self.clear();
        self.extend(items);
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.seen.clear();
    }

    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.id.as_str()).collect()
    }
}

/// Normalize catalog metadata into queue entries, dropping blank ids.
pub fn normalize(items: impl IntoIterator<Item = TrackMeta>, thumbnail_template: &str) -> Vec<QueueItem> {
    items
        .into_iter()
        .filter_map(|meta| QueueItem::from_meta(meta, thumbnail_template))
        .collect()
}
