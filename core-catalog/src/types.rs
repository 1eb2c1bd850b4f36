//! Catalog payload types and lenient decoding.
//!
//! The catalog backend is not strict about shapes: related lists arrive bare,
//! wrapped under one of several keys, or as a single object, and identifiers
//! and artist names live under different field names depending on the
//! upstream source. Decoding therefore works on [`serde_json::Value`] and
//! never fails on a missing optional field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CatalogError, Result};

/// Thumbnail used when the catalog omits one. `{id}` is replaced by the
/// track identifier.
pub const DEFAULT_THUMBNAIL_TEMPLATE: &str = "https://i.ytimg.com/vi/{id}/hq720.jpg";

/// Keys under which an object-shaped related payload may hold its list.
const LIST_KEYS: [&str; 6] = ["related", "items", "contents", "results", "data", "songs"];

/// Expand a thumbnail template for `id`.
pub fn fallback_thumbnail(template: &str, id: &str) -> String {
    template.replace("{id}", id)
}

/// Track metadata without a playable location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMeta {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail_url: String,
}

/// Result of resolving a track's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStream {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail_url: String,
    pub stream_url: String,
}

impl ResolvedStream {
    pub fn meta(&self) -> TrackMeta {
        TrackMeta {
            id: self.id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
        }
    }
}

/// Render a scalar as text. Objects, arrays, null and empty strings yield `None`.
fn scalar(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn first_scalar(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| scalar(item.get(key)))
}

fn item_id(item: &Value) -> Option<String> {
    first_scalar(item, &["videoId", "id"])
}

fn item_title(item: &Value) -> String {
    first_scalar(item, &["title", "name"]).unwrap_or_default()
}

fn item_artist(item: &Value) -> String {
    if let Some(artist) = item.get("artist") {
        // Some sources nest the artist as `{ name, artistId }`
        if let Some(name) = scalar(artist.get("name")).or_else(|| scalar(Some(artist))) {
            return name;
        }
    }

    first_scalar(item, &["artistName"])
        .or_else(|| item.get("author").and_then(|a| scalar(a.get("name"))))
        .or_else(|| item.get("channel").and_then(|c| scalar(c.get("name"))))
        .unwrap_or_default()
}

fn item_thumbnail(item: &Value, id: &str, template: &str) -> String {
    scalar(item.get("thumbnailUrl"))
        .or_else(|| {
            item.get("thumbnails")
                .and_then(Value::as_array)
                .and_then(|thumbs| thumbs.iter().rev().find_map(|t| scalar(t.get("url"))))
        })
        .unwrap_or_else(|| fallback_thumbnail(template, id))
}

/// Decode one list item. Items without an identifier are dropped.
fn decode_item(item: &Value, template: &str) -> Option<TrackMeta> {
    let id = item_id(item)?;
    Some(TrackMeta {
        title: item_title(item),
        artist: item_artist(item),
        thumbnail_url: item_thumbnail(item, &id, template),
        id,
    })
}

/// Decode the audio endpoint payload for `requested_id`.
pub fn decode_stream(payload: &Value, requested_id: &str, template: &str) -> Result<ResolvedStream> {
    if !payload.is_object() {
        return Err(CatalogError::InvalidResponse(
            "audio payload is not an object".to_string(),
        ));
    }

    let stream_url = scalar(payload.get("audioUrl")).ok_or_else(|| CatalogError::MissingStreamUrl {
        track_id: requested_id.to_string(),
    })?;

    let id = item_id(payload).unwrap_or_else(|| requested_id.to_string());
    Ok(ResolvedStream {
        title: scalar(payload.get("title")).unwrap_or_default(),
        artist: scalar(payload.get("artist")).unwrap_or_default(),
        thumbnail_url: scalar(payload.get("thumbnailUrl"))
            .unwrap_or_else(|| fallback_thumbnail(template, requested_id)),
        stream_url,
        id,
    })
}

/// Decode a related-tracks payload of any accepted shape.
pub fn decode_related(payload: &Value, template: &str) -> Vec<TrackMeta> {
    let items: Vec<&Value> = match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => {
            let wrapped = LIST_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array))
                .filter(|list| !list.is_empty());

            match wrapped {
                Some(list) => list.iter().collect(),
                None if ["videoId", "id", "title"].iter().any(|k| map.contains_key(*k)) => {
                    vec![payload]
                }
                None => Vec::new(),
            }
        }
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| decode_item(item, template))
        .collect()
}

/// Decode a playlist payload: tracks live under `songs`.
pub fn decode_playlist(payload: &Value, template: &str) -> Vec<TrackMeta> {
    payload
        .get("songs")
        .and_then(Value::as_array)
        .map(|songs| {
            songs
                .iter()
                .filter_map(|item| decode_item(item, template))
                .collect()
        })
        .unwrap_or_default()
}

/// What a search hit points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchKind {
    Song,
    Video,
    Playlist,
    Album,
    Artist,
}

impl SearchKind {
    fn parse(value: Option<String>) -> Self {
        match value.map(|v| v.to_ascii_uppercase()).as_deref() {
            Some("VIDEO") => Self::Video,
            Some("PLAYLIST") => Self::Playlist,
            Some("ALBUM") => Self::Album,
            Some("ARTIST") => Self::Artist,
            _ => Self::Song,
        }
    }

    /// Keys holding this kind's identifier, most specific first.
    fn id_keys(self) -> &'static [&'static str] {
        match self {
            Self::Song | Self::Video => &["videoId", "id"],
            Self::Playlist => &["playlistId", "id"],
            Self::Album => &["albumId", "id"],
            Self::Artist => &["artistId", "id"],
        }
    }

    /// Whether the hit can be queued directly.
    pub fn is_playable(self) -> bool {
        matches!(self, Self::Song | Self::Video)
    }
}

/// One entry of a search response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub kind: SearchKind,
    pub id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail_url: String,
}

impl SearchResult {
    /// Queueable metadata for song and video hits.
    pub fn as_track(&self) -> Option<TrackMeta> {
        self.kind.is_playable().then(|| TrackMeta {
            id: self.id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
        })
    }
}

fn list_items(payload: &Value) -> Vec<&Value> {
    match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => LIST_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map(|list| list.iter().collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Decode a search payload. Hits without an identifier are dropped.
pub fn decode_search(payload: &Value, template: &str) -> Vec<SearchResult> {
    list_items(payload)
        .into_iter()
        .filter_map(|item| {
            let kind = SearchKind::parse(scalar(item.get("type")));
            let id = first_scalar(item, kind.id_keys()).or_else(|| {
                // Artist hits may only carry the id inside the artist object
                (kind == SearchKind::Artist)
                    .then(|| item.get("artist").and_then(|a| scalar(a.get("artistId"))))
                    .flatten()
            })?;
            let thumbnail_url = if kind.is_playable() {
                item_thumbnail(item, &id, template)
            } else {
                scalar(item.get("thumbnailUrl")).unwrap_or_default()
            };
            Some(SearchResult {
                kind,
                title: item_title(item),
                artist: item_artist(item),
                thumbnail_url,
                id,
            })
        })
        .collect()
}

/// Decode a suggestion payload: a list of scalars. Anything else is empty.
pub fn decode_suggestions(payload: &Value) -> Vec<String> {
    payload
        .as_array()
        .map(|items| items.iter().filter_map(|item| scalar(Some(item))).collect())
        .unwrap_or_default()
}
