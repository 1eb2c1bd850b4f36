//! Native player bridge trait and supporting types.
//!
//! The host platform owns the actual audio pipeline (decoding, output routing,
//! media session). The core only sees a single-slot player: one track is loaded
//! at a time, transport commands act on that track, and completion or
//! track-change notifications arrive asynchronously on a broadcast channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::error::Result;

/// Track handed to the native player when loading.
///
/// This is always a copy of the queue entry; the player never holds a live
/// reference into core state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerTrack {
    /// Catalog identifier of the track.
    pub id: String,
    /// Playable audio location.
    pub url: String,
    pub title: String,
    pub artist: String,
    /// Artwork surfaced on the lock screen / notification.
    pub artwork: String,
}

/// Asynchronous notifications emitted by the native player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// The loaded track reached its natural end.
    TrackEnded,
    /// The player switched its active slot (index in the player's own list).
    ActiveTrackChanged { index: Option<usize> },
    /// The player hit an unrecoverable error on the loaded track.
    Error { message: String },
}

/// Trait for platform-specific native players.
///
/// Exactly one track is ever loaded as active. [`load`](PlayerAdapter::load)
/// replaces whatever was loaded before.
#[async_trait]
pub trait PlayerAdapter: Send + Sync {
    /// Replace the active track. Does not start playback.
    async fn load(&self, track: PlayerTrack) -> Result<()>;

    /// Begin or resume playback of the active track.
    async fn play(&self) -> Result<()>;

    /// Pause playback without unloading.
    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position within the active track.
    async fn seek(&self, position: Duration) -> Result<()>;

    /// Stop playback and reset position.
    async fn stop(&self) -> Result<()>;

    /// Current playback position of the active track.
    async fn position(&self) -> Result<Duration>;

    /// Duration of the active track, if known.
    async fn duration(&self) -> Result<Option<Duration>>;

    /// Subscribe to player notifications.
    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_event_serializes_with_tag() {
        let json = serde_json::to_string(&PlayerEvent::ActiveTrackChanged { index: Some(2) })
            .unwrap();
        assert_eq!(json, r#"{"type":"active_track_changed","index":2}"#);

        let ended: PlayerEvent = serde_json::from_str(r#"{"type":"track_ended"}"#).unwrap();
        assert_eq!(ended, PlayerEvent::TrackEnded);
    }
}
