//! Playback session state and its read-only projection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::queue::{Queue, QueueItem};

/// Externally visible playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// No current track.
    Idle,
    /// A track is being resolved or loaded.
    Loading,
    Playing,
    Paused,
}

impl PlaybackState {
    /// Returns `true` if a track is loaded or loading.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Metadata of the track last loaded into the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail_url: String,
}

impl From<&QueueItem> for NowPlaying {
    fn from(item: &QueueItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            artist: item.artist.clone(),
            thumbnail_url: item.thumbnail_url.clone(),
        }
    }
}

/// Mutable session owned by the engine.
///
/// `current_index` is `None` or addresses an entry of `queue`; every mutator
/// here keeps that true.
#[derive(Debug)]
pub(crate) struct Session {
    pub id: Uuid,
    pub queue: Queue,
    current_index: Option<usize>,
    pub is_playing: bool,
    pub is_loading: bool,
    pub radio_mode: bool,
    pub liked: bool,
    pub now_playing: Option<NowPlaying>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            queue: Queue::new(),
            current_index: None,
            is_playing: false,
            is_loading: false,
            radio_mode: false,
            liked: false,
            now_playing: None,
        }
    }

    /// Start a new session over `items`, positioned at `start` (clamped).
    pub fn replace(&mut self, items: Vec<QueueItem>, start: usize, radio_mode: bool) {
        self.id = Uuid::new_v4();
        self.queue.replace(items);
        self.radio_mode = radio_mode;
        self.current_index = if self.queue.is_empty() {
            None
        } else {
            Some(start.min(self.queue.len() - 1))
        };
    }

    /// Drop everything and stop. Radio mode is left as is.
    pub fn reset(&mut self) {
        self.id = Uuid::new_v4();
        self.queue.clear();
        self.current_index = None;
        self.is_playing = false;
        self.is_loading = false;
        self.now_playing = None;
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Move to `index` if it addresses an entry.
    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.queue.len() {
            self.current_index = Some(index);
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<(usize, &QueueItem)> {
        let index = self.current_index?;
        self.queue.get(index).map(|item| (index, item))
    }

    /// Unplayed entries after the current one.
    pub fn ahead(&self) -> usize {
        match self.current_index {
            Some(index) => self.queue.len().saturating_sub(index + 1),
            None => 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        if self.is_loading {
            PlaybackState::Loading
        } else if self.current_index.is_none() || self.now_playing.is_none() {
            PlaybackState::Idle
        } else if self.is_playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            queue: self.queue.items().to_vec(),
            current_index: self.current_index,
            is_playing: self.is_playing,
            is_loading: self.is_loading,
            radio_mode: self.radio_mode,
            liked: self.liked,
            now_playing: self.now_playing.clone(),
            state: self.state(),
        }
    }
}

/// Read-only copy of the session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Changes whenever the queue is replaced.
    pub session_id: Uuid,
    pub queue: Vec<QueueItem>,
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub is_loading: bool,
    pub radio_mode: bool,
    pub liked: bool,
    pub now_playing: Option<NowPlaying>,
    pub state: PlaybackState,
}

impl SessionSnapshot {
    pub fn current(&self) -> Option<&QueueItem> {
        self.current_index.and_then(|index| self.queue.get(index))
    }

    pub fn queue_ids(&self) -> Vec<&str> {
        self.queue.iter().map(|item| item.id.as_str()).collect()
    }
}
