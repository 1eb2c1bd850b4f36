//! # Event Bus
//!
//! Typed notifications from the core to the presentation layer, carried over
//! `tokio::sync::broadcast`.
//!
//! ```text
//! QueueEngine ──┐                         ┌──> UI
//!               ├──> EventBus (broadcast) ┤
//! ResponseCache ┘                         └──> diagnostics
//! ```
//!
//! Every subscriber sees every event published after it subscribed. A
//! subscriber more than `capacity` events behind gets
//! [`RecvError::Lagged`] once and then resumes with the oldest retained event;
//! [`RecvError::Closed`] means every bus handle was dropped.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, QueueEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(QueueEvent::Appended { added: 2, length: 5 });
//! assert!(matches!(rx.recv().await, Ok(CoreEvent::Queue(_))));
//! # }
//! ```

use bridge_traits::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::RecvError;
pub use tokio::sync::broadcast::Receiver;

/// Capacity used when the host does not pick one.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Queue(QueueEvent),
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Level at which a diagnostics subscriber should record this event.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Playback(PlaybackEvent::Error { recoverable: false, .. }) => LogLevel::Error,
            Self::Playback(PlaybackEvent::Error { .. })
            | Self::Playback(PlaybackEvent::TrackSkipped { .. })
            | Self::Cache(CacheEvent::StaleServed { .. }) => LogLevel::Warn,
            Self::Playback(PlaybackEvent::Started { .. })
            | Self::Queue(QueueEvent::Replaced { .. })
            | Self::Queue(QueueEvent::Ended) => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }
}

impl fmt::Display for CoreEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playback(event) => event.fmt(f),
            Self::Queue(event) => event.fmt(f),
            Self::Cache(event) => event.fmt(f),
        }
    }
}

impl From<PlaybackEvent> for CoreEvent {
    fn from(event: PlaybackEvent) -> Self {
        Self::Playback(event)
    }
}

impl From<QueueEvent> for CoreEvent {
    fn from(event: QueueEvent) -> Self {
        Self::Queue(event)
    }
}

impl From<CacheEvent> for CoreEvent {
    fn from(event: CacheEvent) -> Self {
        Self::Cache(event)
    }
}

/// Transport and now-playing changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The track at `index` is being resolved and handed to the player.
    Loading { track_id: String, index: usize },
    Started {
        track_id: String,
        title: String,
        artist: String,
        index: usize,
    },
    Paused { track_id: Option<String> },
    Resumed { track_id: Option<String> },
    Stopped { track_id: Option<String> },
    /// Neither the cached nor a fresh stream could be played.
    TrackSkipped { track_id: String, reason: String },
    LikeToggled { track_id: Option<String>, liked: bool },
    Error {
        track_id: Option<String>,
        message: String,
        /// Retrying the same action may succeed.
        recoverable: bool,
    },
}

impl fmt::Display for PlaybackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = |track_id: &Option<String>| track_id.clone().unwrap_or_else(|| "-".to_string());
        match self {
            Self::Loading { track_id, index } => write!(f, "loading {track_id} at {index}"),
            Self::Started {
                title, artist, index, ..
            } => write!(f, "playing '{title}' by {artist} at {index}"),
            Self::Paused { track_id } => write!(f, "paused {}", id(track_id)),
            Self::Resumed { track_id } => write!(f, "resumed {}", id(track_id)),
            Self::Stopped { track_id } => write!(f, "stopped {}", id(track_id)),
            Self::TrackSkipped { track_id, reason } => write!(f, "skipped {track_id}: {reason}"),
            Self::LikeToggled { track_id, liked } => {
                write!(f, "{} {}", if *liked { "liked" } else { "unliked" }, id(track_id))
            }
            Self::Error {
                track_id, message, ..
            } => write!(f, "playback error on {}: {message}", id(track_id)),
        }
    }
}

/// Queue mutations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueueEvent {
    Replaced {
        length: usize,
        start_index: usize,
        radio_mode: bool,
    },
    /// Tracks added by the user.
    Appended { added: usize, length: usize },
    /// Radio lookahead pulled `added` tracks from `seed_id`'s related pool.
    LookaheadExtended {
        seed_id: String,
        added: usize,
        length: usize,
    },
    /// Every related track of `seed_id` is already queued.
    RelatedPoolExhausted { seed_id: String },
    /// Auto-advance ran off the end of the queue.
    Ended,
}

impl fmt::Display for QueueEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replaced {
                length,
                start_index,
                radio_mode,
            } => {
                let kind = if *radio_mode { "radio" } else { "playlist" };
                write!(f, "{kind} queue of {length} starting at {start_index}")
            }
            Self::Appended { added, length } => write!(f, "appended {added}, queue now {length}"),
            Self::LookaheadExtended {
                seed_id,
                added,
                length,
            } => write!(f, "lookahead +{added} from {seed_id}, queue now {length}"),
            Self::RelatedPoolExhausted { seed_id } => write!(f, "related pool of {seed_id} exhausted"),
            Self::Ended => f.write_str("queue ended"),
        }
    }
}

/// Response cache activity worth surfacing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// The network failed and an expired entry answered instead.
    StaleServed { url: String, status: u16 },
    /// A `304` extended an entry.
    Revalidated { url: String },
    Cleared { prefix: Option<String>, removed: usize },
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleServed { url, status } => write!(f, "served stale {status} for {url}"),
            Self::Revalidated { url } => write!(f, "revalidated {url}"),
            Self::Cleared {
                prefix: Some(prefix),
                removed,
            } => write!(f, "cleared {removed} entries under {prefix}"),
            Self::Cleared { prefix: None, removed } => write!(f, "cleared {removed} entries"),
        }
    }
}

/// Cloneable broadcast handle shared by every publisher.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish `event`, returning how many subscribers will see it.
    pub fn emit(&self, event: impl Into<CoreEvent>) -> usize {
        self.sender.send(event.into()).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to events matching `accept` only.
    pub fn subscribe_filtered<F>(&self, accept: F) -> EventStream<F>
    where
        F: Fn(&CoreEvent) -> bool,
    {
        EventStream {
            receiver: self.subscribe(),
            accept,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Receiver that skips events its predicate rejects.
pub struct EventStream<F> {
    receiver: Receiver<CoreEvent>,
    accept: F,
}

impl<F> EventStream<F>
where
    F: Fn(&CoreEvent) -> bool,
{
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if (self.accept)(&event) {
                return Ok(event);
            }
        }
    }

    /// Next accepted event already buffered, if any.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        use broadcast::error::TryRecvError;

        loop {
            match self.receiver.try_recv() {
                Ok(event) if (self.accept)(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(n)) => return Some(Err(RecvError::Lagged(n))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl<F> fmt::Debug for EventStream<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(track_id: &str, index: usize) -> PlaybackEvent {
        PlaybackEvent::Started {
            track_id: track_id.to_string(),
            title: "Song".to_string(),
            artist: "Band".to_string(),
            index,
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.emit(QueueEvent::Ended), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_event() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let event = QueueEvent::LookaheadExtended {
            seed_id: "x".to_string(),
            added: 2,
            length: 3,
        };
        assert_eq!(bus.emit(event.clone()), 2);

        assert_eq!(first.recv().await.unwrap(), CoreEvent::Queue(event.clone()));
        assert_eq!(second.recv().await.unwrap(), CoreEvent::Queue(event));
    }

    #[tokio::test]
    async fn test_filtered_stream_skips_other_domains() {
        let bus = EventBus::new(8);
        let mut cache_only = bus.subscribe_filtered(|e| matches!(e, CoreEvent::Cache(_)));

        bus.emit(started("a", 0));
        bus.emit(CacheEvent::Revalidated {
            url: "https://api.example.com/youtube/related/a".to_string(),
        });

        assert!(matches!(
            cache_only.recv().await.unwrap(),
            CoreEvent::Cache(CacheEvent::Revalidated { .. })
        ));
        assert!(cache_only.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        for length in 1..=5 {
            bus.emit(QueueEvent::Appended { added: 1, length });
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(3))));
        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Queue(QueueEvent::Appended { added: 1, length: 4 })
        );
    }

    #[test]
    fn test_log_levels() {
        let fatal = CoreEvent::Playback(PlaybackEvent::Error {
            track_id: None,
            message: "nothing playable".to_string(),
            recoverable: false,
        });
        assert_eq!(fatal.log_level(), LogLevel::Error);

        let stale = CoreEvent::from(CacheEvent::StaleServed {
            url: "https://api.example.com/youtube/audio/a".to_string(),
            status: 200,
        });
        assert_eq!(stale.log_level(), LogLevel::Warn);
        assert_eq!(CoreEvent::from(started("a", 0)).log_level(), LogLevel::Info);
        assert_eq!(
            CoreEvent::from(QueueEvent::Appended { added: 1, length: 1 }).log_level(),
            LogLevel::Debug
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CoreEvent::from(started("a", 2)).to_string(),
            "playing 'Song' by Band at 2"
        );
        assert_eq!(
            CacheEvent::Cleared {
                prefix: None,
                removed: 3
            }
            .to_string(),
            "cleared 3 entries"
        );
        assert_eq!(
            QueueEvent::Replaced {
                length: 5,
                start_index: 0,
                radio_mode: true
            }
            .to_string(),
            "radio queue of 5 starting at 0"
        );
    }

    #[test]
    fn test_wire_shape() {
        let event = CoreEvent::Queue(QueueEvent::Replaced {
            length: 3,
            start_index: 1,
            radio_mode: false,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Queue");
        assert_eq!(json["payload"]["event"], "Replaced");
        assert_eq!(json["payload"]["start_index"], 1);

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
