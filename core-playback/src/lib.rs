//! # Playback Queue & Radio Engine
//!
//! Owns the play queue, resolves stream URLs through the catalog and drives
//! the platform player.
//!
//! ## Overview
//!
//! This module handles:
//! - Queue replacement from a playlist or a radio seed
//! - Navigation with single-flight loads and coalesced "next" taps
//! - Radio lookahead from per-seed related-track pools
//! - Stream URL freshness (age limit plus liveness probe)
//! - Retry-then-skip for unplayable tracks and auto-advance on completion
//!
//! State changes are published on the [`EventBus`](core_runtime::events::EventBus)
//! as `Playback` and `Queue` events; [`QueueEngine::snapshot`] gives a
//! read-only copy of the session.

pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod freshness;
pub mod queue;
pub mod related;
pub mod session;

pub use config::EngineConfig;
pub use debounce::TapCoalescer;
pub use engine::QueueEngine;
pub use error::{PlaybackError, Result};
pub use freshness::{AlwaysLive, HttpStreamProbe, StreamProbe};
pub use queue::{normalize, Queue, QueueItem};
pub use related::RelatedPool;
pub use session::{NowPlaying, PlaybackState, SessionSnapshot};
