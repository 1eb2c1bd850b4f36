//! # Queue Engine
//!
//! Owns the play queue and drives the single-slot native player.
//!
//! ## Concurrency
//!
//! Session state sits behind a synchronous mutex that is never held across an
//! `.await`. Two atomic guards serialize the flows that can interleave at
//! await points:
//!
//! - `switching`: a track is being resolved and loaded into the player. Any
//!   transport command arriving meanwhile is dropped and reports `false`.
//! - `advancing`: a multi-skip or completion-driven advance is running.
//!
//! Radio lookahead serializes on an async mutex around the related pool and
//! runs as a spawned task behind a re-entry flag, so playback start never
//! waits for it.
//!
//! ## Failure handling
//!
//! A track that fails to resolve or load is retried once with a forced
//! re-resolution; if that fails too it is skipped and the next entry tried.
//! Errors never escape the public API; they surface as
//! [`PlaybackEvent::TrackSkipped`] and [`PlaybackEvent::Error`] events.

use bridge_traits::playback::{PlayerAdapter, PlayerEvent};
use bridge_traits::time::Clock;
use core_catalog::{CatalogClient, TrackMeta};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, QueueEvent, Receiver, RecvError};
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::debounce::TapCoalescer;
use crate::error::{PlaybackError, Result};
use crate::freshness::StreamProbe;
use crate::queue::{normalize, QueueItem};
use crate::related::RelatedPool;
use crate::session::{NowPlaying, Session, SessionSnapshot};

/// Holds an atomic flag raised until dropped.
struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    /// Raise `flag` unless it is already raised.
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct EngineInner {
    config: EngineConfig,
    catalog: Arc<dyn CatalogClient>,
    player: Arc<dyn PlayerAdapter>,
    probe: Arc<dyn StreamProbe>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    session: Mutex<Session>,
    related: AsyncMutex<RelatedPool>,
    switching: AtomicBool,
    advancing: AtomicBool,
    refilling: AtomicBool,
    last_lookahead_request: Mutex<Option<Instant>>,
    last_auto_advance: Mutex<Option<Instant>>,
    taps: TapCoalescer,
}

/// Playback queue and radio engine.
///
/// Cheap to clone; clones share the same session.
///
/// # Example
///
/// ```ignore
/// let engine = QueueEngine::new(config, catalog, player, probe, clock, event_bus)?;
/// let _listener = engine.spawn_event_listener();
///
/// engine.play_by_id("dQw4w9WgXcQ").await;
/// engine.queue_next_tap();
/// ```
#[derive(Clone)]
pub struct QueueEngine {
    inner: Arc<EngineInner>,
}

impl QueueEngine {
    /// Create an engine with an empty, idle session.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::InvalidConfig`] when `config` fails validation.
    pub fn new(
        config: EngineConfig,
        catalog: Arc<dyn CatalogClient>,
        player: Arc<dyn PlayerAdapter>,
        probe: Arc<dyn StreamProbe>,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::InvalidConfig)?;

        let taps = TapCoalescer::new(config.tap_debounce);
        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                catalog,
                player,
                probe,
                clock,
                events,
                session: Mutex::new(Session::new()),
                related: AsyncMutex::new(RelatedPool::new()),
                switching: AtomicBool::new(false),
                advancing: AtomicBool::new(false),
                refilling: AtomicBool::new(false),
                last_lookahead_request: Mutex::new(None),
                last_auto_advance: Mutex::new(None),
                taps,
            }),
        })
    }

    /// Settings the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Copy of the current session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.session.lock().snapshot()
    }

    /// Subscribe to engine events.
    pub fn events(&self) -> Receiver<CoreEvent> {
        self.inner.events.subscribe()
    }

    /// Whether a load is in flight.
    pub fn is_switching(&self) -> bool {
        self.inner.switching.load(Ordering::Acquire)
    }

    /// Whether a skip or auto-advance is in flight.
    pub fn is_advancing(&self) -> bool {
        self.inner.advancing.load(Ordering::Acquire)
    }

    fn emit(&self, event: CoreEvent) {
        self.inner.events.emit(event);
    }

    fn is_radio(&self) -> bool {
        self.inner.session.lock().radio_mode
    }

    // ------------------------------------------------------------------
    // Session replacement
    // ------------------------------------------------------------------

    /// Start radio playback seeded with `id`.
    ///
    /// The queue becomes `[id]` followed by related tracks up to the
    /// lookahead target. If `id` cannot be resolved the session ends up
    /// empty and stopped.
    #[instrument(skip(self))]
    pub async fn play_by_id(&self, id: &str) -> bool {
        let Some(switching) = FlagGuard::acquire(&self.inner.switching) else {
            debug!("Load in flight, ignoring radio start");
            return false;
        };

        {
            let mut session = self.inner.session.lock();
            session.reset();
            session.radio_mode = true;
            session.is_loading = true;
        }

        let stream = match self.inner.catalog.resolve_stream(id).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(track_id = %id, error = %e, "Radio seed could not be resolved");
                self.halt_player().await;
                self.emit(CoreEvent::Playback(PlaybackEvent::Error {
                    track_id: Some(id.to_string()),
                    message: e.to_string(),
                    recoverable: e.is_transient(),
                }));
                return false;
            }
        };

        let mut meta = stream.meta();
        meta.id = id.to_string();
        let Some(mut seed) = QueueItem::from_meta(meta, &self.inner.config.thumbnail_template) else {
            self.inner.session.lock().is_loading = false;
            return false;
        };
        seed.apply_stream(&stream, self.inner.clock.now());

        self.inner.session.lock().replace(vec![seed], 0, true);
        self.emit(CoreEvent::Queue(QueueEvent::Replaced {
            length: 1,
            start_index: 0,
            radio_mode: true,
        }));

        self.extend_lookahead(self.inner.config.lookahead).await;
        self.load_current(&switching).await
    }

    /// Replace the queue with `items` and play `start_index` (clamped).
    ///
    /// Leaves radio mode. Duplicate and blank ids are dropped; missing
    /// artwork falls back to the configured template.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn play_playlist(&self, items: Vec<TrackMeta>, start_index: usize) -> bool {
        let Some(switching) = FlagGuard::acquire(&self.inner.switching) else {
            debug!("Load in flight, ignoring playlist");
            return false;
        };

        let items = normalize(items, &self.inner.config.thumbnail_template);
        let (length, start) = {
            let mut session = self.inner.session.lock();
            session.replace(items, start_index, false);
            (session.queue.len(), session.current_index())
        };

        let Some(start) = start else {
            debug!("Playlist had no playable entries, stopping");
            let track_id = self
                .inner
                .session
                .lock()
                .now_playing
                .take()
                .map(|np| np.id);
            self.halt_player().await;
            self.emit(CoreEvent::Playback(PlaybackEvent::Stopped { track_id }));
            return false;
        };

        self.emit(CoreEvent::Queue(QueueEvent::Replaced {
            length,
            start_index: start,
            radio_mode: false,
        }));
        self.load_current(&switching).await
    }

    /// Append entries not already queued. Returns how many were added.
    pub fn add_to_queue(&self, items: Vec<TrackMeta>) -> usize {
        let items = normalize(items, &self.inner.config.thumbnail_template);
        let (added, length) = {
            let mut session = self.inner.session.lock();
            let added = session.queue.extend(items);
            (added, session.queue.len())
        };

        if added > 0 {
            debug!(added, length, "Appended to queue");
            self.emit(CoreEvent::Queue(QueueEvent::Appended { added, length }));
        }
        added
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Play the next entry, wrapping to the first when configured.
    pub async fn play_next(&self) -> bool {
        if self.is_advancing() {
            return false;
        }

        let target = {
            let session = self.inner.session.lock();
            let len = session.queue.len();
            match session.current_index() {
                Some(index) if index + 1 < len => Some(index + 1),
                _ if len > 0 && self.inner.config.wrap_on_next => Some(0),
                _ => None,
            }
        };

        match target {
            Some(target) => self.switch_to(target).await,
            None => false,
        }
    }

    /// Play the previous entry. No-op on the first one.
    pub async fn play_previous(&self) -> bool {
        if self.is_advancing() {
            return false;
        }

        let target = self
            .inner
            .session
            .lock()
            .current_index()
            .and_then(|index| index.checked_sub(1));

        match target {
            Some(target) => self.switch_to(target).await,
            None => false,
        }
    }

    /// Jump to `index`. No-op when out of range.
    pub async fn play_queue_index(&self, index: usize) -> bool {
        self.switch_to(index).await
    }

    /// Jump to the first entry.
    pub async fn play_first_in_queue(&self) -> bool {
        self.switch_to(0).await
    }

    /// Jump to the last entry. No-op on an empty queue.
    pub async fn play_last_in_queue(&self) -> bool {
        let len = self.inner.session.lock().queue.len();
        match len.checked_sub(1) {
            Some(last) => self.switch_to(last).await,
            None => false,
        }
    }

    /// Register a "next" tap. Taps within the debounce window of each other
    /// collapse into one [`skip_many`](Self::skip_many) once the burst ends.
    pub fn queue_next_tap(&self) {
        let generation = self.inner.taps.tap();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, dropping next tap");
            return;
        };

        let engine = self.clone();
        let window = self.inner.taps.window();
        runtime.spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(count) = engine.inner.taps.fire(generation) {
                debug!(count, "Next-tap burst closed");
                engine.skip_many(count).await;
            }
        });
    }

    /// Move forward `count` entries (clamped to the last) and play it.
    ///
    /// In radio mode the queue is first extended so the jump can land on
    /// fresh tracks. Returns `false` if an advance is already running or the
    /// index would not change.
    #[instrument(skip(self))]
    pub async fn skip_many(&self, count: usize) -> bool {
        if count == 0 {
            return false;
        }
        let Some(_advancing) = FlagGuard::acquire(&self.inner.advancing) else {
            debug!("Advance in flight, dropping skip");
            return false;
        };

        let radio = self.is_radio();
        if radio {
            self.extend_lookahead(count).await;
        }

        let target = {
            let session = self.inner.session.lock();
            let Some(current) = session.current_index() else {
                return false;
            };
            let last = session.queue.len().saturating_sub(1);
            let target = current.saturating_add(count).min(last);
            (target != current).then_some(target)
        };

        let Some(target) = target else {
            return false;
        };

        let moved = self.switch_to(target).await;
        if moved && radio {
            self.spawn_refill();
        }
        moved
    }

    /// React to the player finishing the loaded track.
    ///
    /// Duplicate completions within the cooldown, or while another advance
    /// or a load runs, are ignored. At the end of the queue playback stops.
    pub async fn on_track_ended(&self) -> bool {
        if self.is_switching() {
            debug!("Completion during a load, ignoring");
            return false;
        }

        let now = Instant::now();
        if let Some(previous) = *self.inner.last_auto_advance.lock() {
            if now.duration_since(previous) < self.inner.config.auto_advance_cooldown {
                debug!("Completion inside cooldown, ignoring");
                return false;
            }
        }

        let Some(_advancing) = FlagGuard::acquire(&self.inner.advancing) else {
            return false;
        };
        *self.inner.last_auto_advance.lock() = Some(now);

        if self.is_radio() && self.inner.session.lock().ahead() == 0 {
            self.extend_lookahead(1).await;
        }

        let next = {
            let session = self.inner.session.lock();
            session
                .current_index()
                .map(|index| index + 1)
                .filter(|next| *next < session.queue.len())
        };

        if let Some(next) = next {
            return self.switch_to(next).await;
        }

        // A load that started meanwhile owns the player
        let Some(_switching) = FlagGuard::acquire(&self.inner.switching) else {
            return false;
        };
        info!("Reached end of queue, stopping");
        self.halt_player().await;
        self.emit(CoreEvent::Queue(QueueEvent::Ended));
        false
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    /// Pause when playing, resume otherwise.
    pub async fn toggle_play(&self) -> bool {
        if self.inner.session.lock().is_playing {
            self.pause().await
        } else {
            self.resume().await
        }
    }

    /// Pause the player. Returns `false` if it refused.
    pub async fn pause(&self) -> bool {
        if let Err(e) = self.inner.player.pause().await {
            warn!(error = %e, "Player refused pause");
            return false;
        }

        let track_id = {
            let mut session = self.inner.session.lock();
            session.is_playing = false;
            session.now_playing.as_ref().map(|np| np.id.clone())
        };
        self.emit(CoreEvent::Playback(PlaybackEvent::Paused { track_id }));
        true
    }

    /// Resume the loaded track. Returns `false` if the player refused.
    pub async fn resume(&self) -> bool {
        if let Err(e) = self.inner.player.play().await {
            warn!(error = %e, "Player refused play");
            return false;
        }

        let track_id = {
            let mut session = self.inner.session.lock();
            session.is_playing = true;
            session.now_playing.as_ref().map(|np| np.id.clone())
        };
        self.emit(CoreEvent::Playback(PlaybackEvent::Resumed { track_id }));
        true
    }

    /// Stop playback, keeping the queue and position.
    pub async fn stop(&self) -> bool {
        if let Err(e) = self.inner.player.stop().await {
            warn!(error = %e, "Player refused stop");
            return false;
        }

        let track_id = {
            let mut session = self.inner.session.lock();
            session.is_playing = false;
            session.now_playing.as_ref().map(|np| np.id.clone())
        };
        self.emit(CoreEvent::Playback(PlaybackEvent::Stopped { track_id }));
        true
    }

    /// Seek within the loaded track.
    pub async fn seek(&self, position: Duration) -> bool {
        match self.inner.player.seek(position).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, ?position, "Player refused seek");
                false
            }
        }
    }

    /// Playback position of the loaded track; zero when unknown.
    pub async fn position(&self) -> Duration {
        self.inner.player.position().await.unwrap_or_default()
    }

    /// Length of the loaded track, if the player knows it.
    pub async fn duration(&self) -> Option<Duration> {
        self.inner.player.duration().await.ok().flatten()
    }

    /// Flip the local like flag. Returns the new value.
    pub fn toggle_like(&self) -> bool {
        let (liked, track_id) = {
            let mut session = self.inner.session.lock();
            session.liked = !session.liked;
            (
                session.liked,
                session.now_playing.as_ref().map(|np| np.id.clone()),
            )
        };
        self.emit(CoreEvent::Playback(PlaybackEvent::LikeToggled { track_id, liked }));
        liked
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Point the session at `target` and load it, unless a load is running.
    async fn switch_to(&self, target: usize) -> bool {
        let Some(switching) = FlagGuard::acquire(&self.inner.switching) else {
            debug!(target, "Load in flight, dropping transport command");
            return false;
        };

        if !self.inner.session.lock().set_current(target) {
            return false;
        }
        self.load_current(&switching).await
    }

    /// Load the current entry, falling forward past unplayable ones.
    ///
    /// Only callable while holding the `switching` guard.
    async fn load_current(&self, _switching: &FlagGuard<'_>) -> bool {
        let max_attempts = self.inner.session.lock().queue.len().max(1);

        for _ in 0..max_attempts {
            let current = {
                let mut session = self.inner.session.lock();
                let current = session.current().map(|(index, item)| (index, item.clone()));
                session.is_loading = current.is_some();
                current
            };
            let Some((index, item)) = current else {
                return false;
            };

            self.emit(CoreEvent::Playback(PlaybackEvent::Loading {
                track_id: item.id.clone(),
                index,
            }));

            let first = match self.load_entry(index, item.clone(), false).await {
                Ok(()) => {
                    self.finish_loading(index);
                    return true;
                }
                Err(e) => e,
            };
            warn!(track_id = %item.id, error = %first, "Load failed, retrying with a fresh stream");

            let second = match self.load_entry(index, item.clone(), true).await {
                Ok(()) => {
                    self.finish_loading(index);
                    return true;
                }
                Err(e) => e,
            };
            warn!(track_id = %item.id, error = %second, "Track unplayable, skipping");
            self.emit(CoreEvent::Playback(PlaybackEvent::TrackSkipped {
                track_id: item.id.clone(),
                reason: second.to_string(),
            }));

            if !self.step_past(index).await {
                self.halt_player().await;
                self.emit(CoreEvent::Playback(PlaybackEvent::Error {
                    track_id: Some(item.id),
                    message: second.to_string(),
                    recoverable: false,
                }));
                return false;
            }
        }

        warn!("Every queued track failed to load");
        self.halt_player().await;
        false
    }

    /// Resolve (or refresh) `item`'s stream, store it back and hand a copy to
    /// the player.
    async fn load_entry(&self, index: usize, mut item: QueueItem, force_refresh: bool) -> Result<()> {
        if force_refresh {
            let stream = self.inner.catalog.resolve_stream_fresh(&item.id).await?;
            item.apply_stream(&stream, self.inner.clock.now());
        } else {
            self.ensure_fresh_stream(&mut item).await?;
        }

        self.store_entry(index, &item);

        let track = item
            .to_player_track()
            .ok_or_else(|| PlaybackError::StreamUnavailable(item.id.clone()))?;
        debug!(track_id = %track.id, url = %redact_url(&track.url), "Loading into player");

        self.inner.player.load(track).await?;
        self.inner.player.play().await?;
        Ok(())
    }

    /// Make sure `item` carries a stream URL worth loading.
    ///
    /// Missing or expired URLs are resolved again. A young URL is probed and
    /// re-resolved, bypassing cached answers, if the probe fails.
    async fn ensure_fresh_stream(&self, item: &mut QueueItem) -> Result<()> {
        let now = self.inner.clock.now();
        if item.needs_resolution(now, self.inner.config.stream_url_ttl) {
            let stream = self.inner.catalog.resolve_stream(&item.id).await?;
            item.apply_stream(&stream, self.inner.clock.now());
            return Ok(());
        }

        if !self.inner.config.probe_streams {
            return Ok(());
        }

        let url = item.stream_url.clone().unwrap_or_default();
        if !self.inner.probe.is_live(&url).await {
            debug!(track_id = %item.id, "Stream URL failed probe, re-resolving");
            let stream = self.inner.catalog.resolve_stream_fresh(&item.id).await?;
            item.apply_stream(&stream, self.inner.clock.now());
        }
        Ok(())
    }

    fn store_entry(&self, index: usize, item: &QueueItem) {
        let mut session = self.inner.session.lock();
        if let Some(slot) = session.queue.get_mut(index) {
            if slot.id == item.id {
                *slot = item.clone();
            }
        }
    }

    fn finish_loading(&self, index: usize) {
        let (item, radio) = {
            let mut session = self.inner.session.lock();
            session.is_loading = false;
            session.is_playing = true;
            let item = session.queue.get(index).cloned();
            session.now_playing = item.as_ref().map(NowPlaying::from);
            (item, session.radio_mode)
        };

        if let Some(item) = item {
            info!(track_id = %item.id, index, "Playback started");
            self.emit(CoreEvent::Playback(PlaybackEvent::Started {
                track_id: item.id,
                title: item.title,
                artist: item.artist,
                index,
            }));
        }

        if radio {
            self.spawn_refill();
        }
    }

    /// Move past the unplayable entry at `index`. Returns `false` when there
    /// is nothing after it.
    async fn step_past(&self, index: usize) -> bool {
        if self.is_radio() {
            self.extend_lookahead(1).await;
        }

        let mut session = self.inner.session.lock();
        session.current_index() == Some(index) && session.set_current(index + 1)
    }

    async fn halt_player(&self) {
        if let Err(e) = self.inner.player.stop().await {
            debug!(error = %e, "Player refused stop");
        }
        let mut session = self.inner.session.lock();
        session.is_playing = false;
        session.is_loading = false;
    }

    // ------------------------------------------------------------------
    // Radio lookahead
    // ------------------------------------------------------------------

    /// Append related tracks until `min_ahead` entries follow the current one.
    ///
    /// The current track is the first seed. When its pool runs dry the
    /// following queued tracks are used as seeds in order. Returns the
    /// number of entries appended. Does nothing outside radio mode.
    pub async fn extend_lookahead(&self, min_ahead: usize) -> usize {
        let mut pool = self.inner.related.lock().await;

        let (session_id, mut seed_index) = {
            let session = self.inner.session.lock();
            match session.current_index() {
                Some(index) if session.radio_mode => (session.id, index),
                _ => return 0,
            }
        };

        let template = &self.inner.config.thumbnail_template;
        let mut added = 0;
        let mut last_seed = None;

        loop {
            let seed = {
                let session = self.inner.session.lock();
                if session.id != session_id || session.ahead() >= min_ahead {
                    break;
                }
                match session.queue.get(seed_index) {
                    Some(item) => item.id.clone(),
                    None => break,
                }
            };

            if !pool.contains(&seed) {
                match self.inner.catalog.related_tracks(&seed).await {
                    Ok(related) => pool.insert(seed.clone(), related),
                    Err(e) => {
                        warn!(seed_id = %seed, error = %e, "Related lookup failed");
                        seed_index += 1;
                        continue;
                    }
                }
            }

            let pushed = {
                let mut session = self.inner.session.lock();
                if session.id != session_id {
                    break;
                }
                let candidate = pool.next_unseen(&seed, |id| session.queue.contains(id));
                candidate
                    .and_then(|meta| QueueItem::from_meta(meta, template))
                    .map(|item| session.queue.push(item))
                    .unwrap_or(false)
            };

            if pushed {
                added += 1;
                last_seed = Some(seed);
            } else if !pool.contains(&seed) {
                debug!(seed_id = %seed, "Related pool exhausted");
                self.emit(CoreEvent::Queue(QueueEvent::RelatedPoolExhausted { seed_id: seed }));
                seed_index += 1;
            }
        }

        if let Some(seed_id) = last_seed {
            let length = self.inner.session.lock().queue.len();
            debug!(%seed_id, added, length, "Lookahead extended");
            self.emit(CoreEvent::Queue(QueueEvent::LookaheadExtended {
                seed_id,
                added,
                length,
            }));
        }
        added
    }

    /// Kick off a background refill unless one is already running.
    fn spawn_refill(&self) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return false;
        };
        if self
            .inner
            .refilling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let engine = self.clone();
        runtime.spawn(async move {
            let _refilling = FlagGuard(&engine.inner.refilling);
            engine.extend_lookahead(engine.inner.config.lookahead).await;
        });
        true
    }

    /// Presentation-layer lookahead trigger, rate limited by the configured
    /// cooldown. Returns whether a refill was started.
    pub fn request_lookahead(&self) -> bool {
        if !self.is_radio() {
            return false;
        }

        let now = Instant::now();
        {
            let mut last = self.inner.last_lookahead_request.lock();
            if let Some(previous) = *last {
                if now.duration_since(previous) < self.inner.config.lookahead_cooldown {
                    return false;
                }
            }
            *last = Some(now);
        }
        self.spawn_refill()
    }

    // ------------------------------------------------------------------
    // Player events
    // ------------------------------------------------------------------

    /// Subscribe to the player's notifications and react to them.
    ///
    /// Completions advance the queue on their own task so that duplicates
    /// arriving during a load hit the `advancing` guard. The listener holds
    /// only a weak reference and exits once every engine handle is dropped
    /// or the player closes its channel.
    pub fn spawn_event_listener(&self) -> JoinHandle<()> {
        let mut player_events = self.inner.player.subscribe();
        let weak: Weak<EngineInner> = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                let event = match player_events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Player event listener lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let engine = QueueEngine { inner };

                match event {
                    PlayerEvent::TrackEnded => {
                        tokio::spawn(async move {
                            engine.on_track_ended().await;
                        });
                    }
                    PlayerEvent::ActiveTrackChanged { index } => {
                        debug!(?index, "Player active track changed");
                    }
                    PlayerEvent::Error { message } => {
                        warn!(%message, "Player reported an error");
                        let track_id = engine
                            .inner
                            .session
                            .lock()
                            .now_playing
                            .as_ref()
                            .map(|np| np.id.clone());
                        engine.emit(CoreEvent::Playback(PlaybackEvent::Error {
                            track_id,
                            message,
                            recoverable: true,
                        }));
                    }
                }
            }
            debug!("Player event listener stopped");
        })
    }
}

impl std::fmt::Debug for QueueEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.inner.session.lock();
        f.debug_struct("QueueEngine")
            .field("queue_len", &session.queue.len())
            .field("current_index", &session.current_index())
            .field("radio_mode", &session.radio_mode)
            .field("switching", &self.is_switching())
            .field("advancing", &self.is_advancing())
            .finish()
    }
}
