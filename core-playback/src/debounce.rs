//! Coalescing of rapid "next" taps into one multi-skip.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct PendingTaps {
    count: usize,
    generation: u64,
    deadline: Option<Instant>,
}

/// Pending coalesced skip with a deadline.
///
/// Each [`tap`](Self::tap) adds one to the count, pushes the deadline out by
/// the window and bumps a generation number. Every tap arms a timer for its
/// own generation; only the timer whose generation is still current gets the
/// accumulated count from [`fire`](Self::fire).
#[derive(Debug)]
pub struct TapCoalescer {
    window: Duration,
    pending: Mutex<PendingTaps>,
}

impl TapCoalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(PendingTaps::default()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Register a tap. Returns the generation its timer must present.
    pub fn tap(&self) -> u64 {
        let mut pending = self.pending.lock();
        pending.count += 1;
        pending.generation = pending.generation.wrapping_add(1);
        pending.deadline = Some(Instant::now() + self.window);
        pending.generation
    }

    /// Take the accumulated count if `generation` is still the latest burst.
    pub fn fire(&self, generation: u64) -> Option<usize> {
        let mut pending = self.pending.lock();
        if pending.generation != generation || pending.count == 0 {
            return None;
        }
        pending.deadline = None;
        Some(std::mem::take(&mut pending.count))
    }

    /// Taps waiting for the current burst to close.
    pub fn pending(&self) -> usize {
        self.pending.lock().count
    }

    /// When the current burst closes, if one is open.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.lock().deadline
    }
}
