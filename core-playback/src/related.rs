//! Per-seed pools of related tracks for radio mode.

use core_catalog::TrackMeta;
use std::collections::HashMap;

#[derive(Debug)]
struct PoolEntry {
    candidates: Vec<TrackMeta>,
    cursor: usize,
}

/// Related-track candidates keyed by seed id, each with a consumption cursor.
///
/// A cursor only moves forward, so a candidate is offered at most once. A
/// pool that runs out without yielding anything is evicted so the next refill
/// fetches it again instead of spinning on dead data.
#[derive(Debug, Default)]
pub struct RelatedPool {
    pools: HashMap<String, PoolEntry>,
}

impl RelatedPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, seed: &str) -> bool {
        self.pools.contains_key(seed)
    }

    /// Store freshly fetched candidates for `seed`, resetting its cursor.
    pub fn insert(&mut self, seed: impl Into<String>, candidates: Vec<TrackMeta>) {
        self.pools.insert(
            seed.into(),
            PoolEntry {
                candidates,
                cursor: 0,
            },
        );
    }

    /// Advance `seed`'s cursor to the first candidate for which `is_seen`
    /// is false and return it.
    ///
    /// Returns `None` and evicts the pool when the cursor reaches the end
    /// without a match, or when `seed` has no pool.
    pub fn next_unseen(&mut self, seed: &str, is_seen: impl Fn(&str) -> bool) -> Option<TrackMeta> {
        let entry = self.pools.get_mut(seed)?;

        while entry.cursor < entry.candidates.len() {
            let candidate = &entry.candidates[entry.cursor];
            entry.cursor += 1;
            if !candidate.id.is_empty() && !is_seen(&candidate.id) {
                return Some(candidate.clone());
            }
        }

        self.pools.remove(seed);
        None
    }

    /// Candidates not yet walked past for `seed`.
    pub fn remaining(&self, seed: &str) -> usize {
        self.pools
            .get(seed)
            .map(|entry| entry.candidates.len().saturating_sub(entry.cursor))
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn clear(&mut self) {
        self.pools.clear();
    }
}
