//! Access list - keys in placement order, with lazy removal.
//!
//! Moving a key to the most recent end would normally mean searching the
//! list for its old slot. Instead every placement gets a fresh stamp and the
//! cache entry remembers the stamp of its current slot. A slot whose stamp
//! no longer matches its entry is stale: it is skipped while iterating and
//! dropped on the next compaction.

use std::collections::VecDeque;

use crate::common::CacheKey;

/// Stale slots tolerated on top of the live ones before compacting.
const COMPACT_SLACK: usize = 64;

/// One of the two resident lists of the page cache.
#[derive(Debug, Default)]
pub struct AccessList {
    /// `(key, stamp)` slots in placement order (front = oldest), stale ones
    /// included.
    slots: VecDeque<(CacheKey, u64)>,

    /// Number of slots that are still the current position of their entry.
    live: usize,
}

impl AccessList {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: VecDeque::with_capacity(capacity),
            live: 0,
        }
    }

    /// Append a slot at the most recent end.
    #[inline]
    pub fn push(&mut self, key: CacheKey, stamp: u64) {
        self.slots.push_back((key, stamp));
        self.live += 1;
    }

    /// Account for a slot that went stale because its entry moved or left.
    #[inline]
    pub fn forget(&mut self) {
        self.live = self.live.saturating_sub(1);
    }

    /// Number of live slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Slots held, stale ones included.
    #[inline]
    pub fn slots(&self) -> usize {
        self.slots.len()
    }

    /// Live keys, oldest first.
    ///
    /// `is_current(key, stamp)` tells whether a slot is still the position of
    /// its entry.
    pub fn iter<'a, F>(&'a self, is_current: F) -> impl Iterator<Item = CacheKey> + 'a
    where
        F: Fn(&CacheKey, u64) -> bool + 'a,
    {
        self.slots
            .iter()
            .filter(move |(key, stamp)| is_current(key, *stamp))
            .map(|(key, _)| *key)
    }

    /// Drop the stale slots once they outnumber the live ones by more than
    /// the slack. Amortized O(1) per push.
    pub fn compact<F>(&mut self, is_current: F)
    where
        F: Fn(&CacheKey, u64) -> bool,
    {
        if self.slots.len() > 2 * self.live + COMPACT_SLACK {
            self.slots.retain(|(key, stamp)| is_current(key, *stamp));
            self.live = self.slots.len();
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.live = 0;
    }
}
