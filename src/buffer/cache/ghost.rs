//! Ghost list - bounded memory of recently evicted keys.
//!
//! A ghost list keeps only the identity of evicted pages, not their data.
//! When a page whose key is still remembered comes back, the cache admits it
//! straight into the frequency list.

use std::collections::{HashSet, VecDeque};

use crate::common::CacheKey;

/// A bounded FIFO set of evicted keys.
///
/// Keys are dropped oldest first once the bound is exceeded.
#[derive(Debug)]
pub struct GhostList {
    /// Keys in eviction order (front = oldest).
    queue: VecDeque<CacheKey>,

    /// Set for O(1) membership check.
    members: HashSet<CacheKey>,

    bound: usize,
}

impl GhostList {
    /// Create an empty ghost list remembering at most `bound` keys.
    pub fn new(bound: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(bound),
            members: HashSet::with_capacity(bound),
            bound,
        }
    }

    /// Remember an evicted key. Returns the key dropped to make room, if any.
    pub fn push(&mut self, key: CacheKey) -> Option<CacheKey> {
        if self.bound == 0 || !self.members.insert(key) {
            return None;
        }
        self.queue.push_back(key);

        if self.queue.len() > self.bound {
            let dropped = self.queue.pop_front()?;
            self.members.remove(&dropped);
            return Some(dropped);
        }
        None
    }

    /// Forget a key. Returns true if it was remembered.
    pub fn remove(&mut self, key: &CacheKey) -> bool {
        if !self.members.remove(key) {
            return false;
        }
        if let Some(pos) = self.queue.iter().position(|k| k == key) {
            self.queue.remove(pos);
        }
        true
    }

    #[inline]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.members.contains(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Remembered keys, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &CacheKey> {
        self.queue.iter()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.members.clear();
    }
}
