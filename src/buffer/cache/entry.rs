//! Cache entry - bookkeeping for one resident page.
//!
//! A [`CacheEntry`] holds a [`PageRef`] plus the metadata the replacement
//! policy needs:
//! - Which list the page lives on, and its position stamp there
//! - Hit counter (saturating at 2)
//! - Pin count for reference counting
//! - Tombstone flag for expelled resources

use crate::common::ResourceId;
use crate::storage::page::PageRef;

/// Hits at which a page counts as frequently used.
pub const FREQUENT_HITS: u8 = 2;

/// The resident list an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Pages seen once (or not yet requested, when prefetched).
    Recency,
    /// Pages seen at least twice, or recognized from a ghost list.
    Frequency,
}

impl ListKind {
    /// The other list.
    #[inline]
    pub fn other(self) -> Self {
        match self {
            ListKind::Recency => ListKind::Frequency,
            ListKind::Frequency => ListKind::Recency,
        }
    }
}

/// An entry in the page cache.
///
/// Entries are owned by the [`PageCache`](super::PageCache) and only touched
/// while its lock is held, so none of the fields need interior mutability.
/// The cache keys its entries by [`CacheKey`](crate::CacheKey); the entry
/// itself only keeps the resource, for expelling.
#[derive(Debug)]
pub struct CacheEntry {
    page: PageRef,
    resource_id: ResourceId,
    list: ListKind,
    /// Stamp of the entry's current slot in its list. Older slots carrying
    /// the same key are stale.
    stamp: u64,
    hits: u8,
    pin_count: u32,
    deleted: bool,
}

impl CacheEntry {
    /// Create an un-hit, unpinned entry placed on `list` with `stamp`.
    pub fn new(page: PageRef, resource_id: ResourceId, list: ListKind, stamp: u64) -> Self {
        Self {
            page,
            resource_id,
            list,
            stamp,
            hits: 0,
            pin_count: 0,
            deleted: false,
        }
    }

    /// The wrapped page.
    #[inline]
    pub fn page(&self) -> &PageRef {
        &self.page
    }

    /// Owning resource.
    #[inline]
    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    #[inline]
    pub fn list(&self) -> ListKind {
        self.list
    }

    #[inline]
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Record a new position: `list`, at the slot stamped `stamp`.
    #[inline]
    pub(crate) fn place(&mut self, list: ListKind, stamp: u64) {
        self.list = list;
        self.stamp = stamp;
    }

    // ========================================================================
    // Hit counter
    // ========================================================================

    /// Count one access. Returns the new hit count.
    #[inline]
    pub fn hit(&mut self) -> u8 {
        self.hits = (self.hits + 1).min(FREQUENT_HITS);
        self.hits
    }

    #[inline]
    pub fn hits(&self) -> u8 {
        self.hits
    }

    // ========================================================================
    // Pin count
    // ========================================================================

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub fn pin(&mut self) -> u32 {
        self.pin_count += 1;
        self.pin_count
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// Unpinning an unpinned entry is a no-op.
    #[inline]
    pub fn unpin(&mut self) -> u32 {
        self.pin_count = self.pin_count.saturating_sub(1);
        self.pin_count
    }

    /// Drop all pins at once.
    #[inline]
    pub fn reset_pins(&mut self) {
        self.pin_count = 0;
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    // ========================================================================
    // Tombstone
    // ========================================================================

    /// Hide the entry from lookups and make it the next eviction candidate.
    #[inline]
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Whether the entry may be chosen as a victim on an ordinary pass.
    #[inline]
    pub fn is_evictable(&self) -> bool {
        !self.is_pinned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::{Page, PageType};
    use std::sync::Arc;

    fn entry() -> CacheEntry {
        let page = Arc::new(Page::new(4, PageType::Raw, vec![0u8; 64].into_boxed_slice()));
        CacheEntry::new(page, ResourceId::new(1), ListKind::Recency, 7)
    }

    #[test]
    fn test_entry_new() {
        let entry = entry();
        assert_eq!(entry.resource_id(), ResourceId::new(1));
        assert_eq!(entry.list(), ListKind::Recency);
        assert_eq!(entry.stamp(), 7);
        assert_eq!(entry.hits(), 0);
        assert!(!entry.is_pinned());
        assert!(!entry.is_deleted());
        assert!(entry.is_evictable());
    }

    #[test]
    fn test_entry_hits_saturate() {
        let mut entry = entry();
        assert_eq!(entry.hit(), 1);
        assert_eq!(entry.hit(), 2);
        assert_eq!(entry.hit(), 2);
    }

    #[test]
    fn test_entry_pin_unpin() {
        let mut entry = entry();

        assert_eq!(entry.pin(), 1);
        assert_eq!(entry.pin(), 2);
        assert!(!entry.is_evictable());

        assert_eq!(entry.unpin(), 1);
        assert_eq!(entry.unpin(), 0);
        assert!(entry.is_evictable());
    }

    #[test]
    fn test_entry_unpin_is_best_effort() {
        let mut entry = entry();
        assert_eq!(entry.unpin(), 0);
        assert_eq!(entry.pin_count(), 0);
    }

    #[test]
    fn test_entry_reset_pins() {
        let mut entry = entry();
        entry.pin();
        entry.pin();
        entry.reset_pins();
        assert_eq!(entry.pin_count(), 0);
    }

    #[test]
    fn test_entry_place() {
        let mut entry = entry();
        entry.place(ListKind::Frequency, 12);
        assert_eq!(entry.list(), ListKind::Frequency);
        assert_eq!(entry.stamp(), 12);
    }

    #[test]
    fn test_list_kind_other() {
        assert_eq!(ListKind::Recency.other(), ListKind::Frequency);
        assert_eq!(ListKind::Frequency.other(), ListKind::Recency);
    }
}
