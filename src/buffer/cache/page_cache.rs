//! Page cache with a two-list recency/frequency replacement policy.
//!
//! The cache is a simplified ARC:
//! - **Recency** holds pages seen once. Prefetched pages land here un-hit,
//!   so the first real request is their first hit.
//! - **Frequency** holds pages seen at least twice, and returning pages
//!   recognized from a ghost list.
//! - Each list has a bounded **ghost list** of recently evicted keys.
//!
//! Capacity is fixed; there is no adaptive target size between the lists.
//! When space is needed the larger list gives up a victim (ties go to
//! Recency), which biases eviction away from the frequently used set.

use std::collections::HashMap;

use log::{debug, trace};

use crate::common::{CacheKey, Error, PageSize, ResourceId, Result};
use crate::storage::page::PageRef;

use super::access_list::AccessList;
use super::entry::{CacheEntry, ListKind, FREQUENT_HITS};
use super::ghost::GhostList;

/// What an insertion pushed out of the cache.
///
/// For an unmodified victim the buffer has already been detached and can be
/// reused right away. A modified victim keeps its buffer attached so the
/// writer can persist it first.
#[derive(Debug, Default)]
pub struct EvictedEntry {
    /// Reusable buffer of the victim, if it could be detached.
    pub buffer: Option<Box<[u8]>>,
    /// The victim page, already marked expired.
    pub page: Option<PageRef>,
    /// Identity of the victim.
    pub key: Option<CacheKey>,
    /// Whether the victim must be written back before its buffer is reused.
    pub modified: bool,
}

impl EvictedEntry {
    /// Marker for an insertion that did not need to evict anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True if nothing was evicted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.page.is_none()
    }

    /// Resource of the victim.
    #[inline]
    pub fn resource_id(&self) -> Option<ResourceId> {
        self.key.map(|key| key.resource_id)
    }
}

/// In-memory page cache for one page size.
///
/// Not synchronized: the buffer pool keeps each cache behind a mutex, and
/// that mutex is the only lock for mutations of the cache.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use pagepool::{CacheKey, Page, PageCache, PageSize, PageType, ResourceId};
///
/// let mut cache = PageCache::new(PageSize::Size4K, 2);
/// let rid = ResourceId::new(1);
/// let page = Arc::new(Page::new(0, PageType::Raw, vec![0u8; 4096].into_boxed_slice()));
///
/// let evicted = cache.insert(page, rid, false).unwrap();
/// assert!(evicted.is_empty());
/// assert!(cache.lookup(CacheKey::new(rid, 0), false).is_some());
/// ```
#[derive(Debug)]
pub struct PageCache {
    page_size: PageSize,
    capacity: usize,

    /// All resident entries, whichever list they are on.
    entries: HashMap<CacheKey, CacheEntry>,

    /// Resident keys seen once.
    recency: AccessList,

    /// Resident keys seen repeatedly.
    frequency: AccessList,

    ghost_recency: GhostList,
    ghost_frequency: GhostList,

    /// Number of tombstoned entries; skips the deleted-first scan when zero.
    deleted: usize,

    /// Last stamp handed to a list slot.
    clock: u64,
}

impl PageCache {
    /// Create an empty cache holding up to `capacity` pages.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(page_size: PageSize, capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");

        Self {
            page_size,
            capacity,
            entries: HashMap::with_capacity(capacity),
            recency: AccessList::with_capacity(capacity),
            frequency: AccessList::with_capacity(capacity),
            ghost_recency: GhostList::new(capacity),
            ghost_frequency: GhostList::new(capacity),
            deleted: 0,
            clock: 0,
        }
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Look up a resident page, counting a hit and optionally pinning it.
    ///
    /// A Recency page reaching two hits moves to Frequency. Tombstoned
    /// entries are treated as misses.
    pub fn lookup(&mut self, key: CacheKey, pin: bool) -> Option<PageRef> {
        if self.entries.get(&key)?.is_deleted() {
            return None;
        }
        let stamp = self.next_stamp();
        let entry = self.entries.get_mut(&key)?;

        let hits = entry.hit();
        if pin {
            entry.pin();
        }
        let from = entry.list();
        let to = if from == ListKind::Recency && hits >= FREQUENT_HITS {
            ListKind::Frequency
        } else {
            from
        };
        entry.place(to, stamp);
        let page = entry.page().clone();

        // The old slot goes stale; the entry now sits at the most recent end
        self.list_mut(from).forget();
        self.link(key, to, stamp);

        if from != to {
            trace!("{} promoted to frequency list", key);
        }
        Some(page)
    }

    /// All resident, non-deleted pages of a resource.
    ///
    /// Counts as one lookup (without pinning) for every returned page.
    pub fn entries_for(&mut self, resource_id: ResourceId) -> Vec<PageRef> {
        let keys: Vec<CacheKey> = self
            .keys(ListKind::Recency)
            .chain(self.keys(ListKind::Frequency))
            .filter(|key| key.resource_id == resource_id)
            .collect();

        keys.into_iter()
            .filter_map(|key| self.lookup(key, false))
            .collect()
    }

    /// Resident, non-deleted pages of a resource that are modified.
    ///
    /// Does not count as an access.
    pub fn modified_for(&self, resource_id: ResourceId) -> Vec<(CacheKey, PageRef)> {
        let mut pages: Vec<(CacheKey, PageRef)> = self
            .entries
            .iter()
            .filter(|(key, entry)| {
                key.resource_id == resource_id
                    && !entry.is_deleted()
                    && matches!(entry.page().is_modified(), Ok(true))
            })
            .map(|(key, entry)| (*key, entry.page().clone()))
            .collect();
        pages.sort_by_key(|(key, _)| *key);
        pages
    }

    // ========================================================================
    // Insertion and eviction
    // ========================================================================

    /// Add a page to the cache, evicting one entry if the cache is full.
    ///
    /// - A key remembered by a ghost list is admitted into Frequency and
    ///   counted as hit.
    /// - Otherwise the page enters Recency un-hit, unless `pin` is set, in
    ///   which case it is pinned and counted as hit right away.
    ///
    /// # Errors
    /// - `Error::DuplicateEntry` if the key is already resident
    /// - `Error::CachePinned` if eviction is needed but nothing can be evicted
    /// - `Error::PageExpired` if `page` is already expired
    ///
    /// On error the cache is unchanged.
    pub fn insert(&mut self, page: PageRef, resource_id: ResourceId, pin: bool) -> Result<EvictedEntry> {
        let key = CacheKey::new(resource_id, page.page_number()?);
        if self.entries.contains_key(&key) {
            return Err(Error::DuplicateEntry(key));
        }

        let returning = self.ghost_recency.contains(&key) || self.ghost_frequency.contains(&key);

        let evicted = if self.entries.len() >= self.capacity {
            self.evict()?
        } else {
            EvictedEntry::empty()
        };

        let list = if returning {
            self.ghost_recency.remove(&key);
            self.ghost_frequency.remove(&key);
            ListKind::Frequency
        } else {
            ListKind::Recency
        };

        let stamp = self.next_stamp();
        let mut entry = CacheEntry::new(page, resource_id, list, stamp);
        if returning || pin {
            entry.hit();
        }
        if pin {
            entry.pin();
        }
        self.entries.insert(key, entry);
        self.link(key, list, stamp);

        trace!("admitted {} into {:?} (pinned: {})", key, list, pin);
        Ok(evicted)
    }

    /// Evict the tombstoned entry of `key` ahead of its turn.
    ///
    /// Lets a key of an expelled resource be cached again without waiting
    /// for the tombstone to age out. The key is remembered as a ghost like
    /// any other victim. Returns `None` if the key is absent or live.
    pub fn evict_tombstone(&mut self, key: CacheKey) -> Option<EvictedEntry> {
        let entry = self.entries.get(&key)?;
        if !entry.is_deleted() {
            return None;
        }
        let list = entry.list();
        self.remove_victim(list, key)
    }

    /// Evict one entry, starting with the larger list.
    fn evict(&mut self) -> Result<EvictedEntry> {
        let target = if self.recency.len() >= self.frequency.len() {
            ListKind::Recency
        } else {
            ListKind::Frequency
        };

        let (list, key) = self
            .select_victim(target)
            .map(|key| (target, key))
            .or_else(|| self.select_victim(target.other()).map(|key| (target.other(), key)))
            .ok_or(Error::CachePinned)?;

        self.remove_victim(list, key).ok_or(Error::CachePinned)
    }

    /// Take `key` out of `list`, remember it as a ghost and expire its page.
    fn remove_victim(&mut self, list: ListKind, key: CacheKey) -> Option<EvictedEntry> {
        let entry = self.entries.remove(&key)?;
        self.list_mut(list).forget();
        if entry.is_deleted() {
            self.deleted -= 1;
        }

        match list {
            ListKind::Recency => self.ghost_recency.push(key),
            ListKind::Frequency => self.ghost_frequency.push(key),
        };

        let page = entry.page().clone();
        let modified = matches!(page.is_modified(), Ok(true));
        page.mark_expired();
        let buffer = if modified { None } else { page.detach_buffer() };

        debug!(
            "evicted {} from {:?} (modified: {}, deleted: {})",
            key,
            list,
            modified,
            entry.is_deleted()
        );
        Some(EvictedEntry {
            buffer,
            page: Some(page),
            key: Some(key),
            modified,
        })
    }

    /// Pick a victim from one list: the oldest tombstoned entry, otherwise
    /// the oldest unpinned one.
    fn select_victim(&self, list: ListKind) -> Option<CacheKey> {
        if self.deleted > 0 {
            let tombstone = self
                .keys(list)
                .find(|key| self.entries.get(key).is_some_and(|e| e.is_deleted()));
            if tombstone.is_some() {
                return tombstone;
            }
        }

        self.keys(list)
            .find(|key| self.entries.get(key).is_some_and(|e| e.is_evictable()))
    }

    // ========================================================================
    // Pinning and tombstones
    // ========================================================================

    /// Release one pin. Does nothing if the key is absent or unpinned.
    pub fn unpin(&mut self, key: CacheKey) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.unpin();
        }
    }

    /// Drop every pin without changing list positions.
    pub fn unpin_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.reset_pins();
        }
    }

    /// Tombstone every resident page of a resource.
    ///
    /// Pins are ignored. Occupancy is unchanged; the tombstoned entries are
    /// the next eviction victims of their lists.
    pub fn expel_resource(&mut self, resource_id: ResourceId) {
        let mut expelled = 0;
        for entry in self.entries.values_mut() {
            if entry.resource_id() == resource_id && !entry.is_deleted() {
                entry.mark_deleted();
                expelled += 1;
            }
        }
        self.deleted += expelled;

        if expelled > 0 {
            debug!("expelled {} pages of {}", expelled, resource_id);
        }
    }

    /// Expire every page and empty the cache, including ghost lists.
    pub fn clear(&mut self) {
        for entry in self.entries.values() {
            entry.page().mark_expired();
        }
        self.entries.clear();
        self.recency.clear();
        self.frequency.clear();
        self.ghost_recency.clear();
        self.ghost_frequency.clear();
        self.deleted = 0;
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    #[inline]
    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resident entries, tombstoned ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn recency_len(&self) -> usize {
        self.recency.len()
    }

    #[inline]
    pub fn frequency_len(&self) -> usize {
        self.frequency.len()
    }

    /// Whether the key is resident (tombstoned or not).
    #[inline]
    pub fn contains(&self, key: CacheKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Whether the key is remembered by either ghost list.
    pub fn is_ghost(&self, key: CacheKey) -> bool {
        self.ghost_recency.contains(&key) || self.ghost_frequency.contains(&key)
    }

    pub fn ghost_len(&self) -> usize {
        self.ghost_recency.len() + self.ghost_frequency.len()
    }

    /// The list a resident key is on.
    pub fn list_of(&self, key: CacheKey) -> Option<ListKind> {
        self.entries.get(&key).map(|e| e.list())
    }

    pub fn hits(&self, key: CacheKey) -> Option<u8> {
        self.entries.get(&key).map(|e| e.hits())
    }

    pub fn pin_count(&self, key: CacheKey) -> Option<u32> {
        self.entries.get(&key).map(|e| e.pin_count())
    }

    /// Check every structural invariant of the cache.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        use std::collections::HashSet;

        assert!(self.recency.len() + self.frequency.len() <= self.capacity);
        assert_eq!(self.recency.len() + self.frequency.len(), self.entries.len());

        let recency: HashSet<_> = self.keys(ListKind::Recency).collect();
        let frequency: HashSet<_> = self.keys(ListKind::Frequency).collect();
        assert_eq!(recency.len(), self.recency.len());
        assert_eq!(frequency.len(), self.frequency.len());
        assert!(recency.is_disjoint(&frequency));

        for (key, entry) in &self.entries {
            match entry.list() {
                ListKind::Recency => assert!(recency.contains(key)),
                ListKind::Frequency => assert!(frequency.contains(key)),
            }
            assert!(!self.is_ghost(*key), "{} is resident and a ghost", key);
            assert!(!entry.page().is_expired());
        }
        for key in self.ghost_recency.iter() {
            assert!(!self.ghost_frequency.contains(key));
        }
        assert_eq!(
            self.deleted,
            self.entries.values().filter(|e| e.is_deleted()).count()
        );
    }

    // ========================================================================
    // Internal: list plumbing
    // ========================================================================

    fn next_stamp(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn list_mut(&mut self, list: ListKind) -> &mut AccessList {
        match list {
            ListKind::Recency => &mut self.recency,
            ListKind::Frequency => &mut self.frequency,
        }
    }

    /// Live keys of a list, oldest first.
    fn keys(&self, list: ListKind) -> impl Iterator<Item = CacheKey> + '_ {
        let entries = &self.entries;
        let list = match list {
            ListKind::Recency => &self.recency,
            ListKind::Frequency => &self.frequency,
        };
        list.iter(move |key, stamp| is_current(entries, key, stamp))
    }

    /// Append a slot for `key` to `list`. The entry must already carry
    /// `stamp`.
    fn link(&mut self, key: CacheKey, list: ListKind, stamp: u64) {
        let entries = &self.entries;
        let current = |key: &CacheKey, stamp: u64| is_current(entries, key, stamp);
        let list = match list {
            ListKind::Recency => &mut self.recency,
            ListKind::Frequency => &mut self.frequency,
        };
        list.push(key, stamp);
        list.compact(current);
    }
}

/// Whether the slot `(key, stamp)` is the current position of its entry.
fn is_current(entries: &HashMap<CacheKey, CacheEntry>, key: &CacheKey, stamp: u64) -> bool {
    entries.get(key).is_some_and(|entry| entry.stamp() == stamp)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::{Page, PageType};
    use std::sync::Arc;

    const RID: ResourceId = ResourceId(1);

    fn page(number: u32) -> PageRef {
        Arc::new(Page::new(
            number,
            PageType::Raw,
            vec![number as u8; 64].into_boxed_slice(),
        ))
    }

    fn key(number: u32) -> CacheKey {
        CacheKey::new(RID, number)
    }

    fn cache(capacity: usize) -> PageCache {
        PageCache::new(PageSize::Size4K, capacity)
    }

    #[test]
    fn test_insert_without_eviction() {
        let mut cache = cache(2);

        assert!(cache.insert(page(0), RID, false).unwrap().is_empty());
        assert!(cache.insert(page(1), RID, false).unwrap().is_empty());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.recency_len(), 2);
        assert_eq!(cache.hits(key(0)), Some(0));
        cache.assert_invariants();
    }

    #[test]
    fn test_tie_evicts_from_recency() {
        let mut cache = cache(2);

        cache.insert(page(0), RID, false).unwrap(); // A
        cache.insert(page(1), RID, false).unwrap(); // B
        cache.lookup(key(1), false);
        cache.lookup(key(1), false); // B -> Frequency

        assert_eq!(cache.recency_len(), 1);
        assert_eq!(cache.frequency_len(), 1);

        let evicted = cache.insert(page(2), RID, false).unwrap();
        assert_eq!(evicted.key, Some(key(0)));
        assert!(cache.contains(key(1)));
        assert!(cache.contains(key(2)));
        assert!(!cache.contains(key(0)));
        cache.assert_invariants();
    }

    #[test]
    fn test_larger_list_gives_victim() {
        let mut cache = cache(3);

        for n in 0..3 {
            cache.insert(page(n), RID, false).unwrap();
        }
        // 0 and 1 frequent, 2 recent
        for n in 0..2 {
            cache.lookup(key(n), false);
            cache.lookup(key(n), false);
        }
        assert_eq!(cache.frequency_len(), 2);

        let evicted = cache.insert(page(3), RID, false).unwrap();
        assert_eq!(evicted.key, Some(key(0)));
        assert_eq!(cache.list_of(key(3)), Some(ListKind::Recency));
        cache.assert_invariants();
    }

    #[test]
    fn test_pinned_blocks_eviction() {
        let mut cache = cache(1);

        cache.insert(page(0), RID, true).unwrap();
        let err = cache.insert(page(1), RID, false).unwrap_err();
        assert!(matches!(err, Error::CachePinned));
        assert!(cache.contains(key(0)));
        assert!(!cache.contains(key(1)));

        cache.unpin(key(0));
        let evicted = cache.insert(page(1), RID, false).unwrap();
        assert_eq!(evicted.key, Some(key(0)));
        let buffer = evicted.buffer.unwrap();
        assert_eq!(buffer[0], 0);
        assert!(evicted.page.unwrap().is_expired());
        cache.assert_invariants();
    }

    #[test]
    fn test_victim_falls_back_to_other_list() {
        let mut cache = cache(2);

        cache.insert(page(0), RID, true).unwrap(); // pinned, Recency
        cache.insert(page(1), RID, false).unwrap();
        cache.lookup(key(1), false);
        cache.lookup(key(1), false); // Frequency, unpinned

        // Tie -> Recency, but its only entry is pinned
        let evicted = cache.insert(page(2), RID, false).unwrap();
        assert_eq!(evicted.key, Some(key(1)));
        cache.assert_invariants();
    }

    #[test]
    fn test_lookup_promotes_after_two_hits() {
        let mut cache = cache(4);
        cache.insert(page(0), RID, false).unwrap();

        assert!(cache.lookup(key(0), false).is_some());
        assert_eq!(cache.hits(key(0)), Some(1));
        assert_eq!(cache.list_of(key(0)), Some(ListKind::Recency));

        assert!(cache.lookup(key(0), false).is_some());
        assert_eq!(cache.hits(key(0)), Some(2));
        assert_eq!(cache.list_of(key(0)), Some(ListKind::Frequency));
        cache.assert_invariants();
    }

    #[test]
    fn test_lookup_miss() {
        let mut cache = cache(2);
        assert!(cache.lookup(key(9), true).is_none());
    }

    #[test]
    fn test_pinned_insert_counts_hit() {
        let mut cache = cache(2);
        cache.insert(page(0), RID, true).unwrap();

        assert_eq!(cache.hits(key(0)), Some(1));
        assert_eq!(cache.pin_count(key(0)), Some(1));

        // First lookup after a pinned insert promotes
        cache.lookup(key(0), true);
        assert_eq!(cache.list_of(key(0)), Some(ListKind::Frequency));
        assert_eq!(cache.pin_count(key(0)), Some(2));
    }

    #[test]
    fn test_ghost_readmission() {
        let mut cache = cache(1);

        cache.insert(page(0), RID, false).unwrap();
        cache.insert(page(1), RID, false).unwrap(); // evicts 0
        assert!(cache.is_ghost(key(0)));

        let evicted = cache.insert(page(0), RID, false).unwrap();
        assert_eq!(evicted.key, Some(key(1)));
        assert_eq!(cache.list_of(key(0)), Some(ListKind::Frequency));
        assert!(cache.hits(key(0)).unwrap() >= 1);
        assert!(!cache.is_ghost(key(0)));
        assert!(cache.is_ghost(key(1)));
        cache.assert_invariants();
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut cache = cache(2);
        cache.insert(page(0), RID, false).unwrap();

        let err = cache.insert(page(0), RID, true).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntry(k) if k == key(0)));
        assert_eq!(cache.pin_count(key(0)), Some(0));
        assert_eq!(cache.hits(key(0)), Some(0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_same_page_number_other_resource() {
        let mut cache = cache(2);
        cache.insert(page(0), RID, false).unwrap();
        assert!(cache.insert(page(0), ResourceId::new(2), false).is_ok());
    }

    #[test]
    fn test_expel_resource() {
        let mut cache = cache(3);
        let other = ResourceId::new(2);

        cache.insert(page(0), RID, true).unwrap();
        cache.insert(page(1), other, false).unwrap();
        cache.insert(page(2), RID, false).unwrap();

        cache.expel_resource(RID);
        assert_eq!(cache.len(), 3);
        assert!(cache.lookup(key(0), false).is_none());
        assert!(cache.lookup(key(2), false).is_none());
        assert!(cache.entries_for(RID).is_empty());

        // Tombstones go first, even the pinned one
        let evicted = cache.insert(page(3), other, false).unwrap();
        assert_eq!(evicted.key, Some(key(0)));
        let evicted = cache.insert(page(4), other, false).unwrap();
        assert_eq!(evicted.key, Some(key(2)));
        cache.assert_invariants();
    }

    #[test]
    fn test_entries_for_counts_access() {
        let mut cache = cache(4);
        cache.insert(page(0), RID, false).unwrap();
        cache.insert(page(1), RID, false).unwrap();
        cache.insert(page(0), ResourceId::new(5), false).unwrap();

        let pages = cache.entries_for(RID);
        assert_eq!(pages.len(), 2);
        assert_eq!(cache.hits(key(0)), Some(1));
        assert_eq!(cache.hits(key(1)), Some(1));
        assert_eq!(cache.hits(CacheKey::new(ResourceId::new(5), 0)), Some(0));
    }

    #[test]
    fn test_unpin_all() {
        let mut cache = cache(2);
        cache.insert(page(0), RID, true).unwrap();
        cache.lookup(key(0), true);
        cache.insert(page(1), RID, true).unwrap();

        cache.unpin_all();
        assert_eq!(cache.pin_count(key(0)), Some(0));
        assert_eq!(cache.pin_count(key(1)), Some(0));
        assert_eq!(cache.list_of(key(0)), Some(ListKind::Frequency));

        // Unpinning absent or unpinned keys is harmless
        cache.unpin(key(0));
        cache.unpin(key(42));
    }

    #[test]
    fn test_modified_victim_keeps_buffer() {
        let mut cache = cache(1);
        let dirty = page(0);
        dirty.data_mut().unwrap()[0] = 0xAA;
        cache.insert(dirty, RID, false).unwrap();

        let evicted = cache.insert(page(1), RID, false).unwrap();
        assert!(evicted.modified);
        assert!(evicted.buffer.is_none());
        let victim = evicted.page.unwrap();
        assert!(victim.is_expired());
        assert_eq!(victim.raw_buffer().unwrap()[0], 0xAA);
    }

    #[test]
    fn test_modified_for() {
        let mut cache = cache(3);
        let dirty = page(2);
        dirty.mark_modified();
        cache.insert(page(1), RID, false).unwrap();
        cache.insert(dirty, RID, false).unwrap();

        let modified = cache.modified_for(RID);
        assert_eq!(modified.len(), 1);
        assert_eq!(modified[0].0, key(2));
        assert_eq!(cache.hits(key(2)), Some(0));
    }

    #[test]
    fn test_clear_expires_pages() {
        let mut cache = cache(2);
        let p = page(0);
        cache.insert(Arc::clone(&p), RID, false).unwrap();

        cache.clear();
        assert!(cache.is_empty());
        assert!(p.is_expired());
        assert_eq!(cache.ghost_len(), 0);
    }

    #[test]
    fn test_evict_tombstone() {
        let mut cache = cache(3);
        let p = page(0);
        cache.insert(Arc::clone(&p), RID, true).unwrap();
        cache.insert(page(1), RID, false).unwrap();
        cache.expel_resource(RID);

        let evicted = cache.evict_tombstone(key(0)).unwrap();
        assert_eq!(evicted.key, Some(key(0)));
        assert!(!evicted.modified);
        assert!(evicted.buffer.is_some());
        assert!(p.is_expired());
        assert!(!cache.contains(key(0)));
        assert!(cache.is_ghost(key(0)));
        assert_eq!(cache.len(), 1);
        cache.assert_invariants();

        // The key can be cached again, and comes back as a returning page
        cache.insert(page(0), RID, false).unwrap();
        assert_eq!(cache.list_of(key(0)), Some(ListKind::Frequency));
        cache.assert_invariants();
    }

    #[test]
    fn test_evict_tombstone_ignores_live_and_absent_keys() {
        let mut cache = cache(2);
        cache.insert(page(0), RID, false).unwrap();

        assert!(cache.evict_tombstone(key(0)).is_none());
        assert!(cache.evict_tombstone(key(9)).is_none());
        assert!(cache.contains(key(0)));
        cache.assert_invariants();
    }

    #[test]
    fn test_repeated_lookups_keep_list_lengths() {
        let mut cache = cache(4);
        for number in 0..4 {
            cache.insert(page(number), RID, false).unwrap();
        }

        for round in 0..500u32 {
            cache.lookup(key(round % 2), false);
        }
        assert_eq!(cache.frequency_len(), 2);
        assert_eq!(cache.recency_len(), 2);
        cache.assert_invariants();

        // Oldest Recency page is still the tie-breaking victim
        let evicted = cache.insert(page(4), RID, false).unwrap();
        assert_eq!(evicted.key, Some(key(2)));
        cache.assert_invariants();
    }
}
