//! RAII guard for pinned pages.
//!
//! [`PinnedPage`] holds one pin on a cached page and releases it when
//! dropped, so early returns and `?` never leak pins.

use std::ops::Deref;

use crate::common::CacheKey;
use crate::storage::page::{Page, PageRef};

use super::buffer_pool_manager::BufferPoolManager;

/// A page pinned through [`BufferPoolManager::fetch`].
///
/// Derefs to [`Page`]. Writing through [`Page::data_mut`] marks the page
/// modified; the pool writes it back when it is evicted.
///
/// # Example
/// ```ignore
/// let page = bpm.fetch(rid, 3)?;
/// page.data_mut()?[64] = 0xFF;
/// // page drops here and is unpinned
/// ```
pub struct PinnedPage<'a> {
    bpm: &'a BufferPoolManager,
    key: CacheKey,
    page: PageRef,
}

impl<'a> PinnedPage<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, key: CacheKey, page: PageRef) -> Self {
        Self { bpm, key, page }
    }

    /// Identity of the pinned page.
    #[inline]
    pub fn key(&self) -> CacheKey {
        self.key
    }

    /// Shared handle to the page, usable after the guard is gone.
    ///
    /// The handle does not keep the pin; once evicted the page expires.
    #[inline]
    pub fn page_ref(&self) -> &PageRef {
        &self.page
    }
}

impl Deref for PinnedPage<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.page
    }
}

impl Drop for PinnedPage<'_> {
    fn drop(&mut self) {
        self.bpm.unpin(self.key.resource_id, self.key.page_number);
    }
}
