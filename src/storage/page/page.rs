//! Page - a typed view over one raw page buffer.
//!
//! A [`Page`] owns the bytes of one resident page together with its
//! identity and state flags. Pages are shared between the cache, the I/O
//! workers and callers as [`PageRef`]s.
//!
//! Once the cache evicts a page it is marked expired: every accessor that
//! would hand out page content or identity fails with
//! [`Error::PageExpired`] instead of returning data that may already belong
//! to another page.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use crate::common::{Error, Result};

use super::page_header::PageType;

/// Shared handle to a resident page.
pub type PageRef = Arc<Page>;

/// One page of a resource, wrapping its raw buffer.
///
/// # Thread Safety
/// - `data`: `RwLock` so callers may read concurrently; `None` once the
///   buffer has been detached for reuse
/// - `state` / `expired`: atomics, updated without locking
///
/// `state` packs the modified flag (bit 0) with a count of modifications in
/// the upper bits, so a write-back can tell whether the page changed while it
/// was being persisted.
///
/// # Example
/// ```
/// use pagepool::{Page, PageType};
///
/// let page = Page::new(3, PageType::Table, vec![0u8; 4096].into_boxed_slice());
/// page.data_mut().unwrap()[100] = 0xAB;
///
/// assert!(page.is_modified().unwrap());
/// page.mark_expired();
/// assert!(page.page_number().is_err());
/// ```
#[derive(Debug)]
pub struct Page {
    page_number: u32,
    page_type: PageType,
    data: RwLock<Option<Box<[u8]>>>,
    state: AtomicU64,
    expired: AtomicBool,
}

/// Bit 0 of `Page::state`.
const MODIFIED: u64 = 1;

/// One modification, counted above the flag bit.
const MODIFICATION: u64 = 2;

impl Page {
    /// Wrap a buffer as page `page_number`.
    pub fn new(page_number: u32, page_type: PageType, buffer: Box<[u8]>) -> Self {
        Self {
            page_number,
            page_type,
            data: RwLock::new(Some(buffer)),
            state: AtomicU64::new(0),
            expired: AtomicBool::new(false),
        }
    }

    /// Page number within the owning resource.
    ///
    /// # Errors
    /// `Error::PageExpired` if the page has been evicted.
    pub fn page_number(&self) -> Result<u32> {
        self.check_live()?;
        Ok(self.page_number)
    }

    /// Resource kind tag assigned by the resource manager.
    #[inline]
    pub fn page_type(&self) -> PageType {
        self.page_type
    }

    /// Whether the page changed since it was read or last written.
    ///
    /// # Errors
    /// `Error::PageExpired` if the page has been evicted.
    pub fn is_modified(&self) -> Result<bool> {
        self.check_live()?;
        Ok((self.state.load(Ordering::Acquire) & MODIFIED) != 0)
    }

    /// Flag the page as changed so eviction writes it back.
    #[inline]
    pub fn mark_modified(&self) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                Some(state.wrapping_add(MODIFICATION) | MODIFIED)
            });
    }

    /// Clear the modified flag after the page has been persisted.
    #[inline]
    pub fn clear_modified(&self) {
        self.state.fetch_and(!MODIFIED, Ordering::AcqRel);
    }

    /// Snapshot of the modification state, taken before a write-back.
    #[inline]
    pub(crate) fn modification_stamp(&self) -> u64 {
        self.state.load(Ordering::Acquire)
    }

    /// Clear the modified flag only if the page was not modified since
    /// `stamp` was taken. Returns whether the flag was cleared.
    pub(crate) fn clear_modified_if_unchanged(&self, stamp: u64) -> bool {
        self.state
            .compare_exchange(stamp, stamp & !MODIFIED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Mark the page as no longer backed by the cache.
    #[inline]
    pub fn mark_expired(&self) {
        self.expired.store(true, Ordering::Release);
    }

    /// Check if the page has been evicted.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }

    /// Shared access to the page bytes.
    ///
    /// # Errors
    /// `Error::PageExpired` if the page has been evicted.
    pub fn data(&self) -> Result<MappedRwLockReadGuard<'_, [u8]>> {
        self.check_live()?;
        RwLockReadGuard::try_map(self.data.read(), |buf| buf.as_deref())
            .map_err(|_| Error::PageExpired)
    }

    /// Exclusive access to the page bytes. Marks the page modified.
    ///
    /// # Errors
    /// `Error::PageExpired` if the page has been evicted.
    pub fn data_mut(&self) -> Result<MappedRwLockWriteGuard<'_, [u8]>> {
        self.check_live()?;
        let guard = RwLockWriteGuard::try_map(self.data.write(), |buf| buf.as_deref_mut())
            .map_err(|_| Error::PageExpired)?;
        self.mark_modified();
        Ok(guard)
    }

    /// The raw buffer, regardless of expiry.
    ///
    /// Resource managers use this to persist an evicted page. Returns `None`
    /// once the buffer has been handed back to the free-buffer pool.
    pub fn raw_buffer(&self) -> Option<MappedRwLockReadGuard<'_, [u8]>> {
        RwLockReadGuard::try_map(self.data.read(), |buf| buf.as_deref()).ok()
    }

    /// Take the buffer out of the page for reuse.
    ///
    /// Only called on expired pages. Does not wait for readers: if the
    /// buffer is currently borrowed it stays with the page.
    pub(crate) fn detach_buffer(&self) -> Option<Box<[u8]>> {
        debug_assert!(self.is_expired(), "detaching the buffer of a live page");
        self.data.try_write().and_then(|mut buf| buf.take())
    }

    /// Copy the page bytes into `target`. Returns false if the buffer is gone
    /// or has a different length.
    pub(crate) fn copy_into(&self, target: &mut [u8]) -> bool {
        match self.data.read().as_deref() {
            Some(bytes) if bytes.len() == target.len() => {
                target.copy_from_slice(bytes);
                true
            }
            _ => false,
        }
    }

    fn check_live(&self) -> Result<()> {
        if self.is_expired() {
            Err(Error::PageExpired)
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: u32) -> Page {
        Page::new(number, PageType::Raw, vec![0u8; 4096].into_boxed_slice())
    }

    #[test]
    fn test_page_new() {
        let page = page(5);
        assert_eq!(page.page_number().unwrap(), 5);
        assert_eq!(page.page_type(), PageType::Raw);
        assert!(!page.is_modified().unwrap());
        assert!(!page.is_expired());
        assert_eq!(page.data().unwrap().len(), 4096);
    }

    #[test]
    fn test_page_write_marks_modified() {
        let page = page(0);

        page.data_mut().unwrap()[0] = 0xFF;
        assert!(page.is_modified().unwrap());
        assert_eq!(page.data().unwrap()[0], 0xFF);

        page.clear_modified();
        assert!(!page.is_modified().unwrap());
    }

    #[test]
    fn test_clear_modified_if_unchanged() {
        let page = page(0);
        page.mark_modified();

        let stamp = page.modification_stamp();
        assert!(page.clear_modified_if_unchanged(stamp));
        assert!(!page.is_modified().unwrap());
    }

    #[test]
    fn test_change_after_stamp_keeps_modified() {
        let page = page(0);
        page.data_mut().unwrap()[0] = 1;

        let stamp = page.modification_stamp();
        page.data_mut().unwrap()[0] = 2;
        assert!(!page.clear_modified_if_unchanged(stamp));
        assert!(page.is_modified().unwrap());

        // A later stamp covers the second change
        let stamp = page.modification_stamp();
        assert!(page.clear_modified_if_unchanged(stamp));
        assert!(!page.is_modified().unwrap());
    }

    #[test]
    fn test_expired_page_rejects_access() {
        let page = page(1);
        page.mark_expired();

        assert!(matches!(page.page_number(), Err(Error::PageExpired)));
        assert!(matches!(page.is_modified(), Err(Error::PageExpired)));
        assert!(page.data().is_err());
        assert!(page.data_mut().is_err());

        // The writer still reaches the bytes
        assert!(page.raw_buffer().is_some());
    }

    #[test]
    fn test_detach_buffer() {
        let page = page(2);
        page.data_mut().unwrap()[7] = 0x42;
        page.mark_expired();

        let buffer = page.detach_buffer().unwrap();
        assert_eq!(buffer[7], 0x42);
        assert!(page.raw_buffer().is_none());
        assert!(page.detach_buffer().is_none());
    }

    #[test]
    fn test_detach_skips_borrowed_buffer() {
        let page = page(2);
        page.mark_expired();

        let borrowed = page.raw_buffer();
        assert!(page.detach_buffer().is_none());
        drop(borrowed);
        assert!(page.detach_buffer().is_some());
    }

    #[test]
    fn test_copy_into() {
        let page = page(3);
        page.data_mut().unwrap()[10] = 0x10;

        let mut target = vec![0u8; 4096];
        assert!(page.copy_into(&mut target));
        assert_eq!(target[10], 0x10);

        let mut short = vec![0u8; 16];
        assert!(!page.copy_into(&mut short));
    }

    #[test]
    fn test_concurrent_reads() {
        use std::thread;

        let page = Arc::new(page(9));
        page.data_mut().unwrap()[0] = 0x42;

        let mut handles = vec![];
        for _ in 0..10 {
            let page = Arc::clone(&page);
            handles.push(thread::spawn(move || {
                assert_eq!(page.data().unwrap()[0], 0x42);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
