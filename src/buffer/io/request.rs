//! I/O requests handed to the background workers.
//!
//! Every request carries a one-shot [`Completion`] slot. The worker stores
//! the outcome there, success or failure, so a waiting caller always wakes
//! with a definite result.

use std::sync::Arc;

use log::{debug, warn};
use parking_lot::{Condvar, Mutex};

use crate::buffer::free_buffers::FreeBufferPool;
use crate::buffer::stats::BufferPoolStats;
use crate::common::{CacheKey, Error, Result};
use crate::storage::page::{Page, PageRef};
use crate::storage::SharedResource;

/// Work a background worker can perform.
pub trait IoRequest: Send + Sync + 'static {
    /// Page the request is about.
    fn key(&self) -> CacheKey;

    /// Perform the physical I/O and complete the request.
    fn process(&self);

    /// Complete the request with `Error::PoolClosed` unless already done.
    fn cancel(&self);
}

#[derive(Debug)]
enum Slot<T> {
    Pending,
    Ready(Result<T>),
    Taken,
}

/// One-shot result slot with a blocking wait.
#[derive(Debug)]
pub struct Completion<T> {
    slot: Mutex<Slot<T>>,
    done: Condvar,
}

impl<T> Completion<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            done: Condvar::new(),
        }
    }

    /// Store the outcome and wake the waiter.
    ///
    /// Returns false if the slot was already completed; the outcome is then
    /// dropped.
    pub fn complete(&self, outcome: Result<T>) -> bool {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Pending) {
            return false;
        }
        *slot = Slot::Ready(outcome);
        self.done.notify_all();
        true
    }

    /// Block until the outcome is available and take it.
    ///
    /// A second call returns `Error::PoolClosed`.
    pub fn wait(&self) -> Result<T> {
        let mut slot = self.slot.lock();
        while matches!(*slot, Slot::Pending) {
            self.done.wait(&mut slot);
        }
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(outcome) => outcome,
            _ => Err(Error::PoolClosed),
        }
    }

    pub fn is_done(&self) -> bool {
        !matches!(*self.slot.lock(), Slot::Pending)
    }
}

impl<T> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read one page from its resource.
///
/// Takes the resource lock for the duration of the read. Shared by the
/// reader worker and one-shot prefetches.
pub(crate) fn read_page(resource: &SharedResource, key: CacheKey, buffer: Box<[u8]>) -> Result<Page> {
    let page = resource.lock().read_page(buffer, key.page_number)?;
    Ok(page)
}

// ============================================================================
// Read
// ============================================================================

/// Read a page into a checked-out buffer.
pub struct ReadRequest {
    key: CacheKey,
    resource: SharedResource,
    buffer: Mutex<Option<Box<[u8]>>>,
    completion: Completion<Page>,
}

impl ReadRequest {
    pub fn new(key: CacheKey, resource: SharedResource, buffer: Box<[u8]>) -> Self {
        Self {
            key,
            resource,
            buffer: Mutex::new(Some(buffer)),
            completion: Completion::new(),
        }
    }

    /// Block until the page has been read.
    ///
    /// On failure the buffer is gone; the caller replenishes its pool.
    pub fn wait(&self) -> Result<Page> {
        self.completion.wait()
    }
}

impl IoRequest for ReadRequest {
    fn key(&self) -> CacheKey {
        self.key
    }

    fn process(&self) {
        let Some(buffer) = self.buffer.lock().take() else {
            self.completion.complete(Err(Error::PoolClosed));
            return;
        };
        let outcome = read_page(&self.resource, self.key, buffer);
        if let Err(e) = &outcome {
            warn!("read of {} failed: {}", self.key, e);
        }
        self.completion.complete(outcome);
    }

    fn cancel(&self) {
        self.completion.complete(Err(Error::PoolClosed));
    }
}

// ============================================================================
// Write
// ============================================================================

/// Persist a modified page.
///
/// Eviction writes recycle the page's buffer into the free buffer pool once
/// the bytes are on disk; flush writes leave the resident page untouched.
pub struct WriteRequest {
    key: CacheKey,
    resource: SharedResource,
    page: PageRef,
    /// Pool to return the buffer to after an eviction write.
    recycle_into: Option<Arc<FreeBufferPool>>,
    stats: Arc<BufferPoolStats>,
    completion: Completion<()>,
}

impl WriteRequest {
    /// Write back a page that was evicted from the cache.
    pub fn eviction(
        key: CacheKey,
        resource: SharedResource,
        page: PageRef,
        buffers: Arc<FreeBufferPool>,
        stats: Arc<BufferPoolStats>,
    ) -> Self {
        Self {
            key,
            resource,
            page,
            recycle_into: Some(buffers),
            stats,
            completion: Completion::new(),
        }
    }

    /// Write a resident page without evicting it.
    pub fn flush(
        key: CacheKey,
        resource: SharedResource,
        page: PageRef,
        stats: Arc<BufferPoolStats>,
    ) -> Self {
        Self {
            key,
            resource,
            page,
            recycle_into: None,
            stats,
            completion: Completion::new(),
        }
    }

    /// The page being written.
    #[inline]
    pub fn page(&self) -> &PageRef {
        &self.page
    }

    /// Block until the write has finished.
    pub fn wait(&self) -> Result<()> {
        self.completion.wait()
    }
}

impl IoRequest for WriteRequest {
    fn key(&self) -> CacheKey {
        self.key
    }

    fn process(&self) {
        let stamp = self.page.modification_stamp();
        let outcome = self
            .resource
            .lock()
            .write_page(self.key.page_number, &self.page)
            .map_err(Error::from);

        match &outcome {
            Ok(()) => {
                // Clean from here on, so an eviction can reuse the buffer,
                // unless the page changed while it was being written
                if !self.page.clear_modified_if_unchanged(stamp) {
                    debug!("{} changed during write-back, still modified", self.key);
                }
                BufferPoolStats::record(&self.stats.pages_written);
            }
            Err(e) => warn!("write of {} failed: {}", self.key, e),
        }

        if let Some(buffers) = &self.recycle_into {
            match self.page.detach_buffer() {
                Some(buffer) => buffers.release(buffer),
                None => buffers.replenish(),
            }
        }

        self.completion.complete(outcome);
    }

    fn cancel(&self) {
        self.completion.complete(Err(Error::PoolClosed));
    }
}
