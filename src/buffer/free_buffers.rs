//! Free-buffer pool - reusable I/O buffers for one page size.

use parking_lot::{Condvar, Mutex};

use crate::common::{Error, PageSize, Result};

/// A bounded pool of page-sized byte buffers.
///
/// Every read and every new page starts by checking out a buffer here, so
/// the bound also limits how many pages can be in flight at once for this
/// page size. Buffers come back when an evicted page is clean, when a write
/// of an evicted page completes, or when a checked-out buffer goes unused.
///
/// # Thread Safety
/// The pool lock is never held while waiting on any other lock.
#[derive(Debug)]
pub struct FreeBufferPool {
    page_size: PageSize,
    bound: usize,
    state: Mutex<PoolState>,
    available: Condvar,
}

#[derive(Debug)]
struct PoolState {
    buffers: Vec<Box<[u8]>>,
    closed: bool,
}

impl FreeBufferPool {
    /// Create a pool pre-filled with `bound` zeroed buffers.
    pub fn new(page_size: PageSize, bound: usize) -> Self {
        let buffers = (0..bound).map(|_| Self::allocate(page_size)).collect();

        Self {
            page_size,
            bound,
            state: Mutex::new(PoolState {
                buffers,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Take a buffer, blocking until one is available.
    ///
    /// # Errors
    /// `Error::PoolClosed` if the pool is or becomes closed while waiting.
    pub fn checkout(&self) -> Result<Box<[u8]>> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(Error::PoolClosed);
            }
            if let Some(buffer) = state.buffers.pop() {
                return Ok(buffer);
            }
            self.available.wait(&mut state);
        }
    }

    /// Take a buffer if one is available right now.
    pub fn try_checkout(&self) -> Option<Box<[u8]>> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.buffers.pop()
    }

    /// Give a buffer back. Dropped if the pool is already full or the buffer
    /// has the wrong size.
    pub fn release(&self, buffer: Box<[u8]>) {
        if buffer.len() != self.page_size.bytes() {
            return;
        }
        let mut state = self.state.lock();
        if state.buffers.len() < self.bound {
            state.buffers.push(buffer);
            self.available.notify_one();
        }
    }

    /// Allocate a fresh buffer if the pool is below its bound.
    ///
    /// Used when a checked-out buffer ended up owned by a cached page and
    /// nothing was evicted to take its place.
    pub fn replenish(&self) {
        let mut state = self.state.lock();
        if !state.closed && state.buffers.len() < self.bound {
            state.buffers.push(Self::allocate(self.page_size));
            self.available.notify_one();
        }
    }

    /// Fail all current and future checkouts.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.buffers.clear();
        self.available.notify_all();
    }

    #[inline]
    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    #[inline]
    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Buffers currently available.
    pub fn available(&self) -> usize {
        self.state.lock().buffers.len()
    }

    fn allocate(page_size: PageSize) -> Box<[u8]> {
        vec![0u8; page_size.bytes()].into_boxed_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_pool_starts_full() {
        let pool = FreeBufferPool::new(PageSize::Size4K, 3);
        assert_eq!(pool.available(), 3);

        let buffer = pool.checkout().unwrap();
        assert_eq!(buffer.len(), 4096);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_try_checkout_never_blocks() {
        let pool = FreeBufferPool::new(PageSize::Size4K, 1);
        assert!(pool.try_checkout().is_some());
        assert!(pool.try_checkout().is_none());
    }

    #[test]
    fn test_release_respects_bound() {
        let pool = FreeBufferPool::new(PageSize::Size4K, 1);
        pool.release(vec![0u8; 4096].into_boxed_slice());
        assert_eq!(pool.available(), 1);

        let buffer = pool.checkout().unwrap();
        pool.release(buffer);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_release_rejects_wrong_size() {
        let pool = FreeBufferPool::new(PageSize::Size8K, 1);
        let _ = pool.checkout().unwrap();
        pool.release(vec![0u8; 4096].into_boxed_slice());
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_replenish() {
        let pool = FreeBufferPool::new(PageSize::Size4K, 2);
        let _a = pool.checkout().unwrap();
        let _b = pool.checkout().unwrap();

        pool.replenish();
        assert_eq!(pool.available(), 1);
        pool.replenish();
        pool.replenish();
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_checkout_blocks_until_release() {
        let pool = Arc::new(FreeBufferPool::new(PageSize::Size4K, 1));
        let held = pool.checkout().unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.checkout().map(|b| b.len()))
        };

        thread::sleep(Duration::from_millis(50));
        pool.release(held);
        assert_eq!(waiter.join().unwrap().unwrap(), 4096);
    }

    #[test]
    fn test_close_wakes_waiters() {
        let pool = Arc::new(FreeBufferPool::new(PageSize::Size4K, 1));
        let _held = pool.checkout().unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.checkout())
        };

        thread::sleep(Duration::from_millis(50));
        pool.close();
        assert!(matches!(waiter.join().unwrap(), Err(Error::PoolClosed)));
        assert!(matches!(pool.checkout(), Err(Error::PoolClosed)));
    }
}
