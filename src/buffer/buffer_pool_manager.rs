//! Buffer Pool Manager - the façade over caches, buffers and I/O workers.
//!
//! The [`BufferPoolManager`] provides:
//! - One page cache and one free-buffer pool per page size
//! - Pin-based protection from eviction
//! - Blocking reads through a background reader
//! - Asynchronous write-back of evicted modified pages
//! - Fire-and-forget prefetching

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, trace, warn};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::buffer::cache::{EvictedEntry, PageCache};
use crate::buffer::free_buffers::FreeBufferPool;
use crate::buffer::io::{IoRequest, IoWorker, Prefetch, ReadRequest, WriteRequest};
use crate::buffer::{BufferPoolStats, PinnedPage};
use crate::common::{BufferPoolConfig, CacheKey, Error, PageSize, ResourceId, Result};
use crate::storage::page::{Page, PageRef, PageType};
use crate::storage::SharedResource;

/// Caches pages of registered resources and schedules their I/O.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                     BufferPoolManager                        │
/// │  ┌───────────────┐     ┌─────────────────────────────────┐   │
/// │  │  resources    │     │  classes: PageSize → PageClass  │   │
/// │  │ Rid → (Rm, ●)─┼────▶│  [cache + in-flight] [buffers]  │   │
/// │  └───────────────┘     └─────────────────────────────────┘   │
/// │  ┌───────────────┐     ┌───────────────┐                     │
/// │  │ reader thread │     │ writer thread │   prefetch threads  │
/// │  └───────────────┘     └───────────────┘                     │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `resources` / `classes`: `RwLock`, written only on (un)registration
///   and close
/// - each page class: one `Mutex` over its cache and in-flight set; this is
///   the only lock for cache mutations
/// - resource managers: their own `Mutex`, never held while taking a cache
///   lock
/// - worker queues and free-buffer pools: leaf locks
///
/// A miss is claimed under the cache lock by recording the key as in
/// flight. Other callers missing on the same key wait for that read to
/// settle instead of issuing a second one.
///
/// # Usage
/// ```ignore
/// let bpm = BufferPoolManager::new(BufferPoolConfig::default())?;
/// bpm.register_resource(ResourceId::new(1), shared(resource_manager))?;
///
/// let page = bpm.get_and_pin(ResourceId::new(1), 0)?;
/// page.data_mut()?[64] = 0xAB;
/// bpm.unpin(ResourceId::new(1), 0);
/// ```
pub struct BufferPoolManager {
    inner: Arc<PoolInner>,
}

/// State shared with prefetch threads.
struct PoolInner {
    config: BufferPoolConfig,

    /// Registered resources and the page class they use.
    resources: RwLock<HashMap<ResourceId, Registration>>,

    /// One cache and buffer pool per page size in use.
    classes: RwLock<HashMap<PageSize, Arc<PageClass>>>,

    reader: IoWorker<ReadRequest>,
    writer: IoWorker<WriteRequest>,

    stats: Arc<BufferPoolStats>,
    closed: AtomicBool,
}

#[derive(Clone)]
struct Registration {
    resource: SharedResource,
    class: Arc<PageClass>,
}

/// Everything the pool keeps for one page size.
struct PageClass {
    shard: Mutex<CacheShard>,
    /// Signalled whenever an in-flight read settles.
    settled: Condvar,
    buffers: Arc<FreeBufferPool>,
}

struct CacheShard {
    cache: PageCache,
    /// Keys being read right now, by a caller or a prefetch.
    in_flight: HashSet<CacheKey>,
}

impl PageClass {
    fn new(page_size: PageSize, capacity: usize, io_buffers: usize) -> Self {
        Self {
            shard: Mutex::new(CacheShard {
                cache: PageCache::new(page_size, capacity),
                in_flight: HashSet::new(),
            }),
            settled: Condvar::new(),
            buffers: Arc::new(FreeBufferPool::new(page_size, io_buffers)),
        }
    }

    /// Expire a page that never made it into the cache and reuse its buffer.
    fn recycle(&self, page: &Page) {
        page.mark_expired();
        match page.detach_buffer() {
            Some(buffer) => self.buffers.release(buffer),
            None => self.buffers.replenish(),
        }
    }
}

impl BufferPoolManager {
    /// Create a pool and start its reader and writer threads.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` if the configuration is rejected
    /// - `Error::Io` if a worker thread cannot be spawned
    pub fn new(config: BufferPoolConfig) -> Result<Self> {
        config.validate()?;

        let reader = IoWorker::start("pagepool-reader")?;
        let writer = IoWorker::start("pagepool-writer")?;

        info!(
            "buffer pool started ({} io buffers, default capacity {})",
            config.num_io_buffers, config.default_cache_capacity
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                resources: RwLock::new(HashMap::new()),
                classes: RwLock::new(HashMap::new()),
                reader,
                writer,
                stats: Arc::new(BufferPoolStats::new()),
                closed: AtomicBool::new(false),
            }),
        })
    }

    // ========================================================================
    // Public API: Registration
    // ========================================================================

    /// Bind a resource manager to `resource_id`.
    ///
    /// The first resource of a page size creates that size's cache and
    /// free-buffer pool.
    ///
    /// # Errors
    /// - `Error::PoolClosed` after [`close`](Self::close)
    /// - `Error::AlreadyRegistered` if the id is taken
    pub fn register_resource(&self, resource_id: ResourceId, resource: SharedResource) -> Result<()> {
        let page_size = resource.lock().page_size();

        let mut resources = self.inner.resources.write();
        self.inner.check_open()?;
        if resources.contains_key(&resource_id) {
            return Err(Error::AlreadyRegistered(resource_id));
        }

        let class = {
            let mut classes = self.inner.classes.write();
            let config = &self.inner.config;
            let class = classes.entry(page_size).or_insert_with(|| {
                debug!("creating page class for {}", page_size);
                Arc::new(PageClass::new(
                    page_size,
                    config.cache_capacity(page_size),
                    config.num_io_buffers,
                ))
            });
            Arc::clone(class)
        };

        resources.insert(resource_id, Registration { resource, class });
        info!("registered {} ({} pages)", resource_id, page_size);
        Ok(())
    }

    /// Write back the resource's modified pages, tombstone its cached pages
    /// and drop the registration.
    ///
    /// # Errors
    /// - `Error::NotRegistered` / `Error::PoolClosed`
    /// - `Error::Io` if a write fails; the resource stays registered
    pub fn unregister_resource(&self, resource_id: ResourceId) -> Result<()> {
        self.flush_resource(resource_id)?;

        let registration = self
            .inner
            .resources
            .write()
            .remove(&resource_id)
            .ok_or(Error::NotRegistered(resource_id))?;
        registration.class.shard.lock().cache.expel_resource(resource_id);

        info!("unregistered {}", resource_id);
        Ok(())
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Fetch a page and pin it.
    ///
    /// On a miss the calling thread blocks until the reader has loaded the
    /// page. If admitting it evicts a modified page, that page is written
    /// back in the background.
    ///
    /// # Errors
    /// - `Error::NotRegistered` / `Error::PoolClosed`
    /// - `Error::CachePinned` if every cached page of this size is pinned
    /// - `Error::Io` if the read fails
    pub fn get_and_pin(&self, resource_id: ResourceId, page_number: u32) -> Result<PageRef> {
        let registration = self.inner.resolve(resource_id)?;
        self.inner
            .fetch(&registration, CacheKey::new(resource_id, page_number), None)
    }

    /// Unpin one page and fetch and pin another of the same resource, with a
    /// single acquisition of the cache lock on a hit.
    ///
    /// # Errors
    /// As [`get_and_pin`](Self::get_and_pin).
    pub fn unpin_and_get_and_pin(
        &self,
        resource_id: ResourceId,
        unpin_page: u32,
        get_page: u32,
    ) -> Result<PageRef> {
        let registration = self.inner.resolve(resource_id)?;
        self.inner.fetch(
            &registration,
            CacheKey::new(resource_id, get_page),
            Some(CacheKey::new(resource_id, unpin_page)),
        )
    }

    /// Fetch and pin a page, unpinning it when the guard drops.
    ///
    /// # Errors
    /// As [`get_and_pin`](Self::get_and_pin).
    pub fn fetch(&self, resource_id: ResourceId, page_number: u32) -> Result<PinnedPage<'_>> {
        let page = self.get_and_pin(resource_id, page_number)?;
        Ok(PinnedPage::new(
            self,
            CacheKey::new(resource_id, page_number),
            page,
        ))
    }

    /// Release one pin. Never fails; unknown resources and pages are ignored.
    pub fn unpin(&self, resource_id: ResourceId, page_number: u32) {
        if let Ok(registration) = self.inner.resolve(resource_id) {
            registration
                .class
                .shard
                .lock()
                .cache
                .unpin(CacheKey::new(resource_id, page_number));
        }
    }

    /// Drop every pin in every cache.
    pub fn unpin_all(&self) {
        let classes: Vec<Arc<PageClass>> = self.inner.classes.read().values().cloned().collect();
        for class in classes {
            class.shard.lock().cache.unpin_all();
        }
    }

    // ========================================================================
    // Public API: Prefetch
    // ========================================================================

    /// Start loading a page in the background and return immediately.
    ///
    /// A cached page counts as a hit. Otherwise the page is read on a
    /// one-shot thread and cached unpinned and un-hit, so the first real
    /// request becomes its first hit. Prefetching is a hint: nothing happens
    /// if the page is already being read, if a write of it is still queued,
    /// or if no I/O buffer is free.
    ///
    /// # Errors
    /// - `Error::NotRegistered` / `Error::PoolClosed`
    /// - `Error::Io` if the prefetch thread cannot be spawned
    pub fn prefetch(&self, resource_id: ResourceId, page_number: u32) -> Result<()> {
        let registration = self.inner.resolve(resource_id)?;
        let key = CacheKey::new(resource_id, page_number);
        let class = Arc::clone(&registration.class);

        let buffer = {
            let mut shard = class.shard.lock();
            if shard.cache.lookup(key, false).is_some() {
                BufferPoolStats::record(&self.inner.stats.cache_hits);
                return Ok(());
            }
            if shard.in_flight.contains(&key) {
                trace!("skipping prefetch of {}: already in progress", key);
                return Ok(());
            }
            self.inner.drop_tombstone(&class, &mut shard, key);
            if self.inner.pending_write(key).is_some() {
                trace!("skipping prefetch of {}: already in progress", key);
                return Ok(());
            }
            let Some(buffer) = class.buffers.try_checkout() else {
                trace!("skipping prefetch of {}: no free buffer", key);
                return Ok(());
            };
            shard.in_flight.insert(key);
            buffer
        };

        BufferPoolStats::record(&self.inner.stats.prefetches);
        let inner = Arc::clone(&self.inner);
        let prefetch_class = Arc::clone(&class);
        let spawned = Prefetch::new(key, registration.resource, buffer).spawn(move |key, outcome| {
            inner.finish_prefetch(&prefetch_class, key, outcome);
        });

        if let Err(e) = spawned {
            warn!("could not start prefetch of {}: {}", key, e);
            let mut shard = class.shard.lock();
            shard.in_flight.remove(&key);
            class.settled.notify_all();
            class.buffers.replenish();
            return Err(e);
        }
        Ok(())
    }

    /// Prefetch every page of `start..=end`.
    ///
    /// Pages for which no I/O buffer is free at that moment are skipped, like
    /// any other prefetch.
    ///
    /// # Errors
    /// As [`prefetch`](Self::prefetch).
    pub fn prefetch_range(&self, resource_id: ResourceId, start: u32, end: u32) -> Result<()> {
        self.inner.resolve(resource_id)?;
        for page_number in start..=end {
            self.prefetch(resource_id, page_number)?;
        }
        Ok(())
    }

    // ========================================================================
    // Public API: Create pages
    // ========================================================================

    /// Allocate a new page in the resource and cache it pinned.
    ///
    /// Resource managers that keep a single kind of page ignore `page_type`.
    ///
    /// # Errors
    /// - `Error::NotRegistered` / `Error::PoolClosed`
    /// - `Error::CachePinned` if the new page cannot be cached
    /// - `Error::Io` if the resource manager fails
    pub fn create_new_page_and_pin(
        &self,
        resource_id: ResourceId,
        page_type: Option<PageType>,
    ) -> Result<PageRef> {
        let registration = self.inner.resolve(resource_id)?;
        let class = &registration.class;

        let buffer = class.buffers.checkout()?;
        let reserved = registration.resource.lock().reserve_new_page(buffer, page_type);
        let page = match reserved {
            Ok(page) => Arc::new(page),
            Err(e) => {
                class.buffers.replenish();
                return Err(e.into());
            }
        };

        let key = CacheKey::new(resource_id, page.page_number()?);
        let mut shard = class.shard.lock();
        self.inner.drop_tombstone(class, &mut shard, key);
        self.inner.admit(class, &mut shard, Arc::clone(&page), key, true)?;
        debug!("created {}", key);
        Ok(page)
    }

    // ========================================================================
    // Public API: Resource maintenance
    // ========================================================================

    /// Tombstone every cached page of the resource.
    ///
    /// The pages stay cached, invisible to lookups, and are the first to be
    /// evicted.
    ///
    /// # Errors
    /// `Error::NotRegistered` / `Error::PoolClosed`
    pub fn expel_resource(&self, resource_id: ResourceId) -> Result<()> {
        let registration = self.inner.resolve(resource_id)?;
        registration.class.shard.lock().cache.expel_resource(resource_id);
        Ok(())
    }

    /// Cached, non-tombstoned pages of a resource. Counts as an access to
    /// each of them.
    ///
    /// # Errors
    /// `Error::NotRegistered` / `Error::PoolClosed`
    pub fn pages_for(&self, resource_id: ResourceId) -> Result<Vec<PageRef>> {
        let registration = self.inner.resolve(resource_id)?;
        let pages = registration.class.shard.lock().cache.entries_for(resource_id);
        Ok(pages)
    }

    /// Write every cached modified page of a resource and wait for the
    /// writes to finish.
    ///
    /// # Errors
    /// - `Error::NotRegistered` / `Error::PoolClosed`
    /// - the first `Error::Io` among the writes; the other writes still run
    pub fn flush_resource(&self, resource_id: ResourceId) -> Result<()> {
        let registration = self.inner.resolve(resource_id)?;

        // Queued under the cache lock so an eviction write of the same page
        // can only come after these
        let requests: Vec<Arc<WriteRequest>> = {
            let shard = registration.class.shard.lock();
            let mut requests = Vec::new();
            for (key, page) in shard.cache.modified_for(resource_id) {
                let request = Arc::new(WriteRequest::flush(
                    key,
                    Arc::clone(&registration.resource),
                    page,
                    Arc::clone(&self.inner.stats),
                ));
                self.inner.writer.submit(Arc::clone(&request))?;
                requests.push(request);
            }
            requests
        };

        debug!("flushing {} pages of {}", requests.len(), resource_id);
        let mut first_error = None;
        for request in requests {
            if let Err(e) = request.wait() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // ========================================================================
    // Public API: Shutdown
    // ========================================================================

    /// Shut the pool down. Idempotent.
    ///
    /// Queued reads and writes are cancelled, not flushed; call
    /// [`flush_resource`](Self::flush_resource) first to keep modifications.
    /// Callers blocked on a read, a free buffer or another caller's read
    /// wake up with `Error::PoolClosed`. All cached pages expire.
    pub fn close(&self) {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("closing buffer pool");

        inner.reader.stop();
        inner.writer.stop();

        inner.resources.write().clear();
        let classes: Vec<Arc<PageClass>> = inner.classes.write().drain().map(|(_, c)| c).collect();
        for class in classes {
            class.buffers.close();
            {
                let mut shard = class.shard.lock();
                shard.cache.clear();
            }
            class.settled.notify_all();
        }

        inner.reader.join();
        inner.writer.join();
        info!("buffer pool closed: {}", inner.stats.snapshot());
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Pool counters.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.inner.stats
    }

    pub fn config(&self) -> &BufferPoolConfig {
        &self.inner.config
    }

    /// Whether [`close`](Self::close) has not been called yet.
    pub fn is_open(&self) -> bool {
        !self.inner.closed.load(Ordering::Acquire)
    }

    /// Number of cached entries for a page size (0 if the size is unused).
    pub fn cache_len(&self, page_size: PageSize) -> usize {
        self.with_cache(page_size, PageCache::len).unwrap_or(0)
    }

    /// Inspect the cache of a page size under its lock.
    ///
    /// Returns `None` if no resource of that size is registered.
    pub fn with_cache<T>(&self, page_size: PageSize, f: impl FnOnce(&PageCache) -> T) -> Option<T> {
        let class = self.inner.classes.read().get(&page_size).cloned()?;
        let shard = class.shard.lock();
        Some(f(&shard.cache))
    }
}

impl Drop for BufferPoolManager {
    fn drop(&mut self) {
        self.close();
    }
}

impl PoolInner {
    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::PoolClosed)
        } else {
            Ok(())
        }
    }

    fn resolve(&self, resource_id: ResourceId) -> Result<Registration> {
        self.check_open()?;
        self.resources
            .read()
            .get(&resource_id)
            .cloned()
            .ok_or(Error::NotRegistered(resource_id))
    }

    /// Page of a write still queued or running for `key`.
    fn pending_write(&self, key: CacheKey) -> Option<PageRef> {
        self.writer
            .find(|request| request.key() == key)
            .map(|request| Arc::clone(request.page()))
    }

    // ========================================================================
    // Internal: Miss handling
    // ========================================================================

    /// Look up `key`, loading it on a miss, and return it pinned.
    fn fetch(&self, registration: &Registration, key: CacheKey, unpin: Option<CacheKey>) -> Result<PageRef> {
        let class = &registration.class;

        let pending = {
            let mut shard = class.shard.lock();
            if let Some(unpin) = unpin {
                shard.cache.unpin(unpin);
            }
            loop {
                self.check_open()?;
                if let Some(page) = shard.cache.lookup(key, true) {
                    BufferPoolStats::record(&self.stats.cache_hits);
                    return Ok(page);
                }
                if !shard.in_flight.contains(&key) {
                    break;
                }
                trace!("{} is already being read, waiting", key);
                class.settled.wait(&mut shard);
            }
            shard.in_flight.insert(key);
            // A tombstone of this key goes first; if modified, its write is
            // queued here and served back below
            self.drop_tombstone(class, &mut shard, key);
            self.pending_write(key)
        };
        BufferPoolStats::record(&self.stats.cache_misses);

        let loaded = self.load(registration, key, pending);

        let mut shard = class.shard.lock();
        shard.in_flight.remove(&key);
        class.settled.notify_all();

        let page = Arc::new(loaded?);
        if self.check_open().is_err() {
            class.recycle(&page);
            return Err(Error::PoolClosed);
        }

        match self.admit(class, &mut shard, Arc::clone(&page), key, true) {
            Ok(()) => Ok(page),
            // Created concurrently; hand out the cached copy
            Err(Error::DuplicateEntry(_)) => shard
                .cache
                .lookup(key, true)
                .ok_or(Error::DuplicateEntry(key)),
            Err(e) => Err(e),
        }
    }

    /// Produce the bytes of a missing page, from a pending write if there is
    /// one, from the resource otherwise.
    fn load(&self, registration: &Registration, key: CacheKey, pending: Option<PageRef>) -> Result<Page> {
        let buffers = &registration.class.buffers;
        let mut buffer = buffers.checkout()?;

        if let Some(pending) = pending {
            if pending.copy_into(&mut buffer) {
                BufferPoolStats::record(&self.stats.read_throughs);
                debug!("{} served from a queued write", key);
                return Ok(Page::new(key.page_number, pending.page_type(), buffer));
            }
        }

        let request = Arc::new(ReadRequest::new(
            key,
            Arc::clone(&registration.resource),
            buffer,
        ));
        self.reader.submit(Arc::clone(&request))?;
        match request.wait() {
            Ok(page) => {
                BufferPoolStats::record(&self.stats.pages_read);
                Ok(page)
            }
            Err(e) => {
                buffers.replenish();
                Err(e)
            }
        }
    }

    fn finish_prefetch(&self, class: &PageClass, key: CacheKey, outcome: Result<Page>) {
        let mut shard = class.shard.lock();
        shard.in_flight.remove(&key);
        class.settled.notify_all();

        let page = match outcome {
            Ok(page) => Arc::new(page),
            Err(_) => {
                class.buffers.replenish();
                return;
            }
        };
        BufferPoolStats::record(&self.stats.pages_read);

        if self.check_open().is_err() {
            class.recycle(&page);
            return;
        }
        if let Err(e) = self.admit(class, &mut shard, page, key, false) {
            debug!("dropping prefetched {}: {}", key, e);
        }
    }

    // ========================================================================
    // Internal: Admission and eviction
    // ========================================================================

    /// Insert a page into its cache and dispose of whatever it evicted.
    ///
    /// On failure the page is expired and its buffer recycled.
    fn admit(
        &self,
        class: &PageClass,
        shard: &mut CacheShard,
        page: PageRef,
        key: CacheKey,
        pin: bool,
    ) -> Result<()> {
        match shard.cache.insert(Arc::clone(&page), key.resource_id, pin) {
            Ok(evicted) => {
                self.dispose(class, evicted);
                Ok(())
            }
            Err(e) => {
                class.recycle(&page);
                Err(e)
            }
        }
    }

    /// Evict the tombstone of `key`, if there is one, so the key can be
    /// cached again.
    fn drop_tombstone(&self, class: &PageClass, shard: &mut CacheShard, key: CacheKey) {
        if let Some(evicted) = shard.cache.evict_tombstone(key) {
            trace!("evicted tombstone of {} ahead of reuse", key);
            self.dispose(class, evicted);
        }
    }

    /// Return the victim's buffer to the pool, or queue the victim for
    /// write-back if it is modified.
    ///
    /// Runs under the cache lock, so a miss on the victim's key always sees
    /// the queued write.
    fn dispose(&self, class: &PageClass, evicted: EvictedEntry) {
        let (Some(page), Some(key)) = (evicted.page, evicted.key) else {
            // The new page kept its buffer and nothing came back
            class.buffers.replenish();
            return;
        };
        BufferPoolStats::record(&self.stats.evictions);

        if !evicted.modified {
            match evicted.buffer {
                Some(buffer) => class.buffers.release(buffer),
                None => class.buffers.replenish(),
            }
            return;
        }

        let resource = self
            .resources
            .read()
            .get(&key.resource_id)
            .map(|registration| Arc::clone(&registration.resource));
        let Some(resource) = resource else {
            warn!("discarding modifications of {}: resource is gone", key);
            class.recycle(&page);
            return;
        };

        let request = Arc::new(WriteRequest::eviction(
            key,
            resource,
            page,
            Arc::clone(&class.buffers),
            Arc::clone(&self.stats),
        ));
        if self.writer.submit(request).is_err() {
            debug!("write of {} dropped: pool is closing", key);
        }
    }
}
