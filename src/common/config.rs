//! Configuration for pagepool.
//!
//! The pool is configured once at construction and never changes afterwards.
//! Every page size gets its own cache and its own free-buffer pool, so the
//! cache capacity can be tuned per size.

use std::collections::HashMap;
use std::fmt;

use super::{Error, Result};

/// Default number of shared I/O buffers per page size.
///
/// Also bounds the background reads in flight, since each prefetch holds
/// one of these buffers until it lands in the cache.
pub const DEFAULT_IO_BUFFERS: usize = 32;

/// Default cache capacity (in entries) for page sizes without an override.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Supported page sizes.
///
/// All pages of one resource have the same size. Resources with equal page
/// sizes share a cache.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageSize {
    /// 4 KiB pages.
    #[default]
    Size4K,
    /// 8 KiB pages.
    Size8K,
    /// 16 KiB pages.
    Size16K,
    /// 32 KiB pages.
    Size32K,
    /// 64 KiB pages.
    Size64K,
}

impl PageSize {
    /// All supported sizes, smallest first.
    pub const ALL: [PageSize; 5] = [
        PageSize::Size4K,
        PageSize::Size8K,
        PageSize::Size16K,
        PageSize::Size32K,
        PageSize::Size64K,
    ];

    /// Number of bytes in a page of this size.
    #[inline]
    pub const fn bytes(self) -> usize {
        match self {
            PageSize::Size4K => 4096,
            PageSize::Size8K => 8192,
            PageSize::Size16K => 16384,
            PageSize::Size32K => 32768,
            PageSize::Size64K => 65536,
        }
    }

    /// Look up the page size with exactly `bytes` bytes.
    pub fn from_bytes(bytes: usize) -> Option<Self> {
        Self::ALL.iter().copied().find(|size| size.bytes() == bytes)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}KiB", self.bytes() / 1024)
    }
}

/// Read-only buffer pool configuration.
///
/// # Example
/// ```
/// use pagepool::{BufferPoolConfig, PageSize};
///
/// let config = BufferPoolConfig::default()
///     .with_io_buffers(8)
///     .with_cache_capacity(PageSize::Size8K, 64);
///
/// assert_eq!(config.cache_capacity(PageSize::Size8K), 64);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Shared I/O buffers per page size (bound of each free-buffer pool).
    pub num_io_buffers: usize,

    /// Cache capacity for page sizes without an explicit override.
    pub default_cache_capacity: usize,

    /// Per page size cache capacity overrides.
    pub cache_capacities: HashMap<PageSize, usize>,
}

impl BufferPoolConfig {
    /// Set the number of shared I/O buffers per page size.
    pub fn with_io_buffers(mut self, count: usize) -> Self {
        self.num_io_buffers = count;
        self
    }

    /// Set the cache capacity used for page sizes without an override.
    pub fn with_default_cache_capacity(mut self, capacity: usize) -> Self {
        self.default_cache_capacity = capacity;
        self
    }

    /// Override the cache capacity for one page size.
    pub fn with_cache_capacity(mut self, page_size: PageSize, capacity: usize) -> Self {
        self.cache_capacities.insert(page_size, capacity);
        self
    }

    /// Cache capacity (entries) for the given page size.
    pub fn cache_capacity(&self, page_size: PageSize) -> usize {
        self.cache_capacities
            .get(&page_size)
            .copied()
            .unwrap_or(self.default_cache_capacity)
    }

    /// Reject configurations the pool cannot run with.
    ///
    /// # Errors
    /// `Error::InvalidConfig` if any buffer count or capacity is zero.
    pub fn validate(&self) -> Result<()> {
        if self.num_io_buffers == 0 {
            return Err(Error::InvalidConfig("num_io_buffers must be > 0".into()));
        }
        if self.default_cache_capacity == 0 {
            return Err(Error::InvalidConfig(
                "default_cache_capacity must be > 0".into(),
            ));
        }
        if let Some((size, _)) = self.cache_capacities.iter().find(|(_, &cap)| cap == 0) {
            return Err(Error::InvalidConfig(format!(
                "cache capacity for {} must be > 0",
                size
            )));
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            num_io_buffers: DEFAULT_IO_BUFFERS,
            default_cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_capacities: HashMap::new(),
        }
    }
}
