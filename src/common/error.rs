//! Error types for pagepool.

use thiserror::Error;

use super::{CacheKey, ResourceId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the buffer pool.
///
/// Cache-policy errors (`DuplicateEntry`, `CachePinned`) are raised by the
/// operation that triggered them. I/O failures are carried back from the
/// worker threads on the request that failed.
#[derive(Debug, Error)]
pub enum Error {
    /// The pool has been closed; no further requests are accepted.
    #[error("buffer pool is closed")]
    PoolClosed,

    /// The resource id was never registered with the pool.
    #[error("{0} is not registered")]
    NotRegistered(ResourceId),

    /// `register_resource` was called twice for the same id.
    #[error("{0} is already registered")]
    AlreadyRegistered(ResourceId),

    /// A page with the same identity is already resident in the cache.
    ///
    /// This indicates a bug upstream: the same page was fetched twice.
    #[error("cache already contains an entry for {0}")]
    DuplicateEntry(CacheKey),

    /// Eviction was required but every resident entry is pinned.
    ///
    /// Unpin outstanding pages and retry.
    #[error("no page can be evicted: all cache entries are pinned")]
    CachePinned,

    /// The page was evicted; its buffer no longer holds this page.
    #[error("page has expired")]
    PageExpired,

    /// I/O error from a resource manager.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rejected configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether the caller can reasonably retry the same operation.
    ///
    /// Only `CachePinned` qualifies, and only after releasing pins.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::CachePinned)
    }
}
