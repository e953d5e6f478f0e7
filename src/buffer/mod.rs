//! Buffer pool management.
//!
//! The buffer pool sits between the query engine and the resource managers.
//! It keeps recently used pages in memory, one cache per page size, and
//! moves pages to and from storage on background threads.
//!
//! # Components
//! - [`BufferPoolManager`] - The façade used by clients
//! - [`cache`] - Page cache and replacement policy
//! - [`FreeBufferPool`] - Reusable I/O buffers per page size
//! - [`io`] - Reader and writer workers, prefetch threads
//! - [`PinnedPage`] - RAII guard releasing a pin on drop
//! - [`BufferPoolStats`] - Counters

mod buffer_pool_manager;
pub mod cache;
mod free_buffers;
pub mod io;
mod page_guard;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use free_buffers::FreeBufferPool;
pub use page_guard::PinnedPage;
pub use stats::{BufferPoolStats, StatsSnapshot};
