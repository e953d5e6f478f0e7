//! pagepool - the page buffer pool of a disk-oriented database engine.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │        Clients: table heap, B-tree, query operators             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │              BufferPoolManager (buffer/)                │    │
//! │  │  register · get_and_pin · unpin · prefetch · create     │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │          ↓ per page size                 ↓                      │
//! │  ┌───────────────────────────┐  ┌──────────────────────────┐    │
//! │  │ PageCache (two lists +    │  │ IoWorker: reader, writer │    │
//! │  │ ghosts) + FreeBufferPool  │  │ Prefetch: one-shot reads │    │
//! │  └───────────────────────────┘  └──────────────────────────┘    │
//! │                                          ↓                      │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │   Storage (storage/): ResourceManager, Page, PageHeader │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (ResourceId, CacheKey, Error, config)
//! - [`buffer`] - Buffer pool, page cache and background I/O
//! - [`storage`] - Resource managers and page formats
//!
//! # Quick Start
//! ```no_run
//! use pagepool::{
//!     shared, BufferPoolConfig, BufferPoolManager, FileResourceManager, PageSize, PageType,
//!     ResourceId,
//! };
//!
//! let bpm = BufferPoolManager::new(BufferPoolConfig::default()).unwrap();
//! let file = FileResourceManager::open_or_create("orders.tbl", PageSize::Size4K, PageType::Table)
//!     .unwrap();
//! bpm.register_resource(ResourceId::new(1), shared(file)).unwrap();
//!
//! let page = bpm.create_new_page_and_pin(ResourceId::new(1), None).unwrap();
//! page.data_mut().unwrap()[64] = 0xAB;
//! bpm.unpin(ResourceId::new(1), page.page_number().unwrap());
//! ```

pub mod buffer;
pub mod common;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::{BufferPoolConfig, CacheKey, Error, PageSize, ResourceId, Result};

pub use buffer::cache::{EvictedEntry, ListKind, PageCache};
pub use buffer::{BufferPoolManager, BufferPoolStats, PinnedPage, StatsSnapshot};
pub use storage::page::{Page, PageHeader, PageRef, PageType};
pub use storage::{shared, FileResourceManager, ResourceManager, SharedResource};
