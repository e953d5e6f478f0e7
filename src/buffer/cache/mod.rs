//! Page cache and its replacement policy.
//!
//! - [`PageCache`] - Two-list cache, one per page size
//! - [`CacheEntry`] - Per-page policy bookkeeping
//! - [`GhostList`] - Bounded memory of evicted keys
//! - `AccessList` - Resident keys in access order, removed lazily

mod access_list;
mod entry;
mod ghost;
mod page_cache;

pub use entry::{CacheEntry, ListKind, FREQUENT_HITS};
pub use ghost::GhostList;
pub use page_cache::{EvictedEntry, PageCache};
