//! One-shot background reads.

use std::thread;

use log::{trace, warn};

use crate::common::{CacheKey, Result};
use crate::storage::page::Page;
use crate::storage::SharedResource;

use super::request::read_page;

/// A single read running on its own detached thread.
///
/// Unlike the reader worker there is no waiter: the outcome is handed to a
/// callback that admits the page into the cache.
pub struct Prefetch {
    key: CacheKey,
    resource: SharedResource,
    buffer: Box<[u8]>,
}

impl Prefetch {
    pub fn new(key: CacheKey, resource: SharedResource, buffer: Box<[u8]>) -> Self {
        Self {
            key,
            resource,
            buffer,
        }
    }

    /// Start the read. `on_done` runs on the prefetch thread.
    ///
    /// # Errors
    /// `Error::Io` if the thread cannot be spawned; `on_done` is not called.
    pub fn spawn<F>(self, on_done: F) -> Result<()>
    where
        F: FnOnce(CacheKey, Result<Page>) + Send + 'static,
    {
        let key = self.key;
        thread::Builder::new()
            .name(format!("prefetch-{}-{}", key.resource_id.0, key.page_number))
            .spawn(move || {
                let outcome = read_page(&self.resource, key, self.buffer);
                match &outcome {
                    Ok(_) => trace!("prefetched {}", key),
                    Err(e) => warn!("prefetch of {} failed: {}", key, e),
                }
                on_done(key, outcome);
            })?;
        Ok(())
    }
}
