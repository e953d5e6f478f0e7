//! Resource manager contract.
//!
//! A resource manager performs the physical I/O for one registered resource
//! (a table or index file). The buffer pool never touches storage directly;
//! it hands buffers to the resource manager and gets typed pages back.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::PageSize;

use super::page::{Page, PageType};

/// Physical page I/O for one resource.
///
/// All methods are called with the manager's lock held, so implementations
/// need no internal synchronization. A page cache lock is never acquired
/// while this lock is held.
pub trait ResourceManager: Send {
    /// Size of every page in this resource.
    fn page_size(&self) -> PageSize;

    /// Read page `page_number` into `buffer` and wrap it as a [`Page`].
    ///
    /// `buffer` has exactly `page_size().bytes()` bytes.
    fn read_page(&mut self, buffer: Box<[u8]>, page_number: u32) -> io::Result<Page>;

    /// Persist the bytes of `page` as page `page_number`.
    ///
    /// `page` is usually already expired when this is called, so
    /// implementations must use [`Page::raw_buffer`] rather than
    /// [`Page::data`].
    fn write_page(&mut self, page_number: u32, page: &Page) -> io::Result<()>;

    /// Allocate and format a new page in `buffer`, assigning it the next
    /// free page number.
    ///
    /// Managers that keep a single kind of page ignore `page_type`.
    fn reserve_new_page(
        &mut self,
        buffer: Box<[u8]>,
        page_type: Option<PageType>,
    ) -> io::Result<Page>;
}

/// A resource manager shared between the pool and its worker threads.
///
/// The mutex is the lock for physical I/O against the resource.
pub type SharedResource = Arc<Mutex<dyn ResourceManager>>;

/// Wrap a resource manager for registration with the pool.
pub fn shared<R: ResourceManager + 'static>(manager: R) -> SharedResource {
    Arc::new(Mutex::new(manager))
}
