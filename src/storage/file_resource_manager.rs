//! File Resource Manager - one file per resource, fixed-size pages.
//!
//! The [`FileResourceManager`] handles all direct file operations for one
//! resource:
//! - Reading and writing pages
//! - Allocating new pages
//! - Stamping and verifying page checksums

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, trace};

use crate::common::PageSize;
use crate::storage::page::{Page, PageHeader, PageType};
use crate::storage::ResourceManager;

/// Manages disk I/O for a single resource file.
///
/// # File Layout
/// Pages are laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0   P        2P        ...      N×P
/// ```
///
/// Page N is located at file offset `N × page_size`. The first
/// [`PageHeader::SIZE`] bytes of every page are reserved for the header;
/// the header is rewritten and the checksum restamped on every write.
///
/// # Thread Safety
/// `FileResourceManager` is **single-threaded**. The buffer pool serializes
/// access through the resource's mutex.
pub struct FileResourceManager {
    file: File,
    page_size: PageSize,
    /// Type given to pages created without an explicit hint.
    default_page_type: PageType,
    /// Number of pages in the file.
    page_count: u32,
    /// Reused for header stamping on write.
    scratch: Vec<u8>,
}

impl FileResourceManager {
    /// Create a new resource file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(
        path: P,
        page_size: PageSize,
        default_page_type: PageType,
    ) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self::with_file(file, page_size, default_page_type, 0))
    }

    /// Open an existing resource file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(
        path: P,
        page_size: PageSize,
        default_page_type: PageType,
    ) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        // Calculate page count from file size
        let file_size = file.metadata()?.len();
        let page_count = (file_size / page_size.bytes() as u64) as u32;

        debug!(
            "opened {} with {} pages of {}",
            path.as_ref().display(),
            page_count,
            page_size
        );
        Ok(Self::with_file(file, page_size, default_page_type, page_count))
    }

    /// Open an existing resource file, or create it if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(
        path: P,
        page_size: PageSize,
        default_page_type: PageType,
    ) -> io::Result<Self> {
        if path.as_ref().exists() {
            Self::open(path, page_size, default_page_type)
        } else {
            Self::create(path, page_size, default_page_type)
        }
    }

    fn with_file(file: File, page_size: PageSize, default_page_type: PageType, page_count: u32) -> Self {
        Self {
            file,
            page_size,
            default_page_type,
            page_count,
            scratch: vec![0u8; page_size.bytes()],
        }
    }

    /// Get the number of pages in the resource.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Get the total size of the resource file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (self.page_size.bytes() as u64)
    }

    fn offset(&self, page_number: u32) -> u64 {
        (page_number as u64) * (self.page_size.bytes() as u64)
    }

    fn check_page(&self, page_number: u32) -> io::Result<()> {
        if page_number >= self.page_count {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("page {} not found", page_number),
            ));
        }
        Ok(())
    }

    fn check_buffer(&self, len: usize) -> io::Result<()> {
        if len != self.page_size.bytes() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("buffer of {} bytes for {} pages", len, self.page_size),
            ));
        }
        Ok(())
    }
}

impl ResourceManager for FileResourceManager {
    fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Read a page and verify its header.
    ///
    /// # Errors
    /// - `NotFound` if the page was never allocated
    /// - `InvalidData` if the stored page number or checksum doesn't match
    fn read_page(&mut self, mut buffer: Box<[u8]>, page_number: u32) -> io::Result<Page> {
        self.check_page(page_number)?;
        self.check_buffer(buffer.len())?;

        self.file.seek(SeekFrom::Start(self.offset(page_number)))?;
        self.file.read_exact(&mut buffer)?;

        let header = PageHeader::from_bytes(&buffer);
        if header.page_number != page_number {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "page {} carries page number {}",
                    page_number, header.page_number
                ),
            ));
        }
        if !header.verify_checksum(&buffer) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("checksum mismatch on page {}", page_number),
            ));
        }

        trace!("read page {} ({:?})", page_number, header.page_type);
        Ok(Page::new(page_number, header.page_type, buffer))
    }

    /// Write a page, restamping header and checksum.
    ///
    /// # Durability
    /// Calls `sync_data()` after every write.
    fn write_page(&mut self, page_number: u32, page: &Page) -> io::Result<()> {
        self.check_page(page_number)?;

        {
            let bytes = page.raw_buffer().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("page {} has no buffer attached", page_number),
                )
            })?;
            self.check_buffer(bytes.len())?;
            self.scratch.copy_from_slice(&bytes);
        }

        PageHeader::new(page_number, page.page_type()).write_to(&mut self.scratch);
        PageHeader::stamp_checksum(&mut self.scratch);

        let offset = self.offset(page_number);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&self.scratch)?;
        self.file.sync_data()?;

        trace!("wrote page {}", page_number);
        Ok(())
    }

    /// Allocate a new page at the end of the file.
    ///
    /// The page is zeroed, formatted with a header and persisted before it
    /// is returned, so it starts out unmodified.
    fn reserve_new_page(
        &mut self,
        mut buffer: Box<[u8]>,
        page_type: Option<PageType>,
    ) -> io::Result<Page> {
        self.check_buffer(buffer.len())?;

        let page_number = self.page_count;
        let page_type = page_type.unwrap_or(self.default_page_type);

        buffer.fill(0);
        PageHeader::new(page_number, page_type).write_to(&mut buffer);
        PageHeader::stamp_checksum(&mut buffer);

        let offset = self.offset(page_number);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&buffer)?;
        self.file.sync_data()?;

        self.page_count += 1;
        debug!("reserved page {} ({:?})", page_number, page_type);
        Ok(Page::new(page_number, page_type, buffer))
    }
}
