//! Page header and type definitions.
//!
//! Every page written by a [`FileResourceManager`](crate::storage::FileResourceManager)
//! starts with a [`PageHeader`] containing:
//! - the page number, so a misplaced page is detected on read
//! - the [`PageType`] discriminator
//! - a CRC32 checksum for integrity

/// Kind of resource a page belongs to.
///
/// Resource managers tag every page they produce, so callers can tell a
/// table page from an index page without downcasting.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    /// Uninitialized or corrupted page.
    #[default]
    Invalid = 0,
    /// Raw page with no interpretation.
    Raw = 1,
    /// Table (heap) data page.
    Table = 2,
    /// B-tree inner node.
    IndexInner = 3,
    /// B-tree leaf node.
    IndexLeaf = 4,
}

impl PageType {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageType::Raw,
            2 => PageType::Table,
            3 => PageType::IndexInner,
            4 => PageType::IndexLeaf,
            _ => PageType::Invalid,
        }
    }

    /// Whether this page belongs to an index resource.
    #[inline]
    pub fn is_index(self) -> bool {
        matches!(self, PageType::IndexInner | PageType::IndexLeaf)
    }
}

/// Metadata stored at the beginning of every page.
///
/// # Layout (9 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     page_number (little-endian)
/// 4       1     page_type (PageType as u8)
/// 5       4     checksum (CRC32, little-endian)
/// ```
///
/// # Checksum
/// The checksum is computed over the entire page with the checksum field
/// itself set to zero. This allows verification without special handling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// Page number within its resource.
    pub page_number: u32,
    /// Type of this page.
    pub page_type: PageType,
    /// CRC32 checksum of the page contents.
    pub checksum: u32,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 9;

    /// Offset of each field within the header.
    pub const OFFSET_PAGE_NUMBER: usize = 0;
    pub const OFFSET_PAGE_TYPE: usize = 4;
    pub const OFFSET_CHECKSUM: usize = 5;

    /// Create a new header. The checksum starts at zero.
    pub fn new(page_number: u32, page_type: PageType) -> Self {
        Self {
            page_number,
            page_type,
            checksum: 0,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        let page_number = u32::from_le_bytes([
            data[Self::OFFSET_PAGE_NUMBER],
            data[Self::OFFSET_PAGE_NUMBER + 1],
            data[Self::OFFSET_PAGE_NUMBER + 2],
            data[Self::OFFSET_PAGE_NUMBER + 3],
        ]);

        let page_type = PageType::from_u8(data[Self::OFFSET_PAGE_TYPE]);

        let checksum = u32::from_le_bytes([
            data[Self::OFFSET_CHECKSUM],
            data[Self::OFFSET_CHECKSUM + 1],
            data[Self::OFFSET_CHECKSUM + 2],
            data[Self::OFFSET_CHECKSUM + 3],
        ]);

        Self {
            page_number,
            page_type,
            checksum,
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_PAGE_NUMBER..Self::OFFSET_PAGE_NUMBER + 4]
            .copy_from_slice(&self.page_number.to_le_bytes());
        data[Self::OFFSET_PAGE_TYPE] = self.page_type as u8;
        data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&self.checksum.to_le_bytes());
    }

    /// Compute the CRC32 checksum of a page.
    ///
    /// The checksum field is hashed as zeros, so the checksum doesn't
    /// include itself.
    pub fn compute_checksum(page_data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&page_data[..Self::OFFSET_CHECKSUM]);
        hasher.update(&[0u8; 4]);
        hasher.update(&page_data[Self::OFFSET_CHECKSUM + 4..]);
        hasher.finalize()
    }

    /// Compute the checksum of `page_data` and store it in place.
    pub fn stamp_checksum(page_data: &mut [u8]) {
        let checksum = Self::compute_checksum(page_data);
        page_data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verify that the stored checksum matches the computed checksum.
    pub fn verify_checksum(&self, page_data: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(page_data)
    }
}

// ============================================================================
// TESTS
// ============================================================================
