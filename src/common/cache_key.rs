//! Cache key type.

use std::fmt;

use super::ResourceId;

/// Identity of a page inside the buffer pool.
///
/// A page is identified by the resource it belongs to and its page number
/// within that resource. Ordering is by resource first, then page number.
///
/// # Example
/// ```
/// use pagepool::{CacheKey, ResourceId};
///
/// let a = CacheKey::new(ResourceId::new(1), 9);
/// let b = CacheKey::new(ResourceId::new(2), 0);
/// assert!(a < b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub resource_id: ResourceId,
    pub page_number: u32,
}

impl CacheKey {
    /// Create a new CacheKey.
    #[inline]
    pub fn new(resource_id: ResourceId, page_number: u32) -> Self {
        CacheKey {
            resource_id,
            page_number,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}:{})", self.resource_id.0, self.page_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_ordering() {
        let r1 = ResourceId::new(1);
        let r2 = ResourceId::new(2);

        assert!(CacheKey::new(r1, 1) < CacheKey::new(r1, 2));
        assert!(CacheKey::new(r1, 100) < CacheKey::new(r2, 0));
        assert_eq!(CacheKey::new(r2, 7), CacheKey::new(r2, 7));
    }

    #[test]
    fn test_cache_key_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(CacheKey::new(ResourceId::new(1), 1));
        set.insert(CacheKey::new(ResourceId::new(1), 1));
        set.insert(CacheKey::new(ResourceId::new(1), 2));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_cache_key_display() {
        let key = CacheKey::new(ResourceId::new(3), 42);
        assert_eq!(format!("{}", key), "Key(3:42)");
    }
}
