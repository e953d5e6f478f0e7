//! Resource identifier type.

use std::fmt;

/// Identifies a registered resource (one table or index file).
///
/// Ids are chosen by the caller at registration time and must be unique
/// within one [`BufferPoolManager`](crate::BufferPoolManager).
///
/// # Example
/// ```
/// use pagepool::ResourceId;
///
/// let id = ResourceId::new(5);
/// assert_eq!(id.0, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u32);

impl ResourceId {
    /// Create a new ResourceId.
    #[inline]
    pub fn new(id: u32) -> Self {
        ResourceId(id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource({})", self.0)
    }
}
