//! Common types and utilities shared across pagepool.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration (page sizes, pool sizing)
//! - Error types
//! - Identifiers (ResourceId, CacheKey)

pub mod config;
pub mod error;
mod cache_key;
mod resource_id;

pub use cache_key::CacheKey;
pub use config::{BufferPoolConfig, PageSize};
pub use error::{Error, Result};
pub use resource_id::ResourceId;
