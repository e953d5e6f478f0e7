//! Storage layer - resource I/O and page formats.
//!
//! This module handles persistent storage:
//! - [`ResourceManager`] - The physical I/O contract the pool relies on
//! - [`FileResourceManager`] - File-backed resource manager
//! - [`page`] - Page types and layouts

mod file_resource_manager;
pub mod page;
mod resource_manager;

pub use file_resource_manager::FileResourceManager;
pub use resource_manager::{shared, ResourceManager, SharedResource};
