//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - A typed view over one raw page buffer
//! - [`PageHeader`] - Metadata at the start of every file-backed page
//! - [`PageType`] - Discriminator for the resource kind

#[allow(clippy::module_inception)]
mod page;
mod page_header;

pub use page::{Page, PageRef};
pub use page_header::{PageHeader, PageType};
