//! Background I/O.
//!
//! - [`IoWorker`] - Long-lived reader and writer threads
//! - [`ReadRequest`] / [`WriteRequest`] - Work items with result slots
//! - [`Prefetch`] - Detached one-shot reads

mod prefetch;
mod request;
mod worker;

pub use prefetch::Prefetch;
pub use request::{Completion, IoRequest, ReadRequest, WriteRequest};
pub use worker::IoWorker;
