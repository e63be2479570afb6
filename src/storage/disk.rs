//! On-disk page storage.

pub mod heap_file;

pub use heap_file::{HeapFile, HeapFileScan};

/// Bytes per page, including the slot header.
pub const PAGE_SIZE: usize = 4096;
