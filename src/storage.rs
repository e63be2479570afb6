//! Storage layer implementation for heapstore.
//!
//! This module provides the foundation for persistent data storage using a page-based
//! architecture. Key components:
//!
//! - **PageId**: Identifies one fixed-size page within a table's backing file
//! - **HeapPage**: Bitmap-slotted page format for fixed-width tuples
//! - **HeapFile**: Handles reading/writing pages to disk, one file per table
//! - **BufferPool**: In-memory cache of pages; the single gateway for page access,
//!   coordinating with the lock manager and enforcing a no-steal eviction policy
//!
//! Durability is limited to explicit flushes at commit time; there is no
//! write-ahead log, so a crash between flushes loses uncommitted work.

pub mod buffer;
pub mod disk;
pub mod error;
pub mod page;

pub use buffer::BufferPool;
pub use disk::{HeapFile, PAGE_SIZE};
pub use error::{StorageError, StorageResult};
pub use page::{HeapPage, PageId};
