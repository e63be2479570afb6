//! Page identity.
//!
//! A `PageId` names one fixed-size page inside one table's backing file.
//! The buffer pool and the lock manager both key their maps on it, so two
//! ids with equal fields must behave as the same page regardless of which
//! object instance carries them; everything here is a plain value type.

pub mod heap_page;

pub use heap_page::HeapPage;

use crate::catalog::TableId;

/// Identifies a page within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub table: TableId,
    pub page_no: u32,
}

impl PageId {
    pub fn new(table: TableId, page_no: u32) -> Self {
        Self { table, page_no }
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.table, self.page_no)
    }
}
