//! Table catalog.
//!
//! Maps table ids to the heap files backing them. The buffer pool resolves
//! every page load and flush through this lookup; it never opens files
//! itself.

use crate::storage::disk::HeapFile;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Identifies a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of heap files by table id.
pub struct Catalog {
    tables: RwLock<HashMap<TableId, Arc<HeapFile>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a heap file under its own table id, replacing any previous
    /// registration for that id.
    pub fn register(&self, file: Arc<HeapFile>) {
        self.tables.write().insert(file.table_id(), file);
    }

    /// Looks up the heap file backing a table.
    pub fn table_file(&self, table_id: TableId) -> Option<Arc<HeapFile>> {
        self.tables.read().get(&table_id).cloned()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
