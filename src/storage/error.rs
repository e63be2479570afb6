//! Storage layer error types.

use crate::catalog::TableId;
use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The transaction was chosen as a deadlock victim (or aborted by its
    /// caller) and must not proceed. The caller is expected to run
    /// `BufferPool::transaction_complete(txn, false)` on seeing this.
    #[error("transaction {0} aborted")]
    TransactionAborted(TransactionId),

    #[error("page {0} does not exist in its backing file")]
    PageNotFound(PageId),

    #[error("no table registered for id {0}")]
    UnknownTable(TableId),

    #[error("slot {slot} out of range on page {page_id} (slot count {slot_count})")]
    SlotOutOfRange {
        page_id: PageId,
        slot: u16,
        slot_count: u16,
    },

    #[error("slot {slot} on page {page_id} is empty")]
    EmptySlot { page_id: PageId, slot: u16 },

    #[error("page {0} has no free slot")]
    PageFull(PageId),

    #[error("tuple does not match the table schema")]
    SchemaMismatch,

    #[error("tuple has no storage location")]
    MissingRecordId,

    #[error("buffer pool exhausted: every cached page is dirty")]
    BufferExhausted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
