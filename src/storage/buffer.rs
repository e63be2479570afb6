//! The buffer pool: the single gateway for page access.
//!
//! Every page read or mutation in the engine goes through [`BufferPool`].
//! It acquires the page lock for the requesting transaction before touching
//! the cache, loads pages from their heap file on a miss, and evicts under
//! memory pressure — but only clean pages, chosen uniformly at random. A
//! dirty page can leave the cache solely through a commit-time flush or an
//! abort-time reload from disk (no-steal), which is what makes abort
//! recovery possible without a log: discarding the cached object always
//! re-exposes the last committed bytes.
//!
//! The documented consequence: a workload that dirties every cached page
//! makes the next miss fail with `BufferExhausted` rather than flushing
//! uncommitted data.

use crate::access::tuple::Tuple;
use crate::catalog::{Catalog, TableId};
use crate::concurrency::lock::{LockManager, Permission};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{HeapPage, PageId};
use crate::transaction::TransactionId;
use dashmap::DashMap;
use log::{debug, trace};
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Default cache capacity, in pages.
pub const DEFAULT_CAPACITY: usize = 50;

/// Capacity-bounded cache of decoded pages, coordinating with the lock
/// manager on every access. Capacity is fixed at construction.
pub struct BufferPool {
    capacity: usize,
    cache: DashMap<PageId, Arc<RwLock<HeapPage>>>,
    lock_manager: LockManager,
    catalog: Arc<Catalog>,
}

impl BufferPool {
    pub fn new(catalog: Arc<Catalog>, capacity: usize) -> Self {
        Self {
            capacity,
            cache: DashMap::new(),
            lock_manager: LockManager::new(),
            catalog,
        }
    }

    /// Number of distinct pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }

    /// Retrieves a page under `txn` with the requested permission.
    ///
    /// Blocks until the page lock is granted; fails with
    /// `TransactionAborted` if waiting would deadlock, with `PageNotFound` /
    /// `UnknownTable` if the id does not resolve, and with `BufferExhausted`
    /// if a miss occurs while every cached page is dirty.
    pub fn get_page(
        &self,
        txn: TransactionId,
        page_id: PageId,
        perm: Permission,
    ) -> StorageResult<Arc<RwLock<HeapPage>>> {
        self.lock_manager.acquire(txn, page_id, perm)?;

        if let Some(page) = self.cache.get(&page_id) {
            return Ok(Arc::clone(page.value()));
        }

        while self.cache.len() >= self.capacity {
            self.evict_page()?;
        }

        let file = self.table_file(page_id.table)?;
        let page = Arc::new(RwLock::new(file.read_page(page_id)?));
        let entry = self.cache.entry(page_id).or_insert(page);
        Ok(Arc::clone(entry.value()))
    }

    /// Releases a single page lock before transaction end.
    ///
    /// This breaks strict two-phase locking and is unsafe in general: call
    /// it only when the transaction provably will not rely on the page's
    /// state again, such as skipping a full page while scanning for insert
    /// space.
    pub fn release_page(&self, txn: TransactionId, page_id: PageId) {
        self.lock_manager.release(txn, page_id);
    }

    /// Whether `txn` holds a lock on the page.
    pub fn holds_lock(&self, txn: TransactionId, page_id: PageId) -> bool {
        self.lock_manager.holds(txn, page_id)
    }

    /// Adds a tuple to `table_id` on behalf of `txn`, marking every mutated
    /// page dirty and attributed to `txn`.
    pub fn insert_tuple(
        &self,
        txn: TransactionId,
        table_id: TableId,
        tuple: Tuple,
    ) -> StorageResult<()> {
        let file = self.table_file(table_id)?;
        let dirtied = file.insert_tuple(self, txn, tuple)?;
        self.mark_dirty(txn, &dirtied);
        Ok(())
    }

    /// Removes a tuple located by its record id on behalf of `txn`.
    pub fn delete_tuple(&self, txn: TransactionId, tuple: &Tuple) -> StorageResult<()> {
        let record_id = tuple.record_id().ok_or(StorageError::MissingRecordId)?;
        let file = self.table_file(record_id.page_id.table)?;
        let dirtied = file.delete_tuple(self, txn, tuple)?;
        self.mark_dirty(txn, &dirtied);
        Ok(())
    }

    /// Commits or aborts `txn`: flush its dirty pages on commit, reload them
    /// from disk on abort, then release all of its locks.
    pub fn transaction_complete(&self, txn: TransactionId, commit: bool) -> StorageResult<()> {
        debug!(
            "{} {}",
            txn,
            if commit { "committing" } else { "aborting" }
        );
        if commit {
            self.flush_pages(txn)?;
        } else {
            self.reload_pages(txn)?;
        }
        self.lock_manager.release_all(txn);
        Ok(())
    }

    /// Writes every dirty cached page to disk.
    ///
    /// Checkpoint-style maintenance only — flushing another transaction's
    /// uncommitted pages violates the no-steal discipline, so this must not
    /// run concurrently with active writers.
    pub fn flush_all_pages(&self) -> StorageResult<()> {
        let page_ids: Vec<PageId> = self.cache.iter().map(|e| *e.key()).collect();
        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    fn table_file(&self, table_id: TableId) -> StorageResult<Arc<crate::storage::disk::HeapFile>> {
        self.catalog
            .table_file(table_id)
            .ok_or(StorageError::UnknownTable(table_id))
    }

    fn mark_dirty(&self, txn: TransactionId, page_ids: &[PageId]) {
        for page_id in page_ids {
            // Mutated pages were fetched through get_page, so they are
            // cached and under the transaction's write lock.
            if let Some(page) = self.cache.get(page_id) {
                page.value().write().mark_dirty(Some(txn));
            }
        }
    }

    /// Writes one page to disk if it is cached and dirty, clearing its
    /// dirty attribution.
    fn flush_page(&self, page_id: PageId) -> StorageResult<()> {
        if let Some(entry) = self.cache.get(&page_id) {
            let mut page = entry.value().write();
            if page.dirtied_by().is_some() {
                trace!("flushing page {}", page_id);
                let file = self.table_file(page_id.table)?;
                file.write_page(&page)?;
                page.mark_dirty(None);
            }
        }
        Ok(())
    }

    /// Flushes every page dirtied by `txn` (the commit path).
    fn flush_pages(&self, txn: TransactionId) -> StorageResult<()> {
        let dirtied: Vec<PageId> = self
            .cache
            .iter()
            .filter(|e| e.value().read().dirtied_by() == Some(txn))
            .map(|e| *e.key())
            .collect();
        for page_id in dirtied {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Replaces every page dirtied by `txn` with its on-disk contents (the
    /// abort path). Because eviction never touches dirty pages, every page
    /// the transaction dirtied is still cached, and the disk copy is the
    /// pre-transaction state.
    fn reload_pages(&self, txn: TransactionId) -> StorageResult<()> {
        let dirtied: Vec<PageId> = self
            .cache
            .iter()
            .filter(|e| e.value().read().dirtied_by() == Some(txn))
            .map(|e| *e.key())
            .collect();
        for page_id in dirtied {
            if let Some(entry) = self.cache.get(&page_id) {
                trace!("discarding page {} dirtied by {}", page_id, txn);
                let file = self.table_file(page_id.table)?;
                *entry.value().write() = file.read_page(page_id)?;
            }
        }
        Ok(())
    }

    /// Evicts one page chosen uniformly at random among the clean ones.
    /// Dirty pages are never candidates; if nothing is clean the pool is
    /// exhausted.
    fn evict_page(&self) -> StorageResult<()> {
        let clean: Vec<PageId> = self
            .cache
            .iter()
            .filter(|e| e.value().read().dirtied_by().is_none())
            .map(|e| *e.key())
            .collect();

        let victim = *clean
            .choose(&mut rand::thread_rng())
            .ok_or(StorageError::BufferExhausted)?;

        trace!("evicting page {}", victim);
        self.flush_page(victim)?;
        self.cache.remove(&victim);
        Ok(())
    }
}
