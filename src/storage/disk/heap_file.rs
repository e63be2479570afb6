//! Heap files: one table's tuples spread over an ordered sequence of
//! fixed-size pages in a single file.
//!
//! A heap file is a stateless disk accessor — it owns no pages in memory.
//! Raw page reads and writes are its own concern; tuple-level operations
//! (`insert_tuple`, `delete_tuple`, `scan`) route every page access through
//! the buffer pool so that locking and caching apply uniformly. Files only
//! grow: deleting a tuple clears a slot bit, never removes a page.

use crate::access::tuple::{Tuple, TupleDesc};
use crate::catalog::TableId;
use crate::concurrency::lock::Permission;
use crate::storage::buffer::BufferPool;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{HeapPage, PageId};
use crate::storage::PAGE_SIZE;
use crate::transaction::TransactionId;
use log::debug;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// A disk-backed, append-only sequence of fixed-size pages for one table.
pub struct HeapFile {
    file: Mutex<File>,
    table_id: TableId,
    desc: TupleDesc,
}

impl HeapFile {
    /// Opens the backing file, creating it empty if it does not exist.
    pub fn open(path: impl AsRef<Path>, table_id: TableId, desc: TupleDesc) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.as_ref())?;
        Ok(Self {
            file: Mutex::new(file),
            table_id,
            desc,
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    /// Number of pages currently in the file.
    pub fn num_pages(&self) -> StorageResult<u32> {
        let len = self.file.lock().metadata()?.len();
        Ok(len.div_ceil(PAGE_SIZE as u64) as u32)
    }

    /// Reads and decodes one page. Fails with `PageNotFound` if the id does
    /// not fall inside the file.
    pub fn read_page(&self, page_id: PageId) -> StorageResult<HeapPage> {
        let offset = page_id.page_no as u64 * PAGE_SIZE as u64;
        let mut buf = vec![0u8; PAGE_SIZE];
        {
            let mut file = self.file.lock();
            if offset >= file.metadata()?.len() {
                return Err(StorageError::PageNotFound(page_id));
            }
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf)
                .map_err(|_| StorageError::PageNotFound(page_id))?;
        }
        HeapPage::from_bytes(page_id, &buf, self.desc.clone())
    }

    /// Serializes and writes one page at its offset, extending the file if
    /// the page lies past the current end.
    pub fn write_page(&self, page: &HeapPage) -> StorageResult<()> {
        let data = page.to_bytes()?;
        let offset = page.page_id().page_no as u64 * PAGE_SIZE as u64;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&data)?;
        file.sync_all()?;
        Ok(())
    }

    /// Appends one all-empty page and returns its id. The length check and
    /// the write happen under the file mutex so concurrent appends get
    /// distinct page numbers.
    fn append_empty_page(&self) -> StorageResult<PageId> {
        let mut file = self.file.lock();
        let page_no = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;
        file.seek(SeekFrom::End(0))?;
        file.write_all(&HeapPage::empty_page_data())?;
        file.sync_all()?;
        let page_id = PageId::new(self.table_id, page_no);
        debug!("heap file {} grew to page {}", self.table_id, page_no);
        Ok(page_id)
    }

    /// Inserts a tuple into the first page with a free slot, appending a new
    /// page if every existing page is full. Returns the ids of the pages the
    /// operation mutated (always exactly one) so the buffer pool can mark
    /// them dirty uniformly with `delete_tuple`.
    ///
    /// Existing pages are scanned under a read lock; a page with no room has
    /// its lock released right away, and the chosen page's read lock is
    /// dropped and retaken as a write lock for the actual slot write. That
    /// keeps exclusive locks short, at the price of re-checking the page
    /// after the gap.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        tuple: Tuple,
    ) -> StorageResult<Vec<PageId>> {
        for page_no in 0..self.num_pages()? {
            let page_id = PageId::new(self.table_id, page_no);
            let page = pool.get_page(txn, page_id, Permission::ReadOnly)?;
            let has_room = page.read().empty_slot_count() > 0;
            drop(page);

            if !has_room {
                // Nothing on this page was used beyond the slot count, so
                // releasing early is safe despite breaking strict 2PL.
                pool.release_page(txn, page_id);
                continue;
            }

            pool.release_page(txn, page_id);
            let page = pool.get_page(txn, page_id, Permission::ReadWrite)?;
            let mut guard = page.write();
            // Another transaction may have filled the page between the
            // release and the write lock; move on if so.
            if guard.empty_slot_count() == 0 {
                continue;
            }
            guard.insert_tuple(tuple)?;
            return Ok(vec![page_id]);
        }

        // Every page is full: grow the file, then write into the new page.
        let page_id = self.append_empty_page()?;
        let page = pool.get_page(txn, page_id, Permission::ReadWrite)?;
        page.write().insert_tuple(tuple)?;
        Ok(vec![page_id])
    }

    /// Deletes a tuple located by its record id, returning the mutated page.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        tuple: &Tuple,
    ) -> StorageResult<Vec<PageId>> {
        let record_id = tuple.record_id().ok_or(StorageError::MissingRecordId)?;
        let page = pool.get_page(txn, record_id.page_id, Permission::ReadWrite)?;
        page.write().delete_tuple(record_id)?;
        Ok(vec![record_id.page_id])
    }

    /// A lazy sequential scan over every occupied slot, in page order then
    /// slot order. The page count is snapshotted here, so pages appended
    /// after the scan starts are not visited.
    pub fn scan<'a>(
        &self,
        pool: &'a BufferPool,
        txn: TransactionId,
    ) -> StorageResult<HeapFileScan<'a>> {
        Ok(HeapFileScan {
            pool,
            txn,
            table_id: self.table_id,
            num_pages: self.num_pages()?,
            next_page: 0,
            buffered: Vec::new().into_iter(),
        })
    }
}

/// Iterator over a heap file's tuples; each page is fetched through the
/// buffer pool under read permission as the scan reaches it.
pub struct HeapFileScan<'a> {
    pool: &'a BufferPool,
    txn: TransactionId,
    table_id: TableId,
    num_pages: u32,
    next_page: u32,
    buffered: std::vec::IntoIter<Tuple>,
}

impl HeapFileScan<'_> {
    /// Restarts the scan from page zero.
    pub fn rewind(&mut self) {
        self.next_page = 0;
        self.buffered = Vec::new().into_iter();
    }
}

impl Iterator for HeapFileScan<'_> {
    type Item = StorageResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tuple) = self.buffered.next() {
                return Some(Ok(tuple));
            }
            if self.next_page == self.num_pages {
                return None;
            }

            let page_id = PageId::new(self.table_id, self.next_page);
            self.next_page += 1;
            let page = match self.pool.get_page(self.txn, page_id, Permission::ReadOnly) {
                Ok(page) => page,
                Err(e) => return Some(Err(e)),
            };
            let tuples: Vec<Tuple> = page.read().tuples().cloned().collect();
            self.buffered = tuples.into_iter();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::value::{DataType, Value};
    use anyhow::Result;
    use tempfile::tempdir;

    fn int_desc() -> TupleDesc {
        TupleDesc::new(vec![DataType::Int])
    }

    fn open_file(dir: &tempfile::TempDir, table: u32) -> Result<HeapFile> {
        Ok(HeapFile::open(
            dir.path().join(format!("t{}.dat", table)),
            TableId(table),
            int_desc(),
        )?)
    }

    #[test]
    fn test_new_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let file = open_file(&dir, 1)?;
        assert_eq!(file.num_pages()?, 0);
        Ok(())
    }

    #[test]
    fn test_write_and_read_page() -> Result<()> {
        let dir = tempdir()?;
        let file = open_file(&dir, 1)?;

        let page_id = PageId::new(TableId(1), 0);
        let mut page = HeapPage::empty(page_id, int_desc());
        page.insert_tuple(Tuple::new(vec![Value::Int(99)]))?;
        file.write_page(&page)?;
        assert_eq!(file.num_pages()?, 1);

        let back = file.read_page(page_id)?;
        let values: Vec<_> = back.tuples().map(|t| t.values()[0].clone()).collect();
        assert_eq!(values, vec![Value::Int(99)]);
        Ok(())
    }

    #[test]
    fn test_read_out_of_range_page() -> Result<()> {
        let dir = tempdir()?;
        let file = open_file(&dir, 1)?;
        let result = file.read_page(PageId::new(TableId(1), 5));
        assert!(matches!(result, Err(StorageError::PageNotFound(_))));
        Ok(())
    }

    #[test]
    fn test_write_past_end_extends_file() -> Result<()> {
        let dir = tempdir()?;
        let file = open_file(&dir, 1)?;

        let page = HeapPage::empty(PageId::new(TableId(1), 2), int_desc());
        file.write_page(&page)?;
        assert_eq!(file.num_pages()?, 3);
        Ok(())
    }

    #[test]
    fn test_pages_do_not_overlap() -> Result<()> {
        let dir = tempdir()?;
        let file = open_file(&dir, 1)?;

        for page_no in 0..3 {
            let page_id = PageId::new(TableId(1), page_no);
            let mut page = HeapPage::empty(page_id, int_desc());
            page.insert_tuple(Tuple::new(vec![Value::Int(page_no as i32)]))?;
            file.write_page(&page)?;
        }

        for page_no in 0..3 {
            let page = file.read_page(PageId::new(TableId(1), page_no))?;
            let values: Vec<_> = page.tuples().map(|t| t.values()[0].clone()).collect();
            assert_eq!(values, vec![Value::Int(page_no as i32)]);
        }
        Ok(())
    }

    #[test]
    fn test_persistence_across_reopen() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("t1.dat");
        let page_id = PageId::new(TableId(1), 0);

        {
            let file = HeapFile::open(&path, TableId(1), int_desc())?;
            let mut page = HeapPage::empty(page_id, int_desc());
            page.insert_tuple(Tuple::new(vec![Value::Int(7)]))?;
            file.write_page(&page)?;
        }

        let file = HeapFile::open(&path, TableId(1), int_desc())?;
        assert_eq!(file.num_pages()?, 1);
        let page = file.read_page(page_id)?;
        assert_eq!(page.tuples().count(), 1);
        Ok(())
    }
}
