use crate::access::tuple::{RecordId, Tuple, TupleDesc};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use crate::storage::PAGE_SIZE;
use crate::transaction::TransactionId;
use std::io::Cursor;

/// In-memory decoded form of one fixed-size disk page.
///
/// On disk a page is a slot-occupancy bitmap followed by `slot_count`
/// fixed-width rows. Each row costs its serialized width plus one header
/// bit, so `slot_count = (PAGE_SIZE * 8) / (row_bytes * 8 + 1)` and the
/// header occupies `ceil(slot_count / 8)` bytes.
///
/// The dirty flag and the dirtying transaction live outside the serialized
/// bytes; they describe the cached object, not the page content.
pub struct HeapPage {
    page_id: PageId,
    desc: TupleDesc,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    dirtied_by: Option<TransactionId>,
}

impl HeapPage {
    /// Number of tuple slots a page holds for rows of this schema.
    pub fn slot_count(desc: &TupleDesc) -> u16 {
        ((PAGE_SIZE * 8) / (desc.byte_size() * 8 + 1)) as u16
    }

    fn header_bytes(desc: &TupleDesc) -> usize {
        (Self::slot_count(desc) as usize + 7) / 8
    }

    /// A fresh page with every slot empty.
    pub fn empty(page_id: PageId, desc: TupleDesc) -> Self {
        let slots = Self::slot_count(&desc) as usize;
        Self {
            page_id,
            header: vec![0u8; Self::header_bytes(&desc)],
            tuples: vec![None; slots],
            desc,
            dirtied_by: None,
        }
    }

    /// The raw bytes of an all-empty page, for appending to a file.
    pub fn empty_page_data() -> Vec<u8> {
        vec![0u8; PAGE_SIZE]
    }

    /// Decodes a page from exactly `PAGE_SIZE` bytes.
    pub fn from_bytes(page_id: PageId, data: &[u8], desc: TupleDesc) -> StorageResult<Self> {
        if data.len() != PAGE_SIZE {
            return Err(StorageError::PageNotFound(page_id));
        }

        let slots = Self::slot_count(&desc) as usize;
        let header_len = Self::header_bytes(&desc);
        let header = data[..header_len].to_vec();
        let row_size = desc.byte_size();

        let mut tuples = Vec::with_capacity(slots);
        for slot in 0..slots {
            if header[slot / 8] & (1 << (slot % 8)) != 0 {
                let start = header_len + slot * row_size;
                let mut cursor = Cursor::new(&data[start..start + row_size]);
                let mut tuple = Tuple::read_from(&mut cursor, &desc)?;
                tuple.set_record_id(Some(RecordId::new(page_id, slot as u16)));
                tuples.push(Some(tuple));
            } else {
                tuples.push(None);
            }
        }

        Ok(Self {
            page_id,
            desc,
            header,
            tuples,
            dirtied_by: None,
        })
    }

    /// Serializes this page back to exactly `PAGE_SIZE` bytes. Empty slots
    /// and the tail padding are zero-filled.
    pub fn to_bytes(&self) -> StorageResult<Vec<u8>> {
        let mut data = Vec::with_capacity(PAGE_SIZE);
        data.extend_from_slice(&self.header);

        let row_size = self.desc.byte_size();
        for tuple in &self.tuples {
            match tuple {
                Some(t) => t.write_to(&mut data)?,
                None => data.extend(std::iter::repeat(0u8).take(row_size)),
            }
        }

        data.resize(PAGE_SIZE, 0);
        Ok(data)
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn is_slot_occupied(&self, slot: u16) -> bool {
        self.header[slot as usize / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot(&mut self, slot: u16, occupied: bool) {
        let byte = slot as usize / 8;
        let mask = 1u8 << (slot % 8);
        if occupied {
            self.header[byte] |= mask;
        } else {
            self.header[byte] &= !mask;
        }
    }

    pub fn empty_slot_count(&self) -> u16 {
        self.tuples.iter().filter(|t| t.is_none()).count() as u16
    }

    /// Places a tuple in the first free slot and stamps its record id.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> StorageResult<RecordId> {
        if !tuple.matches(&self.desc) {
            return Err(StorageError::SchemaMismatch);
        }

        let slot = self
            .tuples
            .iter()
            .position(|t| t.is_none())
            .ok_or(StorageError::PageFull(self.page_id))? as u16;

        let record_id = RecordId::new(self.page_id, slot);
        tuple.set_record_id(Some(record_id));
        self.set_slot(slot, true);
        self.tuples[slot as usize] = Some(tuple);
        Ok(record_id)
    }

    /// Clears the slot named by `record_id`.
    pub fn delete_tuple(&mut self, record_id: RecordId) -> StorageResult<()> {
        debug_assert_eq!(record_id.page_id, self.page_id);
        let slot = record_id.slot;
        if slot >= self.tuples.len() as u16 {
            return Err(StorageError::SlotOutOfRange {
                page_id: self.page_id,
                slot,
                slot_count: self.tuples.len() as u16,
            });
        }
        if self.tuples[slot as usize].is_none() {
            return Err(StorageError::EmptySlot {
                page_id: self.page_id,
                slot,
            });
        }

        self.set_slot(slot, false);
        self.tuples[slot as usize] = None;
        Ok(())
    }

    /// Occupied tuples in slot order.
    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter().flatten()
    }

    pub fn mark_dirty(&mut self, dirtier: Option<TransactionId>) {
        self.dirtied_by = dirtier;
    }

    /// The transaction that last dirtied this page, or `None` if clean.
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }
}
