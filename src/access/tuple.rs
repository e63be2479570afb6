use crate::access::value::{DataType, Value};
use crate::storage::page::PageId;
use std::cmp::Ordering;
use std::io::{self, Read, Write};

/// Identifies the storage location of one tuple: a page plus a slot within
/// it. Stale once that tuple is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: u16) -> Self {
        Self { page_id, slot }
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Page order first, then slot order.
        (self.page_id.table, self.page_id.page_no, self.slot).cmp(&(
            other.page_id.table,
            other.page_id.page_no,
            other.slot,
        ))
    }
}

/// Describes the schema of a row: the ordered field types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleDesc {
    types: Vec<DataType>,
}

impl TupleDesc {
    pub fn new(types: Vec<DataType>) -> Self {
        assert!(!types.is_empty(), "a schema needs at least one field");
        Self { types }
    }

    pub fn num_fields(&self) -> usize {
        self.types.len()
    }

    pub fn types(&self) -> &[DataType] {
        &self.types
    }

    /// Serialized width of one row, in bytes.
    pub fn byte_size(&self) -> usize {
        self.types.iter().map(DataType::byte_size).sum()
    }
}

/// A row in a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    values: Vec<Value>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            record_id: None,
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Where this tuple is stored, if it has been placed on a page.
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Whether this tuple's field types match `desc` exactly.
    pub fn matches(&self, desc: &TupleDesc) -> bool {
        self.values.len() == desc.num_fields()
            && self
                .values
                .iter()
                .zip(desc.types())
                .all(|(v, t)| v.data_type() == *t)
    }

    /// Writes the row at the schema's fixed width.
    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        for value in &self.values {
            value.write_to(w)?;
        }
        Ok(())
    }

    /// Reads one row described by `desc` from `r`.
    pub fn read_from(r: &mut impl Read, desc: &TupleDesc) -> io::Result<Self> {
        let values = desc
            .types()
            .iter()
            .map(|t| t.read_value(r))
            .collect::<io::Result<Vec<_>>>()?;
        Ok(Self::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableId;
    use anyhow::Result;
    use std::io::Cursor;

    fn pid(page_no: u32) -> PageId {
        PageId::new(TableId(1), page_no)
    }

    #[test]
    fn test_record_id_ordering() {
        let a = RecordId::new(pid(1), 5);
        let b = RecordId::new(pid(1), 10);
        let c = RecordId::new(pid(2), 3);

        assert!(a < b); // same page, slot order
        assert!(b < c); // page order wins
        assert!(a < c);
    }

    #[test]
    fn test_tuple_desc_byte_size() {
        let desc = TupleDesc::new(vec![DataType::Int, DataType::Int]);
        assert_eq!(desc.byte_size(), 8);

        let desc = TupleDesc::new(vec![DataType::Int, DataType::Text]);
        assert_eq!(desc.byte_size(), 4 + 132);
    }

    #[test]
    fn test_tuple_matches_schema() {
        let desc = TupleDesc::new(vec![DataType::Int, DataType::Text]);

        let good = Tuple::new(vec![Value::Int(1), Value::Text("a".into())]);
        let wrong_type = Tuple::new(vec![Value::Int(1), Value::Int(2)]);
        let wrong_arity = Tuple::new(vec![Value::Int(1)]);

        assert!(good.matches(&desc));
        assert!(!wrong_type.matches(&desc));
        assert!(!wrong_arity.matches(&desc));
    }

    #[test]
    fn test_tuple_round_trip() -> Result<()> {
        let desc = TupleDesc::new(vec![DataType::Int, DataType::Text]);
        let tuple = Tuple::new(vec![Value::Int(7), Value::Text("seven".into())]);

        let mut buf = Vec::new();
        tuple.write_to(&mut buf)?;
        assert_eq!(buf.len(), desc.byte_size());

        let back = Tuple::read_from(&mut Cursor::new(buf), &desc)?;
        assert_eq!(back.values(), tuple.values());
        Ok(())
    }
}
