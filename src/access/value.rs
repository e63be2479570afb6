//! Field types and values.
//!
//! Both types serialize to a fixed byte width so that a row's width is
//! computable from its schema alone. Integers are 4 bytes big-endian; text
//! is a 4-byte big-endian length followed by a fixed 128-byte zero-padded
//! payload.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Maximum byte length of a text field's payload.
pub const TEXT_MAX_LEN: usize = 128;

/// The type of a tuple field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int,
    Text,
}

impl DataType {
    /// Serialized width of a field of this type, in bytes.
    pub fn byte_size(&self) -> usize {
        match self {
            DataType::Int => 4,
            DataType::Text => 4 + TEXT_MAX_LEN,
        }
    }

    /// Reads one field of this type from `r`.
    pub fn read_value(&self, r: &mut impl Read) -> io::Result<Value> {
        match self {
            DataType::Int => Ok(Value::Int(r.read_i32::<BigEndian>()?)),
            DataType::Text => {
                let len = r.read_u32::<BigEndian>()? as usize;
                let mut buf = [0u8; TEXT_MAX_LEN];
                r.read_exact(&mut buf)?;
                if len > TEXT_MAX_LEN {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "text length exceeds fixed field width",
                    ));
                }
                let s = String::from_utf8(buf[..len].to_vec())
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(Value::Text(s))
            }
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Text(String),
}

impl Value {
    /// The type this value serializes as.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::Text(_) => DataType::Text,
        }
    }

    /// Writes this value at its type's fixed width.
    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        match self {
            Value::Int(v) => w.write_i32::<BigEndian>(*v),
            Value::Text(s) => {
                let bytes = s.as_bytes();
                if bytes.len() > TEXT_MAX_LEN {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "text value exceeds fixed field width",
                    ));
                }
                w.write_u32::<BigEndian>(bytes.len() as u32)?;
                w.write_all(bytes)?;
                // Pad out to the fixed width.
                w.write_all(&vec![0u8; TEXT_MAX_LEN - bytes.len()])
            }
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Cursor;

    #[test]
    fn test_int_round_trip() -> Result<()> {
        let mut buf = Vec::new();
        Value::Int(-42).write_to(&mut buf)?;
        assert_eq!(buf.len(), DataType::Int.byte_size());

        let v = DataType::Int.read_value(&mut Cursor::new(buf))?;
        assert_eq!(v, Value::Int(-42));
        Ok(())
    }

    #[test]
    fn test_int_is_big_endian() -> Result<()> {
        let mut buf = Vec::new();
        Value::Int(1).write_to(&mut buf)?;
        assert_eq!(buf, vec![0, 0, 0, 1]);
        Ok(())
    }

    #[test]
    fn test_text_round_trip() -> Result<()> {
        let mut buf = Vec::new();
        Value::Text("hello".to_string()).write_to(&mut buf)?;
        assert_eq!(buf.len(), DataType::Text.byte_size());

        let v = DataType::Text.read_value(&mut Cursor::new(buf))?;
        assert_eq!(v, Value::Text("hello".to_string()));
        Ok(())
    }

    #[test]
    fn test_text_too_long_rejected() {
        let long = "x".repeat(TEXT_MAX_LEN + 1);
        let mut buf = Vec::new();
        assert!(Value::Text(long).write_to(&mut buf).is_err());
    }

    #[test]
    fn test_empty_text() -> Result<()> {
        let mut buf = Vec::new();
        Value::Text(String::new()).write_to(&mut buf)?;
        let v = DataType::Text.read_value(&mut Cursor::new(buf))?;
        assert_eq!(v, Value::Text(String::new()));
        Ok(())
    }
}
