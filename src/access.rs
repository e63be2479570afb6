//! Tuple and schema representation.
//!
//! The storage core treats a tuple as a byte-serializable record of known
//! fixed width given a schema; field semantics beyond encoding and width are
//! a concern of higher layers.

pub mod tuple;
pub mod value;

pub use tuple::{RecordId, Tuple, TupleDesc};
pub use value::{DataType, Value};
