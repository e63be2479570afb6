//! Transaction identity.
//!
//! Transaction lifecycle (begin/commit/abort decisions) belongs to the
//! caller; the storage layer only needs a stable id to attribute locks and
//! dirty pages to.

pub mod id;

pub use id::{TransactionId, TransactionIdGenerator};
