//! Concurrency control.
//!
//! Page-granularity two-phase locking with deadlock detection. Every page
//! access in the engine goes through [`lock::LockManager`] via the buffer
//! pool; locks are held until `transaction_complete` releases them.

pub mod lock;

pub use lock::{LockManager, LockMode, Permission};
