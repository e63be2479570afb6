//! Lock management for two-phase locking.
//!
//! Locks are per page, in shared or exclusive mode. A transaction that is
//! the sole holder of a shared lock may upgrade it in place; there is no
//! downgrade. Blocked requests park on a per-page condvar and re-check the
//! grant predicates on every wakeup, so grant ordering is whoever re-checks
//! first, with ties broken arbitrarily — no FIFO fairness is guaranteed.
//!
//! Deadlocks are detected, not avoided: a blocked request records wait-for
//! edges to every current holder and runs a depth-first cycle search; if the
//! request closes a cycle, it fails with a transaction-aborted error instead
//! of waiting forever.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use dashmap::DashMap;
use log::{debug, trace};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Access level requested through the buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

/// Lock modes supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Shared lock for read access; any number of holders.
    Shared,
    /// Exclusive lock for write access; exactly one holder.
    Exclusive,
}

/// Current lock state of one page: the mode plus every transaction holding
/// it. Invariant: an exclusive lock has exactly one holder.
struct LockState {
    mode: LockMode,
    holders: HashSet<TransactionId>,
}

impl LockState {
    fn new(txn: TransactionId, mode: LockMode) -> Self {
        let mut holders = HashSet::new();
        holders.insert(txn);
        Self { mode, holders }
    }
}

/// Per-page synchronization handle. Two value-equal `PageId`s may be
/// distinct instances, so blocking must key off a canonical object interned
/// in the manager's registry rather than the id itself.
struct PageLock {
    state: Mutex<Option<LockState>>,
    granted: Condvar,
}

impl PageLock {
    fn new() -> Self {
        Self {
            state: Mutex::new(None),
            granted: Condvar::new(),
        }
    }
}

/// Grants and releases page locks under two-phase locking.
pub struct LockManager {
    /// Interned per-page lock state and condvar, keyed by page id value.
    pages: DashMap<PageId, Arc<PageLock>>,
    /// Wait-for graph: blocked transaction -> transactions it waits on.
    wait_for: Mutex<HashMap<TransactionId, HashSet<TransactionId>>>,
    /// Pages locked by each transaction, for `release_all`.
    held: Mutex<HashMap<TransactionId, HashSet<PageId>>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            pages: DashMap::new(),
            wait_for: Mutex::new(HashMap::new()),
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Blocks until `txn` holds a lock on `page_id` sufficient for `perm`,
    /// or fails with `TransactionAborted` if waiting would deadlock.
    ///
    /// A shared lock satisfies a read request; a write request needs the
    /// exclusive lock, upgrading in place when `txn` is the sole holder.
    pub fn acquire(
        &self,
        txn: TransactionId,
        page_id: PageId,
        perm: Permission,
    ) -> StorageResult<()> {
        let page = self.page_lock(page_id);
        let mut state = page.state.lock();

        loop {
            if self.try_grant(txn, perm, &mut state) {
                self.clear_waits(txn);
                self.held.lock().entry(txn).or_default().insert(page_id);
                // A new shared holder joining does not free the lock, but
                // waiters must refresh their wait-for edges against the
                // larger holder set, so wake them for a re-check.
                page.granted.notify_all();
                return Ok(());
            }

            let holders: Vec<TransactionId> = state
                .as_ref()
                .map(|s| s.holders.iter().copied().filter(|h| *h != txn).collect())
                .unwrap_or_default();
            trace!("{} blocked on page {} held by {:?}", txn, page_id, holders);
            self.add_waits(txn, &holders)?;
            page.granted.wait(&mut state);
        }
    }

    /// Applies the grant predicates against the current state. Returns true
    /// and mutates the state if the request can be satisfied now.
    fn try_grant(
        &self,
        txn: TransactionId,
        perm: Permission,
        state: &mut Option<LockState>,
    ) -> bool {
        let cur = match state.as_mut() {
            None => {
                let mode = match perm {
                    Permission::ReadOnly => LockMode::Shared,
                    Permission::ReadWrite => LockMode::Exclusive,
                };
                *state = Some(LockState::new(txn, mode));
                return true;
            }
            Some(cur) => cur,
        };

        match perm {
            Permission::ReadOnly => {
                // Holding either mode satisfies a read.
                if cur.holders.contains(&txn) {
                    true
                } else if cur.mode == LockMode::Shared {
                    cur.holders.insert(txn);
                    true
                } else {
                    false
                }
            }
            Permission::ReadWrite => {
                if cur.mode == LockMode::Exclusive && cur.holders.contains(&txn) {
                    true
                } else if cur.holders.len() == 1 && cur.holders.contains(&txn) {
                    // Sole shared holder: upgrade in place. One-way.
                    cur.mode = LockMode::Exclusive;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Drops `txn`'s lock on one page, waking any blocked requesters.
    pub fn release(&self, txn: TransactionId, page_id: PageId) {
        if let Some(page) = self.pages.get(&page_id).map(|e| Arc::clone(e.value())) {
            let mut state = page.state.lock();
            if let Some(cur) = state.as_mut() {
                cur.holders.remove(&txn);
                if cur.holders.is_empty() {
                    *state = None;
                }
            }
            page.granted.notify_all();
        }

        let mut held = self.held.lock();
        if let Some(pages) = held.get_mut(&txn) {
            pages.remove(&page_id);
            if pages.is_empty() {
                held.remove(&txn);
            }
        }
    }

    /// Drops every lock `txn` holds and removes it from the wait-for graph.
    pub fn release_all(&self, txn: TransactionId) {
        let pages: Vec<PageId> = self
            .held
            .lock()
            .get(&txn)
            .map(|pids| pids.iter().copied().collect())
            .unwrap_or_default();
        for page_id in pages {
            self.release(txn, page_id);
        }

        let mut graph = self.wait_for.lock();
        graph.remove(&txn);
        for waits in graph.values_mut() {
            waits.remove(&txn);
        }
    }

    /// Whether `txn` holds any lock on `page_id`.
    pub fn holds(&self, txn: TransactionId, page_id: PageId) -> bool {
        self.pages
            .get(&page_id)
            .map(|e| {
                let state = e.value().state.lock();
                state
                    .as_ref()
                    .map(|s| s.holders.contains(&txn))
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    /// Whether `txn` holds `page_id` in exactly `mode`.
    pub fn holds_mode(&self, txn: TransactionId, page_id: PageId, mode: LockMode) -> bool {
        self.pages
            .get(&page_id)
            .map(|e| {
                let state = e.value().state.lock();
                state
                    .as_ref()
                    .map(|s| s.mode == mode && s.holders.contains(&txn))
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    fn page_lock(&self, page_id: PageId) -> Arc<PageLock> {
        Arc::clone(
            self.pages
                .entry(page_id)
                .or_insert_with(|| Arc::new(PageLock::new()))
                .value(),
        )
    }

    /// Records that `txn` waits on `holders` and fails the request if the
    /// new edges close a cycle. On failure the requester's edges are removed;
    /// the caller is expected to abort and release everything it holds.
    fn add_waits(&self, txn: TransactionId, holders: &[TransactionId]) -> StorageResult<()> {
        let mut graph = self.wait_for.lock();
        let waits = graph.entry(txn).or_default();
        for holder in holders {
            waits.insert(*holder);
        }

        if Self::on_cycle(&graph, txn, &mut Vec::new()) {
            graph.remove(&txn);
            debug!("deadlock detected, aborting {}", txn);
            return Err(StorageError::TransactionAborted(txn));
        }
        Ok(())
    }

    /// Depth-first search through the wait-for graph; revisiting a node on
    /// the current path means a cycle. Any cycle created by the newest edge
    /// must pass through `txn`, so searching from it suffices.
    fn on_cycle(
        graph: &HashMap<TransactionId, HashSet<TransactionId>>,
        txn: TransactionId,
        path: &mut Vec<TransactionId>,
    ) -> bool {
        if path.contains(&txn) {
            return true;
        }
        path.push(txn);
        if let Some(waits) = graph.get(&txn) {
            for next in waits {
                if Self::on_cycle(graph, *next, path) {
                    return true;
                }
            }
        }
        path.pop();
        false
    }

    /// Clears `txn`'s outgoing wait-for edges; called on every grant.
    fn clear_waits(&self, txn: TransactionId) {
        self.wait_for.lock().remove(&txn);
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
