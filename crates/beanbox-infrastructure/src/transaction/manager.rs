//! Thread-bound transaction manager
//!
//! The manager tracks which transaction is active on each thread so nested
//! transactional calls join the outer transaction instead of opening their
//! own. Stores enlist a [`TransactionResource`] with the active transaction;
//! when the outer transaction ends every resource is committed, or discarded
//! on rollback. A participating call that rolls back marks the outer
//! transaction rollback-only, and the outer commit then rolls back and fails.

use beanbox_domain::error::{Error, Result};
use beanbox_domain::ports::{Transaction, TransactionResource, TransactionRunner};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static ACTIVE: RefCell<HashMap<u64, ActiveTransaction>> = RefCell::new(HashMap::new());
}

struct ActiveTransaction {
    id: u64,
    depth: usize,
    rollback_only: bool,
    resources: Vec<Arc<dyn TransactionResource>>,
}

impl ActiveTransaction {
    fn discard(&self) {
        for resource in &self.resources {
            resource.rollback(self.id);
        }
    }
}

/// Counters of completed transactions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransactionStats {
    pub begun: u64,
    pub committed: u64,
    pub rolled_back: u64,
}

/// Default [`TransactionRunner`]
#[derive(Debug)]
pub struct LocalTransactionManager {
    manager_id: u64,
    next_transaction: AtomicU64,
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

impl LocalTransactionManager {
    pub fn new() -> Self {
        Self {
            manager_id: NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed),
            next_transaction: AtomicU64::new(1),
            begun: AtomicU64::new(0),
            committed: AtomicU64::new(0),
            rolled_back: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> TransactionStats {
        TransactionStats {
            begun: self.begun.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
        }
    }

    /// Whether the calling thread is inside a transaction of this manager
    pub fn has_active_transaction(&self) -> bool {
        ACTIVE.with(|active| active.borrow().contains_key(&self.manager_id))
    }

    /// End one level of `transaction`
    ///
    /// Returns the finished outer transaction, or `None` when a participating
    /// level ended.
    fn finish(
        &self,
        active: &mut HashMap<u64, ActiveTransaction>,
        transaction: Transaction,
        rollback: bool,
    ) -> Result<Option<ActiveTransaction>> {
        let current = active
            .get_mut(&self.manager_id)
            .filter(|current| current.id == transaction.id())
            .ok_or_else(|| {
                Error::invalid_state(format!(
                    "transaction {} is not active on this thread",
                    transaction.id()
                ))
            })?;

        if !transaction.is_new_transaction() {
            current.depth = current.depth.saturating_sub(1);
            if rollback {
                current.rollback_only = true;
            }
            return Ok(None);
        }

        Ok(active.remove(&self.manager_id))
    }
}

impl Default for LocalTransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionRunner for LocalTransactionManager {
    fn begin(&self) -> Result<Transaction> {
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(current) = active.get_mut(&self.manager_id) {
                current.depth += 1;
                trace!(transaction = current.id, depth = current.depth, "Joined active transaction");
                return Ok(Transaction::participating(current.id));
            }

            let id = self.next_transaction.fetch_add(1, Ordering::Relaxed);
            active.insert(
                self.manager_id,
                ActiveTransaction {
                    id,
                    depth: 0,
                    rollback_only: false,
                    resources: Vec::new(),
                },
            );
            self.begun.fetch_add(1, Ordering::Relaxed);
            debug!(transaction = id, "Transaction begun");
            Ok(Transaction::new(id))
        })
    }

    fn commit(&self, transaction: Transaction) -> Result<()> {
        let finished = ACTIVE.with(|active| self.finish(&mut active.borrow_mut(), transaction, false))?;
        let Some(finished) = finished else {
            return Ok(());
        };

        if finished.rollback_only {
            finished.discard();
            self.rolled_back.fetch_add(1, Ordering::Relaxed);
            warn!(transaction = finished.id, "Transaction was marked rollback-only, rolled back");
            return Err(Error::invalid_state(format!(
                "transaction {} was marked rollback-only by a participating call",
                finished.id
            )));
        }

        for (position, resource) in finished.resources.iter().enumerate() {
            if let Err(error) = resource.commit(finished.id) {
                for pending in &finished.resources[position + 1..] {
                    pending.rollback(finished.id);
                }
                self.rolled_back.fetch_add(1, Ordering::Relaxed);
                warn!(transaction = finished.id, error = %error, "Resource commit failed, rolled back");
                return Err(error);
            }
        }

        self.committed.fetch_add(1, Ordering::Relaxed);
        debug!(
            transaction = finished.id,
            resources = finished.resources.len(),
            "Transaction committed"
        );
        Ok(())
    }

    fn rollback(&self, transaction: Transaction) -> Result<()> {
        let finished = ACTIVE.with(|active| self.finish(&mut active.borrow_mut(), transaction, true))?;
        match finished {
            Some(finished) => {
                finished.discard();
                self.rolled_back.fetch_add(1, Ordering::Relaxed);
                debug!(transaction = finished.id, "Transaction rolled back");
            }
            None => {
                debug!(transaction = transaction.id(), "Participating call marked transaction rollback-only");
            }
        }
        Ok(())
    }

    fn current(&self) -> Option<u64> {
        ACTIVE.with(|active| active.borrow().get(&self.manager_id).map(|current| current.id))
    }

    fn enlist(&self, resource: Arc<dyn TransactionResource>) -> Result<()> {
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            let current = active.get_mut(&self.manager_id).ok_or_else(|| {
                Error::invalid_state("no transaction is active on this thread")
            })?;
            current.resources.push(resource);
            trace!(transaction = current.id, resources = current.resources.len(), "Resource enlisted");
            Ok(())
        })
    }
}
