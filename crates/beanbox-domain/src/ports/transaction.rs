//! Transaction runner port
//!
//! A runner owns the begin/commit/rollback protocol. Reentrancy is the
//! runner's job: a `begin` issued while a transaction is already active on
//! the same call chain must join it instead of opening a second one.
//!
//! Stores that stage writes enlist a [`TransactionResource`] with the active
//! transaction. The runner commits or discards every enlisted resource when
//! the outer transaction completes.

use crate::error::{Error, Result};
use serde::Serialize;
use std::sync::Arc;

/// Handle returned by [`TransactionRunner::begin`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transaction {
    id: u64,
    new_transaction: bool,
}

impl Transaction {
    /// A freshly opened outer transaction
    pub fn new(id: u64) -> Self {
        Self {
            id,
            new_transaction: true,
        }
    }

    /// A handle participating in an already active transaction
    pub fn participating(id: u64) -> Self {
        Self {
            id,
            new_transaction: false,
        }
    }

    /// Identifier of the underlying transaction
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this handle opened the transaction (and therefore completes it)
    pub fn is_new_transaction(&self) -> bool {
        self.new_transaction
    }
}

/// Participant whose staged work completes with a transaction
pub trait TransactionResource: Send + Sync {
    /// Make the work staged under `transaction` visible
    fn commit(&self, transaction: u64) -> Result<()>;

    /// Discard the work staged under `transaction`
    fn rollback(&self, transaction: u64);
}

/// Begin/commit/rollback protocol used by transactional proxies
pub trait TransactionRunner: Send + Sync {
    /// Open a transaction, or join the one active on this call chain
    fn begin(&self) -> Result<Transaction>;

    /// Complete the transaction successfully
    fn commit(&self, transaction: Transaction) -> Result<()>;

    /// Abandon the transaction
    fn rollback(&self, transaction: Transaction) -> Result<()>;

    /// Identifier of the transaction active on this call chain, if any
    fn current(&self) -> Option<u64> {
        None
    }

    /// Attach a resource to the active transaction
    fn enlist(&self, _resource: Arc<dyn TransactionResource>) -> Result<()> {
        Err(Error::invalid_state(
            "this transaction runner does not accept resources",
        ))
    }
}
