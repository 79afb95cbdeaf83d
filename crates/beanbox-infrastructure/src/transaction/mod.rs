//! Transactions
//!
//! [`LocalTransactionManager`] is the default [`TransactionRunner`]
//! (registered by auto-configuration when no other runner exists).
//! [`TransactionalProxyFactory`] wraps a capability so that each of its
//! methods runs inside a transaction boundary.
//!
//! [`TransactionRunner`]: beanbox_domain::ports::TransactionRunner

pub mod manager;
pub mod proxy;

pub use manager::{LocalTransactionManager, TransactionStats};
pub use proxy::{
    CallObserver, CallOutcome, TransactionBoundary, TransactionalCallRecord,
    TransactionalCapability, TransactionalProxyFactory,
};
