//! Transactional proxies
//!
//! A proxy is a decorator implementing the same capability as its target.
//! Each proxied method runs through [`TransactionBoundary::execute`]:
//!
//! 1. log the method name and rendered arguments
//! 2. begin a transaction (or join the active one)
//! 3. call the target
//! 4. commit on success, roll back exactly once on failure or panic
//!
//! A failure is returned as [`Error::Transaction`] wrapping the target's
//! original error, which stays reachable through
//! [`Error::transaction_cause`].

use beanbox_domain::error::{Error, Result};
use beanbox_domain::ports::{Transaction, TransactionRunner};
use serde::Serialize;
use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// How a transactional call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallOutcome {
    Commit,
    Rollback,
}

/// One completed transactional call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionalCallRecord {
    pub method: String,
    pub arguments: Vec<String>,
    pub outcome: CallOutcome,
}

/// Callback notified after every transactional call
pub type CallObserver = Arc<dyn Fn(&TransactionalCallRecord) + Send + Sync>;

/// Begin / commit / rollback around a single call
#[derive(Clone)]
pub struct TransactionBoundary {
    runner: Arc<dyn TransactionRunner>,
    target: &'static str,
    observer: Option<CallObserver>,
}

impl TransactionBoundary {
    pub fn new(runner: Arc<dyn TransactionRunner>, target: &'static str) -> Self {
        Self {
            runner,
            target,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: CallObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Capability the boundary guards
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Run `call` inside a transaction
    pub fn execute<R>(
        &self,
        method: &str,
        arguments: Vec<String>,
        call: impl FnOnce() -> Result<R>,
    ) -> Result<R> {
        debug!(target_capability = self.target, "calling {method} with arguments {arguments:?}");

        let transaction = self
            .runner
            .begin()
            .map_err(|cause| Error::transaction(method, arguments.clone(), cause))?;
        let mut guard = RollbackOnUnwind::new(self.runner.as_ref(), transaction);

        match call() {
            Ok(value) => {
                let transaction = guard.disarm();
                if let Err(cause) = self.runner.commit(transaction) {
                    self.notify(method, &arguments, CallOutcome::Rollback);
                    return Err(Error::transaction(method, arguments, cause));
                }
                self.notify(method, &arguments, CallOutcome::Commit);
                Ok(value)
            }
            Err(cause) => {
                let transaction = guard.disarm();
                if let Err(rollback_error) = self.runner.rollback(transaction) {
                    error!(method, error = %rollback_error, "Rollback failed");
                }
                self.notify(method, &arguments, CallOutcome::Rollback);
                Err(Error::transaction(method, arguments, cause))
            }
        }
    }

    fn notify(&self, method: &str, arguments: &[String], outcome: CallOutcome) {
        if let Some(observer) = &self.observer {
            observer(&TransactionalCallRecord {
                method: method.to_string(),
                arguments: arguments.to_vec(),
                outcome,
            });
        }
    }
}

impl fmt::Debug for TransactionBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionBoundary")
            .field("target", &self.target)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

/// Rolls the transaction back if the call unwinds
struct RollbackOnUnwind<'a> {
    runner: &'a dyn TransactionRunner,
    transaction: Transaction,
    armed: bool,
}

impl<'a> RollbackOnUnwind<'a> {
    fn new(runner: &'a dyn TransactionRunner, transaction: Transaction) -> Self {
        Self {
            runner,
            transaction,
            armed: true,
        }
    }

    fn disarm(&mut self) -> Transaction {
        self.armed = false;
        self.transaction
    }
}

impl Drop for RollbackOnUnwind<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(transaction = self.transaction.id(), "Transactional call panicked, rolling back");
            if let Err(rollback_error) = self.runner.rollback(self.transaction) {
                error!(error = %rollback_error, "Rollback after panic failed");
            }
        }
    }
}

/// A capability whose methods can be wrapped in transaction boundaries
///
/// Implemented for trait objects:
///
/// ```ignore
/// impl TransactionalCapability for dyn CustomerRepository {
///     const METHODS: &'static [&'static str] = &["find_all", "find_by_id", "save_all"];
///
///     fn proxy(target: Arc<Self>, boundary: TransactionBoundary) -> Arc<Self> {
///         Arc::new(TransactionalCustomerRepository::new(target, boundary))
///     }
/// }
/// ```
pub trait TransactionalCapability: Send + Sync + 'static {
    /// Methods routed through the boundary
    const METHODS: &'static [&'static str];

    fn proxy(target: Arc<Self>, boundary: TransactionBoundary) -> Arc<Self>;
}

/// Wraps capabilities in transactional proxies
#[derive(Clone)]
pub struct TransactionalProxyFactory {
    runner: Arc<dyn TransactionRunner>,
    observer: Option<CallObserver>,
}

impl TransactionalProxyFactory {
    pub fn new(runner: Arc<dyn TransactionRunner>) -> Self {
        Self {
            runner,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: CallObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Proxy `target`, keeping its capability type
    pub fn wrap<C>(&self, target: Arc<C>) -> Arc<C>
    where
        C: TransactionalCapability + ?Sized,
    {
        let capability = type_name::<C>();
        debug!(capability, methods = ?C::METHODS, "Creating transactional proxy");
        let mut boundary = TransactionBoundary::new(Arc::clone(&self.runner), capability);
        if let Some(observer) = &self.observer {
            boundary = boundary.with_observer(Arc::clone(observer));
        }
        C::proxy(target, boundary)
    }
}

impl fmt::Debug for TransactionalProxyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionalProxyFactory")
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

/// Render call arguments for a transaction boundary
///
/// ```ignore
/// boundary.execute("find_by_id", call_args!(ids), || self.target.find_by_id(ids))
/// ```
#[macro_export]
macro_rules! call_args {
    () => {
        ::std::vec::Vec::<::std::string::String>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$(::std::format!("{:?}", $arg)),+]
    };
}
