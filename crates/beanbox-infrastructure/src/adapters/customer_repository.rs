//! Customer repository adapters
//!
//! [`InMemoryCustomerRepository`] bound to a [`TransactionRunner`] stages
//! writes made inside a transaction and applies them when the transaction
//! commits. A rollback discards them, along with the ids they were given.

use crate::call_args;
use crate::transaction::{TransactionBoundary, TransactionalCapability};
use beanbox_domain::entities::Customer;
use beanbox_domain::error::{Error, Result};
use beanbox_domain::ports::{CustomerRepository, TransactionResource, TransactionRunner};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
struct CustomerStore {
    rows: RwLock<BTreeMap<i32, Customer>>,
    staged: RwLock<HashMap<u64, BTreeMap<i32, Customer>>>,
    next_id: AtomicI32,
}

impl CustomerStore {
    fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            staged: RwLock::new(HashMap::new()),
            next_id: AtomicI32::new(1),
        }
    }

    /// Committed rows plus whatever `transaction` has staged
    fn read_visible<R>(
        &self,
        transaction: Option<u64>,
        read: impl FnOnce(&BTreeMap<i32, Customer>) -> R,
    ) -> R {
        let rows = self.rows.read();
        let staged = self.staged.read();
        match transaction.and_then(|id| staged.get(&id)) {
            Some(pending) if !pending.is_empty() => {
                let mut merged = rows.clone();
                merged.extend(pending.iter().map(|(id, customer)| (*id, customer.clone())));
                read(&merged)
            }
            _ => read(&rows),
        }
    }
}

impl TransactionResource for CustomerStore {
    fn commit(&self, transaction: u64) -> Result<()> {
        let Some(pending) = self.staged.write().remove(&transaction) else {
            return Ok(());
        };
        debug!(transaction, count = pending.len(), "Applying staged customers");
        self.rows.write().extend(pending);
        Ok(())
    }

    fn rollback(&self, transaction: u64) {
        if let Some(pending) = self.staged.write().remove(&transaction) {
            debug!(transaction, count = pending.len(), "Discarding staged customers");
        }
    }
}

/// Customer store kept in memory with sequential ids
pub struct InMemoryCustomerRepository {
    store: Arc<CustomerStore>,
    runner: Option<Arc<dyn TransactionRunner>>,
}

impl InMemoryCustomerRepository {
    /// Repository whose writes are visible immediately
    pub fn new() -> Self {
        Self {
            store: Arc::new(CustomerStore::new()),
            runner: None,
        }
    }

    /// Stage writes in the transaction `runner` reports as active
    pub fn with_runner(mut self, runner: Arc<dyn TransactionRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Repository pre-populated with one customer per name
    pub fn seeded<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let repository = Self::new();
        {
            let mut rows = repository.store.rows.write();
            for name in names {
                let id = repository.store.next_id.fetch_add(1, Ordering::Relaxed);
                rows.insert(id, Customer::with_id(id, name));
            }
        }
        repository
    }

    /// Number of committed customers
    pub fn len(&self) -> usize {
        self.store.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.rows.read().is_empty()
    }

    fn current_transaction(&self) -> Option<u64> {
        self.runner.as_ref().and_then(|runner| runner.current())
    }

    /// Open the staging buffer for `transaction`, enlisting the store on first use
    fn stage(
        &self,
        runner: &Arc<dyn TransactionRunner>,
        transaction: u64,
        customers: &[Customer],
    ) -> Result<()> {
        let enlisted = self.store.staged.read().contains_key(&transaction);
        if !enlisted {
            runner.enlist(Arc::clone(&self.store) as Arc<dyn TransactionResource>)?;
        }
        let mut staged = self.store.staged.write();
        let pending = staged.entry(transaction).or_default();
        for customer in customers {
            if let Some(id) = customer.id {
                pending.insert(id, customer.clone());
            }
        }
        Ok(())
    }
}

impl Default for InMemoryCustomerRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryCustomerRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCustomerRepository")
            .field("store", &self.store)
            .field("transactional", &self.runner.is_some())
            .finish()
    }
}

impl CustomerRepository for InMemoryCustomerRepository {
    fn find_all(&self) -> Result<Vec<Customer>> {
        Ok(self.store.read_visible(self.current_transaction(), |rows| {
            rows.values().cloned().collect()
        }))
    }

    fn find_by_id(&self, ids: &[i32]) -> Result<Vec<Customer>> {
        Ok(self.store.read_visible(self.current_transaction(), |rows| {
            ids.iter().filter_map(|id| rows.get(id).cloned()).collect()
        }))
    }

    /// Insert every customer or none of them
    fn save_all(&self, customers: Vec<Customer>) -> Result<Vec<Customer>> {
        if let Some(blank) = customers.iter().position(|c| c.name.trim().is_empty()) {
            return Err(Error::invalid_argument(format!(
                "customer #{blank} has a blank name"
            )));
        }

        let saved: Vec<Customer> = customers
            .into_iter()
            .map(|customer| {
                let id = self.store.next_id.fetch_add(1, Ordering::Relaxed);
                Customer::with_id(id, customer.name)
            })
            .collect();

        match (self.runner.as_ref(), self.current_transaction()) {
            (Some(runner), Some(transaction)) => {
                self.stage(runner, transaction, &saved)?;
                debug!(transaction, count = saved.len(), "Staged customers");
            }
            _ => {
                self.store
                    .rows
                    .write()
                    .extend(saved.iter().filter_map(|c| c.id.map(|id| (id, c.clone()))));
                debug!(count = saved.len(), "Saved customers");
            }
        }
        Ok(saved)
    }
}

/// Transactional decorator for any [`CustomerRepository`]
pub struct TransactionalCustomerRepository {
    target: Arc<dyn CustomerRepository>,
    boundary: TransactionBoundary,
}

impl TransactionalCustomerRepository {
    pub fn new(target: Arc<dyn CustomerRepository>, boundary: TransactionBoundary) -> Self {
        Self { target, boundary }
    }
}

impl CustomerRepository for TransactionalCustomerRepository {
    fn find_all(&self) -> Result<Vec<Customer>> {
        self.boundary
            .execute("find_all", call_args!(), || self.target.find_all())
    }

    fn find_by_id(&self, ids: &[i32]) -> Result<Vec<Customer>> {
        self.boundary
            .execute("find_by_id", call_args!(ids), || self.target.find_by_id(ids))
    }

    fn save_all(&self, customers: Vec<Customer>) -> Result<Vec<Customer>> {
        let arguments = call_args!(customers);
        self.boundary
            .execute("save_all", arguments, || self.target.save_all(customers))
    }
}

impl TransactionalCapability for dyn CustomerRepository {
    const METHODS: &'static [&'static str] = &["find_all", "find_by_id", "save_all"];

    fn proxy(target: Arc<Self>, boundary: TransactionBoundary) -> Arc<Self> {
        Arc::new(TransactionalCustomerRepository::new(target, boundary))
    }
}
