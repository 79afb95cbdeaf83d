//! Tests for transaction management and transactional proxies

use crate::test_utils::bare_builder;
use beanbox_domain::entities::Customer;
use beanbox_domain::error::{Error, Result};
use beanbox_domain::ports::{
    CustomerRepository, Transaction, TransactionResource, TransactionRunner,
};
use beanbox_infrastructure::adapters::InMemoryCustomerRepository;
use beanbox_infrastructure::call_args;
use beanbox_infrastructure::container::BeanDefinition;
use beanbox_infrastructure::transaction::{
    CallObserver, CallOutcome, LocalTransactionManager, TransactionBoundary, TransactionStats,
    TransactionalCallRecord, TransactionalProxyFactory,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Runner that counts protocol calls and can be told to fail
#[derive(Default)]
struct CountingRunner {
    begins: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    fail_begin: bool,
    fail_commit: bool,
}

impl CountingRunner {
    fn counts(&self) -> (u64, u64, u64) {
        (
            self.begins.load(Ordering::SeqCst),
            self.commits.load(Ordering::SeqCst),
            self.rollbacks.load(Ordering::SeqCst),
        )
    }
}

impl TransactionRunner for CountingRunner {
    fn begin(&self) -> Result<Transaction> {
        if self.fail_begin {
            return Err(Error::invalid_state("database unavailable"));
        }
        let id = self.begins.fetch_add(1, Ordering::SeqCst);
        Ok(Transaction::new(id))
    }

    fn commit(&self, _transaction: Transaction) -> Result<()> {
        if self.fail_commit {
            return Err(Error::invalid_state("commit rejected"));
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&self, _transaction: Transaction) -> Result<()> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Resource that logs how each transaction completed
#[derive(Default)]
struct JournalResource {
    journal: Mutex<Vec<String>>,
    fail_commit: bool,
}

impl JournalResource {
    fn entries(&self) -> Vec<String> {
        self.journal.lock().expect("journal poisoned").clone()
    }
}

impl TransactionResource for JournalResource {
    fn commit(&self, transaction: u64) -> Result<()> {
        if self.fail_commit {
            return Err(Error::invalid_state("disk full"));
        }
        self.journal
            .lock()
            .expect("journal poisoned")
            .push(format!("commit {transaction}"));
        Ok(())
    }

    fn rollback(&self, transaction: u64) {
        self.journal
            .lock()
            .expect("journal poisoned")
            .push(format!("rollback {transaction}"));
    }
}

fn recorder() -> (Arc<Mutex<Vec<TransactionalCallRecord>>>, CallObserver) {
    let records = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&records);
    let observer: CallObserver = Arc::new(move |record: &TransactionalCallRecord| {
        sink.lock().expect("records poisoned").push(record.clone());
    });
    (records, observer)
}

// ============================================================================
// LocalTransactionManager
// ============================================================================

#[test]
fn test_begin_and_commit() {
    let manager = LocalTransactionManager::new();

    let transaction = manager.begin().expect("begin");
    assert!(transaction.is_new_transaction());
    assert!(manager.has_active_transaction());
    manager.commit(transaction).expect("commit");

    assert!(!manager.has_active_transaction());
    assert_eq!(
        manager.stats(),
        TransactionStats {
            begun: 1,
            committed: 1,
            rolled_back: 0
        }
    );
}

#[test]
fn test_nested_begin_joins_outer_transaction() {
    let manager = LocalTransactionManager::new();

    let outer = manager.begin().expect("outer");
    let inner = manager.begin().expect("inner");
    assert!(!inner.is_new_transaction());
    assert_eq!(inner.id(), outer.id());

    manager.commit(inner).expect("inner commit");
    assert!(manager.has_active_transaction());
    manager.commit(outer).expect("outer commit");

    assert_eq!(manager.stats().begun, 1);
    assert_eq!(manager.stats().committed, 1);
}

#[test]
fn test_participating_rollback_marks_rollback_only() {
    let manager = LocalTransactionManager::new();

    let outer = manager.begin().expect("outer");
    let inner = manager.begin().expect("inner");
    manager.rollback(inner).expect("inner rollback");
    let error = manager.commit(outer).expect_err("rollback-only");

    assert!(matches!(error, Error::InvalidState { .. }));
    assert!(error.to_string().contains("rollback-only"));
    assert_eq!(
        manager.stats(),
        TransactionStats {
            begun: 1,
            committed: 0,
            rolled_back: 1
        }
    );
}

#[test]
fn test_commit_of_inactive_transaction_fails() {
    let manager = LocalTransactionManager::new();
    let transaction = manager.begin().expect("begin");
    manager.rollback(transaction).expect("rollback");

    assert!(matches!(
        manager.commit(transaction),
        Err(Error::InvalidState { .. })
    ));
}

#[test]
fn test_transactions_are_bound_to_threads() {
    let manager = Arc::new(LocalTransactionManager::new());
    let outer = manager.begin().expect("outer");

    let other = Arc::clone(&manager);
    let joined = std::thread::spawn(move || {
        let transaction = other.begin().expect("begin on other thread");
        let fresh = transaction.is_new_transaction();
        other.commit(transaction).expect("commit on other thread");
        fresh
    })
    .join()
    .expect("thread");

    assert!(joined, "another thread must open its own transaction");
    manager.commit(outer).expect("outer commit");
    assert_eq!(manager.stats().committed, 2);
}

#[test]
fn test_managers_do_not_share_transactions() {
    let first = LocalTransactionManager::new();
    let second = LocalTransactionManager::new();

    let outer = first.begin().expect("first");
    let other = second.begin().expect("second");

    assert!(other.is_new_transaction());
    second.commit(other).expect("second commit");
    first.commit(outer).expect("first commit");
}

// ============================================================================
// TransactionBoundary
// ============================================================================

#[test]
fn test_successful_call_commits() {
    let runner = Arc::new(CountingRunner::default());
    let (records, observer) = recorder();
    let boundary = TransactionBoundary::new(runner.clone(), "Greeter").with_observer(observer);

    let value = boundary
        .execute("greet", call_args!("Josh"), || Ok(42))
        .expect("call");

    assert_eq!(value, 42);
    assert_eq!(runner.counts(), (1, 1, 0));
    let records = records.lock().expect("records");
    assert_eq!(
        *records,
        vec![TransactionalCallRecord {
            method: "greet".to_string(),
            arguments: vec!["\"Josh\"".to_string()],
            outcome: CallOutcome::Commit,
        }]
    );
}

#[test]
fn test_failed_call_rolls_back_once_and_wraps_cause() {
    let runner = Arc::new(CountingRunner::default());
    let boundary = TransactionBoundary::new(runner.clone(), "Greeter");

    let error = boundary
        .execute::<()>("greet", call_args!(1, "two"), || {
            Err(Error::invalid_argument("greeting"))
        })
        .expect_err("call fails");

    assert_eq!(runner.counts(), (1, 0, 1));
    assert_eq!(
        error.to_string(),
        "Transactional call greet(1, \"two\") failed: Invalid argument: greeting"
    );
    assert!(matches!(
        error.transaction_cause(),
        Some(Error::InvalidArgument { .. })
    ));
}

#[test]
fn test_begin_failure_skips_call() {
    let runner = Arc::new(CountingRunner {
        fail_begin: true,
        ..CountingRunner::default()
    });
    let boundary = TransactionBoundary::new(runner.clone(), "Greeter");
    let called = AtomicUsize::new(0);

    let error = boundary
        .execute("greet", call_args!(), || {
            called.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .expect_err("begin fails");

    assert_eq!(called.load(Ordering::SeqCst), 0);
    assert!(matches!(
        error.transaction_cause(),
        Some(Error::InvalidState { .. })
    ));
}

#[test]
fn test_commit_failure_is_reported_as_rollback() {
    let runner = Arc::new(CountingRunner {
        fail_commit: true,
        ..CountingRunner::default()
    });
    let (records, observer) = recorder();
    let boundary = TransactionBoundary::new(runner, "Greeter").with_observer(observer);

    let result = boundary.execute("greet", call_args!(), || Ok(()));

    assert!(matches!(result, Err(Error::Transaction { .. })));
    let records = records.lock().expect("records");
    assert_eq!(records[0].outcome, CallOutcome::Rollback);
}

#[test]
fn test_panicking_call_rolls_back() {
    let runner = Arc::new(CountingRunner::default());
    let boundary = TransactionBoundary::new(runner.clone(), "Greeter");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        boundary.execute::<()>("greet", call_args!(), || panic!("boom"))
    }));

    assert!(outcome.is_err());
    assert_eq!(runner.counts(), (1, 0, 1));
}

#[test]
fn test_nested_failure_poisons_outer_call() {
    let manager = Arc::new(LocalTransactionManager::new());
    let boundary = TransactionBoundary::new(manager.clone(), "Service");

    let result = boundary.execute("outer", call_args!(), || {
        let inner = boundary.execute::<()>("inner", call_args!(), || {
            Err(Error::invalid_argument("bad input"))
        });
        assert!(inner.is_err());
        Ok(())
    });

    let error = result.expect_err("outer commit must fail");
    assert!(matches!(
        error.transaction_cause(),
        Some(Error::InvalidState { .. })
    ));
    assert_eq!(manager.stats().begun, 1);
    assert_eq!(manager.stats().rolled_back, 1);
    assert!(!manager.has_active_transaction());
}

#[test]
fn test_enlisted_resources_follow_outer_transaction() {
    let manager = LocalTransactionManager::new();
    let committed = Arc::new(JournalResource::default());
    let discarded = Arc::new(JournalResource::default());

    let outer = manager.begin().expect("begin");
    assert_eq!(manager.current(), Some(outer.id()));
    manager.enlist(committed.clone()).expect("enlist");
    manager.commit(outer).expect("commit");

    let second = manager.begin().expect("begin");
    let inner = manager.begin().expect("join");
    manager.enlist(discarded.clone()).expect("enlist from nested call");
    manager.commit(inner).expect("inner commit");
    assert!(discarded.entries().is_empty());
    manager.rollback(second).expect("rollback");

    assert_eq!(committed.entries(), vec![format!("commit {}", outer.id())]);
    assert_eq!(discarded.entries(), vec![format!("rollback {}", second.id())]);
    assert_eq!(manager.current(), None);
}

#[test]
fn test_enlist_requires_active_transaction() {
    let manager = LocalTransactionManager::new();

    let error = manager
        .enlist(Arc::new(JournalResource::default()))
        .expect_err("nothing active");

    assert!(matches!(error, Error::InvalidState { .. }));
}

#[test]
fn test_failed_resource_commit_discards_the_rest() {
    let manager = LocalTransactionManager::new();
    let broken = Arc::new(JournalResource {
        fail_commit: true,
        ..JournalResource::default()
    });
    let pending = Arc::new(JournalResource::default());

    let transaction = manager.begin().expect("begin");
    manager.enlist(broken.clone()).expect("enlist");
    manager.enlist(pending.clone()).expect("enlist");
    let error = manager.commit(transaction).expect_err("commit fails");

    assert_eq!(error.to_string(), "Invalid state: disk full");
    assert_eq!(
        pending.entries(),
        vec![format!("rollback {}", transaction.id())]
    );
    assert_eq!(manager.stats().rolled_back, 1);
    assert_eq!(manager.stats().committed, 0);
}

#[test]
fn test_rollback_only_commit_discards_resources() {
    let manager = LocalTransactionManager::new();
    let resource = Arc::new(JournalResource::default());

    let outer = manager.begin().expect("begin");
    manager.enlist(resource.clone()).expect("enlist");
    let inner = manager.begin().expect("join");
    manager.rollback(inner).expect("mark rollback-only");
    manager.commit(outer).expect_err("rollback-only");

    assert_eq!(resource.entries(), vec![format!("rollback {}", outer.id())]);
}

// ============================================================================
// Proxies
// ============================================================================

#[test]
fn test_proxy_factory_wraps_repository() {
    let manager = Arc::new(LocalTransactionManager::new());
    let (records, observer) = recorder();
    let factory = TransactionalProxyFactory::new(manager.clone()).with_observer(observer);
    let target: Arc<dyn CustomerRepository> = Arc::new(InMemoryCustomerRepository::new());

    let proxy = factory.wrap(target);
    let saved = proxy
        .save_all(vec![Customer::new("Alexey"), Customer::new("Josh")])
        .expect("save");
    let found = proxy.find_by_id(&[2]).expect("find");

    assert_eq!(saved.len(), 2);
    assert_eq!(found, vec![Customer::with_id(2, "Josh")]);
    assert_eq!(manager.stats().committed, 2);

    let records = records.lock().expect("records");
    let methods: Vec<&str> = records.iter().map(|r| r.method.as_str()).collect();
    assert_eq!(methods, vec!["save_all", "find_by_id"]);
    assert_eq!(records[1].arguments, vec!["[2]"]);
}

#[test]
fn test_container_exposes_transactional_repository() {
    let context = bare_builder()
        .with_definition(
            BeanDefinition::builder::<LocalTransactionManager>("transactionManager")
                .supplier(LocalTransactionManager::new)
                .provides::<dyn TransactionRunner>(|manager| manager)
                .build()
                .expect("manager"),
        )
        .with_definition(
            BeanDefinition::builder::<InMemoryCustomerRepository>("customerRepository")
                .supplier(InMemoryCustomerRepository::new)
                .transactional::<dyn CustomerRepository>(|repository| repository)
                .build()
                .expect("repository"),
        )
        .build()
        .expect("build");
    context.start().expect("start");

    let repository = context.resolve::<dyn CustomerRepository>().expect("repository");
    let manager = context.resolve::<LocalTransactionManager>().expect("manager");
    let raw = context
        .resolve::<InMemoryCustomerRepository>()
        .expect("raw repository");

    let error = repository
        .save_all(vec![Customer::new("Alexey"), Customer::new(" ")])
        .expect_err("blank name");
    assert!(matches!(
        error.transaction_cause(),
        Some(Error::InvalidArgument { .. })
    ));
    assert!(raw.is_empty());

    let saved = repository
        .save_all(vec![Customer::new("Alexey"), Customer::new("Josh")])
        .expect("save");
    assert_eq!(
        saved,
        vec![Customer::with_id(1, "Alexey"), Customer::with_id(2, "Josh")]
    );
    assert_eq!(
        manager.stats(),
        TransactionStats {
            begun: 2,
            committed: 1,
            rolled_back: 1
        }
    );
}

#[test]
fn test_transactional_bean_requires_runner() {
    let context = bare_builder()
        .with_definition(
            BeanDefinition::builder::<InMemoryCustomerRepository>("customerRepository")
                .supplier(InMemoryCustomerRepository::new)
                .transactional::<dyn CustomerRepository>(|repository| repository)
                .build()
                .expect("repository"),
        )
        .build()
        .expect("build");

    let error = context.start().expect_err("no runner registered");

    match error {
        Error::MissingDependency {
            capability,
            required_by,
            ..
        } => {
            assert!(capability.contains("TransactionRunner"));
            assert_eq!(required_by.as_deref(), Some("customerRepository"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_rolled_back_inserts_are_discarded() {
    let manager = Arc::new(LocalTransactionManager::new());
    let repository = Arc::new(InMemoryCustomerRepository::new().with_runner(manager.clone()));
    let proxy = TransactionalProxyFactory::new(manager.clone())
        .wrap(repository.clone() as Arc<dyn CustomerRepository>);
    let boundary = TransactionBoundary::new(manager.clone(), "CustomerService");

    let result = boundary.execute::<()>("register", call_args!(), || {
        let saved = proxy.save_all(vec![Customer::new("Alexey")])?;
        assert_eq!(saved, vec![Customer::with_id(1, "Alexey")]);
        assert_eq!(proxy.find_all()?, saved);
        Err(Error::invalid_state("ooops!"))
    });

    assert!(result.is_err());
    assert_eq!(
        manager.stats(),
        TransactionStats {
            begun: 1,
            committed: 0,
            rolled_back: 1
        }
    );
    assert!(repository.is_empty());
    assert!(proxy.find_all().expect("find_all").is_empty());
}

#[test]
fn test_staged_inserts_are_visible_after_commit_only() {
    let manager = Arc::new(LocalTransactionManager::new());
    let repository = Arc::new(InMemoryCustomerRepository::new().with_runner(manager.clone()));
    let boundary = TransactionBoundary::new(manager.clone(), "CustomerService");

    boundary
        .execute("register", call_args!(), || {
            repository.save_all(vec![Customer::new("Josh")])?;
            let seen_elsewhere = std::thread::scope(|scope| {
                scope
                    .spawn(|| repository.find_all().expect("find_all").len())
                    .join()
                    .expect("reader thread")
            });
            assert_eq!(seen_elsewhere, 0);
            assert!(repository.is_empty());
            Ok(())
        })
        .expect("commit");

    assert_eq!(
        repository.find_by_id(&[1]).expect("find"),
        vec![Customer::with_id(1, "Josh")]
    );
    assert_eq!(manager.stats().committed, 1);
}

#[test]
fn test_nested_failure_discards_outer_inserts() {
    let manager = Arc::new(LocalTransactionManager::new());
    let repository = Arc::new(InMemoryCustomerRepository::new().with_runner(manager.clone()));
    let proxy = TransactionalProxyFactory::new(manager.clone())
        .wrap(repository.clone() as Arc<dyn CustomerRepository>);
    let boundary = TransactionBoundary::new(manager.clone(), "CustomerService");

    let result = boundary.execute("register", call_args!(), || {
        proxy.save_all(vec![Customer::new("Alexey")])?;
        let rejected = proxy.save_all(vec![Customer::new("")]);
        assert!(rejected.is_err());
        Ok(())
    });

    assert!(result.is_err());
    assert!(repository.is_empty());
}
