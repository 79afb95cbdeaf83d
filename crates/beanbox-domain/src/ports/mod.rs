//! Ports implemented by infrastructure adapters and demo beans
//!
//! | Port | Purpose |
//! |------|---------|
//! | [`CustomerRepository`] | CRUD record store |
//! | [`TransactionRunner`] | begin/commit/rollback boundary |
//! | [`ApplicationRunner`] | work invoked once the container has started |
//! | [`NameProducer`] | supplies a name to greet |

pub mod repository;
pub mod runner;
pub mod transaction;

pub use repository::CustomerRepository;
pub use runner::{ApplicationRunner, NameProducer};
pub use transaction::{Transaction, TransactionResource, TransactionRunner};
