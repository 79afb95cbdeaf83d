//! Concrete implementations of domain ports

pub mod customer_repository;

pub use customer_repository::{InMemoryCustomerRepository, TransactionalCustomerRepository};
