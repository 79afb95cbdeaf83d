//! # beanbox domain
//!
//! Core types shared by every layer: the error taxonomy, the record-store
//! entities, the events published on the in-process bus and the ports that
//! infrastructure adapters implement.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | `Error` taxonomy and `Result` alias |
//! | [`entities`] | `Customer` record |
//! | [`events`] | `UserAuthenticated`, `ContainerEvent` |
//! | [`ports`] | `CustomerRepository`, `TransactionRunner`, `ApplicationRunner`, `NameProducer` |

pub mod entities;
pub mod error;
pub mod events;
pub mod ports;

pub use entities::Customer;
pub use error::{Error, ListenerError, ListenerFailure, Result};
pub use events::{ContainerEvent, UserAuthenticated};
