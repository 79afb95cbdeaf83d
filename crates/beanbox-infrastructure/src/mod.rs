//! # Infrastructure Layer
//!
//! The container and the machinery around it.
//!
//! ### Container
//! | Module | Description |
//! |--------|-------------|
//! | [`container`] | Definitions, registry, conditions, auto-configuration, application context |
//! | [`lifecycle`] | Bean states, init/destroy hooks, shutdown report |
//! | [`events`] | Synchronous in-process event bus |
//! | [`transaction`] | Transaction manager and transactional proxies |
//!
//! ### Configuration & Observability
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Figment-layered configuration and the container environment |
//! | [`constants`] | Centralized configuration constants |
//! | [`logging`] | Structured logging with tracing |
//!
//! ### Adapters
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | In-memory customer repository and its transactional decorator |

pub mod adapters;
pub mod config;
pub mod constants;
pub mod container;
pub mod error_ext;
pub mod events;
pub mod lifecycle;
pub mod logging;
pub mod transaction;

mod utils;

pub use container::{
    ApplicationContext, BeanDefinition, BeanRegistry, Condition, Configuration, ContainerBuilder,
    Scope,
};
pub use error_ext::ErrorContext;
pub use events::EventBus;
pub use lifecycle::{Lifecycle, ShutdownReport};
