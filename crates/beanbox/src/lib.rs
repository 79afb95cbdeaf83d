//! # beanbox
//!
//! A small dependency injection container: named bean definitions resolved
//! by capability, singleton and prototype scopes, init/destroy hooks, a
//! synchronous event bus and transactional proxies.
//!
//! ## Example
//!
//! ```ignore
//! use beanbox::domain::ports::CustomerRepository;
//! use beanbox::infrastructure::adapters::InMemoryCustomerRepository;
//! use beanbox::infrastructure::config::Environment;
//! use beanbox::infrastructure::{BeanDefinition, ContainerBuilder};
//!
//! let mut builder = ContainerBuilder::new(Environment::new());
//! builder.register(
//!     BeanDefinition::builder::<InMemoryCustomerRepository>("customerRepository")
//!         .supplier(InMemoryCustomerRepository::new)
//!         .transactional::<dyn CustomerRepository>(|repo| repo)
//!         .build()?,
//! );
//! let context = builder.build()?;
//! context.start()?;
//! let repository = context.resolve::<dyn CustomerRepository>()?;
//! ```
//!
//! ## Architecture
//!
//! - `domain` - errors, entities, events and ports
//! - `infrastructure` - container, lifecycle, event bus, transactions, config, logging
//! - `app` - the demo application wired by the `beanbox` binary

/// Domain layer - errors, entities, events and ports
///
/// Re-exports from the domain crate for convenience
pub mod domain {
    pub use beanbox_domain::*;
}

/// Infrastructure layer - container, config and logging
///
/// Re-exports from the infrastructure crate for convenience
pub mod infrastructure {
    pub use beanbox_infrastructure::*;
}

pub mod app;

pub use app::{run, RunOptions};
