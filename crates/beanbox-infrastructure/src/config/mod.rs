//! Configuration
//!
//! Typed configuration loaded through Figment, and the [`Environment`] view
//! that conditions and bean factories consult.

pub mod environment;
pub mod loader;
pub mod types;

pub use environment::Environment;
pub use loader::ConfigLoader;
pub use types::{AppConfig, ContainerConfig, LoggingConfig};
