//! Dependency injection container
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`BeanDefinition`] | Immutable recipe for one bean |
//! | [`BeanRegistry`] | Stores definitions, resolves capabilities |
//! | [`DependencyGraph`] | Start-time wiring validation and ordering |
//! | [`Condition`] | Gates conditional registrations |
//! | [`ContainerBuilder`] | Collects registrations, applies auto-configuration |
//! | [`ApplicationContext`] | Start, run, close |

pub mod auto_config;
pub mod builder;
pub mod capability;
pub mod condition;
pub mod context;
pub mod definition;
pub mod graph;
pub mod instance;
pub mod registry;

pub use auto_config::{list_auto_configurations, AutoConfigurationEntry, AUTO_CONFIGURATIONS};
pub use builder::{Configuration, ContainerBuilder};
pub use capability::Capability;
pub use condition::{Condition, ConditionContext};
pub use context::ApplicationContext;
pub use definition::{BeanDefinition, BeanDefinitionBuilder, BeanObject, Dependency, Scope};
pub use graph::{DependencyEdge, DependencyGraph};
pub use instance::BeanInstance;
pub use registry::{BeanContext, BeanRegistry, RegistryState};
