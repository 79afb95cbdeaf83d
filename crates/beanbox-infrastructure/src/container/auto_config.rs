//! Auto-configuration registry
//!
//! Crates contribute auto-configurations at link time via linkme. Entries are
//! applied after user registrations, in name order.
//!
//! ```ignore
//! #[linkme::distributed_slice(AUTO_CONFIGURATIONS)]
//! static GREETING: AutoConfigurationEntry = AutoConfigurationEntry {
//!     name: "greeting",
//!     description: "Greeting runners",
//!     configure: configure_greeting,
//! };
//! ```

use super::builder::ContainerBuilder;
use super::condition::Condition;
use super::definition::BeanDefinition;
use crate::constants::TRANSACTION_MANAGER_BEAN_NAME;
use crate::transaction::LocalTransactionManager;
use beanbox_domain::error::{Error, Result};
use beanbox_domain::ports::TransactionRunner;
use tracing::debug;

/// An auto-configuration contributed by a linked crate
pub struct AutoConfigurationEntry {
    /// Unique name; also the application order key
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Adds (usually conditional) registrations
    pub configure: fn(&mut ContainerBuilder) -> Result<()>,
}

/// Every linked auto-configuration
#[linkme::distributed_slice]
pub static AUTO_CONFIGURATIONS: [AutoConfigurationEntry] = [..];

/// Names and descriptions of every linked auto-configuration
pub fn list_auto_configurations() -> Vec<(&'static str, &'static str)> {
    let mut entries: Vec<_> = AUTO_CONFIGURATIONS
        .iter()
        .map(|entry| (entry.name, entry.description))
        .collect();
    entries.sort_by_key(|(name, _)| *name);
    entries
}

pub(crate) fn apply_auto_configurations(builder: &mut ContainerBuilder) -> Result<()> {
    let mut entries: Vec<&AutoConfigurationEntry> = AUTO_CONFIGURATIONS.iter().collect();
    entries.sort_by_key(|entry| entry.name);
    for entry in entries {
        debug!(auto_configuration = entry.name, "Applying auto-configuration");
        (entry.configure)(builder).map_err(|error| {
            Error::configuration_with_source(
                format!("Auto-configuration '{}' failed", entry.name),
                error,
            )
        })?;
    }
    Ok(())
}

#[linkme::distributed_slice(AUTO_CONFIGURATIONS)]
static TRANSACTION_AUTO_CONFIGURATION: AutoConfigurationEntry = AutoConfigurationEntry {
    name: "transaction",
    description: "Local transaction manager unless a TransactionRunner is registered",
    configure: configure_transactions,
};

fn configure_transactions(builder: &mut ContainerBuilder) -> Result<()> {
    let definition =
        BeanDefinition::builder::<LocalTransactionManager>(TRANSACTION_MANAGER_BEAN_NAME)
            .description("Thread-bound transaction manager with nested-call participation")
            .supplier(LocalTransactionManager::new)
            .provides::<dyn TransactionRunner>(|manager| manager)
            .build()?;
    builder.register_when(Condition::on_missing_bean::<dyn TransactionRunner>(), definition);
    Ok(())
}
