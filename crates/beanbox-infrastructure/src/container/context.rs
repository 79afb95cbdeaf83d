//! Application context
//!
//! Wraps a configured registry with the start / run / close sequence and
//! publishes container milestones on the event bus.

use super::instance::BeanInstance;
use super::registry::{BeanRegistry, RegistryState};
use crate::config::{ContainerConfig, Environment};
use crate::events::EventBus;
use crate::lifecycle::ShutdownReport;
use beanbox_domain::error::{Error, Result};
use beanbox_domain::events::ContainerEvent;
use beanbox_domain::ports::ApplicationRunner;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A running container
///
/// Dropping an open context closes it.
#[derive(Debug)]
pub struct ApplicationContext {
    registry: BeanRegistry,
    config: ContainerConfig,
}

impl ApplicationContext {
    pub(crate) fn new(registry: BeanRegistry, config: ContainerConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &BeanRegistry {
        &self.registry
    }

    pub fn environment(&self) -> &Environment {
        self.registry.environment()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        self.registry.event_bus()
    }

    pub fn resolve<C>(&self) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.registry.resolve::<C>(None)
    }

    pub fn resolve_qualified<C>(&self, qualifier: &str) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.registry.resolve::<C>(Some(qualifier))
    }

    pub fn resolve_all<C>(&self) -> Result<Vec<BeanInstance<C>>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.registry.resolve_all::<C>()
    }

    /// Realize every singleton and announce the start
    pub fn start(&self) -> Result<()> {
        if self.registry.state() == RegistryState::Started {
            return Ok(());
        }
        self.registry.start()?;
        if self.config.publish_container_events {
            let singletons = self.registry.singleton_count();
            self.event_bus()
                .publish(&ContainerEvent::Started { singletons })?;
        }
        Ok(())
    }

    /// Run every [`ApplicationRunner`] bean in registration order
    ///
    /// Stops at the first failing runner.
    pub fn run(&self, args: &[String]) -> Result<()> {
        if self.registry.state() != RegistryState::Started {
            return Err(Error::invalid_state(
                "application runners require a started container",
            ));
        }
        for runner in self.registry.resolve_all::<dyn ApplicationRunner>()? {
            info!(runner = runner.name(), "Running application runner");
            runner.run(args)?;
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.registry.state() == RegistryState::Started
    }

    /// Announce the shutdown and destroy every initialized singleton
    pub fn close(&self) -> ShutdownReport {
        match self.registry.state() {
            RegistryState::Closed => return ShutdownReport::default(),
            RegistryState::Started if self.config.publish_container_events => {
                if let Err(error) = self.event_bus().publish(&ContainerEvent::Closing) {
                    warn!(error = %error, "Closing event listeners failed");
                }
            }
            _ => {}
        }
        self.registry.close()
    }
}

impl Drop for ApplicationContext {
    fn drop(&mut self) {
        if self.registry.state() != RegistryState::Closed {
            debug!("Closing application context on drop");
            self.close();
        }
    }
}
