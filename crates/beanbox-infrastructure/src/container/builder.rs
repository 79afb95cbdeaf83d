//! Container assembly
//!
//! Registrations are applied in the order they were made, user registrations
//! first and linked auto-configurations after them, so an `on_missing_bean`
//! condition in an auto-configuration sees every user-supplied bean.

use super::auto_config::apply_auto_configurations;
use super::condition::{Condition, ConditionContext};
use super::context::ApplicationContext;
use super::definition::BeanDefinition;
use super::registry::BeanRegistry;
use crate::config::{AppConfig, ContainerConfig, Environment};
use beanbox_domain::error::Result;
use tracing::{debug, info};

/// A group of related registrations
pub trait Configuration {
    /// Label used in logs
    fn name(&self) -> &str;

    fn configure(&self, builder: &mut ContainerBuilder) -> Result<()>;
}

enum Registration {
    Always(BeanDefinition),
    When(Condition, BeanDefinition),
}

/// Collects registrations and builds an [`ApplicationContext`]
pub struct ContainerBuilder {
    environment: Environment,
    config: ContainerConfig,
    registrations: Vec<Registration>,
}

impl ContainerBuilder {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            config: ContainerConfig::default(),
            registrations: Vec::new(),
        }
    }

    /// Builder over the environment and container switches of `config`
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Environment::from_config(config)).with_container_config(config.container.clone())
    }

    pub fn with_container_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn container_config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn register(&mut self, definition: BeanDefinition) -> &mut Self {
        self.registrations.push(Registration::Always(definition));
        self
    }

    /// Register `definition` only if `condition` holds when it is reached
    pub fn register_when(&mut self, condition: Condition, definition: BeanDefinition) -> &mut Self {
        self.registrations
            .push(Registration::When(condition, definition));
        self
    }

    /// Chaining form of [`register`](Self::register)
    pub fn with_definition(mut self, definition: BeanDefinition) -> Self {
        self.register(definition);
        self
    }

    /// Apply a [`Configuration`]
    pub fn with_configuration<C: Configuration + ?Sized>(mut self, configuration: &C) -> Result<Self> {
        debug!(configuration = configuration.name(), "Applying configuration");
        configuration.configure(&mut self)?;
        Ok(self)
    }

    /// Number of pending registrations
    pub fn pending(&self) -> usize {
        self.registrations.len()
    }

    /// Register everything into a fresh registry
    ///
    /// The returned context is not started yet.
    pub fn build(mut self) -> Result<ApplicationContext> {
        if self.config.auto_configuration {
            apply_auto_configurations(&mut self)?;
        }

        let mut registry = BeanRegistry::new(self.environment, &self.config);
        for registration in self.registrations {
            match registration {
                Registration::Always(definition) => registry.register(definition)?,
                Registration::When(condition, definition) => {
                    let matched = condition.matches(&ConditionContext::new(&registry));
                    if matched {
                        debug!(bean = definition.name(), %condition, "Condition matched");
                        registry.register(definition)?;
                    } else {
                        debug!(
                            bean = definition.name(),
                            %condition,
                            "Condition did not match, skipping bean"
                        );
                    }
                }
            }
        }

        info!(definitions = registry.definition_count(), "Container configured");
        Ok(ApplicationContext::new(registry, self.config))
    }
}
