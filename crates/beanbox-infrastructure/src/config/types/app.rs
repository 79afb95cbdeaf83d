//! Root application configuration

use super::{ContainerConfig, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration for a beanbox application
///
/// `properties` is the free-form key/value source behind
/// [`Environment`](crate::config::Environment); keys are conventionally
/// dotted (`greeting.name`), so quote them in TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Container configuration
    pub container: ContainerConfig,

    /// Active profiles
    pub profiles: Vec<String>,

    /// Application properties
    pub properties: BTreeMap<String, String>,
}
