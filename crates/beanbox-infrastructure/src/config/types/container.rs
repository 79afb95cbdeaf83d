//! Container configuration types

use serde::{Deserialize, Serialize};

/// Container behaviour switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Let a later definition replace an earlier one with the same name
    pub allow_bean_overriding: bool,

    /// Apply the linked auto-configuration entries after user registrations
    pub auto_configuration: bool,

    /// Publish `ContainerEvent::Started` / `ContainerEvent::Closing`
    pub publish_container_events: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            allow_bean_overriding: false,
            auto_configuration: true,
            publish_container_events: true,
        }
    }
}
