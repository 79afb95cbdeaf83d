//! Events published on the in-process event bus

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user finished authenticating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAuthenticated {
    /// When authentication completed
    pub when: DateTime<Utc>,
    /// Who authenticated
    pub username: String,
}

impl UserAuthenticated {
    /// Create an event stamped with the current time
    pub fn now(username: impl Into<String>) -> Self {
        Self {
            when: Utc::now(),
            username: username.into(),
        }
    }
}

/// Container lifecycle milestones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerEvent {
    /// Every singleton has been constructed and initialized
    Started {
        /// Number of singletons that are ready
        singletons: usize,
    },
    /// The container is about to destroy its beans
    Closing,
}
