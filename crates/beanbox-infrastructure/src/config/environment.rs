//! Environment: properties and active profiles
//!
//! An immutable snapshot taken when the container is built. Conditions and
//! bean factories read it; nothing writes to it afterwards.

use super::AppConfig;
use beanbox_domain::error::{Error, Result};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Properties and profiles visible to the container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    properties: BTreeMap<String, String>,
    profiles: Vec<String>,
}

impl Environment {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the properties and profiles of an application configuration
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            properties: config.properties.clone(),
            profiles: config.profiles.clone(),
        }
    }

    /// Add or replace a property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Activate a profile
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        let profile = profile.into();
        if !self.profiles.contains(&profile) {
            self.profiles.push(profile);
        }
        self
    }

    /// Look up a property
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Look up a property, falling back to `default`
    pub fn property_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.property(key).unwrap_or(default)
    }

    /// Look up a property that must be present
    pub fn require_property(&self, key: &str) -> Result<&str> {
        self.property(key)
            .ok_or_else(|| Error::configuration(format!("Required property '{key}' is not set")))
    }

    /// Parse a property into `T`
    ///
    /// Returns `Ok(None)` when the property is absent.
    pub fn property_as<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.property(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| {
                    Error::configuration(format!("Property '{key}' has invalid value '{raw}': {e}"))
                })
            })
            .transpose()
    }

    /// Whether a property is present
    pub fn contains_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Active profiles in activation order
    pub fn active_profiles(&self) -> &[String] {
        &self.profiles
    }

    /// Whether `profile` is active
    pub fn is_profile_active(&self, profile: &str) -> bool {
        self.profiles.iter().any(|p| p == profile)
    }
}
