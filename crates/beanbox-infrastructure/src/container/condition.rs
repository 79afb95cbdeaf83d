//! Registration conditions
//!
//! A conditional registration is evaluated once, when the builder reaches it,
//! against the environment and the definitions registered so far.

use super::capability::Capability;
use super::registry::BeanRegistry;
use crate::config::Environment;
use std::fmt;
use std::ops::Not;
use std::sync::Arc;

pub type ConditionFn = Arc<dyn Fn(&ConditionContext<'_>) -> bool + Send + Sync>;

/// What a condition can inspect
pub struct ConditionContext<'a> {
    registry: &'a BeanRegistry,
}

impl<'a> ConditionContext<'a> {
    pub fn new(registry: &'a BeanRegistry) -> Self {
        Self { registry }
    }

    pub fn environment(&self) -> &Environment {
        self.registry.environment()
    }

    /// Whether a definition providing `capability` is registered
    pub fn has_bean(&self, capability: &Capability) -> bool {
        self.registry.provides(capability)
    }

    pub fn contains_bean(&self, name: &str) -> bool {
        self.registry.contains_bean(name)
    }
}

/// Predicate gating a registration
#[derive(Clone)]
pub enum Condition {
    /// Property is set, and equals `having_value` when given
    OnProperty {
        key: String,
        having_value: Option<String>,
    },
    OnProfile(String),
    OnBean(Capability),
    OnMissingBean(Capability),
    Custom {
        description: String,
        predicate: ConditionFn,
    },
    All(Vec<Condition>),
    Negated(Box<Condition>),
}

impl Condition {
    pub fn on_property(key: impl Into<String>) -> Self {
        Self::OnProperty {
            key: key.into(),
            having_value: None,
        }
    }

    pub fn on_property_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::OnProperty {
            key: key.into(),
            having_value: Some(value.into()),
        }
    }

    pub fn on_profile(profile: impl Into<String>) -> Self {
        Self::OnProfile(profile.into())
    }

    pub fn on_bean<C: ?Sized + 'static>() -> Self {
        Self::OnBean(Capability::of::<C>())
    }

    pub fn on_missing_bean<C: ?Sized + 'static>() -> Self {
        Self::OnMissingBean(Capability::of::<C>())
    }

    pub fn custom<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&ConditionContext<'_>) -> bool + Send + Sync + 'static,
    {
        Self::Custom {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Both conditions must hold
    pub fn and(self, other: Condition) -> Self {
        match self {
            Self::All(mut conditions) => {
                conditions.push(other);
                Self::All(conditions)
            }
            single => Self::All(vec![single, other]),
        }
    }

    pub fn matches(&self, ctx: &ConditionContext<'_>) -> bool {
        match self {
            Self::OnProperty { key, having_value } => {
                match (ctx.environment().property(key), having_value) {
                    (None, _) => false,
                    (Some(_), None) => true,
                    (Some(actual), Some(expected)) => actual == expected,
                }
            }
            Self::OnProfile(profile) => ctx.environment().is_profile_active(profile),
            Self::OnBean(capability) => ctx.has_bean(capability),
            Self::OnMissingBean(capability) => !ctx.has_bean(capability),
            Self::Custom { predicate, .. } => predicate(ctx),
            Self::All(conditions) => conditions.iter().all(|condition| condition.matches(ctx)),
            Self::Negated(condition) => !condition.matches(ctx),
        }
    }
}

impl Not for Condition {
    type Output = Condition;

    fn not(self) -> Self::Output {
        match self {
            Self::Negated(inner) => *inner,
            condition => Self::Negated(Box::new(condition)),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnProperty {
                key,
                having_value: None,
            } => write!(f, "on_property({key})"),
            Self::OnProperty {
                key,
                having_value: Some(value),
            } => write!(f, "on_property({key} = {value})"),
            Self::OnProfile(profile) => write!(f, "on_profile({profile})"),
            Self::OnBean(capability) => write!(f, "on_bean({capability})"),
            Self::OnMissingBean(capability) => write!(f, "on_missing_bean({capability})"),
            Self::Custom { description, .. } => write!(f, "custom({description})"),
            Self::All(conditions) => {
                let parts: Vec<String> = conditions.iter().map(ToString::to_string).collect();
                write!(f, "all({})", parts.join(", "))
            }
            Self::Negated(condition) => write!(f, "not({condition})"),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
