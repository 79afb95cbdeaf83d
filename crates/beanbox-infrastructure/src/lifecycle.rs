//! Bean lifecycle management
//!
//! Tracks the state of every singleton and runs its hooks:
//!
//! ```text
//! Uninitialized -> Constructed -> Ready -> Destroying -> Destroyed
//! ```
//!
//! Singletons are destroyed in the reverse of the order they became ready.
//! Destruction never fails as a whole: hook errors and panics are logged and
//! collected into the [`ShutdownReport`], and the remaining beans are still
//! destroyed.

use crate::container::definition::{BeanDefinition, BeanObject};
use crate::utils::panic_message;
use beanbox_domain::error::{Error, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Lifecycle state of a singleton
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BeanState {
    #[default]
    Uninitialized,
    /// Factory returned, after-construct hooks pending or failed
    Constructed,
    Ready,
    Destroying,
    Destroyed,
}

/// Init/destroy callbacks implemented by the bean itself
///
/// Wired with [`BeanDefinitionBuilder::with_lifecycle`](crate::container::BeanDefinitionBuilder::with_lifecycle).
pub trait Lifecycle: Send + Sync + 'static {
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        Ok(())
    }
}

/// A before-destroy hook that failed or panicked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookFailure {
    pub bean: String,
    pub hook: String,
    pub message: String,
}

/// Outcome of closing a container
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShutdownReport {
    /// Beans destroyed, in destruction order
    pub destroyed: Vec<String>,
    pub failures: Vec<HookFailure>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct ManagedBean {
    definition: Arc<BeanDefinition>,
    object: BeanObject,
}

/// Hook runner and state tracker for singletons
#[derive(Default)]
pub struct LifecycleManager {
    states: Mutex<HashMap<String, BeanState>>,
    ready: Mutex<Vec<ManagedBean>>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, bean: &str) -> BeanState {
        self.states.lock().get(bean).copied().unwrap_or_default()
    }

    /// Names of ready singletons in the order they became ready
    pub fn construction_order(&self) -> Vec<String> {
        self.ready
            .lock()
            .iter()
            .map(|bean| bean.definition.name().to_string())
            .collect()
    }

    /// Run after-construct hooks for a freshly built object
    ///
    /// Only tracked objects (singletons) get a state; they stay
    /// `Constructed` until [`mark_ready`](Self::mark_ready). Prototypes run
    /// their hooks and are then left to their owner.
    pub(crate) fn initialize(
        &self,
        definition: &BeanDefinition,
        object: &BeanObject,
        track: bool,
    ) -> Result<()> {
        let name = definition.name();
        if track {
            self.set_state(name, BeanState::Constructed);
        }

        for hook in definition.after_construct_hooks() {
            debug!(bean = name, hook = %hook.label, "Running after-construct hook");
            (hook.run)(object).map_err(|error| Error::initialization(name, error))?;
        }
        Ok(())
    }

    /// Track an initialized singleton for destruction on close
    pub(crate) fn mark_ready(&self, definition: &Arc<BeanDefinition>, object: &BeanObject) {
        self.set_state(definition.name(), BeanState::Ready);
        self.ready.lock().push(ManagedBean {
            definition: Arc::clone(definition),
            object: Arc::clone(object),
        });
    }

    /// Destroy every ready singleton, newest first
    pub(crate) fn destroy_all(&self) -> ShutdownReport {
        let beans = std::mem::take(&mut *self.ready.lock());
        let mut report = ShutdownReport::default();

        for bean in beans.into_iter().rev() {
            let name = bean.definition.name();
            self.set_state(name, BeanState::Destroying);
            for hook in bean.definition.before_destroy_hooks() {
                debug!(bean = name, hook = %hook.label, "Running before-destroy hook");
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| (hook.run)(&bean.object)));
                let message = match outcome {
                    Ok(Ok(())) => continue,
                    Ok(Err(error)) => error.to_string(),
                    Err(payload) => format!("panicked: {}", panic_message(&*payload)),
                };
                warn!(bean = name, hook = %hook.label, error = %message, "Before-destroy hook failed");
                report.failures.push(HookFailure {
                    bean: name.to_string(),
                    hook: hook.label.clone(),
                    message,
                });
            }
            self.set_state(name, BeanState::Destroyed);
            report.destroyed.push(name.to_string());
        }
        report
    }

    fn set_state(&self, bean: &str, state: BeanState) {
        self.states.lock().insert(bean.to_string(), state);
    }
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("ready", &self.construction_order())
            .finish()
    }
}
