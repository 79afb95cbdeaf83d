//! Bean registry
//!
//! Owns definitions and realized singletons, and resolves capabilities to
//! instances. Resolution selects exactly one candidate per request:
//!
//! | Request | Candidates | Outcome |
//! |---------|------------|---------|
//! | qualified | none match | missing dependency |
//! | qualified | one matches | that bean |
//! | qualified | several match | ambiguous |
//! | unqualified | none | missing dependency |
//! | unqualified | one | that bean |
//! | unqualified | several, one primary | the primary bean |
//! | unqualified | several otherwise | ambiguous |
//!
//! Singleton creation is serialized by a reentrant lock so nested resolution
//! from inside a factory works on the creating thread while other threads
//! wait for the finished instance. The stack of beans in creation doubles as
//! the cycle detector for beans resolved before [`BeanRegistry::start`].
//!
//! A singleton becomes ready only once its hooks, capability views and
//! listener bindings all succeed. If any of them fails after the factory ran,
//! the bean is never built again; later requests report the earlier failure.

use super::capability::Capability;
use super::definition::{BeanDefinition, BeanObject, Scope};
use super::graph::DependencyGraph;
use super::instance::BeanInstance;
use crate::config::{ContainerConfig, Environment};
use crate::constants::{ENVIRONMENT_BEAN_NAME, EVENT_BUS_BEAN_NAME};
use crate::events::{EventBus, SubscriptionHandle};
use crate::lifecycle::{LifecycleManager, ShutdownReport};
use beanbox_domain::error::{Error, Result};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde::Serialize;
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryState {
    /// Accepting definitions
    Configuring,
    /// Eager singletons realized
    Started,
    /// Shut down; every resolution fails
    Closed,
}

struct CreatedBean {
    views: HashMap<TypeId, BeanObject>,
}

/// Definition store and resolver
pub struct BeanRegistry {
    definitions: Vec<Arc<BeanDefinition>>,
    by_name: HashMap<String, usize>,
    by_capability: HashMap<TypeId, Vec<usize>>,
    allow_overriding: bool,
    environment: Arc<Environment>,
    event_bus: Arc<EventBus>,
    lifecycle: LifecycleManager,
    singletons: RwLock<HashMap<usize, Arc<CreatedBean>>>,
    failed: Mutex<HashMap<usize, String>>,
    creation: ReentrantMutex<RefCell<Vec<usize>>>,
    subscriptions: Mutex<Vec<SubscriptionHandle>>,
    state: RwLock<RegistryState>,
}

impl BeanRegistry {
    /// Empty registry holding only the `environment` and `eventBus` beans
    pub fn new(environment: Environment, config: &ContainerConfig) -> Self {
        let environment = Arc::new(environment);
        let event_bus = Arc::new(EventBus::new());
        let mut registry = Self {
            definitions: Vec::new(),
            by_name: HashMap::new(),
            by_capability: HashMap::new(),
            allow_overriding: config.allow_bean_overriding,
            environment: Arc::clone(&environment),
            event_bus: Arc::clone(&event_bus),
            lifecycle: LifecycleManager::new(),
            singletons: RwLock::new(HashMap::new()),
            failed: Mutex::new(HashMap::new()),
            creation: ReentrantMutex::new(RefCell::new(Vec::new())),
            subscriptions: Mutex::new(Vec::new()),
            state: RwLock::new(RegistryState::Configuring),
        };
        registry.insert(BeanDefinition::from_instance(
            ENVIRONMENT_BEAN_NAME,
            "Configuration properties and active profiles",
            environment,
        ));
        registry.insert(BeanDefinition::from_instance(
            EVENT_BUS_BEAN_NAME,
            "Synchronous in-process event bus",
            event_bus,
        ));
        registry
    }

    /// Add a definition
    ///
    /// A name clash fails unless overriding is enabled for the registry or
    /// for the incoming definition, in which case the new definition takes
    /// the old one's place.
    pub fn register(&mut self, definition: BeanDefinition) -> Result<()> {
        if *self.state.get_mut() != RegistryState::Configuring {
            return Err(Error::invalid_state(format!(
                "cannot register '{}' after the container has started",
                definition.name()
            )));
        }

        let name = definition.name().to_string();
        match self.by_name.get(&name).copied() {
            Some(index) => {
                if !(self.allow_overriding || definition.allows_override()) {
                    return Err(Error::duplicate_definition(name));
                }
                info!(
                    bean = %name,
                    replaced = self.definitions[index].bean_type(),
                    with = definition.bean_type(),
                    "Overriding bean definition"
                );
                self.definitions[index] = Arc::new(definition);
                self.singletons.get_mut().remove(&index);
                self.failed.get_mut().remove(&index);
                self.reindex_capabilities();
            }
            None => {
                debug!(bean = %name, scope = %definition.scope(), "Registered bean definition");
                self.insert(definition);
            }
        }
        Ok(())
    }

    fn insert(&mut self, definition: BeanDefinition) {
        let index = self.definitions.len();
        for capability in definition.capabilities() {
            self.by_capability
                .entry(capability.id())
                .or_default()
                .push(index);
        }
        self.by_name.insert(definition.name().to_string(), index);
        self.definitions.push(Arc::new(definition));
    }

    fn reindex_capabilities(&mut self) {
        self.by_capability.clear();
        for (index, definition) in self.definitions.iter().enumerate() {
            for capability in definition.capabilities() {
                self.by_capability
                    .entry(capability.id())
                    .or_default()
                    .push(index);
            }
        }
    }

    /// Resolve capability `C`, optionally narrowed by qualifier
    pub fn resolve<C>(&self, qualifier: Option<&str>) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.resolve_bean::<C>(qualifier)
            .map(BeanInstance::into_inner)
    }

    /// Resolve capability `C` together with its definition
    pub fn resolve_bean<C>(&self, qualifier: Option<&str>) -> Result<BeanInstance<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.ensure_open()?;
        let capability = Capability::of::<C>();
        let index = self.select_candidate(&capability, qualifier)?;
        self.instance_of(index, &capability)
    }

    /// Resolve `C` if any bean provides it
    ///
    /// Only a missing candidate yields `None`; ambiguity and creation
    /// failures still surface as errors.
    pub fn resolve_optional<C>(&self, qualifier: Option<&str>) -> Result<Option<Arc<C>>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.ensure_open()?;
        let capability = Capability::of::<C>();
        let index = match self.select_candidate(&capability, qualifier) {
            Ok(index) => index,
            Err(Error::MissingDependency { .. }) => return Ok(None),
            Err(error) => return Err(error),
        };
        self.instance_of::<C>(index, &capability)
            .map(|bean| Some(bean.into_inner()))
    }

    /// Every bean providing `C`, in registration order
    pub fn resolve_all<C>(&self) -> Result<Vec<BeanInstance<C>>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.ensure_open()?;
        let capability = Capability::of::<C>();
        self.candidate_indices(&capability)
            .iter()
            .map(|&index| self.instance_of(index, &capability))
            .collect()
    }

    /// Whether any definition provides `C`
    pub fn contains<C: ?Sized + 'static>(&self) -> bool {
        self.provides(&Capability::of::<C>())
    }

    /// Whether any definition provides `capability`
    pub fn provides(&self, capability: &Capability) -> bool {
        !self.candidate_indices(capability).is_empty()
    }

    pub fn contains_bean(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn definition(&self, name: &str) -> Option<&BeanDefinition> {
        self.by_name
            .get(name)
            .map(|&index| self.definitions[index].as_ref())
    }

    /// Definitions in registration order
    pub fn definitions(&self) -> impl Iterator<Item = &BeanDefinition> + '_ {
        self.definitions.iter().map(Arc::as_ref)
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// Number of realized singletons
    pub fn singleton_count(&self) -> usize {
        self.singletons.read().len()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn state(&self) -> RegistryState {
        *self.state.read()
    }

    /// Wiring graph over the current definitions
    pub fn dependency_graph(&self) -> Result<DependencyGraph> {
        DependencyGraph::build(self)
    }

    /// Validate wiring and realize every singleton in dependency order
    ///
    /// Missing, ambiguous, and cyclic dependencies are reported before any
    /// factory runs. An initialization failure aborts start; beans already
    /// initialized stay registered for [`close`](Self::close) to destroy.
    pub fn start(&self) -> Result<()> {
        match self.state() {
            RegistryState::Started => {
                debug!("Container already started");
                return Ok(());
            }
            RegistryState::Closed => {
                return Err(Error::invalid_state("cannot start a closed container"));
            }
            RegistryState::Configuring => {}
        }

        let order = self.dependency_graph()?.topological_order()?;
        info!(definitions = self.definitions.len(), "Starting container");
        for index in order {
            if self.definitions[index].scope() == Scope::Singleton {
                self.singleton(index)?;
            }
        }

        *self.state.write() = RegistryState::Started;
        info!(singletons = self.singleton_count(), "Container started");
        Ok(())
    }

    /// Destroy initialized singletons in reverse initialization order
    ///
    /// Idempotent; a second call returns an empty report.
    pub fn close(&self) -> ShutdownReport {
        {
            let mut state = self.state.write();
            if *state == RegistryState::Closed {
                return ShutdownReport::default();
            }
            *state = RegistryState::Closed;
        }

        info!("Closing container");
        let handles = std::mem::take(&mut *self.subscriptions.lock());
        for handle in &handles {
            self.event_bus.unsubscribe(handle);
        }
        let report = self.lifecycle.destroy_all();
        self.singletons.write().clear();
        info!(
            destroyed = report.destroyed.len(),
            failures = report.failures.len(),
            "Container closed"
        );
        report
    }

    pub(crate) fn candidate_indices(&self, capability: &Capability) -> &[usize] {
        self.by_capability
            .get(&capability.id())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn definition_at(&self, index: usize) -> &BeanDefinition {
        &self.definitions[index]
    }

    /// Pick the single definition answering a request
    pub(crate) fn select_candidate(
        &self,
        capability: &Capability,
        qualifier: Option<&str>,
    ) -> Result<usize> {
        let candidates = self.candidate_indices(capability);
        let matching: Vec<usize> = match qualifier {
            Some(qualifier) => candidates
                .iter()
                .copied()
                .filter(|&index| self.definitions[index].matches_qualifier(qualifier))
                .collect(),
            None => candidates.to_vec(),
        };

        match matching.as_slice() {
            [] => Err(Error::missing_dependency(capability.name(), qualifier)),
            [only] => Ok(*only),
            several => {
                if qualifier.is_none() {
                    let primaries: Vec<usize> = several
                        .iter()
                        .copied()
                        .filter(|&index| self.definitions[index].is_primary())
                        .collect();
                    if let [primary] = primaries.as_slice() {
                        return Ok(*primary);
                    }
                }
                Err(Error::ambiguous_dependency(
                    capability.name(),
                    qualifier,
                    several
                        .iter()
                        .map(|&index| self.definitions[index].name().to_string())
                        .collect(),
                ))
            }
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state() == RegistryState::Closed {
            return Err(Error::invalid_state("container is closed"));
        }
        Ok(())
    }

    fn instance_of<C>(&self, index: usize, capability: &Capability) -> Result<BeanInstance<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let definition = Arc::clone(&self.definitions[index]);
        let created = match definition.scope() {
            Scope::Singleton => self.singleton(index)?,
            Scope::Prototype => Arc::new(self.create(index)?),
        };
        let view = created.views.get(&capability.id()).ok_or_else(|| {
            Error::internal(format!(
                "bean '{}' has no view for {}",
                definition.name(),
                capability
            ))
        })?;
        let instance = view.downcast_ref::<Arc<C>>().cloned().ok_or_else(|| {
            Error::internal(format!(
                "view of bean '{}' is not a {}",
                definition.name(),
                capability
            ))
        })?;
        Ok(BeanInstance::new(instance, definition))
    }

    fn singleton(&self, index: usize) -> Result<Arc<CreatedBean>> {
        let cached = self.singletons.read().get(&index).cloned();
        if let Some(created) = cached {
            return Ok(created);
        }

        let _creating = self.creation.lock();
        let cached = self.singletons.read().get(&index).cloned();
        if let Some(created) = cached {
            return Ok(created);
        }
        let failure = self.failed.lock().get(&index).cloned();
        if let Some(message) = failure {
            return Err(Error::initialization(
                self.definitions[index].name(),
                Error::invalid_state(format!(
                    "an earlier initialization attempt failed: {message}"
                )),
            ));
        }

        let created = Arc::new(self.create(index)?);
        self.singletons.write().insert(index, Arc::clone(&created));
        Ok(created)
    }

    fn create(&self, index: usize) -> Result<CreatedBean> {
        let guard = self.creation.lock();
        {
            let mut in_creation = guard.borrow_mut();
            if let Some(position) = in_creation.iter().position(|&i| i == index) {
                let cycle = in_creation[position..]
                    .iter()
                    .map(|&i| self.definitions[i].name().to_string())
                    .collect();
                return Err(Error::cyclic_dependency(cycle));
            }
            in_creation.push(index);
        }

        let result = self.instantiate(index);
        guard.borrow_mut().pop();
        result
    }

    fn instantiate(&self, index: usize) -> Result<CreatedBean> {
        let definition = Arc::clone(&self.definitions[index]);
        let name = definition.name();
        let ctx = BeanContext::new(self, name);

        for dependency in definition.dependencies() {
            let dependency_index = self
                .select_candidate(dependency.capability(), dependency.qualifier())
                .map_err(|error| error.required_by(name))?;
            if self.definitions[dependency_index].scope() == Scope::Singleton {
                self.singleton(dependency_index)?;
            }
        }

        debug!(bean = name, bean_type = definition.bean_type(), "Creating bean");
        let object = (definition.factory())(&ctx).map_err(|error| error.required_by(name))?;

        let singleton = definition.scope() == Scope::Singleton;
        match self.initialize(&definition, &object, &ctx, singleton) {
            Ok((created, handles)) => {
                if singleton {
                    self.subscriptions.lock().extend(handles);
                    self.lifecycle.mark_ready(&definition, &object);
                }
                Ok(created)
            }
            Err(error) => {
                if singleton {
                    let message = match &error {
                        Error::Initialization { source, .. } => source.to_string(),
                        other => other.to_string(),
                    };
                    self.failed.lock().insert(index, message);
                }
                Err(error)
            }
        }
    }

    /// Hooks, capability views and listener bindings of a constructed object
    ///
    /// On failure nothing stays subscribed and the bean is not tracked for
    /// destruction.
    fn initialize(
        &self,
        definition: &Arc<BeanDefinition>,
        object: &BeanObject,
        ctx: &BeanContext<'_>,
        singleton: bool,
    ) -> Result<(CreatedBean, Vec<SubscriptionHandle>)> {
        let name = definition.name();
        self.lifecycle.initialize(definition, object, singleton)?;

        let mut views = HashMap::with_capacity(definition.bindings().len());
        for binding in definition.bindings() {
            let view = (binding.view)(object, ctx)
                .map_err(|error| Error::initialization(name, error))?;
            views.insert(binding.capability.id(), view);
        }

        let mut handles = Vec::new();
        if singleton {
            for listener in definition.listeners() {
                let label = format!("{name} <- {}", listener.event);
                match (listener.bind)(object, &self.event_bus, label) {
                    Ok(handle) => handles.push(handle),
                    Err(error) => {
                        for handle in &handles {
                            self.event_bus.unsubscribe(handle);
                        }
                        return Err(Error::initialization(name, error));
                    }
                }
            }
        }

        Ok((CreatedBean { views }, handles))
    }
}

impl fmt::Debug for BeanRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanRegistry")
            .field("state", &self.state())
            .field(
                "definitions",
                &self.definitions.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .field("singletons", &self.singleton_count())
            .finish()
    }
}

/// Resolution scope handed to factories and capability views
pub struct BeanContext<'a> {
    registry: &'a BeanRegistry,
    bean: &'a str,
}

impl<'a> BeanContext<'a> {
    pub(crate) fn new(registry: &'a BeanRegistry, bean: &'a str) -> Self {
        Self { registry, bean }
    }

    /// Name of the bean being created
    pub fn bean_name(&self) -> &str {
        self.bean
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
        self.registry
            .resolve::<C>(None)
            .map_err(|error| error.required_by(self.bean))
    }

    pub fn resolve_qualified<C>(&self, qualifier: &str) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.registry
            .resolve::<C>(Some(qualifier))
            .map_err(|error| error.required_by(self.bean))
    }

    pub fn resolve_optional<C>(&self) -> Result<Option<Arc<C>>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.registry.resolve_optional::<C>(None)
    }

    pub fn resolve_all<C>(&self) -> Result<Vec<Arc<C>>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        Ok(self
            .registry
            .resolve_all::<C>()?
            .into_iter()
            .map(BeanInstance::into_inner)
            .collect())
    }
}
