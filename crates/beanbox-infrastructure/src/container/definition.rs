//! Bean definitions
//!
//! A [`BeanDefinition`] is the immutable recipe for one bean: how to build it,
//! which capabilities it satisfies, what it needs, and the hooks that run
//! around its lifetime. Definitions are assembled with [`BeanDefinitionBuilder`]
//! and handed to the registry, which owns them until the container closes.
//!
//! Every capability a bean provides is stored type-erased as an `Arc<Arc<C>>`
//! so that the registry can hand out `Arc<C>` for unsized `C` (trait objects)
//! without knowing `C` at registration time.

use super::capability::Capability;
use super::registry::BeanContext;
use crate::events::{Event, EventBus, SubscriptionHandle};
use crate::lifecycle::Lifecycle;
use crate::transaction::{TransactionalCapability, TransactionalProxyFactory};
use beanbox_domain::error::{Error, Result};
use beanbox_domain::ports::TransactionRunner;
use serde::Serialize;
use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Type-erased bean object
pub type BeanObject = Arc<dyn Any + Send + Sync>;

pub(crate) type FactoryFn = Box<dyn Fn(&BeanContext<'_>) -> Result<BeanObject> + Send + Sync>;
pub(crate) type HookFn = Box<dyn Fn(&BeanObject) -> Result<()> + Send + Sync>;
pub(crate) type ViewFn =
    Box<dyn Fn(&BeanObject, &BeanContext<'_>) -> Result<BeanObject> + Send + Sync>;
pub(crate) type BindFn =
    Box<dyn Fn(&BeanObject, &EventBus, String) -> Result<SubscriptionHandle> + Send + Sync>;

/// Instance-sharing policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// One shared instance per registry
    #[default]
    Singleton,
    /// A fresh instance per resolution
    Prototype,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Singleton => f.write_str("singleton"),
            Scope::Prototype => f.write_str("prototype"),
        }
    }
}

/// A declared need for a capability, optionally narrowed by qualifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    capability: Capability,
    qualifier: Option<String>,
}

impl Dependency {
    pub fn new(capability: Capability, qualifier: Option<String>) -> Self {
        Self {
            capability,
            qualifier,
        }
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{} @ '{}'", self.capability, qualifier),
            None => write!(f, "{}", self.capability),
        }
    }
}

pub(crate) struct Hook {
    pub(crate) label: String,
    pub(crate) run: HookFn,
}

impl Hook {
    fn typed<T, F>(label: String, hook: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            label,
            run: Box::new(move |object: &BeanObject| {
                let bean = object.downcast_ref::<T>().ok_or_else(type_mismatch::<T>)?;
                hook(bean)
            }),
        }
    }
}

pub(crate) struct CapabilityBinding {
    pub(crate) capability: Capability,
    pub(crate) view: ViewFn,
}

pub(crate) struct ListenerBinding {
    pub(crate) event: &'static str,
    pub(crate) bind: BindFn,
}

/// Immutable bean recipe
pub struct BeanDefinition {
    name: String,
    bean_type: &'static str,
    description: Option<String>,
    scope: Scope,
    primary: bool,
    allow_override: bool,
    qualifiers: Vec<String>,
    dependencies: Vec<Dependency>,
    bindings: Vec<CapabilityBinding>,
    factory: FactoryFn,
    after_construct: Vec<Hook>,
    before_destroy: Vec<Hook>,
    listeners: Vec<ListenerBinding>,
}

impl BeanDefinition {
    /// Start a definition for a bean of concrete type `T`
    pub fn builder<T: Send + Sync + 'static>(name: impl Into<String>) -> BeanDefinitionBuilder<T> {
        BeanDefinitionBuilder::new(name.into())
    }

    /// Definition that always yields an already constructed instance
    pub(crate) fn from_instance<T: Send + Sync + 'static>(
        name: &str,
        description: &str,
        instance: Arc<T>,
    ) -> Self {
        let factory: FactoryFn =
            Box::new(move |_: &BeanContext<'_>| Ok(Arc::clone(&instance) as BeanObject));
        Self::builder::<T>(name)
            .description(description)
            .assemble(factory)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Concrete type name of the bean
    pub fn bean_type(&self) -> &'static str {
        self.bean_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Whether this definition may replace an existing one with the same name
    pub fn allows_override(&self) -> bool {
        self.allow_override
    }

    pub fn qualifiers(&self) -> &[String] {
        &self.qualifiers
    }

    /// Declared dependencies, in declaration order
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Capabilities this bean can be resolved as, its own type first
    pub fn capabilities(&self) -> impl Iterator<Item = &Capability> + '_ {
        self.bindings.iter().map(|binding| &binding.capability)
    }

    pub fn provides(&self, capability: &Capability) -> bool {
        self.capabilities().any(|provided| provided == capability)
    }

    /// A qualifier matches an explicit qualifier or the bean name
    pub fn matches_qualifier(&self, qualifier: &str) -> bool {
        self.name == qualifier || self.qualifiers.iter().any(|q| q == qualifier)
    }

    /// Event types this bean listens to
    pub fn listened_events(&self) -> Vec<&'static str> {
        self.listeners.iter().map(|listener| listener.event).collect()
    }

    pub fn has_lifecycle_hooks(&self) -> bool {
        !self.after_construct.is_empty() || !self.before_destroy.is_empty()
    }

    pub(crate) fn factory(&self) -> &FactoryFn {
        &self.factory
    }

    pub(crate) fn bindings(&self) -> &[CapabilityBinding] {
        &self.bindings
    }

    pub(crate) fn after_construct_hooks(&self) -> &[Hook] {
        &self.after_construct
    }

    pub(crate) fn before_destroy_hooks(&self) -> &[Hook] {
        &self.before_destroy
    }

    pub(crate) fn listeners(&self) -> &[ListenerBinding] {
        &self.listeners
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("name", &self.name)
            .field("bean_type", &self.bean_type)
            .field("scope", &self.scope)
            .field("primary", &self.primary)
            .field("qualifiers", &self.qualifiers)
            .field("dependencies", &self.dependencies)
            .field("capabilities", &self.capabilities().collect::<Vec<_>>())
            .field("listeners", &self.listened_events())
            .finish()
    }
}

/// Fluent builder for [`BeanDefinition`]
///
/// ```ignore
/// let definition = BeanDefinition::builder::<InMemoryCustomerRepository>("customerRepository")
///     .supplier(InMemoryCustomerRepository::new)
///     .transactional::<dyn CustomerRepository>(|repo| repo)
///     .build()?;
/// ```
pub struct BeanDefinitionBuilder<T> {
    name: String,
    description: Option<String>,
    scope: Scope,
    primary: bool,
    allow_override: bool,
    qualifiers: Vec<String>,
    dependencies: Vec<Dependency>,
    bindings: Vec<CapabilityBinding>,
    factory: Option<FactoryFn>,
    after_construct: Vec<Hook>,
    before_destroy: Vec<Hook>,
    listeners: Vec<ListenerBinding>,
    _bean: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> BeanDefinitionBuilder<T> {
    fn new(name: String) -> Self {
        let own_type = CapabilityBinding {
            capability: Capability::of::<T>(),
            view: Box::new(|object: &BeanObject, _: &BeanContext<'_>| {
                let bean = downcast_bean::<T>(object)?;
                Ok(Arc::new(bean) as BeanObject)
            }),
        };
        Self {
            name,
            description: None,
            scope: Scope::Singleton,
            primary: false,
            allow_override: false,
            qualifiers: Vec::new(),
            dependencies: Vec::new(),
            bindings: vec![own_type],
            factory: None,
            after_construct: Vec::new(),
            before_destroy: Vec::new(),
            listeners: Vec::new(),
            _bean: PhantomData,
        }
    }

    /// Construct the bean from its resolution context
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&BeanContext<'_>) -> Result<T> + Send + Sync + 'static,
    {
        self.factory = Some(Box::new(move |ctx: &BeanContext<'_>| {
            factory(ctx).map(|bean| Arc::new(bean) as BeanObject)
        }));
        self
    }

    /// Construct the bean without dependencies
    pub fn supplier<F>(self, supplier: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factory(move |_| Ok(supplier()))
    }

    /// Always yield this instance
    pub fn instance(mut self, instance: Arc<T>) -> Self {
        self.factory = Some(Box::new(move |_: &BeanContext<'_>| {
            Ok(Arc::clone(&instance) as BeanObject)
        }));
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn prototype(self) -> Self {
        self.scope(Scope::Prototype)
    }

    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.push(qualifier.into());
        self
    }

    /// Preferred candidate when an unqualified lookup finds several
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Allow replacing an existing definition with the same name
    pub fn allow_override(mut self) -> Self {
        self.allow_override = true;
        self
    }

    /// Declare a dependency on capability `C`
    ///
    /// Declared dependencies are realized before the factory runs and drive
    /// construction order and cycle detection at start.
    pub fn depends_on<C: ?Sized + 'static>(mut self) -> Self {
        self.dependencies
            .push(Dependency::new(Capability::of::<C>(), None));
        self
    }

    pub fn depends_on_qualified<C: ?Sized + 'static>(mut self, qualifier: impl Into<String>) -> Self {
        self.dependencies
            .push(Dependency::new(Capability::of::<C>(), Some(qualifier.into())));
        self
    }

    /// Make the bean resolvable as `C`
    pub fn provides<C>(self, cast: fn(Arc<T>) -> Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.provides_with::<C, _>(move |bean, _| Ok(cast(bean)))
    }

    /// Make the bean resolvable as `C` through a decorating view
    pub fn provides_with<C, F>(self, decorate: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>, &BeanContext<'_>) -> Result<Arc<C>> + Send + Sync + 'static,
    {
        let view: ViewFn = Box::new(move |object: &BeanObject, ctx: &BeanContext<'_>| {
            let bean = downcast_bean::<T>(object)?;
            let view: Arc<C> = decorate(bean, ctx)?;
            Ok(Arc::new(view) as BeanObject)
        });
        self.bind(Capability::of::<C>(), view)
    }

    /// Expose `C` through a transactional proxy bound to the container's
    /// [`TransactionRunner`]
    pub fn transactional<C>(self, cast: fn(Arc<T>) -> Arc<C>) -> Self
    where
        C: TransactionalCapability + ?Sized,
    {
        self.depends_on::<dyn TransactionRunner>()
            .provides_with::<C, _>(move |bean, ctx| {
                let runner = ctx.resolve::<dyn TransactionRunner>()?;
                Ok(TransactionalProxyFactory::new(runner).wrap(cast(bean)))
            })
    }

    /// Run after construction, before the bean is handed out
    pub fn after_construct<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<()> + Send + Sync + 'static,
    {
        let label = format!("after_construct[{}]", self.after_construct.len());
        self.after_construct.push(Hook::typed(label, hook));
        self
    }

    /// Run when the container closes
    pub fn before_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<()> + Send + Sync + 'static,
    {
        let label = format!("before_destroy[{}]", self.before_destroy.len());
        self.before_destroy.push(Hook::typed(label, hook));
        self
    }

    /// Subscribe the singleton to events of type `E` once it is ready
    pub fn on_event<E, F>(mut self, listener: F) -> Self
    where
        E: Event,
        F: Fn(&T, &E) -> Result<()> + Send + Sync + 'static,
    {
        let listener = Arc::new(listener);
        let bind: BindFn = Box::new(move |object: &BeanObject, bus: &EventBus, label: String| {
            let bean = downcast_bean::<T>(object)?;
            let listener = Arc::clone(&listener);
            Ok(bus.subscribe_named::<E, _>(label, move |event| listener(bean.as_ref(), event)))
        });
        self.listeners.push(ListenerBinding {
            event: type_name::<E>(),
            bind,
        });
        self
    }

    /// Validate and freeze the definition
    pub fn build(mut self) -> Result<BeanDefinition> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_argument("bean name must not be blank"));
        }
        if self.scope == Scope::Prototype && !self.listeners.is_empty() {
            return Err(Error::invalid_argument(format!(
                "prototype bean '{}' cannot listen to events",
                self.name
            )));
        }
        let Some(factory) = self.factory.take() else {
            return Err(Error::invalid_argument(format!(
                "bean '{}' has no factory",
                self.name
            )));
        };
        Ok(self.assemble(factory))
    }

    fn assemble(self, factory: FactoryFn) -> BeanDefinition {
        BeanDefinition {
            name: self.name,
            bean_type: type_name::<T>(),
            description: self.description,
            scope: self.scope,
            primary: self.primary,
            allow_override: self.allow_override,
            qualifiers: self.qualifiers,
            dependencies: self.dependencies,
            bindings: self.bindings,
            factory,
            after_construct: self.after_construct,
            before_destroy: self.before_destroy,
            listeners: self.listeners,
        }
    }

    fn bind(mut self, capability: Capability, view: ViewFn) -> Self {
        match self
            .bindings
            .iter_mut()
            .find(|binding| binding.capability == capability)
        {
            Some(existing) => existing.view = view,
            None => self.bindings.push(CapabilityBinding { capability, view }),
        }
        self
    }
}

impl<T: Lifecycle> BeanDefinitionBuilder<T> {
    /// Wire [`Lifecycle::initialize`] and [`Lifecycle::destroy`] as hooks
    pub fn with_lifecycle(mut self) -> Self {
        self.after_construct.push(Hook::typed(
            "Lifecycle::initialize".to_string(),
            |bean: &T| bean.initialize(),
        ));
        self.before_destroy.push(Hook::typed(
            "Lifecycle::destroy".to_string(),
            |bean: &T| bean.destroy(),
        ));
        self
    }
}

fn downcast_bean<T: Send + Sync + 'static>(object: &BeanObject) -> Result<Arc<T>> {
    Arc::clone(object)
        .downcast::<T>()
        .map_err(|_| type_mismatch::<T>())
}

fn type_mismatch<T>() -> Error {
    Error::internal(format!("bean object is not a {}", type_name::<T>()))
}
