//! Demo beans

use beanbox_domain::error::Result;
use beanbox_domain::events::UserAuthenticated;
use beanbox_domain::ports::{NameProducer, TransactionRunner};
use beanbox_infrastructure::events::EventBus;
use beanbox_infrastructure::lifecycle::Lifecycle;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

static FOO_CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

/// Singleton-sharing demo: built once no matter how many beans need it
#[derive(Debug)]
pub struct Foo {
    _private: (),
}

impl Foo {
    pub fn new() -> Self {
        FOO_CONSTRUCTIONS.fetch_add(1, Ordering::Relaxed);
        info!("Foo");
        Self { _private: () }
    }

    /// Process-wide number of `Foo` constructions
    pub fn constructions() -> usize {
        FOO_CONSTRUCTIONS.load(Ordering::Relaxed)
    }
}

impl Default for Foo {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct Bar {
    foo: Arc<Foo>,
}

impl Bar {
    pub fn new(foo: Arc<Foo>) -> Self {
        info!("Bar");
        Self { foo }
    }

    pub fn foo(&self) -> &Arc<Foo> {
        &self.foo
    }
}

/// Bean exercising every hook style
///
/// After construction: `start`, then [`Lifecycle::initialize`].
/// On close: `stop`, then [`Lifecycle::destroy`].
#[derive(Default)]
pub struct MyLifecycle {
    transaction_manager: Option<Arc<dyn TransactionRunner>>,
    calls: Mutex<Vec<&'static str>>,
}

impl MyLifecycle {
    pub fn new(transaction_manager: Option<Arc<dyn TransactionRunner>>) -> Self {
        Self {
            transaction_manager,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn start(&self) -> Result<()> {
        if self.transaction_manager.is_none() {
            info!("no default transaction manager ...");
        }
        info!("start");
        self.calls.lock().push("start");
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        info!("stop");
        self.calls.lock().push("stop");
        Ok(())
    }

    pub fn has_transaction_manager(&self) -> bool {
        self.transaction_manager.is_some()
    }

    /// Hooks run so far, in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }
}

impl Lifecycle for MyLifecycle {
    fn initialize(&self) -> Result<()> {
        info!("initialize in trait");
        self.calls.lock().push("initialize");
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        info!("destroy in trait");
        self.calls.lock().push("destroy");
        Ok(())
    }
}

/// An app store; two implementations are told apart by qualifier
pub trait AppStore: Send + Sync {
    fn name(&self) -> &str;
}

#[derive(Debug, Default)]
pub struct AppleAppStore;

impl AppStore for AppleAppStore {
    fn name(&self) -> &str {
        "apple"
    }
}

#[derive(Debug, Default)]
pub struct GoogleAppStore;

impl AppStore for GoogleAppStore {
    fn name(&self) -> &str {
        "google"
    }
}

pub struct AppStoreConsumer {
    apple: Arc<dyn AppStore>,
    google: Arc<dyn AppStore>,
}

impl AppStoreConsumer {
    pub fn new(apple: Arc<dyn AppStore>, google: Arc<dyn AppStore>) -> Self {
        info!(apple = apple.name(), google = google.name(), "App store consumer wired");
        Self { apple, google }
    }

    pub fn apple(&self) -> &dyn AppStore {
        self.apple.as_ref()
    }

    pub fn google(&self) -> &dyn AppStore {
        self.google.as_ref()
    }
}

/// [`NameProducer`] returning a fixed name
#[derive(Debug, Clone)]
pub struct StaticNameProducer {
    name: String,
}

impl StaticNameProducer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl NameProducer for StaticNameProducer {
    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Listens for [`UserAuthenticated`]
#[derive(Debug, Default)]
pub struct EventConsumer {
    received: Mutex<Vec<UserAuthenticated>>,
}

impl EventConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_authentication(&self, event: &UserAuthenticated) -> Result<()> {
        info!(username = %event.username, when = %event.when, "onAuthentication");
        self.received.lock().push(event.clone());
        Ok(())
    }

    pub fn received(&self) -> Vec<UserAuthenticated> {
        self.received.lock().clone()
    }
}

/// Publishes one [`UserAuthenticated`] event after a delay
///
/// The publication runs on a tokio task; without a runtime the producer
/// does nothing. [`cancel`](Self::cancel) aborts a pending publication.
pub struct EventProducer {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EventProducer {
    pub fn schedule(bus: Arc<EventBus>, username: String, delay: Duration) -> Self {
        let task = match Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                let event = UserAuthenticated::now(username);
                match bus.publish(&event) {
                    Ok(listeners) => debug!(listeners, "Published user authenticated event"),
                    Err(error) => warn!(error = %error, "User authenticated listeners failed"),
                }
            })),
            Err(_) => {
                warn!("No tokio runtime available, event producer disabled");
                None
            }
        };
        Self {
            task: Mutex::new(task),
        }
    }

    /// Whether a publication is still pending
    pub fn is_pending(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn cancel(&self) -> Result<()> {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        Ok(())
    }
}
