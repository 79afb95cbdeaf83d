//! In-process event bus
//!
//! Synchronous, type-keyed publish/subscribe. The subscriber table is an
//! immutable snapshot swapped with [`ArcSwap`]: publishing reads a snapshot
//! without locking, and subscribing or unsubscribing copies the table. A
//! listener that subscribes or unsubscribes during delivery therefore only
//! affects later publications.
//!
//! Listeners run on the publishing thread in subscription order. Every
//! listener runs even when an earlier one fails or panics; failures are
//! collected into a single [`ListenerError`].

use crate::utils::panic_message;
use arc_swap::ArcSwap;
use beanbox_domain::error::{Error, ListenerError, ListenerFailure, Result};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Anything that can be published
pub trait Event: Any + Send + Sync {}

impl<T: Any + Send + Sync> Event for T {}

type ErasedListener = Arc<dyn Fn(&dyn Any) -> Result<()> + Send + Sync>;

#[derive(Clone)]
struct Subscription {
    id: u64,
    label: String,
    listener: ErasedListener,
}

#[derive(Clone, Default)]
struct SubscriberTable {
    by_event: HashMap<TypeId, Vec<Subscription>>,
}

/// Token returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    event_type: TypeId,
    event_name: &'static str,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Type name of the subscribed event
    pub fn event_name(&self) -> &'static str {
        self.event_name
    }
}

/// Synchronous event bus
///
/// Clones share the same subscriber table.
#[derive(Clone)]
pub struct EventBus {
    table: Arc<ArcSwap<SubscriberTable>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            table: Arc::new(ArcSwap::from_pointee(SubscriberTable::default())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Subscribe to events of type `E`
    pub fn subscribe<E, F>(&self, listener: F) -> SubscriptionHandle
    where
        E: Event,
        F: Fn(&E) -> Result<()> + Send + Sync + 'static,
    {
        let label = format!("{} listener", type_name::<E>());
        self.subscribe_named(label, listener)
    }

    /// Subscribe with a label that identifies the listener in failures
    pub fn subscribe_named<E, F>(&self, label: impl Into<String>, listener: F) -> SubscriptionHandle
    where
        E: Event,
        F: Fn(&E) -> Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let event_name = type_name::<E>();
        let erased: ErasedListener = Arc::new(move |event: &dyn Any| match event.downcast_ref::<E>() {
            Some(event) => listener(event),
            None => Err(Error::internal(format!(
                "listener for {event_name} received another event type"
            ))),
        });
        let subscription = Subscription {
            id,
            label: label.into(),
            listener: erased,
        };

        self.table.rcu(|table| {
            let mut next = SubscriberTable::clone(table);
            next.by_event
                .entry(TypeId::of::<E>())
                .or_default()
                .push(subscription.clone());
            next
        });
        debug!(subscription = id, event = event_name, label = %subscription.label, "Listener subscribed");

        SubscriptionHandle {
            id,
            event_type: TypeId::of::<E>(),
            event_name,
        }
    }

    /// Remove a subscription; `false` if it was already gone
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let mut removed = false;
        self.table.rcu(|table| {
            let mut next = SubscriberTable::clone(table);
            removed = false;
            if let Some(subscriptions) = next.by_event.get_mut(&handle.event_type) {
                let before = subscriptions.len();
                subscriptions.retain(|subscription| subscription.id != handle.id);
                removed = subscriptions.len() != before;
                if subscriptions.is_empty() {
                    next.by_event.remove(&handle.event_type);
                }
            }
            next
        });
        if removed {
            debug!(subscription = handle.id, event = handle.event_name, "Listener unsubscribed");
        }
        removed
    }

    /// Deliver `event` to every current subscriber of `E`
    ///
    /// Returns the number of listeners that completed successfully, or a
    /// [`ListenerError`] naming every listener that failed.
    pub fn publish<E: Event>(&self, event: &E) -> Result<usize> {
        let event_name = type_name::<E>();
        let table = self.table.load_full();
        let Some(subscriptions) = table.by_event.get(&TypeId::of::<E>()) else {
            trace!(event = event_name, "No listeners for event");
            return Ok(0);
        };

        let mut delivered = 0;
        let mut failures = Vec::new();
        for subscription in subscriptions {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                (subscription.listener)(event as &dyn Any)
            }));
            let error = match outcome {
                Ok(Ok(())) => {
                    delivered += 1;
                    continue;
                }
                Ok(Err(error)) => error,
                Err(payload) => Error::internal(format!(
                    "listener panicked: {}",
                    panic_message(&*payload)
                )),
            };
            warn!(event = event_name, listener = %subscription.label, error = %error, "Event listener failed");
            failures.push(ListenerFailure {
                listener: subscription.label.clone(),
                error,
            });
        }

        trace!(event = event_name, delivered, failed = failures.len(), "Event published");
        if failures.is_empty() {
            Ok(delivered)
        } else {
            Err(ListenerError {
                event_type: event_name.to_string(),
                delivered,
                failures,
            }
            .into())
        }
    }

    /// Number of current subscribers of `E`
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.table
            .load()
            .by_event
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    pub fn has_subscribers<E: Event>(&self) -> bool {
        self.subscriber_count::<E>() > 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.load();
        let subscriptions: usize = table.by_event.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("event_types", &table.by_event.len())
            .field("subscriptions", &subscriptions)
            .finish()
    }
}
