//! Tests for the in-process event bus

use crate::test_utils::{bare_builder, registry, CallLog};
use beanbox_domain::error::Error;
use beanbox_domain::events::{ContainerEvent, UserAuthenticated};
use beanbox_infrastructure::container::BeanDefinition;
use beanbox_infrastructure::events::EventBus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Ping(u32);

#[derive(Debug)]
struct Pong;

// ============================================================================
// Delivery
// ============================================================================

#[test]
fn test_publish_without_listeners() {
    let bus = EventBus::new();

    assert_eq!(bus.publish(&Ping(1)).expect("publish"), 0);
    assert!(!bus.has_subscribers::<Ping>());
}

#[test]
fn test_listeners_run_in_subscription_order() {
    let bus = EventBus::new();
    let log = CallLog::new();
    for label in ["first", "second", "third"] {
        let log = log.clone();
        bus.subscribe::<Ping, _>(move |ping| {
            log.push(format!("{label} {}", ping.0));
            Ok(())
        });
    }

    let delivered = bus.publish(&Ping(7)).expect("publish");

    assert_eq!(delivered, 3);
    assert_eq!(log.entries(), vec!["first 7", "second 7", "third 7"]);
}

#[test]
fn test_delivery_is_keyed_by_event_type() {
    let bus = EventBus::new();
    let pings = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&pings);
    bus.subscribe::<Ping, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    assert_eq!(bus.publish(&Pong).expect("pong"), 0);
    assert_eq!(bus.publish(&Ping(1)).expect("ping"), 1);
    assert_eq!(pings.load(Ordering::SeqCst), 1);
    assert_eq!(bus.subscriber_count::<Ping>(), 1);
    assert_eq!(bus.subscriber_count::<Pong>(), 0);
}

#[test]
fn test_failures_are_aggregated_after_every_listener_ran() {
    let bus = EventBus::new();
    let log = CallLog::new();
    let (before, after) = (log.clone(), log.clone());
    bus.subscribe::<Ping, _>(move |_| {
        before.push("before");
        Ok(())
    });
    bus.subscribe_named::<Ping, _>("rejecting", |_| Err(Error::invalid_argument("bad ping")));
    bus.subscribe_named::<Ping, _>("exploding", |_| panic!("listener exploded"));
    bus.subscribe::<Ping, _>(move |_| {
        after.push("after");
        Ok(())
    });

    let error = bus.publish(&Ping(1)).expect_err("two listeners fail");

    assert_eq!(log.entries(), vec!["before", "after"]);
    match error {
        Error::Listener(failure) => {
            assert_eq!(failure.delivered, 2);
            assert_eq!(failure.attempted(), 4);
            assert_eq!(failure.failures.len(), 2);
            assert_eq!(failure.failures[0].listener, "rejecting");
            assert!(matches!(failure.failures[0].error, Error::InvalidArgument { .. }));
            assert_eq!(failure.failures[1].listener, "exploding");
            assert!(failure.failures[1].error.to_string().contains("listener exploded"));
            assert!(failure.event_type.ends_with("Ping"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unsubscribe() {
    let bus = EventBus::new();
    let handle = bus.subscribe::<Ping, _>(|_| Ok(()));
    bus.subscribe::<Ping, _>(|_| Ok(()));

    assert!(handle.event_name().ends_with("Ping"));
    assert!(bus.unsubscribe(&handle));
    assert!(!bus.unsubscribe(&handle));
    assert_eq!(bus.publish(&Ping(1)).expect("publish"), 1);
}

#[test]
fn test_subscribing_during_delivery_affects_later_events_only() {
    let bus = EventBus::new();
    let late_calls = Arc::new(AtomicUsize::new(0));
    let inner_bus = bus.clone();
    let counter = Arc::clone(&late_calls);
    bus.subscribe::<Ping, _>(move |_| {
        let counter = Arc::clone(&counter);
        inner_bus.subscribe::<Ping, _>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        Ok(())
    });

    assert_eq!(bus.publish(&Ping(1)).expect("first"), 1);
    assert_eq!(late_calls.load(Ordering::SeqCst), 0);

    assert_eq!(bus.publish(&Ping(2)).expect("second"), 2);
    assert_eq!(late_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_clones_share_subscribers() {
    let bus = EventBus::new();
    let clone = bus.clone();
    clone.subscribe::<Ping, _>(|_| Ok(()));

    assert!(bus.has_subscribers::<Ping>());
}

#[test]
fn test_concurrent_publishers() {
    let bus = EventBus::new();
    let received = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&received);
    bus.subscribe::<Ping, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    std::thread::scope(|scope| {
        for n in 0..4 {
            let bus = &bus;
            scope.spawn(move || {
                for _ in 0..25 {
                    bus.publish(&Ping(n)).expect("publish");
                }
            });
        }
    });

    assert_eq!(received.load(Ordering::SeqCst), 100);
}

// ============================================================================
// Bean listeners
// ============================================================================

struct Audit {
    log: CallLog,
}

fn audit_definition(log: &CallLog) -> BeanDefinition {
    let log = log.clone();
    BeanDefinition::builder::<Audit>("audit")
        .supplier(move || Audit { log: log.clone() })
        .on_event::<UserAuthenticated, _>(|audit, event| {
            audit.log.push(format!("authenticated {}", event.username));
            Ok(())
        })
        .build()
        .expect("audit definition")
}

#[test]
fn test_bean_listener_receives_events_until_close() {
    let log = CallLog::new();
    let mut registry = registry();
    registry.register(audit_definition(&log)).expect("register");
    registry.start().expect("start");
    let bus = Arc::clone(registry.event_bus());

    assert_eq!(
        bus.publish(&UserAuthenticated::now("jlong")).expect("publish"),
        1
    );
    registry.close();

    assert!(!bus.has_subscribers::<UserAuthenticated>());
    assert_eq!(bus.publish(&UserAuthenticated::now("late")).expect("publish"), 0);
    assert_eq!(log.entries(), vec!["authenticated jlong"]);
}

#[test]
fn test_listener_label_names_the_bean() {
    struct Grumpy;
    let mut registry = registry();
    registry
        .register(
            BeanDefinition::builder::<Grumpy>("grumpy")
                .supplier(|| Grumpy)
                .on_event::<Ping, _>(|_, _| Err(Error::internal("not today")))
                .build()
                .expect("definition"),
        )
        .expect("register");
    registry.start().expect("start");

    let error = registry.event_bus().publish(&Ping(1)).expect_err("listener fails");

    match error {
        Error::Listener(failure) => assert!(failure.failures[0].listener.starts_with("grumpy <- ")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_listened_events_are_reported() {
    let definition = audit_definition(&CallLog::new());

    let events = definition.listened_events();
    assert_eq!(events.len(), 1);
    assert!(events[0].ends_with("UserAuthenticated"));
}

#[test]
fn test_container_milestones_are_published() {
    struct Watcher {
        log: CallLog,
    }
    let log = CallLog::new();
    let inner = log.clone();
    let context = bare_builder()
        .with_definition(
            BeanDefinition::builder::<Watcher>("watcher")
                .supplier(move || Watcher { log: inner.clone() })
                .on_event::<ContainerEvent, _>(|watcher, event| {
                    watcher.log.push(format!("{event:?}"));
                    Ok(())
                })
                .build()
                .expect("watcher"),
        )
        .build()
        .expect("build");

    context.start().expect("start");
    context.close();

    assert_eq!(log.entries(), vec!["Started { singletons: 3 }", "Closing"]);
}
