//! Tests for bean registration and resolution

use crate::test_utils::{english, french, registry, English, French, Greeter};
use beanbox_domain::error::Error;
use beanbox_infrastructure::config::{ContainerConfig, Environment};
use beanbox_infrastructure::container::{BeanDefinition, BeanRegistry, RegistryState, Scope};
use beanbox_infrastructure::events::EventBus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Definitions
// ============================================================================

#[test]
fn test_definition_metadata() {
    let definition = BeanDefinition::builder::<French>("french")
        .qualifier("fr")
        .primary()
        .description("French greeter")
        .supplier(|| French)
        .provides::<dyn Greeter>(|greeter| greeter)
        .build()
        .expect("definition");

    assert_eq!(definition.name(), "french");
    assert!(definition.bean_type().ends_with("French"));
    assert_eq!(definition.description(), Some("French greeter"));
    assert_eq!(definition.scope(), Scope::Singleton);
    assert!(definition.is_primary());
    assert!(definition.matches_qualifier("fr"));
    assert!(definition.matches_qualifier("french"));
    assert!(!definition.matches_qualifier("en"));
    assert_eq!(definition.capabilities().count(), 2);
}

#[test]
fn test_definition_without_factory_is_rejected() {
    let result = BeanDefinition::builder::<English>("english").build();
    assert!(matches!(result, Err(Error::InvalidArgument { .. })));
}

#[test]
fn test_definition_with_blank_name_is_rejected() {
    let result = BeanDefinition::builder::<English>("  ")
        .supplier(|| English)
        .build();
    assert!(matches!(result, Err(Error::InvalidArgument { .. })));
}

#[test]
fn test_prototype_listener_is_rejected() {
    let result = BeanDefinition::builder::<English>("english")
        .prototype()
        .supplier(|| English)
        .on_event::<String, _>(|_, _| Ok(()))
        .build();

    let error = result.expect_err("prototype listeners must be rejected");
    assert!(error.to_string().contains("cannot listen to events"));
}

// ============================================================================
// Built-in beans
// ============================================================================

#[test]
fn test_builtin_beans_are_registered() {
    let registry = BeanRegistry::new(
        Environment::new().with_property("app.name", "demo"),
        &ContainerConfig::default(),
    );

    assert!(registry.contains_bean("environment"));
    assert!(registry.contains_bean("eventBus"));
    assert_eq!(registry.definition_count(), 2);

    let environment = registry.resolve::<Environment>(None).expect("environment");
    assert_eq!(environment.property("app.name"), Some("demo"));

    let bus = registry.resolve::<EventBus>(None).expect("event bus");
    assert!(Arc::ptr_eq(&bus, registry.event_bus()));
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_resolve_by_concrete_type_and_capability() {
    let mut registry = registry();
    registry.register(english()).expect("register");

    let concrete = registry.resolve::<English>(None).expect("concrete type");
    let greeter = registry.resolve::<dyn Greeter>(None).expect("capability");

    assert_eq!(greeter.greet(), "hello");
    assert_eq!(
        Arc::as_ptr(&concrete).cast::<()>(),
        Arc::as_ptr(&greeter).cast::<()>()
    );
}

#[test]
fn test_singleton_is_shared() {
    let mut registry = registry();
    registry.register(english()).expect("register");

    let first = registry.resolve::<English>(None).expect("first");
    let second = registry.resolve::<English>(None).expect("second");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.singleton_count(), 1);
}

#[test]
fn test_prototype_yields_fresh_instances() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let mut registry = registry();
    registry
        .register(
            BeanDefinition::builder::<English>("english")
                .prototype()
                .supplier(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    English
                })
                .build()
                .expect("definition"),
        )
        .expect("register");

    registry.start().expect("start");
    assert_eq!(built.load(Ordering::SeqCst), 0);

    let first = registry.resolve::<English>(None).expect("first");
    let second = registry.resolve::<English>(None).expect("second");

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn test_resolve_missing_capability() {
    let registry = registry();

    let error = registry
        .resolve::<dyn Greeter>(None)
        .err()
        .expect("nothing provides Greeter");

    match error {
        Error::MissingDependency {
            capability,
            qualifier,
            required_by,
        } => {
            assert!(capability.contains("Greeter"));
            assert!(qualifier.is_none());
            assert!(required_by.is_none());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_resolve_ambiguous_without_primary() {
    let mut registry = registry();
    registry.register(english()).expect("english");
    registry.register(french()).expect("french");

    let error = registry
        .resolve::<dyn Greeter>(None)
        .err()
        .expect("two greeters");

    match error {
        Error::AmbiguousDependency { candidates, .. } => {
            assert_eq!(candidates, vec!["english", "french"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_primary_breaks_tie() {
    let mut registry = registry();
    registry.register(english()).expect("english");
    registry
        .register(
            BeanDefinition::builder::<French>("french")
                .primary()
                .supplier(|| French)
                .provides::<dyn Greeter>(|greeter| greeter)
                .build()
                .expect("definition"),
        )
        .expect("french");

    let greeter = registry.resolve::<dyn Greeter>(None).expect("primary wins");
    assert_eq!(greeter.greet(), "bonjour");
}

#[test]
fn test_two_primaries_stay_ambiguous() {
    let primary_english = BeanDefinition::builder::<English>("english")
        .primary()
        .supplier(|| English)
        .provides::<dyn Greeter>(|greeter| greeter)
        .build()
        .expect("english");
    let primary_french = BeanDefinition::builder::<French>("french")
        .primary()
        .supplier(|| French)
        .provides::<dyn Greeter>(|greeter| greeter)
        .build()
        .expect("french");
    let mut registry = registry();
    registry.register(primary_english).expect("english");
    registry.register(primary_french).expect("french");

    let result = registry.resolve::<dyn Greeter>(None);
    assert!(matches!(result, Err(Error::AmbiguousDependency { .. })));
}

#[test]
fn test_qualifier_selects_candidate() {
    let mut registry = registry();
    registry.register(english()).expect("english");
    registry.register(french()).expect("french");

    let by_qualifier = registry.resolve::<dyn Greeter>(Some("fr")).expect("fr");
    let by_name = registry.resolve::<dyn Greeter>(Some("english")).expect("english");

    assert_eq!(by_qualifier.greet(), "bonjour");
    assert_eq!(by_name.greet(), "hello");
}

#[test]
fn test_unknown_qualifier_is_missing() {
    let mut registry = registry();
    registry.register(english()).expect("english");

    let error = registry
        .resolve::<dyn Greeter>(Some("de"))
        .err()
        .expect("no German greeter");

    assert!(matches!(
        &error,
        Error::MissingDependency { qualifier: Some(q), .. } if q == "de"
    ));
    assert!(error.to_string().contains("'de'"));
}

#[test]
fn test_resolve_bean_carries_definition() {
    let mut registry = registry();
    registry.register(french()).expect("french");

    let bean = registry.resolve_bean::<dyn Greeter>(None).expect("french");

    assert_eq!(bean.name(), "french");
    assert_eq!(bean.definition().qualifiers(), ["fr".to_string()]);
    assert_eq!(bean.greet(), "bonjour");
}

#[test]
fn test_resolve_optional() {
    let mut registry = registry();
    assert!(registry
        .resolve_optional::<dyn Greeter>(None)
        .expect("missing is not an error")
        .is_none());

    registry.register(english()).expect("english");
    assert!(registry
        .resolve_optional::<dyn Greeter>(None)
        .expect("present")
        .is_some());

    registry.register(french()).expect("french");
    assert!(matches!(
        registry.resolve_optional::<dyn Greeter>(None),
        Err(Error::AmbiguousDependency { .. })
    ));
}

#[test]
fn test_resolve_optional_surfaces_nested_missing_dependency() {
    let mut registry = registry();
    registry
        .register(
            BeanDefinition::builder::<English>("english")
                .factory(|ctx| {
                    ctx.resolve::<French>()?;
                    Ok(English)
                })
                .provides::<dyn Greeter>(|greeter| greeter)
                .build()
                .expect("definition"),
        )
        .expect("register");

    let result = registry.resolve_optional::<dyn Greeter>(None);
    assert!(matches!(
        result,
        Err(Error::MissingDependency { required_by: Some(ref bean), .. }) if bean == "english"
    ));
}

#[test]
fn test_resolve_all_in_registration_order() {
    let mut registry = registry();
    registry.register(french()).expect("french");
    registry.register(english()).expect("english");

    let greeters = registry.resolve_all::<dyn Greeter>().expect("all");
    let names: Vec<&str> = greeters.iter().map(|bean| bean.name()).collect();
    let greetings: Vec<String> = greeters.iter().map(|bean| bean.greet()).collect();

    assert_eq!(names, vec!["french", "english"]);
    assert_eq!(greetings, vec!["bonjour", "hello"]);
    assert!(registry.resolve_all::<String>().expect("none").is_empty());
}

#[test]
fn test_factory_error_names_requesting_bean() {
    let mut registry = registry();
    registry
        .register(
            BeanDefinition::builder::<English>("english")
                .factory(|ctx| {
                    ctx.resolve::<French>()?;
                    Ok(English)
                })
                .build()
                .expect("definition"),
        )
        .expect("register");

    let error = registry.resolve::<English>(None).err().expect("French missing");
    assert!(error.to_string().contains("(required by 'english')"), "{error}");
}

#[test]
fn test_lazy_cycle_detected_during_resolution() {
    struct A;
    struct B;
    let mut registry = registry();
    registry
        .register(
            BeanDefinition::builder::<A>("a")
                .factory(|ctx| {
                    ctx.resolve::<B>()?;
                    Ok(A)
                })
                .build()
                .expect("a"),
        )
        .expect("register a");
    registry
        .register(
            BeanDefinition::builder::<B>("b")
                .factory(|ctx| {
                    ctx.resolve::<A>()?;
                    Ok(B)
                })
                .build()
                .expect("b"),
        )
        .expect("register b");

    let error = registry.resolve::<A>(None).err().expect("cycle");
    assert!(
        error.to_string().contains("a -> b -> a"),
        "unexpected message: {error}"
    );
}

#[test]
fn test_concurrent_resolution_creates_one_singleton() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let mut registry = registry();
    registry
        .register(
            BeanDefinition::builder::<English>("english")
                .supplier(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(20));
                    English
                })
                .build()
                .expect("definition"),
        )
        .expect("register");

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| registry.resolve::<English>(None).expect("resolve"));
        }
    });

    assert_eq!(built.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Registration rules
// ============================================================================

#[test]
fn test_duplicate_name_is_rejected() {
    let mut registry = registry();
    registry.register(english()).expect("first");

    let replacement = BeanDefinition::builder::<French>("english")
        .supplier(|| French)
        .build()
        .expect("definition");
    let error = registry.register(replacement).expect_err("duplicate");

    assert!(matches!(error, Error::DuplicateDefinition { ref name } if name == "english"));
    let greeter = registry.resolve::<dyn Greeter>(None).expect("original kept");
    assert_eq!(greeter.greet(), "hello");
}

#[test]
fn test_definition_may_override() {
    let mut registry = registry();
    registry.register(english()).expect("first");

    let replacement = BeanDefinition::builder::<French>("english")
        .allow_override()
        .supplier(|| French)
        .provides::<dyn Greeter>(|greeter| greeter)
        .build()
        .expect("definition");
    registry.register(replacement).expect("override");

    assert_eq!(registry.definition_count(), 3);
    assert!(!registry.contains::<English>());
    let greeter = registry.resolve::<dyn Greeter>(None).expect("replacement");
    assert_eq!(greeter.greet(), "bonjour");
}

#[test]
fn test_registry_wide_overriding() {
    let config = ContainerConfig {
        allow_bean_overriding: true,
        ..ContainerConfig::default()
    };
    let mut registry = BeanRegistry::new(Environment::new(), &config);
    registry.register(english()).expect("first");
    registry
        .register(
            BeanDefinition::builder::<French>("english")
                .supplier(|| French)
                .build()
                .expect("definition"),
        )
        .expect("override allowed by config");

    assert!(registry.contains::<French>());
}

#[test]
fn test_register_after_start_fails() {
    let mut registry = registry();
    registry.start().expect("start");

    let error = registry.register(english()).expect_err("started");
    assert!(matches!(error, Error::InvalidState { .. }));
}

#[test]
fn test_resolution_after_close_fails() {
    let mut registry = registry();
    registry.register(english()).expect("register");
    registry.start().expect("start");
    registry.close();

    assert_eq!(registry.state(), RegistryState::Closed);
    assert!(matches!(
        registry.resolve::<English>(None),
        Err(Error::InvalidState { .. })
    ));
    assert!(matches!(registry.start(), Err(Error::InvalidState { .. })));
}

#[test]
fn test_start_is_idempotent() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let mut registry = registry();
    registry
        .register(
            BeanDefinition::builder::<English>("english")
                .supplier(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    English
                })
                .build()
                .expect("definition"),
        )
        .expect("register");

    registry.start().expect("first start");
    registry.start().expect("second start");

    assert_eq!(registry.state(), RegistryState::Started);
    assert_eq!(built.load(Ordering::SeqCst), 1);
}
