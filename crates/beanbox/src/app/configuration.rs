//! Demo bean registrations

use super::beans::{
    AppStore, AppStoreConsumer, AppleAppStore, Bar, EventConsumer, EventProducer, Foo,
    GoogleAppStore, MyLifecycle, StaticNameProducer,
};
use super::runners::CustomerRepositoryRunner;
use super::{
    DEFAULT_PRODUCER_DELAY_MS, DEFAULT_PRODUCER_USERNAME, PRODUCER_DELAY_PROPERTY,
    PRODUCER_USERNAME_PROPERTY,
};
use beanbox_domain::error::Result;
use beanbox_domain::ports::{ApplicationRunner, CustomerRepository, NameProducer, TransactionRunner};
use beanbox_infrastructure::adapters::InMemoryCustomerRepository;
use beanbox_infrastructure::container::{BeanDefinition, Configuration, ContainerBuilder};
use beanbox_infrastructure::events::EventBus;
use std::time::Duration;

/// Every bean of the demo application
#[derive(Debug, Default, Clone, Copy)]
pub struct CustomerConfiguration;

impl Configuration for CustomerConfiguration {
    fn name(&self) -> &str {
        "customer"
    }

    fn configure(&self, builder: &mut ContainerBuilder) -> Result<()> {
        builder
            .register(
                BeanDefinition::builder::<Foo>("foo")
                    .supplier(Foo::new)
                    .build()?,
            )
            .register(
                BeanDefinition::builder::<Bar>("bar")
                    .depends_on::<Foo>()
                    .factory(|ctx| Ok(Bar::new(ctx.resolve::<Foo>()?)))
                    .build()?,
            )
            .register(
                BeanDefinition::builder::<MyLifecycle>("myLifecycle")
                    .description("Runs closure and trait lifecycle hooks")
                    .factory(|ctx| {
                        Ok(MyLifecycle::new(
                            ctx.resolve_optional::<dyn TransactionRunner>()?,
                        ))
                    })
                    .after_construct(MyLifecycle::start)
                    .before_destroy(MyLifecycle::stop)
                    .with_lifecycle()
                    .build()?,
            )
            .register(
                BeanDefinition::builder::<AppleAppStore>("appleAppStore")
                    .qualifier("apple")
                    .supplier(|| AppleAppStore)
                    .provides::<dyn AppStore>(|store| store)
                    .build()?,
            )
            .register(
                BeanDefinition::builder::<GoogleAppStore>("googleAppStore")
                    .qualifier("google")
                    .supplier(|| GoogleAppStore)
                    .provides::<dyn AppStore>(|store| store)
                    .build()?,
            )
            .register(
                BeanDefinition::builder::<AppStoreConsumer>("appStoreConsumer")
                    .depends_on_qualified::<dyn AppStore>("apple")
                    .depends_on_qualified::<dyn AppStore>("google")
                    .factory(|ctx| {
                        Ok(AppStoreConsumer::new(
                            ctx.resolve_qualified::<dyn AppStore>("apple")?,
                            ctx.resolve_qualified::<dyn AppStore>("google")?,
                        ))
                    })
                    .build()?,
            )
            .register(
                BeanDefinition::builder::<InMemoryCustomerRepository>("customerRepository")
                    .description("In-memory customers behind a transactional proxy")
                    .factory(|ctx| {
                        Ok(InMemoryCustomerRepository::new()
                            .with_runner(ctx.resolve::<dyn TransactionRunner>()?))
                    })
                    .transactional::<dyn CustomerRepository>(|repository| repository)
                    .build()?,
            )
            .register(
                BeanDefinition::builder::<CustomerRepositoryRunner>("customerRepositoryRunner")
                    .depends_on::<dyn CustomerRepository>()
                    .factory(|ctx| {
                        Ok(CustomerRepositoryRunner::new(
                            ctx.resolve::<dyn CustomerRepository>()?,
                        ))
                    })
                    .provides::<dyn ApplicationRunner>(|runner| runner)
                    .build()?,
            )
            .register(
                BeanDefinition::builder::<StaticNameProducer>("nameProducer")
                    .supplier(|| StaticNameProducer::new("beanbox fans"))
                    .provides::<dyn NameProducer>(|producer| producer)
                    .build()?,
            )
            .register(
                BeanDefinition::builder::<EventConsumer>("eventConsumer")
                    .supplier(EventConsumer::new)
                    .on_event(EventConsumer::on_authentication)
                    .build()?,
            )
            .register(
                BeanDefinition::builder::<EventProducer>("eventProducer")
                    .depends_on::<EventBus>()
                    .factory(|ctx| {
                        let environment = ctx.environment();
                        let delay = environment
                            .property_as::<u64>(PRODUCER_DELAY_PROPERTY)?
                            .unwrap_or(DEFAULT_PRODUCER_DELAY_MS);
                        let username = environment
                            .property_or(PRODUCER_USERNAME_PROPERTY, DEFAULT_PRODUCER_USERNAME)
                            .to_string();
                        Ok(EventProducer::schedule(
                            ctx.resolve::<EventBus>()?,
                            username,
                            Duration::from_millis(delay),
                        ))
                    })
                    .before_destroy(EventProducer::cancel)
                    .build()?,
            );
        Ok(())
    }
}
