//! Greeting auto-configuration
//!
//! Adds a greeting runner unless the application already defines one:
//! from a [`NameProducer`] bean if there is one, otherwise from the
//! `greeting.name` property.

use super::runners::{GreetingRunner, ProductiveRunner};
use super::{GREETING_NAME_PROPERTY, GREETING_PRODUCTIVE_PROPERTY};
use beanbox_domain::error::Result;
use beanbox_domain::ports::{ApplicationRunner, NameProducer};
use beanbox_infrastructure::container::{
    AutoConfigurationEntry, BeanDefinition, Condition, ContainerBuilder, AUTO_CONFIGURATIONS,
};

#[linkme::distributed_slice(AUTO_CONFIGURATIONS)]
static GREETING_AUTO_CONFIGURATION: AutoConfigurationEntry = AutoConfigurationEntry {
    name: "greeting",
    description: "Greeting runner from a NameProducer bean or the greeting.name property",
    configure: configure_greeting,
};

fn configure_greeting(builder: &mut ContainerBuilder) -> Result<()> {
    builder.register_when(
        Condition::on_bean::<dyn NameProducer>()
            .and(Condition::on_missing_bean::<GreetingRunner>()),
        BeanDefinition::builder::<GreetingRunner>("nameProducerRunner")
            .depends_on::<dyn NameProducer>()
            .factory(|ctx| Ok(GreetingRunner::new(ctx.resolve::<dyn NameProducer>()?.name())))
            .provides::<dyn ApplicationRunner>(|runner| runner)
            .build()?,
    );

    builder.register_when(
        Condition::on_property(GREETING_NAME_PROPERTY)
            .and(Condition::on_missing_bean::<GreetingRunner>()),
        BeanDefinition::builder::<GreetingRunner>("propertyRunner")
            .factory(|ctx| {
                let name = ctx.environment().require_property(GREETING_NAME_PROPERTY)?;
                Ok(GreetingRunner::new(name))
            })
            .provides::<dyn ApplicationRunner>(|runner| runner)
            .build()?,
    );

    builder.register_when(
        Condition::custom("productive unless greeting.productive = false", |ctx| {
            ctx.environment().property(GREETING_PRODUCTIVE_PROPERTY) != Some("false")
        }),
        BeanDefinition::builder::<ProductiveRunner>("isProductiveRunner")
            .supplier(|| ProductiveRunner)
            .provides::<dyn ApplicationRunner>(|runner| runner)
            .build()?,
    );

    Ok(())
}
