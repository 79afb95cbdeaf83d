//! Demo application
//!
//! | Bean | Shows |
//! |------|-------|
//! | `foo`, `bar` | dependency ordering, singleton sharing |
//! | `myLifecycle` | closure and trait hooks, optional dependency |
//! | `appleAppStore`, `googleAppStore`, `appStoreConsumer` | qualifiers |
//! | `customerRepository`, `customerRepositoryRunner` | transactional proxy |
//! | `nameProducer` | input to the greeting auto-configuration |
//! | `eventConsumer`, `eventProducer` | event bus, background publication |

pub mod auto_config;
pub mod beans;
pub mod configuration;
pub mod runners;

pub use configuration::CustomerConfiguration;

use beanbox_domain::error::Result;
use beanbox_infrastructure::config::ConfigLoader;
use beanbox_infrastructure::container::{list_auto_configurations, BeanRegistry, ContainerBuilder};
use beanbox_infrastructure::logging::init_logging;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Delay before the event producer publishes, in milliseconds
pub const PRODUCER_DELAY_PROPERTY: &str = "demo.producer.delay-ms";
pub const DEFAULT_PRODUCER_DELAY_MS: u64 = 1000;

/// User name carried by the produced event
pub const PRODUCER_USERNAME_PROPERTY: &str = "demo.producer.username";
pub const DEFAULT_PRODUCER_USERNAME: &str = "jlong";

/// How long to keep the container open after the runners finish
pub const LINGER_PROPERTY: &str = "demo.linger-ms";
pub const DEFAULT_LINGER_MS: u64 = 1500;

/// Name greeted by the property-driven greeting runner
pub const GREETING_NAME_PROPERTY: &str = "greeting.name";

/// Set to `false` to drop the productive runner
pub const GREETING_PRODUCTIVE_PROPERTY: &str = "greeting.productive";

/// Options for [`run`]
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub list_beans: bool,
    pub profiles: Vec<String>,
    pub args: Vec<String>,
}

/// Load configuration, run the demo container and shut it down
pub async fn run(options: RunOptions) -> Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &options.config {
        loader = loader.with_config_path(path);
    }
    let mut config = loader.load()?;
    for profile in options.profiles {
        if !config.profiles.contains(&profile) {
            config.profiles.push(profile);
        }
    }
    init_logging(&config.logging)?;

    let context = ContainerBuilder::from_config(&config)
        .with_configuration(&CustomerConfiguration)?
        .build()?;
    context.start()?;

    if options.list_beans {
        print_beans(context.registry());
    }

    context.run(&options.args)?;

    let linger = context
        .environment()
        .property_as::<u64>(LINGER_PROPERTY)?
        .unwrap_or(DEFAULT_LINGER_MS);
    info!(linger_ms = linger, "Runners finished, waiting before shutdown");
    tokio::time::sleep(Duration::from_millis(linger)).await;

    let report = context.close();
    for failure in &report.failures {
        warn!(bean = %failure.bean, hook = %failure.hook, error = %failure.message, "Shutdown hook failed");
    }
    info!(destroyed = report.destroyed.len(), "Shutdown complete");
    Ok(())
}

fn print_beans(registry: &BeanRegistry) {
    for definition in registry.definitions() {
        let capabilities: Vec<&str> = definition
            .capabilities()
            .skip(1)
            .map(|capability| capability.name())
            .collect();
        println!(
            "{:<28} {:<10} {:<6} {}{}",
            definition.name(),
            definition.scope(),
            if definition.has_lifecycle_hooks() { "hooks" } else { "" },
            definition.bean_type(),
            if capabilities.is_empty() {
                String::new()
            } else {
                format!(" as [{}]", capabilities.join(", "))
            }
        );
    }
    println!();
    for (name, description) in list_auto_configurations() {
        println!("auto-configuration {name:<16} {description}");
    }
}
