//! Configuration types

mod app;
mod container;
mod logging;

pub use app::AppConfig;
pub use container::ContainerConfig;
pub use logging::LoggingConfig;
