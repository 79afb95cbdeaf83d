//! Application runner ports

use crate::error::Result;

/// Work executed after the container has started
///
/// Every bean providing this capability is invoked by the application
/// context in registration order.
pub trait ApplicationRunner: Send + Sync {
    /// Run with the command line arguments that were not consumed by the CLI
    fn run(&self, args: &[String]) -> Result<()>;
}

/// Supplies a name for the greeting runners
pub trait NameProducer: Send + Sync {
    /// The name to greet
    fn name(&self) -> String;
}
