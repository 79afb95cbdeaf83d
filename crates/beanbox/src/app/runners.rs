//! Application runners

use beanbox_domain::entities::Customer;
use beanbox_domain::error::Result;
use beanbox_domain::ports::{ApplicationRunner, CustomerRepository};
use std::sync::Arc;
use tracing::info;

/// Greets a name when the application runs
#[derive(Debug, Clone)]
pub struct GreetingRunner {
    name: String,
}

impl GreetingRunner {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn greeting(&self) -> String {
        format!("hello, {}", self.name)
    }
}

impl ApplicationRunner for GreetingRunner {
    fn run(&self, _args: &[String]) -> Result<()> {
        info!("{}", self.greeting());
        Ok(())
    }
}

/// Lists the stored customers, then saves two more
pub struct CustomerRepositoryRunner {
    repository: Arc<dyn CustomerRepository>,
}

impl CustomerRepositoryRunner {
    pub fn new(repository: Arc<dyn CustomerRepository>) -> Self {
        Self { repository }
    }
}

impl ApplicationRunner for CustomerRepositoryRunner {
    fn run(&self, _args: &[String]) -> Result<()> {
        for customer in self.repository.find_all()? {
            info!("{customer}");
        }
        let saved = self
            .repository
            .save_all(vec![Customer::new("Alexey"), Customer::new("Josh")])?;
        for customer in &saved {
            info!("saved {customer}");
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ProductiveRunner;

impl ApplicationRunner for ProductiveRunner {
    fn run(&self, _args: &[String]) -> Result<()> {
        info!("beanbox is productive!");
        Ok(())
    }
}
