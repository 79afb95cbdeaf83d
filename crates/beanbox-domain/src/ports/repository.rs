//! Record store port

use crate::entities::Customer;
use crate::error::Result;

/// CRUD access to customer records
///
/// Implementations must be shareable across threads; the container hands
/// them out as `Arc<dyn CustomerRepository>`.
pub trait CustomerRepository: Send + Sync {
    /// Every stored customer, ordered by id
    fn find_all(&self) -> Result<Vec<Customer>>;

    /// Customers whose id is in `ids`; unknown ids are skipped
    fn find_by_id(&self, ids: &[i32]) -> Result<Vec<Customer>>;

    /// Store every customer and return them with assigned ids
    fn save_all(&self, customers: Vec<Customer>) -> Result<Vec<Customer>>;
}
