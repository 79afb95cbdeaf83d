//! Customer record

use serde::{Deserialize, Serialize};
use std::fmt;

/// A customer row held by a record store
///
/// `id` is `None` until the store assigns one on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Store-assigned identifier
    pub id: Option<i32>,
    /// Display name
    pub name: String,
}

impl Customer {
    /// Create an unsaved customer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// Create a customer with a known identifier
    pub fn with_id(id: i32, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
        }
    }
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Customer[id={id}, name={}]", self.name),
            None => write!(f, "Customer[id=null, name={}]", self.name),
        }
    }
}
