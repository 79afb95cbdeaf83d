//! Resolved bean handle

use super::definition::BeanDefinition;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A realized bean viewed as capability `C`, with a back-reference to the
/// definition it came from
pub struct BeanInstance<C: ?Sized> {
    instance: Arc<C>,
    definition: Arc<BeanDefinition>,
}

impl<C: ?Sized> BeanInstance<C> {
    pub(crate) fn new(instance: Arc<C>, definition: Arc<BeanDefinition>) -> Self {
        Self {
            instance,
            definition,
        }
    }

    /// Name of the originating definition
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// The originating definition
    pub fn definition(&self) -> &BeanDefinition {
        &self.definition
    }

    /// Shared handle to the instance
    pub fn instance(&self) -> &Arc<C> {
        &self.instance
    }

    /// Drop the definition reference and keep the instance
    pub fn into_inner(self) -> Arc<C> {
        self.instance
    }
}

impl<C: ?Sized> Clone for BeanInstance<C> {
    fn clone(&self) -> Self {
        Self {
            instance: Arc::clone(&self.instance),
            definition: Arc::clone(&self.definition),
        }
    }
}

impl<C: ?Sized> Deref for BeanInstance<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.instance
    }
}

impl<C: ?Sized> fmt::Debug for BeanInstance<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanInstance")
            .field("name", &self.definition.name())
            .field("bean_type", &self.definition.bean_type())
            .finish()
    }
}
