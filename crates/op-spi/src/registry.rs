//! Priority-ordered provider registry.
//!
//! Providers are configured once at startup, in priority order. Lookups
//! try the provider that answered last time first, then fall through
//! the rest in order. This replaces runtime service discovery while
//! keeping its preference policy.

use std::sync::Arc;

use parking_lot::Mutex;

/// An ordered set of providers for one collaborator interface.
pub struct ProviderRegistry<T: ?Sized> {
    providers: Vec<Arc<T>>,
    last_successful: Mutex<Option<usize>>,
}

impl<T: ?Sized> ProviderRegistry<T> {
    /// Creates a registry over providers in priority order.
    #[must_use]
    pub fn new(providers: Vec<Arc<T>>) -> Self {
        Self {
            providers,
            last_successful: Mutex::new(None),
        }
    }

    /// Number of configured providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Providers in lookup order: the last successful one first, then
    /// the rest in priority order.
    #[must_use]
    pub fn preferred_order(&self) -> Vec<(usize, Arc<T>)> {
        let preferred = *self.last_successful.lock();
        let mut order = Vec::with_capacity(self.providers.len());
        if let Some(index) = preferred {
            if let Some(provider) = self.providers.get(index) {
                order.push((index, provider.clone()));
            }
        }
        for (index, provider) in self.providers.iter().enumerate() {
            if Some(index) != preferred {
                order.push((index, provider.clone()));
            }
        }
        order
    }

    /// Records that the provider at `index` answered, making it the
    /// first one tried next time.
    pub fn mark_successful(&self, index: usize) {
        *self.last_successful.lock() = Some(index);
    }

    /// Applies `f` to providers in lookup order, returning the first
    /// `Some` and remembering which provider produced it.
    pub fn find_map<R>(&self, f: impl Fn(&T) -> Option<R>) -> Option<R> {
        for (index, provider) in self.preferred_order() {
            if let Some(result) = f(&provider) {
                self.mark_successful(index);
                return Some(result);
            }
        }
        None
    }

    /// All providers in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.providers.iter()
    }
}

impl<T: ?Sized> std::fmt::Debug for ProviderRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.len())
            .field("last_successful", &*self.last_successful.lock())
            .finish()
    }
}
