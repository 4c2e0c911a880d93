//! Provider registry
//!
//! Explicitly constructed at process start and shared by reference through
//! the application state; nothing here is a process-global.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::provider::EmailProvider;

/// Lookup table from provider name to implementation.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn EmailProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name, replacing any previous entry.
    pub fn register(&mut self, provider: Arc<dyn EmailProvider>) {
        self.providers.insert(provider.name(), provider);
    }

    /// Look up a provider by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownProvider`] when no provider was registered
    /// under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn EmailProvider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownProvider(name.to_owned()))
    }

    /// Whether a provider is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Names of all registered providers, sorted for stable output.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.providers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
