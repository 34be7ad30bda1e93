//! In-process factory catalog

use std::collections::HashMap;
use std::sync::Arc;

use hotswap_plugin_api::{Plugin, PluginInit};

use crate::error::{RegistryError, Result};

/// Factory producing a fresh plugin instance
pub type Factory = Arc<dyn Fn(PluginInit) -> Box<dyn Plugin> + Send + Sync>;

/// Explicit registration of built-in plugins, keyed by plugin identifier.
///
/// Each identifier has at most one factory; a second registration is rejected
/// instead of silently replacing the first.
#[derive(Clone, Default)]
pub struct FactoryCatalog {
    factories: HashMap<String, Factory>,
}

impl FactoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory closure for `id`
    pub fn register<F>(&mut self, id: &str, factory: F) -> Result<()>
    where
        F: Fn(PluginInit) -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        if self.factories.contains_key(id) {
            return Err(RegistryError::AmbiguousImplementation {
                id: id.to_string(),
                reason: "a factory is already registered for this identifier".to_string(),
            });
        }
        self.factories.insert(id.to_string(), Arc::new(factory));
        Ok(())
    }

    /// Register a plugin type constructible from a [`PluginInit`]
    pub fn register_type<T>(&mut self, id: &str) -> Result<()>
    where
        T: Plugin + From<PluginInit> + 'static,
    {
        self.register(id, hotswap_plugin_api::create::<T>)
    }

    pub fn get(&self, id: &str) -> Option<Factory> {
        self.factories.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for FactoryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryCatalog")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
