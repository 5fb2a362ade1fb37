//! Module registry - host modules a loaded plugin may `require`

use std::sync::{PoisonError, RwLock};

use jin_plugin_api::{Capability, CapabilityBag, ModuleResolver};

/// Name -> module table consulted by the loader while a fetched module runs.
///
/// Only names registered here resolve; everything else resolves to
/// [`Capability::Empty`] in the module scope.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: RwLock<CapabilityBag>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, replacing any previous module of the same name
    pub fn register(&self, name: impl Into<String>, module: Capability) {
        let name = name.into();
        tracing::debug!(module = %name, "Registering host module");
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, module);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Registered module names, sorted
    pub fn names(&self) -> Vec<String> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .names()
            .map(str::to_string)
            .collect()
    }
}

impl ModuleResolver for ModuleRegistry {
    fn resolve(&self, name: &str) -> Option<Capability> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}
