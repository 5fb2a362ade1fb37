//! Plugin registry - tracks registered plugins and their lifecycle state

use std::collections::HashMap;
use std::sync::Arc;

use jin_plugin_api::{Plugin, PluginManifest};

/// Lifecycle state of a registered plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginState {
    /// Registered, never activated
    Registered,
    /// `activate` is running
    Activating,
    /// Activated successfully
    Active,
    /// `deactivate` or disposal is running
    Deactivating,
    /// Deactivated; may be activated again
    Inactive,
    /// The last transition failed
    Failed { error: String },
}

impl PluginState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Information about a plugin
#[derive(Debug, Clone)]
pub struct PluginInfo {
    /// Plugin id
    pub id: String,
    /// Plugin manifest
    pub manifest: PluginManifest,
    /// Current state
    pub state: PluginState,
}

/// A registry entry
#[derive(Clone)]
pub struct RegisteredPlugin {
    pub manifest: PluginManifest,
    pub plugin: Arc<dyn Plugin>,
    pub state: PluginState,
}

/// Registry of plugins by manifest id
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, RegisteredPlugin>,
    /// Instances replaced by re-registration. Their contexts may still hold
    /// disposables built from module code, so the modules stay loaded.
    retired: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a plugin under its manifest id, replacing any previous entry
    pub fn insert(&mut self, manifest: PluginManifest, plugin: Arc<dyn Plugin>) {
        let id = manifest.id.clone();
        let entry = RegisteredPlugin {
            manifest,
            plugin,
            state: PluginState::Registered,
        };

        if let Some(previous) = self.plugins.insert(id.clone(), entry) {
            tracing::warn!(plugin = %id, "Plugin re-registered, replacing previous instance");
            self.retired.push(previous.plugin);
        }
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredPlugin> {
        self.plugins.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    pub fn manifest(&self, id: &str) -> Option<&PluginManifest> {
        self.plugins.get(id).map(|entry| &entry.manifest)
    }

    pub fn state(&self, id: &str) -> Option<&PluginState> {
        self.plugins.get(id).map(|entry| &entry.state)
    }

    /// Update a plugin's state. Returns false if the id is unknown.
    pub fn set_state(&mut self, id: &str, state: PluginState) -> bool {
        match self.plugins.get_mut(id) {
            Some(entry) => {
                entry.state = state;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Ids of plugins currently `Active`, sorted
    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .plugins
            .iter()
            .filter(|(_, entry)| entry.state.is_active())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// All plugins, sorted by id
    pub fn list(&self) -> Vec<PluginInfo> {
        let mut infos: Vec<PluginInfo> = self
            .plugins
            .iter()
            .map(|(id, entry)| PluginInfo {
                id: id.clone(),
                manifest: entry.manifest.clone(),
                state: entry.state.clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }
}
