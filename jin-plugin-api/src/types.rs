//! Plugin manifest and metadata structures

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Plugin manifest: identity and load instructions for a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Unique key into the host's registry
    pub id: String,
    /// Human-readable display name
    pub name: String,
    /// Plugin version (descriptive, not enforced)
    pub version: String,
    /// Where to fetch the plugin module from, if it is loaded dynamically
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Plugin id -> version range. Recorded, never resolved.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    /// Events that should activate the plugin. Recorded, never consumed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activation_events: Vec<String>,
    /// Names of base-context capabilities the plugin needs to activate
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
}

impl PluginManifest {
    /// Create a manifest with no url, dependencies or required capabilities
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            url: None,
            dependencies: BTreeMap::new(),
            activation_events: Vec::new(),
            capabilities: Vec::new(),
        }
    }

    /// Builder: set the module url
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Builder: declare a required capability
    pub fn requires(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }
}
