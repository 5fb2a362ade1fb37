use std::path::PathBuf;
use std::time::Duration;

use jin_core::{PluginHostConfig, ReactivationPolicy};
use jin_plugin_api::PluginManifest;
use serde::{Deserialize, Serialize};

/// Default timeout for fetching a plugin module
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawJinConfig {
    #[serde(default)]
    pub host: RawHostConfig,

    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

/// Host config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawHostConfig {
    /// Seconds to wait for a plugin module download
    pub fetch_timeout_secs: Option<u64>,

    /// Seconds a plugin's activate/deactivate may run
    pub hook_timeout_secs: Option<u64>,

    /// What activating an active plugin does
    pub reactivation: Option<ReactivationPolicy>,

    /// Where downloaded modules are staged
    pub module_cache_dir: Option<PathBuf>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JinConfig {
    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Seconds to wait for a plugin module download
    pub fetch_timeout_secs: u64,

    /// Seconds a plugin's activate/deactivate may run (unset = no limit)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_timeout_secs: Option<u64>,

    /// What activating an active plugin does
    #[serde(default)]
    pub reactivation: ReactivationPolicy,

    /// Where downloaded modules are staged (unset = jin cache dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_cache_dir: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            hook_timeout_secs: None,
            reactivation: ReactivationPolicy::default(),
            module_cache_dir: None,
        }
    }
}

impl HostConfig {
    /// Build the core host configuration
    pub fn to_host_config(&self) -> PluginHostConfig {
        let defaults = PluginHostConfig::default();
        PluginHostConfig {
            fetch_timeout: Some(Duration::from_secs(self.fetch_timeout_secs)),
            hook_timeout: self.hook_timeout_secs.map(Duration::from_secs),
            reactivation: self.reactivation,
            module_cache_dir: self
                .module_cache_dir
                .clone()
                .unwrap_or(defaults.module_cache_dir),
        }
    }
}

/// A `[[plugins]]` entry: a manifest plus whether `jin run` activates it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginEntry {
    #[serde(flatten)]
    pub manifest: PluginManifest,

    /// Activate after registration
    #[serde(default = "default_activate")]
    pub activate: bool,
}

fn default_activate() -> bool {
    true
}
