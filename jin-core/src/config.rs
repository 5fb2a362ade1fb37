//! Plugin host configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What `activate_plugin` does with a plugin that is already active
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactivationPolicy {
    /// Return immediately without calling `activate` again
    #[default]
    Ignore,
    /// Fully deactivate the plugin, then activate it again
    Restart,
}

/// Configuration for PluginHost
#[derive(Debug, Clone)]
pub struct PluginHostConfig {
    /// Timeout for fetching a plugin module (none = wait forever)
    pub fetch_timeout: Option<Duration>,
    /// Timeout for plugin `activate`/`deactivate` hooks (none = wait forever)
    pub hook_timeout: Option<Duration>,
    /// Behavior when activating an already-active plugin
    pub reactivation: ReactivationPolicy,
    /// Where fetched native modules are staged before being opened
    pub module_cache_dir: PathBuf,
}

impl Default for PluginHostConfig {
    fn default() -> Self {
        // Use XDG cache directory helper for consistency
        let module_cache_dir = jin_paths::module_cache_dir();

        Self {
            fetch_timeout: Some(Duration::from_secs(30)),
            hook_timeout: None,
            reactivation: ReactivationPolicy::default(),
            module_cache_dir,
        }
    }
}
