use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;

use super::types::{
    DEFAULT_FETCH_TIMEOUT_SECS, HostConfig, JinConfig, PluginEntry, RawHostConfig, RawJinConfig,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<JinConfig> {
        Self::load_with(None)
    }

    /// Load merged configuration, with an explicit file layered on top
    pub fn load_with(explicit: Option<&Path>) -> Result<JinConfig> {
        let mut raw = RawJinConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        // Layer 3: File given on the command line
        if let Some(path) = explicit {
            raw = Self::merge_raw(raw, Self::read_raw(path)?);
        }

        // Convert to final config with defaults applied
        Ok(Self::finalize(raw))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "jin").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with JIN_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("JIN_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".jin/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawJinConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set).
    ///
    /// Plugin entries are keyed by id: an overlay entry replaces the base
    /// entry with the same id, new ids are appended.
    fn merge_raw(base: RawJinConfig, overlay: RawJinConfig) -> RawJinConfig {
        let mut plugins: Vec<PluginEntry> = base.plugins;
        for entry in overlay.plugins {
            match plugins
                .iter_mut()
                .find(|existing| existing.manifest.id == entry.manifest.id)
            {
                Some(existing) => *existing = entry,
                None => plugins.push(entry),
            }
        }

        RawJinConfig {
            host: RawHostConfig {
                fetch_timeout_secs: overlay.host.fetch_timeout_secs.or(base.host.fetch_timeout_secs),
                hook_timeout_secs: overlay.host.hook_timeout_secs.or(base.host.hook_timeout_secs),
                reactivation: overlay.host.reactivation.or(base.host.reactivation),
                module_cache_dir: overlay.host.module_cache_dir.or(base.host.module_cache_dir),
            },
            plugins,
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawJinConfig) -> JinConfig {
        JinConfig {
            host: HostConfig {
                fetch_timeout_secs: raw
                    .host
                    .fetch_timeout_secs
                    .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
                hook_timeout_secs: raw.host.hook_timeout_secs,
                reactivation: raw.host.reactivation.unwrap_or_default(),
                module_cache_dir: raw.host.module_cache_dir,
            },
            plugins: raw.plugins,
        }
    }

    /// Load config from a specific path (for testing)
    #[cfg(test)]
    pub fn load_from_path(path: &Path) -> Result<JinConfig> {
        if path.exists() {
            Ok(Self::finalize(Self::read_raw(path)?))
        } else {
            Ok(JinConfig::default())
        }
    }
}
