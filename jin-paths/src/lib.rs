//! Filesystem locations used by the jin host.
//!
//! Staged plugin modules follow the XDG base directory layout on every
//! platform (`$XDG_CACHE_HOME/jin/modules`). An unset variable falls back to
//! the usual dot-directory in the home directory.

use std::path::PathBuf;

const APP_DIR: &str = "jin";

/// Root of jin's disposable state. Safe to delete while no host is running.
///
/// ```
/// let modules = jin_paths::cache_dir().join("modules");
/// assert!(modules.ends_with("jin/modules"));
/// ```
pub fn cache_dir() -> PathBuf {
    xdg_dir("XDG_CACHE_HOME", ".cache")
}

/// Where fetched native modules are written before the host opens them
pub fn module_cache_dir() -> PathBuf {
    cache_dir().join("modules")
}

/// `$var/jin` when `var` is set and non-empty, else `~/<fallback>/jin`
fn xdg_dir(var: &str, fallback: &str) -> PathBuf {
    let base = std::env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(fallback)))
        .unwrap_or_else(|| PathBuf::from(fallback));
    base.join(APP_DIR)
}
