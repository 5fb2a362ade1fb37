//! Plugin loader - turns a URL into a plugin instance
//!
//! Loading fails fast through four steps:
//!
//! 1. Fetch the module (`http`/`https` through reqwest, `file` from disk)
//! 2. Run it through the configured [`ExecutionBackend`] inside a fresh
//!    [`ModuleScope`] whose `require` resolves against the host's modules
//! 3. Pick the effective exports (the replacement if the module reassigned
//!    them, otherwise the original exports object)
//! 4. Require an `activate` export
//!
//! Every failure is a [`LoadError`] naming the URL.

mod backend;
mod native;

pub use backend::{ExecutionBackend, ModuleHandle};
pub use native::NativeLibraryBackend;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jin_plugin_api::{
    CapabilityBag, ExportedPlugin, ModuleResolver, ModuleScope, Plugin, PluginContext, PluginError,
    panic_message,
};
use url::Url;

use crate::config::PluginHostConfig;
use crate::error::LoadError;

/// A plugin built from a fetched module.
///
/// Keeps the backend's module handle alive for as long as the plugin exists.
pub struct LoadedPlugin {
    url: String,
    plugin: ExportedPlugin,
    /// Declared last so it is dropped after the plugin
    _handle: ModuleHandle,
}

impl LoadedPlugin {
    /// URL the module was fetched from
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn has_deactivate(&self) -> bool {
        self.plugin.has_deactivate()
    }

    /// Values the module exported next to its hooks
    pub fn exported_values(&self) -> &CapabilityBag {
        self.plugin.values()
    }
}

#[async_trait]
impl Plugin for LoadedPlugin {
    async fn activate(&self, ctx: &PluginContext) -> Result<(), PluginError> {
        self.plugin.activate(ctx).await
    }

    async fn deactivate(&self) -> Result<(), PluginError> {
        self.plugin.deactivate().await
    }
}

/// Fetches and executes plugin modules
#[derive(Clone)]
pub struct PluginLoader {
    client: reqwest::Client,
    fetch_timeout: Option<Duration>,
    backend: Arc<dyn ExecutionBackend>,
    modules: Arc<dyn ModuleResolver>,
}

impl PluginLoader {
    /// Create a loader using the native library backend
    pub fn new(config: &PluginHostConfig, modules: Arc<dyn ModuleResolver>) -> Self {
        let backend = Arc::new(NativeLibraryBackend::new(&config.module_cache_dir));
        Self::with_backend(config, modules, backend)
    }

    /// Create a loader with a custom execution backend
    pub fn with_backend(
        config: &PluginHostConfig,
        modules: Arc<dyn ModuleResolver>,
        backend: Arc<dyn ExecutionBackend>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            fetch_timeout: config.fetch_timeout,
            backend,
            modules,
        }
    }

    /// Fetch, execute and validate the module at `url`
    pub async fn load(&self, url: &str) -> Result<LoadedPlugin, LoadError> {
        tracing::debug!(url = %url, "Loading plugin module");
        let source = self.fetch(url).await?;
        let (handle, mut scope) = self.execute(url, source).await?;

        // Exports hold module code, so they are declared after (and dropped
        // before) the handle.
        let module_error = scope.take_error();
        let exports = scope.into_effective_exports();
        if let Some(e) = module_error {
            drop(exports);
            return Err(LoadError::execution(url, e.to_string()));
        }

        let plugin = exports.into_plugin().map_err(|_| LoadError::MissingActivate {
            url: url.to_string(),
        })?;

        tracing::info!(url = %url, "Plugin module loaded");
        Ok(LoadedPlugin {
            url: url.to_string(),
            plugin,
            _handle: handle,
        })
    }

    /// Fetch module bytes
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let parsed = Url::parse(url).map_err(|e| LoadError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => self.fetch_http(url).await,
            "file" => {
                let path = parsed.to_file_path().map_err(|()| LoadError::InvalidUrl {
                    url: url.to_string(),
                    message: "not a local file path".to_string(),
                })?;
                tokio::fs::read(&path).await.map_err(|e| LoadError::Fetch {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
            other => Err(LoadError::InvalidUrl {
                url: url.to_string(),
                message: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let fetch_error = |e: reqwest::Error| LoadError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        };

        let mut request = self.client.get(url);
        if let Some(timeout) = self.fetch_timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response.bytes().await.map_err(fetch_error)?;
        Ok(body.to_vec())
    }

    /// Run the backend on its own task so a panicking backend surfaces as
    /// an error instead of unwinding through the caller
    async fn execute(
        &self,
        url: &str,
        source: Vec<u8>,
    ) -> Result<(ModuleHandle, ModuleScope), LoadError> {
        let backend = Arc::clone(&self.backend);
        let modules = Arc::clone(&self.modules);
        let task_url = url.to_string();

        let task = tokio::spawn(async move {
            let mut scope = ModuleScope::new(task_url.clone(), modules);
            let handle = backend.execute(&task_url, source, &mut scope).await?;
            Ok::<_, LoadError>((handle, scope))
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(LoadError::execution(
                url,
                format!("module execution panicked: {}", panic_message(&*e.into_panic())),
            )),
            Err(e) => Err(LoadError::execution(url, e.to_string())),
        }
    }
}
