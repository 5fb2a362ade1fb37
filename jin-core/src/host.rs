//! PluginHost - manages plugin registration, loading and lifecycle

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use jin_plugin_api::{
    Capability, CapabilityBag, Plugin, PluginContext, PluginError, PluginManifest, panic_message,
};

use crate::composer::ContextComposer;
use crate::config::{PluginHostConfig, ReactivationPolicy};
use crate::error::HostError;
use crate::loader::{ExecutionBackend, LoadedPlugin, PluginLoader};
use crate::modules::ModuleRegistry;
use crate::registry::{PluginInfo, PluginRegistry, PluginState};

type FactoryFuture = Pin<Box<dyn Future<Output = Result<Arc<dyn Plugin>, PluginError>> + Send>>;

/// Builds a plugin instance for a manifest without a url
pub struct PluginFactory(Box<dyn FnOnce(PluginManifest) -> FactoryFuture + Send>);

impl PluginFactory {
    /// Wrap an async constructor
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: FnOnce(PluginManifest) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Arc<dyn Plugin>, PluginError>> + Send + 'static,
    {
        Self(Box::new(move |manifest| Box::pin(factory(manifest))))
    }

    /// Factory that hands out an already-built instance
    pub fn from_plugin<P: Plugin + 'static>(plugin: P) -> Self {
        let plugin: Arc<dyn Plugin> = Arc::new(plugin);
        Self::new(move |_| async move { Ok(plugin) })
    }

    async fn create(self, manifest: PluginManifest) -> Result<Arc<dyn Plugin>, PluginError> {
        (self.0)(manifest).await
    }
}

/// The plugin host owns the plugin registry, the context composer, the host
/// module table and the loader.
///
/// Construct one per application and share it behind an `Arc`. Every
/// registration and transition for a given plugin id is serialized; distinct
/// ids proceed in parallel.
pub struct PluginHost {
    config: PluginHostConfig,
    registry: RwLock<PluginRegistry>,
    composer: ContextComposer,
    modules: Arc<ModuleRegistry>,
    loader: PluginLoader,
    /// Per-id transition locks
    transitions: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl PluginHost {
    /// Create a new plugin host loading native modules
    pub fn new(config: PluginHostConfig) -> Self {
        let modules = Arc::new(ModuleRegistry::new());
        let loader = PluginLoader::new(&config, modules.clone());
        Self::with_parts(config, modules, loader)
    }

    /// Create a new plugin host with a custom execution backend
    pub fn with_backend(config: PluginHostConfig, backend: Arc<dyn ExecutionBackend>) -> Self {
        let modules = Arc::new(ModuleRegistry::new());
        let loader = PluginLoader::with_backend(&config, modules.clone(), backend);
        Self::with_parts(config, modules, loader)
    }

    fn with_parts(config: PluginHostConfig, modules: Arc<ModuleRegistry>, loader: PluginLoader) -> Self {
        Self {
            config,
            registry: RwLock::new(PluginRegistry::new()),
            composer: ContextComposer::new(),
            modules,
            loader,
            transitions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &PluginHostConfig {
        &self.config
    }

    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    // ─── Registration ────────────────────────────────────────────────

    /// Register a plugin.
    ///
    /// A manifest with a url is loaded through the loader (a factory passed
    /// alongside is ignored); otherwise the factory builds the instance.
    /// Registering an id again replaces the stored plugin: an active previous
    /// instance is deactivated first and any resources left in the context
    /// are disposed. The new plugin is not activated.
    pub async fn register_plugin(
        &self,
        manifest: PluginManifest,
        factory: Option<PluginFactory>,
    ) -> Result<(), HostError> {
        let lock = self.transition_lock(&manifest.id);
        let _guard = lock.lock().await;

        let plugin: Arc<dyn Plugin> = match (&manifest.url, factory) {
            (Some(url), _) => Arc::new(self.loader.load(url).await?),
            (None, Some(factory)) => factory.create(manifest.clone()).await?,
            (None, None) => {
                return Err(HostError::Registration {
                    id: manifest.id.clone(),
                });
            }
        };

        let missing = self.composer.missing_from_base(&manifest.capabilities);
        if !missing.is_empty() {
            tracing::warn!(
                plugin = %manifest.id,
                missing = %missing.join(", "),
                "Plugin requires capabilities the host does not provide yet"
            );
        }

        self.retire_previous(&manifest.id).await;

        tracing::info!(
            plugin = %manifest.id,
            version = %manifest.version,
            "Plugin registered"
        );
        self.write_registry().insert(manifest, plugin);
        Ok(())
    }

    /// Register a batch of url-based manifests, e.g. a list collected before
    /// the host was ready. Failures are logged and returned; the rest are
    /// registered.
    pub async fn register_pending(
        &self,
        manifests: Vec<PluginManifest>,
    ) -> Vec<(String, HostError)> {
        let mut failures = Vec::new();
        for manifest in manifests {
            let id = manifest.id.clone();
            if let Err(e) = self.register_plugin(manifest, None).await {
                tracing::error!(plugin = %id, error = %e, "Failed to register pending plugin");
                failures.push((id, e));
            }
        }
        failures
    }

    /// Load a plugin from a url without registering it
    pub async fn load_plugin(&self, url: &str) -> Result<LoadedPlugin, HostError> {
        Ok(self.loader.load(url).await?)
    }

    // ─── Context ─────────────────────────────────────────────────────

    /// Merge capabilities into the base context; every existing plugin
    /// context receives the updated base in place.
    pub fn set_plugin_context(&self, partial: CapabilityBag) {
        self.composer.set_base_context(partial);
    }

    /// Make a host module available to `require` in loaded modules
    pub fn register_module(&self, name: impl Into<String>, module: Capability) {
        self.modules.register(name, module);
    }

    /// Snapshot of the base context
    pub fn base_context(&self) -> CapabilityBag {
        self.composer.base_context()
    }

    /// A plugin's context, if it has been activated at least once
    pub fn context(&self, id: &str) -> Option<PluginContext> {
        self.composer.context(id)
    }

    /// Capabilities the plugin requires that the base context lacks
    pub fn missing_capabilities(&self, id: &str) -> Result<Vec<String>, HostError> {
        let required = self
            .read_registry()
            .manifest(id)
            .map(|manifest| manifest.capabilities.clone())
            .ok_or_else(|| not_found(id))?;
        Ok(self.composer.missing_from_base(&required))
    }

    // ─── Lifecycle ───────────────────────────────────────────────────

    /// Activate a registered plugin.
    ///
    /// Creates the plugin's context on first use. Activating an active
    /// plugin follows the configured [`ReactivationPolicy`].
    pub async fn activate_plugin(&self, id: &str) -> Result<(), HostError> {
        if !self.contains(id) {
            return Err(not_found(id));
        }
        let lock = self.transition_lock(id);
        let _guard = lock.lock().await;

        let (plugin, required, state) = {
            let registry = self.read_registry();
            let entry = registry.get(id).ok_or_else(|| not_found(id))?;
            (
                Arc::clone(&entry.plugin),
                entry.manifest.capabilities.clone(),
                entry.state.clone(),
            )
        };
        let ctx = self.composer.get_or_create_context(id);

        if state.is_active() {
            match self.config.reactivation {
                ReactivationPolicy::Ignore => {
                    tracing::debug!(plugin = %id, "Plugin already active, ignoring activation");
                    return Ok(());
                }
                ReactivationPolicy::Restart => {
                    tracing::info!(plugin = %id, "Plugin already active, restarting");
                    self.run_deactivation(id, &plugin, Some(&ctx)).await?;
                }
            }
        }

        let missing: Vec<String> = required
            .into_iter()
            .filter(|name| !ctx.has_capability(name))
            .collect();
        if !missing.is_empty() {
            let err = HostError::MissingCapabilities {
                id: id.to_string(),
                missing,
            };
            tracing::error!(plugin = %id, error = %err, "Plugin cannot be activated");
            self.set_state(id, PluginState::Failed {
                error: err.to_string(),
            });
            return Err(err);
        }

        self.set_state(id, PluginState::Activating);
        let hook_plugin = Arc::clone(&plugin);
        let hook_ctx = ctx.clone();
        let result = self
            .run_hook(id, async move { hook_plugin.activate(&hook_ctx).await })
            .await;

        match result {
            Ok(()) => {
                self.set_state(id, PluginState::Active);
                tracing::info!(
                    plugin = %id,
                    subscriptions = ctx.subscription_count(),
                    "Plugin activated"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(plugin = %id, error = %e, "Plugin activation failed");
                // Resources subscribed before the failure have no other owner
                dispose_subscriptions(id, &ctx);
                self.set_state(id, PluginState::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Deactivate a registered plugin.
    ///
    /// Runs the plugin's `deactivate` hook, then disposes every resource
    /// registered in its context, in registration order. A failing resource
    /// is logged and does not stop the others. The context itself is kept
    /// for the next activation.
    pub async fn deactivate_plugin(&self, id: &str) -> Result<(), HostError> {
        if !self.contains(id) {
            return Err(not_found(id));
        }
        let lock = self.transition_lock(id);
        let _guard = lock.lock().await;

        let plugin = {
            let registry = self.read_registry();
            let entry = registry.get(id).ok_or_else(|| not_found(id))?;
            Arc::clone(&entry.plugin)
        };
        let ctx = self.composer.context(id);

        self.run_deactivation(id, &plugin, ctx.as_ref()).await
    }

    /// Deactivate every plugin that is active or still holds resources, e.g.
    /// at shutdown. Failures are logged and returned.
    pub async fn deactivate_all(&self) -> Vec<(String, HostError)> {
        let pending: Vec<String> = self
            .list_plugins()
            .into_iter()
            .filter(|info| info.state.is_active() || self.holds_resources(&info.id))
            .map(|info| info.id)
            .collect();
        let mut failures = Vec::new();

        for id in pending {
            if let Err(e) = self.deactivate_plugin(&id).await {
                tracing::warn!(plugin = %id, error = %e, "Failed to deactivate plugin");
                failures.push((id, e));
            }
        }
        failures
    }

    /// Wind down the instance about to be replaced under `id`. Called with
    /// the transition lock held.
    async fn retire_previous(&self, id: &str) {
        let previous = {
            let registry = self.read_registry();
            registry
                .get(id)
                .filter(|entry| entry.state.is_active())
                .map(|entry| Arc::clone(&entry.plugin))
        };
        let ctx = self.composer.context(id);

        if let Some(previous) = previous {
            tracing::info!(plugin = %id, "Deactivating replaced plugin instance");
            if let Err(e) = self.run_deactivation(id, &previous, ctx.as_ref()).await {
                tracing::warn!(plugin = %id, error = %e, "Replaced plugin failed to deactivate");
            }
        }

        if let Some(ctx) = ctx
            && ctx.subscription_count() > 0
        {
            dispose_subscriptions(id, &ctx);
        }
    }

    fn holds_resources(&self, id: &str) -> bool {
        self.composer
            .context(id)
            .is_some_and(|ctx| ctx.subscription_count() > 0)
    }

    /// Deactivation with the transition lock already held
    async fn run_deactivation(
        &self,
        id: &str,
        plugin: &Arc<dyn Plugin>,
        ctx: Option<&PluginContext>,
    ) -> Result<(), HostError> {
        self.set_state(id, PluginState::Deactivating);

        let hook_plugin = Arc::clone(plugin);
        if let Err(e) = self
            .run_hook(id, async move { hook_plugin.deactivate().await })
            .await
        {
            tracing::error!(plugin = %id, error = %e, "Plugin deactivate hook failed");
            self.set_state(id, PluginState::Failed {
                error: e.to_string(),
            });
            return Err(e);
        }

        if let Some(ctx) = ctx {
            dispose_subscriptions(id, ctx);
        }

        self.set_state(id, PluginState::Inactive);
        tracing::info!(plugin = %id, "Plugin deactivated");
        Ok(())
    }

    /// Run a plugin hook on its own task, isolating panics and applying the
    /// configured hook timeout
    async fn run_hook<F>(&self, id: &str, hook: F) -> Result<(), HostError>
    where
        F: Future<Output = Result<(), PluginError>> + Send + 'static,
    {
        let mut task = tokio::spawn(hook);

        let joined = match self.config.hook_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    return Err(HostError::Timeout {
                        id: id.to_string(),
                        timeout,
                    });
                }
            },
            None => task.await,
        };

        match joined {
            Ok(result) => Ok(result?),
            Err(e) if e.is_panic() => {
                let message = panic_message(&*e.into_panic());
                tracing::error!(plugin = %id, panic = %message, "Plugin panicked");
                Err(PluginError::custom(format!("plugin panicked: {message}")).into())
            }
            Err(e) => Err(PluginError::custom(e.to_string()).into()),
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────

    pub fn contains(&self, id: &str) -> bool {
        self.read_registry().contains(id)
    }

    pub fn manifest(&self, id: &str) -> Option<PluginManifest> {
        self.read_registry().manifest(id).cloned()
    }

    pub fn plugin_state(&self, id: &str) -> Option<PluginState> {
        self.read_registry().state(id).cloned()
    }

    /// All registered plugins, sorted by id
    pub fn list_plugins(&self) -> Vec<PluginInfo> {
        self.read_registry().list()
    }

    pub fn plugin_count(&self) -> usize {
        self.read_registry().len()
    }

    // ─── Internals ───────────────────────────────────────────────────

    fn transition_lock(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id.to_string()).or_default())
    }

    fn set_state(&self, id: &str, state: PluginState) {
        self.write_registry().set_state(id, state);
    }

    fn read_registry(&self) -> std::sync::RwLockReadGuard<'_, PluginRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> std::sync::RwLockWriteGuard<'_, PluginRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(id: &str) -> HostError {
    HostError::NotFound { id: id.to_string() }
}

/// Dispose a context's resources in registration order. Each resource is
/// isolated: an error or panic is logged and the rest still run.
fn dispose_subscriptions(id: &str, ctx: &PluginContext) {
    let subscriptions = ctx.take_subscriptions();
    let total = subscriptions.len();
    let mut failed = 0usize;

    for (index, mut subscription) in subscriptions.into_iter().enumerate() {
        match std::panic::catch_unwind(AssertUnwindSafe(|| subscription.dispose())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                failed += 1;
                tracing::error!(plugin = %id, index, error = %e, "Failed to dispose plugin resource");
            }
            Err(panic) => {
                failed += 1;
                tracing::error!(
                    plugin = %id,
                    index,
                    panic = %panic_message(&*panic),
                    "Plugin resource panicked while disposing"
                );
            }
        }
    }

    tracing::debug!(plugin = %id, total, failed, "Plugin resources disposed");
}
