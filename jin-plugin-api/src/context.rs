//! PluginContext - a plugin's view of the host

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::watch;

use crate::capability::{Capability, CapabilityBag};
use crate::disposable::Disposable;
use crate::error::PluginError;

/// Per-plugin capability bag plus its cleanup-subscription list.
///
/// A context is a cheap handle: clones share the same state, and the host
/// keeps one context per plugin id for the plugin's whole life. When the host
/// updates its base context, the new capabilities are written into every
/// existing context in place, so a plugin holding on to its context sees
/// them without being reactivated. Each such update bumps [`version`](Self::version)
/// and wakes receivers returned by [`updates`](Self::updates).
///
/// # Example
///
/// ```ignore
/// async fn activate(&self, ctx: &PluginContext) -> Result<(), PluginError> {
///     let routes = ctx.service::<Arc<dyn RouteRegistrar>>(ROUTE_REGISTRAR)?;
///     let registration = routes.register(RouteSpec::new("/hello", "Hello"))?;
///     ctx.subscribe(registration);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct PluginContext {
    inner: Arc<ContextState>,
}

struct ContextState {
    plugin_id: String,
    /// Registration order is disposal order
    subscriptions: Mutex<Vec<Box<dyn Disposable>>>,
    capabilities: RwLock<CapabilityBag>,
    version: watch::Sender<u64>,
}

impl PluginContext {
    /// Create a context seeded with a copy of `capabilities`
    pub fn new(plugin_id: impl Into<String>, capabilities: CapabilityBag) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(ContextState {
                plugin_id: plugin_id.into(),
                subscriptions: Mutex::new(Vec::new()),
                capabilities: RwLock::new(capabilities),
                version,
            }),
        }
    }

    /// Id of the plugin owning this context
    pub fn plugin_id(&self) -> &str {
        &self.inner.plugin_id
    }

    /// True if both handles refer to the same context
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    // ─── Subscriptions ───────────────────────────────────────────────

    /// Register a resource to be disposed when the plugin is deactivated
    pub fn subscribe(&self, disposable: Box<dyn Disposable>) {
        self.subscriptions().push(disposable);
    }

    /// Number of resources currently registered
    pub fn subscription_count(&self) -> usize {
        self.subscriptions().len()
    }

    /// Remove and return every registered resource, in registration order
    /// (used by the host during deactivation)
    pub fn take_subscriptions(&self) -> Vec<Box<dyn Disposable>> {
        std::mem::take(&mut *self.subscriptions())
    }

    fn subscriptions(&self) -> std::sync::MutexGuard<'_, Vec<Box<dyn Disposable>>> {
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ─── Capabilities ────────────────────────────────────────────────

    /// Look up a capability by name
    pub fn capability(&self, name: &str) -> Option<Capability> {
        self.read_capabilities().get(name).cloned()
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.read_capabilities().contains(name)
    }

    /// Names of all capabilities currently visible, sorted
    pub fn capability_names(&self) -> Vec<String> {
        self.read_capabilities().names().map(str::to_string).collect()
    }

    /// Snapshot of every capability currently visible
    pub fn capabilities(&self) -> CapabilityBag {
        self.read_capabilities().clone()
    }

    /// Get a service capability as `T`.
    ///
    /// Fails with [`PluginError::MissingCapability`] if the name is unknown and
    /// [`PluginError::CapabilityType`] if it holds something else.
    pub fn service<T: std::any::Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, PluginError> {
        let capability = self
            .capability(name)
            .ok_or_else(|| PluginError::MissingCapability(name.to_string()))?;
        capability
            .downcast::<T>()
            .ok_or_else(|| PluginError::CapabilityType {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Get a plain-data capability
    pub fn value(&self, name: &str) -> Option<serde_json::Value> {
        self.read_capabilities()
            .get(name)
            .and_then(Capability::as_value)
            .cloned()
    }

    /// Copy every key of `base` onto this context in place and notify
    /// update receivers (used by the host)
    pub fn apply_base(&self, base: &CapabilityBag) {
        self.inner
            .capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .merge(base);
        self.inner.version.send_modify(|version| *version += 1);
    }

    fn read_capabilities(&self) -> std::sync::RwLockReadGuard<'_, CapabilityBag> {
        self.inner
            .capabilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ─── Updates ─────────────────────────────────────────────────────

    /// Number of base-context updates applied since the context was created
    pub fn version(&self) -> u64 {
        *self.inner.version.borrow()
    }

    /// Receiver that changes whenever the base context is updated
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.inner.version.subscribe()
    }

    // ─── Logging ─────────────────────────────────────────────────────

    /// Log an info message (automatically tagged with the plugin id)
    pub fn log_info(&self, message: &str) {
        tracing::info!(plugin = %self.inner.plugin_id, "{}", message);
    }

    /// Log a warning message
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(plugin = %self.inner.plugin_id, "{}", message);
    }

    /// Log an error message
    pub fn log_error(&self, message: &str) {
        tracing::error!(plugin = %self.inner.plugin_id, "{}", message);
    }

    /// Log a debug message
    pub fn log_debug(&self, message: &str) {
        tracing::debug!(plugin = %self.inner.plugin_id, "{}", message);
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_id", &self.inner.plugin_id)
            .field("subscriptions", &self.subscription_count())
            .field("capabilities", &self.capability_names())
            .field("version", &self.version())
            .finish()
    }
}
