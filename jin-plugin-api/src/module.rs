//! Module scope - what a dynamically loaded plugin module sees while it runs
//!
//! A fetched module is executed once. While it runs it has a [`ModuleScope`]:
//! an `exports` object to fill in, the option of replacing the module's
//! exports wholesale, and a restricted [`require`](ModuleScope::require) that
//! only resolves names the host registered. When execution finishes the host
//! takes the effective exports and turns them into a plugin instance.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::Plugin;
use crate::capability::{Capability, CapabilityBag};
use crate::context::PluginContext;
use crate::error::PluginError;

/// Boxed future returned by exported hooks
pub type HookFuture = Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send>>;

/// Exported `activate` hook
pub type ActivateHook = Box<dyn Fn(PluginContext) -> HookFuture + Send + Sync>;

/// Exported `deactivate` hook
pub type DeactivateHook = Box<dyn Fn() -> HookFuture + Send + Sync>;

/// Resolves names passed to [`ModuleScope::require`]
pub trait ModuleResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Capability>;
}

impl ModuleResolver for CapabilityBag {
    fn resolve(&self, name: &str) -> Option<Capability> {
        self.get(name).cloned()
    }
}

/// The exports object of a module
#[derive(Default)]
pub struct Exports {
    activate: Option<ActivateHook>,
    deactivate: Option<DeactivateHook>,
    values: CapabilityBag,
}

impl Exports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export an `activate` hook
    pub fn set_activate<F, Fut>(&mut self, hook: F)
    where
        F: Fn(PluginContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), PluginError>> + Send + 'static,
    {
        self.activate = Some(Box::new(move |ctx| Box::pin(hook(ctx))));
    }

    /// Export a `deactivate` hook
    pub fn set_deactivate<F, Fut>(&mut self, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), PluginError>> + Send + 'static,
    {
        self.deactivate = Some(Box::new(move || Box::pin(hook())));
    }

    /// Export both hooks from a [`Plugin`] implementation
    pub fn set_plugin<P: Plugin + 'static>(&mut self, plugin: P) {
        let plugin = Arc::new(plugin);

        let on_activate = Arc::clone(&plugin);
        self.activate = Some(Box::new(move |ctx| {
            let plugin = Arc::clone(&on_activate);
            Box::pin(async move { plugin.activate(&ctx).await })
        }));

        self.deactivate = Some(Box::new(move || {
            let plugin = Arc::clone(&plugin);
            Box::pin(async move { plugin.deactivate().await })
        }));
    }

    /// Export a named value alongside the hooks
    pub fn insert(&mut self, name: impl Into<String>, value: Capability) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.values.get(name)
    }

    pub fn has_activate(&self) -> bool {
        self.activate.is_some()
    }

    pub fn has_deactivate(&self) -> bool {
        self.deactivate.is_some()
    }

    /// Turn the exports into a plugin, or give them back if there is no
    /// `activate` hook
    pub fn into_plugin(self) -> Result<ExportedPlugin, Self> {
        match self.activate {
            Some(activate) => Ok(ExportedPlugin {
                activate,
                deactivate: self.deactivate,
                values: self.values,
            }),
            None => Err(self),
        }
    }
}

impl fmt::Debug for Exports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exports")
            .field("activate", &self.has_activate())
            .field("deactivate", &self.has_deactivate())
            .field("values", &self.values)
            .finish()
    }
}

/// A plugin built from a module's exports
pub struct ExportedPlugin {
    activate: ActivateHook,
    deactivate: Option<DeactivateHook>,
    values: CapabilityBag,
}

impl ExportedPlugin {
    /// Values exported next to the hooks
    pub fn values(&self) -> &CapabilityBag {
        &self.values
    }

    pub fn has_deactivate(&self) -> bool {
        self.deactivate.is_some()
    }
}

#[async_trait]
impl Plugin for ExportedPlugin {
    async fn activate(&self, ctx: &PluginContext) -> Result<(), PluginError> {
        (self.activate)(ctx.clone()).await
    }

    async fn deactivate(&self) -> Result<(), PluginError> {
        match &self.deactivate {
            Some(deactivate) => deactivate().await,
            None => Ok(()),
        }
    }
}

/// Execution scope handed to a module's init function.
///
/// `exports()` is the object the module starts with. Calling
/// [`set_module_exports`](Self::set_module_exports) replaces the module's
/// exports; once replaced, the original object is ignored even if the module
/// keeps writing to it.
pub struct ModuleScope {
    url: String,
    exports: Exports,
    module_exports: Option<Exports>,
    resolver: Arc<dyn ModuleResolver>,
    error: Option<PluginError>,
}

impl ModuleScope {
    pub fn new(url: impl Into<String>, resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            url: url.into(),
            exports: Exports::new(),
            module_exports: None,
            resolver,
            error: None,
        }
    }

    /// URL the module was fetched from
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The original exports object
    pub fn exports(&mut self) -> &mut Exports {
        &mut self.exports
    }

    /// The module's current exports: the replacement if one was set,
    /// otherwise the original object
    pub fn module_exports(&mut self) -> &mut Exports {
        self.module_exports.as_mut().unwrap_or(&mut self.exports)
    }

    /// Replace the module's exports
    pub fn set_module_exports(&mut self, exports: Exports) {
        self.module_exports = Some(exports);
    }

    pub fn is_reassigned(&self) -> bool {
        self.module_exports.is_some()
    }

    /// Resolve a host-provided module by name.
    ///
    /// Unknown names resolve to [`Capability::Empty`] so module code that
    /// probes for optional host modules keeps running.
    pub fn require(&self, name: &str) -> Capability {
        match self.resolver.resolve(name) {
            Some(module) => module,
            None => {
                tracing::warn!(url = %self.url, module = %name, "Module not found, using empty module");
                Capability::Empty
            }
        }
    }

    /// Record an error raised while the module was executing
    pub fn fail(&mut self, error: PluginError) {
        self.error = Some(error);
    }

    pub fn take_error(&mut self) -> Option<PluginError> {
        self.error.take()
    }

    /// The exports the host should use
    pub fn into_effective_exports(self) -> Exports {
        self.module_exports.unwrap_or(self.exports)
    }
}

impl fmt::Debug for ModuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleScope")
            .field("url", &self.url)
            .field("exports", &self.exports)
            .field("module_exports", &self.module_exports)
            .field("error", &self.error)
            .finish()
    }
}
