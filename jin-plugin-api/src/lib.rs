//! jin-plugin-api - Plugin API for the jin plugin host
//!
//! This crate provides the traits and types needed to write plugins for jin.
//! A plugin receives a [`PluginContext`] when it is activated: a bag of
//! capabilities the host publishes, plus a list of [`Disposable`] resources
//! the host releases when the plugin is deactivated.
//!
//! Plugins reach the host in one of two ways:
//!
//! - registered in-process with a factory that returns an `Arc<dyn Plugin>`
//! - fetched from a URL as a native library built with [`export_module!`]
//!
//! # Example
//!
//! ```ignore
//! use jin_plugin_api::{ModuleScope, PluginError, RouteSpec, export_module, route_registrar};
//!
//! fn init(scope: &mut ModuleScope) -> Result<(), PluginError> {
//!     scope.exports().set_activate(|ctx| async move {
//!         let routes = route_registrar(&ctx)?;
//!         ctx.subscribe(routes.register(RouteSpec::new("/hello", "Hello"))?);
//!         ctx.log_info("Plugin activated!");
//!         Ok(())
//!     });
//!     Ok(())
//! }
//!
//! export_module!(init);
//! ```

pub mod capability;
pub mod context;
pub mod disposable;
pub mod error;
pub mod module;
pub mod routes;
pub mod types;

use std::any::Any;

use async_trait::async_trait;

pub use capability::{Capability, CapabilityBag};
pub use context::PluginContext;
pub use disposable::{Disposable, disposable};
pub use error::PluginError;
pub use module::{ExportedPlugin, Exports, ModuleResolver, ModuleScope};
pub use routes::{ROUTE_REGISTRAR, RouteRegistrar, RouteSpec, route_registrar};
pub use types::*;

/// Current module API version. Modules must match this exactly.
/// This is checked when loading native modules to ensure compatibility.
pub const API_VERSION: u32 = 1;

/// The core plugin trait - implement this to create a jin plugin.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Called on activation. Register resources with `ctx.subscribe` and read
    /// host capabilities from `ctx`.
    async fn activate(&self, ctx: &PluginContext) -> Result<(), PluginError>;

    /// Called on deactivation, before the context's resources are disposed
    async fn deactivate(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Best-effort message from a caught panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Export a module init function for dynamic loading.
///
/// This macro generates the C ABI entry points that jin uses to execute a
/// fetched native module. `init` receives the module's [`ModuleScope`] and
/// fills in its exports.
///
/// # Usage
///
/// ```ignore
/// fn init(scope: &mut ModuleScope) -> Result<(), PluginError> { ... }
///
/// jin_plugin_api::export_module!(init);
/// ```
///
/// # Generated Functions
///
/// - `_jin_module_api_version()`: Returns the API version
/// - `_jin_module_init()`: Runs `init`, recording errors and panics in the scope
#[macro_export]
macro_rules! export_module {
    ($init:path) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _jin_module_api_version() -> u32 {
            $crate::API_VERSION
        }

        #[unsafe(no_mangle)]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn _jin_module_init(scope: *mut $crate::ModuleScope) {
            if scope.is_null() {
                return;
            }
            // SAFETY: the host passes an exclusive pointer that outlives this call
            let scope = unsafe { &mut *scope };
            let result = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| $init(scope)));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => scope.fail(e),
                Err(panic) => scope.fail($crate::PluginError::custom(format!(
                    "module panicked: {}",
                    $crate::panic_message(&*panic)
                ))),
            }
        }
    };
}
