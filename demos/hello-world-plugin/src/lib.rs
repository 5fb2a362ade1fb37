//! Hello World Plugin - A simple example plugin for jin
//!
//! This plugin demonstrates:
//! - Module structure with the `export_module!` macro
//! - Implementing the `Plugin` trait and exporting it
//! - Registering a route through the `routerRegister` capability
//! - Handing the route back to the host with `ctx.subscribe`
//!
//! ## Building
//!
//! ```bash
//! cargo build --release
//! ```
//!
//! ## Serving
//!
//! ```bash
//! cd target/release && python3 -m http.server 3000
//! ```
//!
//! Then add it to `.jin/config.toml`:
//!
//! ```toml
//! [[plugins]]
//! id = "hello-world-plugin"
//! name = "Hello World Plugin"
//! version = "0.1.0"
//! url = "http://localhost:3000/libhello_world_plugin.so"
//! capabilities = ["routerRegister"]
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use jin_plugin_api::{
    Capability, ModuleScope, Plugin, PluginContext, PluginError, RouteSpec, export_module,
    route_registrar,
};

/// Registers an example page while active.
#[derive(Default)]
pub struct HelloWorldPlugin {
    /// Number of times the plugin has been activated
    activations: AtomicU32,
}

#[async_trait]
impl Plugin for HelloWorldPlugin {
    async fn activate(&self, ctx: &PluginContext) -> Result<(), PluginError> {
        let routes = route_registrar(ctx)?;
        ctx.subscribe(routes.register(RouteSpec::new("/example", "Example"))?);

        let count = self.activations.fetch_add(1, Ordering::Relaxed) + 1;
        ctx.log_info(&format!("Hello world plugin activated ({})", count));
        Ok(())
    }

    async fn deactivate(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

fn init(scope: &mut ModuleScope) -> Result<(), PluginError> {
    let exports = scope.exports();
    exports.set_plugin(HelloWorldPlugin::default());
    exports.insert("title", Capability::value("Example Page"));
    Ok(())
}

// This macro generates the C ABI entry points for dynamic loading
export_module!(init);
