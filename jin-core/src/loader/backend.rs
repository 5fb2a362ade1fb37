//! Execution backends - how fetched module bytes become exports

use std::any::Any;

use async_trait::async_trait;
use jin_plugin_api::ModuleScope;

use crate::error::LoadError;

/// Resources a backend must keep alive while the module's plugin lives,
/// e.g. a loaded library. Dropped after the plugin instance.
pub type ModuleHandle = Box<dyn Any + Send + Sync>;

/// Runs a fetched module inside a [`ModuleScope`].
///
/// The backend fills the scope's exports by running the module. Errors the
/// module itself reports go into the scope via [`ModuleScope::fail`]; the
/// backend returns `Err` only when it could not run the module at all.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn execute(
        &self,
        url: &str,
        source: Vec<u8>,
        scope: &mut ModuleScope,
    ) -> Result<ModuleHandle, LoadError>;
}
