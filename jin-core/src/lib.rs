//! jin-core: Core library for the jin plugin host
//!
//! This crate provides the host side of the plugin system:
//!
//! - [`PluginHost`]: registers, loads, activates and deactivates plugins
//! - [`PluginRegistry`]: tracks registered plugins and their [`PluginState`]
//! - [`PluginLoader`]: fetches a module by url and runs it through an [`ExecutionBackend`]
//! - [`ContextComposer`]: the base context and per-plugin [`PluginContext`]s
//! - [`ModuleRegistry`]: host modules that loaded code may `require`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use jin_core::{PluginHost, PluginHostConfig};
//! use jin_plugin_api::{CapabilityBag, PluginManifest, ROUTE_REGISTRAR, routes};
//!
//! let host = Arc::new(PluginHost::new(PluginHostConfig::default()));
//!
//! // Publish host capabilities
//! host.set_plugin_context(
//!     CapabilityBag::new().with(ROUTE_REGISTRAR, routes::registrar_capability(route_table)),
//! );
//!
//! // Register and activate a plugin served over http
//! let manifest = PluginManifest::new("hello", "Hello", "0.1.0")
//!     .with_url("http://localhost:3000/libhello.so");
//! host.register_plugin(manifest, None).await?;
//! host.activate_plugin("hello").await?;
//!
//! // Later
//! host.deactivate_all().await;
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────── PluginHost ────────────────────────┐
//! │  PluginRegistry      ContextComposer       ModuleRegistry  │
//! │  id -> plugin        base + contexts       name -> module  │
//! │       ▲                    │                     │         │
//! │       │              PluginContext          require()      │
//! │  PluginLoader ── fetch ── ExecutionBackend ◄─────┘         │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`PluginContext`]: jin_plugin_api::PluginContext

pub mod composer;
pub mod config;
pub mod error;
pub mod host;
pub mod loader;
pub mod modules;
pub mod registry;

// Re-export key types for convenience
pub use composer::ContextComposer;
pub use config::{PluginHostConfig, ReactivationPolicy};
pub use error::{HostError, LoadError};
pub use host::{PluginFactory, PluginHost};
pub use loader::{ExecutionBackend, LoadedPlugin, ModuleHandle, NativeLibraryBackend, PluginLoader};
pub use modules::ModuleRegistry;
pub use registry::{PluginInfo, PluginRegistry, PluginState, RegisteredPlugin};
