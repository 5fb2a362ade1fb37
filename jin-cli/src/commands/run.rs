//! jin run - host the configured plugins until interrupted
//!
//! Builds a [`PluginHost`], publishes the base context (route table and host
//! info), registers every configured plugin, activates those marked
//! `activate = true` and waits for Ctrl-C before deactivating everything.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use jin_core::{HostError, PluginHost, PluginState};
use jin_plugin_api::{Capability, CapabilityBag, ROUTE_REGISTRAR, RouteRegistrar, routes};
use serde_json::json;
use tracing::info;

use crate::config::{ConfigLoader, JinConfig};
use crate::routes::RouteTable;

/// Capability name of the host description value
pub const HOST_INFO: &str = "hostInfo";

/// Arguments for the run command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Extra config file layered on top of user and project config
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// A host with its route table, after startup
pub struct Session {
    pub host: Arc<PluginHost>,
    pub routes: Arc<RouteTable>,
    /// Plugins that failed to register or activate
    pub failures: Vec<(String, HostError)>,
}

/// Run the run command
pub async fn run(args: RunArgs) -> Result<()> {
    let config = ConfigLoader::load_with(args.config.as_deref())?;
    let session = start(&config).await;

    print_summary(&session);

    info!("Waiting for Ctrl-C");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    for (id, e) in session.host.deactivate_all().await {
        eprintln!("Failed to deactivate {}: {}", id, e);
    }
    Ok(())
}

/// Build the host, publish the base context, then register and activate the
/// configured plugins. Per-plugin failures are collected, not returned.
pub async fn start(config: &JinConfig) -> Session {
    let (host, routes) = build_host(config);

    let manifests = config
        .plugins
        .iter()
        .map(|entry| entry.manifest.clone())
        .collect();
    let mut failures = host.register_pending(manifests).await;

    for entry in config.plugins.iter().filter(|entry| entry.activate) {
        let id = &entry.manifest.id;
        if !host.contains(id) {
            continue;
        }
        if let Err(e) = host.activate_plugin(id).await {
            tracing::error!(plugin = %id, error = %e, "Failed to activate plugin");
            failures.push((id.clone(), e));
        }
    }

    Session {
        host,
        routes,
        failures,
    }
}

/// A host with the base context and host modules published, and no plugins
pub fn build_host(config: &JinConfig) -> (Arc<PluginHost>, Arc<RouteTable>) {
    let host = Arc::new(PluginHost::new(config.host.to_host_config()));
    let routes = Arc::new(RouteTable::new());

    host.set_plugin_context(base_context(&routes));
    host.register_module("jin", host_info());
    (host, routes)
}

fn base_context(route_table: &Arc<RouteTable>) -> CapabilityBag {
    let registrar: Arc<dyn RouteRegistrar> = Arc::clone(route_table) as Arc<dyn RouteRegistrar>;
    CapabilityBag::new()
        .with(ROUTE_REGISTRAR, routes::registrar_capability(registrar))
        .with(HOST_INFO, host_info())
}

fn host_info() -> Capability {
    Capability::value(json!({
        "name": "jin",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn print_summary(session: &Session) {
    let plugins = session.host.list_plugins();
    if plugins.is_empty() {
        println!("No plugins registered");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Plugin").fg(Color::Cyan),
            Cell::new("Version").fg(Color::Cyan),
            Cell::new("State").fg(Color::Cyan),
        ]);
        for info in plugins {
            table.add_row(vec![
                Cell::new(&info.id),
                Cell::new(&info.manifest.version),
                state_cell(&info.state),
            ]);
        }
        println!("{table}");
    }

    let routes = session.routes.routes();
    if !routes.is_empty() {
        println!();
        println!("Routes:");
        for route in routes {
            println!("  {:<24} {}", route.path, route.name);
        }
    }

    for (id, e) in &session.failures {
        eprintln!("✗ {}: {}", id, e);
    }
}

fn state_cell(state: &PluginState) -> Cell {
    match state {
        PluginState::Active => Cell::new("active").fg(Color::Green),
        PluginState::Failed { error } => Cell::new(format!("failed: {}", error)).fg(Color::Red),
        other => Cell::new(format!("{:?}", other).to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PluginEntry;
    use jin_plugin_api::{PluginManifest, route_registrar};

    fn entry(manifest: PluginManifest, activate: bool) -> PluginEntry {
        PluginEntry { manifest, activate }
    }

    #[tokio::test]
    async fn test_start_publishes_base_context() {
        let session = start(&JinConfig::default()).await;

        let base = session.host.base_context();
        assert!(base.contains(ROUTE_REGISTRAR));
        assert_eq!(
            base.get(HOST_INFO).and_then(Capability::as_value).unwrap()["name"],
            json!("jin")
        );
        assert!(session.failures.is_empty());
        assert_eq!(session.host.plugin_count(), 0);
    }

    #[tokio::test]
    async fn test_published_registrar_is_the_route_table() {
        let session = start(&JinConfig::default()).await;

        let ctx = jin_plugin_api::PluginContext::new("probe", session.host.base_context());
        let registrar = route_registrar(&ctx).unwrap();
        let _hello = registrar
            .register(jin_plugin_api::RouteSpec::new("/hello", "Hello"))
            .unwrap();

        assert_eq!(session.routes.routes().len(), 1);
    }

    #[tokio::test]
    async fn test_start_collects_registration_failures() {
        let dir = tempfile::tempdir().unwrap();
        let missing = format!("file://{}/missing.so", dir.path().display());

        let mut config = JinConfig::default();
        config.host.module_cache_dir = Some(dir.path().join("modules"));
        config.plugins = vec![
            entry(PluginManifest::new("no-source", "No Source", "0.1.0"), true),
            entry(
                PluginManifest::new("missing", "Missing", "0.1.0").with_url(missing),
                true,
            ),
        ];

        let session = start(&config).await;

        let ids: Vec<&str> = session.failures.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["no-source", "missing"]);
        assert!(matches!(
            session.failures[0].1,
            HostError::Registration { .. }
        ));
        assert!(matches!(session.failures[1].1, HostError::Load(_)));
        assert_eq!(session.host.plugin_count(), 0);
    }
}
