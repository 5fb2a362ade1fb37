//! jin inspect - check that a url serves a usable plugin module

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use jin_plugin_api::{Capability, PluginManifest};

use super::run::build_host;
use crate::config::ConfigLoader;

/// Id the inspected plugin is registered under with `--activate`
const INSPECT_ID: &str = "inspect";

/// Arguments for the inspect command
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Module url (http, https or file)
    pub url: String,

    /// Also activate and deactivate the plugin against the default base context
    #[arg(long)]
    pub activate: bool,

    /// Extra config file layered on top of user and project config
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Run the inspect command
pub async fn run(args: InspectArgs) -> Result<()> {
    let config = ConfigLoader::load_with(args.config.as_deref())?;
    let (host, routes) = build_host(&config);

    let loaded = host.load_plugin(&args.url).await?;
    println!("URL:        {}", loaded.url());
    println!("activate:   ✓");
    println!(
        "deactivate: {}",
        if loaded.has_deactivate() { "✓" } else { "-" }
    );

    let values = loaded.exported_values();
    if !values.is_empty() {
        println!("Exports:");
        for (name, value) in values.iter() {
            println!("  {:<16} {}", name, describe(value));
        }
    }
    drop(loaded);

    if !args.activate {
        return Ok(());
    }

    let manifest = PluginManifest::new(INSPECT_ID, INSPECT_ID, "0.0.0").with_url(&args.url);
    host.register_plugin(manifest, None).await?;
    host.activate_plugin(INSPECT_ID).await?;

    let subscriptions = host
        .context(INSPECT_ID)
        .map(|ctx| ctx.subscription_count())
        .unwrap_or_default();
    println!();
    println!("Activated with {} resource(s)", subscriptions);
    for route in routes.routes() {
        println!("  route {:<18} {}", route.path, route.name);
    }

    host.deactivate_plugin(INSPECT_ID).await?;
    let leaked = routes.routes();
    if !leaked.is_empty() {
        bail!("{} route(s) still registered after deactivation", leaked.len());
    }
    println!("Deactivated cleanly");
    Ok(())
}

fn describe(value: &Capability) -> String {
    match value {
        Capability::Value(value) => value.to_string(),
        Capability::Service(_) => "<service>".to_string(),
        Capability::Empty => "<empty>".to_string(),
    }
}
