//! Plugin commands - inspect the `[[plugins]]` entries of the merged config

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use crate::config::{ConfigLoader, PluginEntry};

/// Plugin command arguments
#[derive(Args)]
pub struct PluginArgs {
    #[command(subcommand)]
    pub command: PluginCommands,

    /// Extra config file layered on top of user and project config
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Plugin subcommands
#[derive(Subcommand)]
pub enum PluginCommands {
    /// List configured plugins
    List,
    /// Show a configured plugin's manifest
    Info {
        /// Plugin id
        id: String,
    },
}

/// Run plugin command
pub fn run(args: PluginArgs) -> Result<()> {
    let config = ConfigLoader::load_with(args.config.as_deref())?;

    match args.command {
        PluginCommands::List => list_plugins(&config.plugins),
        PluginCommands::Info { id } => show_plugin_info(&config.plugins, &id),
    }
}

fn list_plugins(plugins: &[PluginEntry]) -> Result<()> {
    if plugins.is_empty() {
        println!("No plugins configured");
        println!();
        println!("Add one to .jin/config.toml:");
        println!();
        println!("  [[plugins]]");
        println!("  id = \"hello-world-plugin\"");
        println!("  name = \"Hello World Plugin\"");
        println!("  version = \"0.1.0\"");
        println!("  url = \"http://localhost:3000/libhello_world_plugin.so\"");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("").fg(Color::Cyan),
        Cell::new("Plugin").fg(Color::Cyan),
        Cell::new("Version").fg(Color::Cyan),
        Cell::new("Source").fg(Color::Cyan),
    ]);

    for entry in plugins {
        let m = &entry.manifest;
        table.add_row(vec![
            Cell::new(if entry.activate { "✓" } else { "○" }),
            Cell::new(&m.id),
            Cell::new(&m.version),
            Cell::new(m.url.as_deref().unwrap_or("(no url)")),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn show_plugin_info(plugins: &[PluginEntry], id: &str) -> Result<()> {
    let Some(entry) = find(plugins, id) else {
        bail!("Plugin not configured: {}", id);
    };

    let m = &entry.manifest;
    println!("Id:          {}", m.id);
    println!("Name:        {}", m.name);
    println!("Version:     {}", m.version);
    println!("URL:         {}", m.url.as_deref().unwrap_or("(none)"));
    println!("Activate:    {}", if entry.activate { "yes" } else { "no" });

    if !m.capabilities.is_empty() {
        println!("Requires:    {}", m.capabilities.join(", "));
    }
    if !m.activation_events.is_empty() {
        println!("Events:      {}", m.activation_events.join(", "));
    }
    if !m.dependencies.is_empty() {
        println!("Depends on:");
        for (dep, range) in &m.dependencies {
            println!("  {} {}", dep, range);
        }
    }
    Ok(())
}

/// Last entry with the id wins, matching registration order
fn find<'a>(plugins: &'a [PluginEntry], id: &str) -> Option<&'a PluginEntry> {
    plugins.iter().rev().find(|entry| entry.manifest.id == id)
}
