use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod routes;

#[derive(Parser)]
#[command(name = "jin", about = "Host for dynamically loaded plugins")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Load a plugin module and check its exports
    Inspect(commands::inspect::InspectArgs),
    /// Show configured plugins
    Plugin(commands::plugin::PluginArgs),
    /// Host the configured plugins until Ctrl-C
    Run(commands::run::RunArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Config(args) => commands::config::run(args),
        Commands::Inspect(args) => commands::inspect::run(args).await,
        Commands::Plugin(args) => commands::plugin::run(args),
        Commands::Run(args) => commands::run::run(args).await,
    }
}
