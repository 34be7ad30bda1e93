use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod builtin;
mod commands;
mod config;

#[derive(Parser)]
#[command(name = "hotswap", about = "Host for hot-reloadable plugins")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: $XDG_CONFIG_HOME/hotswap/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Plugin root directory, overrides the config file
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load all plugins and reload them as their files change
    Serve(commands::serve::ServeArgs),
    /// List plugins on disk
    List(commands::list::ListArgs),
    /// Show the status of a plugin
    Status(commands::status::StatusArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::ConfigLoader::load(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.plugins.root = root;
    }

    let level = if cli.verbose {
        "debug"
    } else {
        config.log.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args, config).await,
        Commands::List(args) => commands::list::run(args, config).await,
        Commands::Status(args) => commands::status::run(args, config).await,
    }
}
