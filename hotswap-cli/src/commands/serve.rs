//! Run the plugin host until interrupted
//!
//! Loads every plugin under the root, enables those whose descriptor asks for it,
//! and reloads plugins as their files change.

use anyhow::{Context, Result};
use clap::Args;
use hotswap_core::PluginWatcher;
use tracing::info;

use super::build_registry;
use crate::config::HostConfig;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Do not watch the plugin root for changes
    #[arg(long)]
    pub no_watch: bool,
}

/// Run the serve command
pub async fn run(args: ServeArgs, config: HostConfig) -> Result<()> {
    let registry = build_registry(&config)?;
    info!(root = %registry.plugin_root().display(), "Starting plugin host");

    let report = registry.load_all().await;
    for (id, error) in &report.failed {
        eprintln!("✗ {}: {}", id, error);
    }
    println!(
        "Loaded {} plugin(s), {} enabled, {} failed",
        report.loaded.len(),
        report.enabled.len(),
        report.failed.len()
    );
    for route in registry.mounts() {
        println!("  {:?} {} -> {}", route.method, route.path, route.plugin);
    }

    let watcher = if config.plugins.watch && !args.no_watch {
        Some(
            PluginWatcher::start(&registry, config.watcher_config())
                .context("Failed to watch plugin root")?,
        )
    } else {
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");

    drop(watcher);
    registry.shutdown_all().await;
    Ok(())
}
