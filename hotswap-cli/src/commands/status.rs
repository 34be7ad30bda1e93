//! Show the status of one plugin as JSON

use anyhow::Result;
use clap::Args;

use super::build_registry;
use crate::config::HostConfig;

/// Arguments for the status command
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Plugin identifier (its directory name)
    pub id: String,

    /// Load the plugin first, enabling it if its descriptor asks for it
    #[arg(long)]
    pub load: bool,
}

/// Run the status command
pub async fn run(args: StatusArgs, config: HostConfig) -> Result<()> {
    let registry = build_registry(&config)?;

    if args.load {
        registry.load(&args.id).await?;
        let status = registry.get_status(&args.id).await;
        if status.metadata.as_ref().is_some_and(|m| m.enabled_by_default) {
            registry.enable(&args.id).await?;
        }
    }

    let status = registry.get_status(&args.id).await;
    println!("{}", serde_json::to_string_pretty(&status)?);

    if args.load {
        registry.shutdown_all().await;
    }
    Ok(())
}
