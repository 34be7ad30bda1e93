//! List plugins on disk without loading them

use anyhow::Result;
use clap::Args;
use hotswap_core::PluginStatus;

use super::build_registry;
use crate::config::HostConfig;

/// Arguments for the list command
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the list command
pub async fn run(args: ListArgs, config: HostConfig) -> Result<()> {
    let registry = build_registry(&config)?;
    let statuses = registry.statuses().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    if statuses.is_empty() {
        println!("No plugins found in {}", registry.plugin_root().display());
        println!();
        println!("To add a plugin:");
        println!("  1. Create a plugin directory: mkdir -p <root>/my-plugin");
        println!("  2. Describe it: echo '{{\"main\": \"main\"}}' > <root>/my-plugin/plugin.json");
        return Ok(());
    }

    for status in &statuses {
        println!("{}", summary_line(status));
    }
    Ok(())
}

fn summary_line(status: &PluginStatus) -> String {
    let Some(metadata) = &status.metadata else {
        return format!("✗ {}    unreadable descriptor", status.identifier);
    };

    let marker = if metadata.enabled_by_default { "✓" } else { "○" };
    let version = metadata.version.as_deref().unwrap_or("-");
    let description = metadata
        .description
        .as_deref()
        .unwrap_or("No description");

    format!(
        "{} {} v{}    {} (main: {})",
        marker, status.identifier, version, description, metadata.entry_point
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotswap_core::PluginState;
    use hotswap_plugin_api::PluginDescriptor;

    fn status(metadata: Option<PluginDescriptor>) -> PluginStatus {
        PluginStatus {
            identifier: "echo".to_string(),
            state: PluginState::Unloaded,
            is_enabled: false,
            identity: None,
            metadata,
            config: None,
        }
    }

    #[test]
    fn test_summary_line() {
        let mut descriptor = PluginDescriptor::new("echo");
        descriptor.version = Some("1.0.0".to_string());

        let line = summary_line(&status(Some(descriptor)));
        assert!(line.starts_with("✓ echo v1.0.0"));
        assert!(line.contains("main: main"));
    }

    #[test]
    fn test_summary_line_unreadable() {
        assert!(summary_line(&status(None)).contains("unreadable"));
    }
}
