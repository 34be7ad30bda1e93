pub mod list;
pub mod serve;
pub mod status;

use std::sync::Arc;

use anyhow::Result;
use hotswap_core::PluginRegistry;
use hotswap_plugin_api::HostContext;

use crate::builtin;
use crate::config::HostConfig;

/// Build a registry over the configured plugin root with the built-in catalog
pub fn build_registry(config: &HostConfig) -> Result<Arc<PluginRegistry>> {
    let registry_config = config.registry_config();
    let context = HostContext::new(&registry_config.plugin_root)
        .with_settings(config.context_settings()?);

    Ok(Arc::new(PluginRegistry::new(
        registry_config,
        builtin::catalog()?,
        context,
    )))
}
