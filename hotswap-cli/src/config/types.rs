use std::path::PathBuf;
use std::time::Duration;

use hotswap_core::{RegistryConfig, WatcherConfig};
use hotswap_plugin_api::ConfigMap;
use serde::{Deserialize, Serialize};

/// Default plugin root, relative to the working directory
pub const DEFAULT_PLUGIN_ROOT: &str = "plugins";

/// Default debounce window for file changes
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Default bound on a single plugin hook
pub const DEFAULT_HOOK_TIMEOUT_MS: u64 = 10_000;

/// Host configuration as stored in `config.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostConfig {
    #[serde(default)]
    pub plugins: PluginsConfig,

    #[serde(default)]
    pub log: LogConfig,

    /// Arbitrary values exposed to plugins as host settings
    #[serde(default)]
    pub context: toml::Table,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directory plugins are discovered under
    pub root: PathBuf,

    /// Debounce window for file changes
    pub debounce_ms: u64,

    /// Bound on a single hook call, 0 disables it
    pub hook_timeout_ms: u64,

    /// Reload plugins when their files change
    pub watch: bool,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_PLUGIN_ROOT),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            hook_timeout_ms: DEFAULT_HOOK_TIMEOUT_MS,
            watch: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl HostConfig {
    pub fn registry_config(&self) -> RegistryConfig {
        let hook_timeout = match self.plugins.hook_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        RegistryConfig {
            plugin_root: self.plugins.root.clone(),
            hook_timeout,
            ..Default::default()
        }
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            debounce: Duration::from_millis(self.plugins.debounce_ms),
            ..Default::default()
        }
    }

    /// The `[context]` table as plugin-facing settings
    pub fn context_settings(&self) -> anyhow::Result<ConfigMap> {
        match serde_json::to_value(&self.context)? {
            serde_json::Value::Object(settings) => Ok(settings),
            _ => Ok(ConfigMap::new()),
        }
    }
}
