//! Construction inputs handed to a plugin by the host

use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::types::{ConfigMap, PluginDescriptor};

/// Host-provided shared state.
///
/// Plugins may read it but do not own it; every plugin receives the same
/// `Arc<HostContext>`.
#[derive(Default)]
pub struct HostContext {
    plugin_root: PathBuf,
    settings: ConfigMap,
    services: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl HostContext {
    /// Create a context for plugins living under `plugin_root`
    pub fn new(plugin_root: impl Into<PathBuf>) -> Self {
        Self {
            plugin_root: plugin_root.into(),
            ..Default::default()
        }
    }

    /// Builder: set read-only host settings
    pub fn with_settings(mut self, settings: ConfigMap) -> Self {
        self.settings = settings;
        self
    }

    /// Register a shared service plugins can look up by name
    pub fn insert_service<T: Send + Sync + 'static>(&mut self, name: &str, service: Arc<T>) {
        self.services.insert(name.to_string(), service);
    }

    /// Root directory all plugins are discovered under
    pub fn plugin_root(&self) -> &Path {
        &self.plugin_root
    }

    /// Directory of a specific plugin
    pub fn plugin_dir(&self, identifier: &str) -> PathBuf {
        self.plugin_root.join(identifier)
    }

    /// Read a host setting
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// Get a service registered by the host.
    ///
    /// Returns `None` if no service is registered under `name` or it has a
    /// different type.
    pub fn service<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.services
            .get(name)
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("plugin_root", &self.plugin_root)
            .field("settings", &self.settings)
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Logging handle owned by one plugin.
///
/// Every line is attributed to the plugin identifier; there is no process-wide
/// logger object for plugins to reach for.
#[derive(Debug, Clone)]
pub struct PluginLogger {
    plugin: String,
}

impl PluginLogger {
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
        }
    }

    /// Identifier this logger attributes lines to
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Log an info message
    pub fn log_info(&self, message: &str) {
        tracing::info!(plugin = %self.plugin, "{}", message);
    }

    /// Log a warning message
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(plugin = %self.plugin, "{}", message);
    }

    /// Log an error message
    pub fn log_error(&self, message: &str) {
        tracing::error!(plugin = %self.plugin, "{}", message);
    }

    /// Log a debug message
    pub fn log_debug(&self, message: &str) {
        tracing::debug!(plugin = %self.plugin, "{}", message);
    }
}

/// Everything a plugin is constructed from: `{context, metadata, config}` plus
/// its logger.
#[derive(Debug, Clone)]
pub struct PluginInit {
    /// Shared host state
    pub context: Arc<HostContext>,
    /// Descriptor the plugin was loaded from
    pub metadata: PluginDescriptor,
    /// Runtime config at load time
    pub config: ConfigMap,
    /// Logger attributed to this plugin
    pub logger: PluginLogger,
}

impl PluginInit {
    pub fn new(context: Arc<HostContext>, metadata: PluginDescriptor, config: ConfigMap) -> Self {
        let logger = PluginLogger::new(metadata.identifier.clone());
        Self {
            context,
            metadata,
            config,
            logger,
        }
    }

    /// Identifier of the plugin being constructed
    pub fn identifier(&self) -> &str {
        &self.metadata.identifier
    }

    /// Read a config value, deserialized into `T`
    ///
    /// # Example
    /// ```ignore
    /// let greeting: Option<String> = init.config_get("greeting");
    /// ```
    pub fn config_get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_host_context_settings() {
        let settings = json!({"region": "eu"}).as_object().cloned().unwrap();
        let ctx = HostContext::new("/srv/plugins").with_settings(settings);

        assert_eq!(ctx.setting("region"), Some(&json!("eu")));
        assert!(ctx.setting("missing").is_none());
        assert_eq!(ctx.plugin_dir("echo"), PathBuf::from("/srv/plugins/echo"));
    }

    #[test]
    fn test_host_context_services_are_typed() {
        let mut ctx = HostContext::default();
        ctx.insert_service("counter", Arc::new(42_u32));

        assert_eq!(ctx.service::<u32>("counter").as_deref(), Some(&42));
        assert!(ctx.service::<String>("counter").is_none());
        assert!(ctx.service::<u32>("other").is_none());
    }

    #[test]
    fn test_plugin_init_attributes_logger() {
        let init = PluginInit::new(
            Arc::new(HostContext::default()),
            PluginDescriptor::new("echo"),
            json!({"greeting": "hi", "count": 3}).as_object().cloned().unwrap(),
        );

        assert_eq!(init.identifier(), "echo");
        assert_eq!(init.logger.plugin(), "echo");
        assert_eq!(init.config_get::<String>("greeting").as_deref(), Some("hi"));
        assert_eq!(init.config_get::<u32>("count"), Some(3));
        assert_eq!(init.config_get::<u32>("greeting"), None);
    }
}
