//! Plugins compiled into the host

use async_trait::async_trait;
use hotswap_core::FactoryCatalog;
use hotswap_plugin_api::{
    ConfigMap, HttpMethod, MountPoint, Plugin, PluginError, PluginIdentity, PluginInit,
};

const DEFAULT_GREETING: &str = "hello";

/// Build the catalog of built-in plugins
pub fn catalog() -> hotswap_core::Result<FactoryCatalog> {
    let mut catalog = FactoryCatalog::new();
    catalog.register_type::<EchoPlugin>("echo")?;
    Ok(catalog)
}

/// Echoes messages back with a configurable greeting
pub struct EchoPlugin {
    init: PluginInit,
    greeting: String,
}

impl From<PluginInit> for EchoPlugin {
    fn from(init: PluginInit) -> Self {
        let greeting = init
            .config_get::<String>("greeting")
            .unwrap_or_else(|| DEFAULT_GREETING.to_string());
        Self { init, greeting }
    }
}

impl EchoPlugin {
    pub fn greet(&self, message: &str) -> String {
        format!("{}, {}", self.greeting, message)
    }
}

#[async_trait]
impl Plugin for EchoPlugin {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity::new("echo", env!("CARGO_PKG_VERSION"))
    }

    async fn on_load(&mut self) -> Result<(), PluginError> {
        if self.greeting.trim().is_empty() {
            return Err(PluginError::config("greeting must not be empty"));
        }
        self.init
            .logger
            .log_info(&format!("Loaded with greeting '{}'", self.greeting));
        Ok(())
    }

    async fn on_enable(&mut self) -> Result<(), PluginError> {
        self.init.logger.log_info(&self.greet("echo is enabled"));
        Ok(())
    }

    async fn on_disable(&mut self) -> Result<(), PluginError> {
        self.init.logger.log_info("Echo disabled");
        Ok(())
    }

    async fn on_unload(&mut self) -> Result<(), PluginError> {
        self.init.logger.log_debug("Echo unloading");
        Ok(())
    }

    fn mountable(&self) -> Option<MountPoint> {
        Some(
            MountPoint::new()
                .route(HttpMethod::Get, "/status")
                .route(HttpMethod::Post, "/say/:message"),
        )
    }

    async fn on_config_changed(&mut self, config: &ConfigMap) -> Result<(), PluginError> {
        let Some(greeting) = config.get("greeting") else {
            return Ok(());
        };
        let greeting = greeting
            .as_str()
            .ok_or_else(|| PluginError::config("greeting must be a string"))?;

        self.greeting = greeting.to_string();
        self.init
            .logger
            .log_info(&format!("Greeting is now '{}'", self.greeting));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotswap_plugin_api::{HostContext, PluginDescriptor};
    use serde_json::json;
    use std::sync::Arc;

    fn echo(config: serde_json::Value) -> EchoPlugin {
        EchoPlugin::from(PluginInit::new(
            Arc::new(HostContext::default()),
            PluginDescriptor::new("echo"),
            config.as_object().cloned().unwrap_or_default(),
        ))
    }

    #[test]
    fn test_catalog_registers_echo() {
        let catalog = catalog().unwrap();
        assert!(catalog.contains("echo"));
    }

    #[tokio::test]
    async fn test_greeting_from_config() {
        let mut plugin = echo(json!({"greeting": "hi"}));
        plugin.on_load().await.unwrap();
        assert_eq!(plugin.greet("there"), "hi, there");
    }

    #[tokio::test]
    async fn test_empty_greeting_fails_load() {
        let mut plugin = echo(json!({"greeting": " "}));
        assert!(plugin.on_load().await.is_err());
    }

    #[tokio::test]
    async fn test_config_change_updates_greeting() {
        let mut plugin = echo(json!({}));
        assert_eq!(plugin.greet("x"), "hello, x");

        let config = json!({"greeting": "hey"}).as_object().cloned().unwrap();
        plugin.on_config_changed(&config).await.unwrap();
        assert_eq!(plugin.greet("x"), "hey, x");

        let bad = json!({"greeting": 3}).as_object().cloned().unwrap();
        assert!(plugin.on_config_changed(&bad).await.is_err());
    }

    #[test]
    fn test_mount_point_routes() {
        let plugin = echo(json!({}));
        assert_eq!(plugin.mountable().unwrap().routes.len(), 2);
    }
}
