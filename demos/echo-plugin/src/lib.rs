//! Echo Plugin - the built-in echo plugin as a native library
//!
//! This plugin demonstrates:
//! - Exporting a plugin with the `export_plugin!` macro
//! - Reading config at construction and on change
//! - Exposing routes through a `MountPoint`
//!
//! ## Building
//!
//! ```bash
//! cargo build --release
//! ```
//!
//! ## Installing
//!
//! The directory name is the plugin identifier. It must differ from `echo`, which
//! the host already provides as a built-in.
//!
//! ```bash
//! mkdir -p plugins/native-echo
//! cp target/release/libecho_plugin.so plugins/native-echo/
//! echo '{"main": "libecho_plugin.so", "config": {"greeting": "hi"}}' > plugins/native-echo/plugin.json
//! hotswap serve
//! ```
//!
//! Rebuilding and touching `plugin.json` reloads the new library in place.

use async_trait::async_trait;
use hotswap_plugin_api::{
    ConfigMap, HttpMethod, MountPoint, Plugin, PluginError, PluginIdentity, PluginInit,
    export_plugin,
};

pub struct NativeEcho {
    init: PluginInit,
    greeting: String,
    changes: u32,
}

impl From<PluginInit> for NativeEcho {
    fn from(init: PluginInit) -> Self {
        let greeting = init
            .config_get::<String>("greeting")
            .unwrap_or_else(|| "hello".to_string());
        Self {
            init,
            greeting,
            changes: 0,
        }
    }
}

#[async_trait]
impl Plugin for NativeEcho {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity::new("native-echo", env!("CARGO_PKG_VERSION"))
    }

    async fn on_load(&mut self) -> Result<(), PluginError> {
        self.init.logger.log_info(&format!(
            "Native echo loaded from {}",
            self.init.context.plugin_dir(self.init.identifier()).display()
        ));
        Ok(())
    }

    async fn on_enable(&mut self) -> Result<(), PluginError> {
        self.init
            .logger
            .log_info(&format!("{}, native echo is enabled", self.greeting));
        Ok(())
    }

    async fn on_unload(&mut self) -> Result<(), PluginError> {
        self.init.logger.log_info(&format!(
            "Native echo unloading after {} config change(s)",
            self.changes
        ));
        Ok(())
    }

    fn mountable(&self) -> Option<MountPoint> {
        Some(MountPoint::new().route(HttpMethod::Post, "/say/:message"))
    }

    async fn on_config_changed(&mut self, config: &ConfigMap) -> Result<(), PluginError> {
        self.changes += 1;
        if let Some(greeting) = config.get("greeting").and_then(|v| v.as_str()) {
            self.greeting = greeting.to_string();
        }
        Ok(())
    }
}

export_plugin!(NativeEcho);
