//! Shared test utilities for hotswap-core integration tests

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hotswap_core::{FactoryCatalog, PluginRegistry, RegistryConfig};
use hotswap_plugin_api::{
    ConfigMap, HostContext, MountPoint, Plugin, PluginError, PluginIdentity, PluginInit,
};
use tempfile::TempDir;

/// Hook calls in the order they happened, as `"<plugin>:<hook>"`
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Test double whose behavior is driven by its config:
/// `fail_load`, `fail_enable`, `panic_new`, `panic_enable`, `panic_mountable`,
/// `load_delay_ms`, `enable_delay_ms`
pub struct Probe {
    id: String,
    log: CallLog,
    fail_load: bool,
    fail_enable: bool,
    panic_enable: bool,
    panic_mountable: bool,
    load_delay: Duration,
    enable_delay: Duration,
}

impl Probe {
    fn new(init: PluginInit, log: CallLog) -> Self {
        if init.config_get("panic_new").unwrap_or(false) {
            panic!("constructor exploded");
        }
        let millis = |key: &str| Duration::from_millis(init.config_get::<u64>(key).unwrap_or(0));
        Self {
            id: init.identifier().to_string(),
            fail_load: init.config_get("fail_load").unwrap_or(false),
            fail_enable: init.config_get("fail_enable").unwrap_or(false),
            panic_enable: init.config_get("panic_enable").unwrap_or(false),
            panic_mountable: init.config_get("panic_mountable").unwrap_or(false),
            load_delay: millis("load_delay_ms"),
            enable_delay: millis("enable_delay_ms"),
            log,
        }
    }

    fn record(&self, hook: &str) {
        self.log.lock().unwrap().push(format!("{}:{}", self.id, hook));
    }
}

#[async_trait]
impl Plugin for Probe {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity::new(format!("probe-{}", self.id), "1.0.0")
    }

    fn mountable(&self) -> Option<MountPoint> {
        if self.panic_mountable {
            panic!("mountable exploded");
        }
        None
    }

    async fn on_load(&mut self) -> Result<(), PluginError> {
        tokio::time::sleep(self.load_delay).await;
        self.record("load");
        if self.fail_load {
            return Err(PluginError::declined("fail_load is set"));
        }
        Ok(())
    }

    async fn on_enable(&mut self) -> Result<(), PluginError> {
        tokio::time::sleep(self.enable_delay).await;
        if self.panic_enable {
            panic!("probe exploded");
        }
        self.record("enable");
        if self.fail_enable {
            return Err(PluginError::declined("fail_enable is set"));
        }
        Ok(())
    }

    async fn on_disable(&mut self) -> Result<(), PluginError> {
        self.record("disable");
        Ok(())
    }

    async fn on_unload(&mut self) -> Result<(), PluginError> {
        self.record("unload");
        Ok(())
    }

    async fn on_config_changed(&mut self, config: &ConfigMap) -> Result<(), PluginError> {
        let snapshot = serde_json::Value::Object(config.clone());
        self.record(&format!("config_changed:{}", snapshot));
        Ok(())
    }

    async fn on_descriptor_changed(
        &mut self,
        _descriptor: &hotswap_plugin_api::PluginDescriptor,
    ) -> Result<(), PluginError> {
        self.record("descriptor_changed");
        Ok(())
    }
}

/// A plugin root in a temp dir with a registry whose catalog serves [`Probe`]
/// for the given identifiers
pub struct Fixture {
    pub dir: TempDir,
    pub log: CallLog,
    pub registry: Arc<PluginRegistry>,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new(ids: &[&str]) -> Self {
        Self::with_timeout(ids, Some(Duration::from_secs(5)))
    }

    pub fn with_timeout(ids: &[&str], hook_timeout: Option<Duration>) -> Self {
        let dir = TempDir::new().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));

        let mut catalog = FactoryCatalog::new();
        for id in ids {
            let log = Arc::clone(&log);
            catalog
                .register(id, move |init: PluginInit| {
                    Box::new(Probe::new(init, Arc::clone(&log))) as Box<dyn Plugin>
                })
                .unwrap();
        }

        let config = RegistryConfig {
            plugin_root: dir.path().to_path_buf(),
            hook_timeout,
            shadow_dir: dir.path().join(".shadow"),
        };
        let registry = Arc::new(PluginRegistry::new(
            config,
            catalog,
            HostContext::new(dir.path()),
        ));

        Self { dir, log, registry }
    }

    pub fn plugin_dir(&self, id: &str) -> PathBuf {
        self.dir.path().join(id)
    }

    /// Create `<root>/<id>/plugin.json` and its `main` entry point
    pub fn write_plugin(&self, id: &str, descriptor: &str) {
        let dir = self.plugin_dir(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("plugin.json"), descriptor).unwrap();
        std::fs::write(dir.join("main"), "").unwrap();
    }

    pub fn write_config(&self, id: &str, config: &str) {
        std::fs::write(self.plugin_dir(id).join("config.json"), config).unwrap();
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, needle: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.contains(needle))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.log.lock().unwrap().clear();
    }
}
